// 该文件是 Beifeng （北风） 项目的一部分。
// src/output.rs - 输出定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, task::FrameReport};

/// 渲染端：每帧收到按置信度排序的检测结果与当前帧率
pub trait Render {
  type Error;
  fn render_result(&self, frame: &Frame, report: &FrameReport) -> Result<(), Self::Error>;
}

mod log_output;
pub use self::log_output::LogOutput;

#[cfg(feature = "jsonl_record")]
mod jsonl_record;
#[cfg(feature = "jsonl_record")]
pub use self::jsonl_record::{JsonlRecordOutput, JsonlRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "jsonl_record")]
  #[error("JSONL 记录输出错误: {0}")]
  JsonlRecordOutputError(#[from] JsonlRecordOutputError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  Log(LogOutput),
  #[cfg(feature = "jsonl_record")]
  JsonlRecord(JsonlRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput::from_url(url)?)),
      #[cfg(feature = "jsonl_record")]
      JsonlRecordOutput::SCHEME => Ok(OutputWrapper::JsonlRecord(JsonlRecordOutput::from_url(
        url,
      )?)),
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &Frame, report: &FrameReport) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => output
        .render_result(frame, report)
        .map_err(|e| match e {}),
      #[cfg(feature = "jsonl_record")]
      OutputWrapper::JsonlRecord(output) => output
        .render_result(frame, report)
        .map_err(OutputError::from),
    }
  }
}
