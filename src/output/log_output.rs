// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::convert::Infallible;

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  output::{OutputError, Render},
  task::FrameReport,
};

/// 把每帧的检测结果写入日志，`log://?empty` 时空结果也输出
#[derive(Debug, Default)]
pub struct LogOutput {
  log_empty: bool,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(LogOutput {
      log_empty: url.query_pairs().any(|(k, _)| k == "empty"),
    })
  }
}

impl Render for LogOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &Frame, report: &FrameReport) -> Result<(), Self::Error> {
    if report.detections.is_empty() && !self.log_empty {
      return Ok(());
    }

    info!(
      "帧 {} ({}x{}, {} FPS): 检测到 {} 个对象",
      report.frame_index,
      frame.width(),
      frame.height(),
      report.fps,
      report.detections.len()
    );
    for det in &report.detections {
      info!(
        "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}x{:.0})",
        det.class_name,
        det.confidence * 100.0,
        det.x,
        det.y,
        det.width,
        det.height
      );
    }
    Ok(())
  }
}
