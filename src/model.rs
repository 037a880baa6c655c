// 该文件是 Beifeng （北风） 项目的一部分。
// src/model.rs - 模型
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

use crate::{engine::EngineError, postprocess::PostprocessError, preprocess::PreprocessError};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

  /// 首次推理前的预热，失败不影响后续使用
  fn warmup(&mut self) {}
}

/// 单帧检测过程中可能出现的错误
#[derive(Error, Debug, PartialEq)]
pub enum DetectError {
  #[error("预处理错误: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("{0}")]
  Engine(#[from] EngineError),
  #[error("后处理错误: {0}")]
  Postprocess(#[from] PostprocessError),
}

impl DetectError {
  /// 只有引擎不可用时才是致命错误，其余错误只影响当前帧
  pub fn is_fatal(&self) -> bool {
    matches!(self, DetectError::Engine(e) if e.is_fatal())
  }

  pub fn is_engine_failure(&self) -> bool {
    matches!(self, DetectError::Engine(_))
  }
}

mod yolov8;
pub use self::yolov8::Yolov8Detector;
