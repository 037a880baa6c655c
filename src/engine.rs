// 该文件是 Beifeng （北风） 项目的一部分。
// src/engine.rs - 推理引擎接口
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

use crate::preprocess::Tensor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
  #[error("模型加载错误: {0}")]
  Load(String),
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("推理引擎不可用: {0}")]
  Unusable(String),
}

impl EngineError {
  /// 引擎已无法继续使用，检测循环应当停止
  pub fn is_fatal(&self) -> bool {
    matches!(self, EngineError::Unusable(_))
  }
}

/// 模型的原始扁平输出
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawOutput {
  data: Vec<f32>,
}

impl RawOutput {
  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

impl From<Vec<f32>> for RawOutput {
  fn from(data: Vec<f32>) -> Self {
    Self { data }
  }
}

/// 推理引擎。输入张量自带 `[1, 3, H, W]` 形状，每次调用恰好返回一份输出或一个错误。
pub trait InferenceEngine {
  fn run(&mut self, tensor: &Tensor) -> Result<RawOutput, EngineError>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
  fn run(&mut self, tensor: &Tensor) -> Result<RawOutput, EngineError> {
    (**self).run(tensor)
  }
}

#[cfg(feature = "ort_engine")]
mod ort_engine;
#[cfg(feature = "ort_engine")]
pub use self::ort_engine::{OrtEngine, OrtEngineBuilder};
