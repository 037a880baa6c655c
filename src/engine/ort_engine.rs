// 该文件是 Beifeng （北风） 项目的一部分。
// src/engine/ort_engine.rs - ONNX Runtime 推理引擎
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

use std::fmt::Display;

use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::Tensor as OrtTensor,
};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  engine::{EngineError, InferenceEngine, RawOutput},
  preprocess::Tensor,
};

const ORT_NUM_INPUTS: usize = 1;

pub struct OrtEngine {
  session: Session,
}

pub struct OrtEngineBuilder {
  model_path: String,
  intra_threads: Option<usize>,
}

impl FromUrlWithScheme for OrtEngineBuilder {
  const SCHEME: &'static str = "ort";
}

impl FromUrl for OrtEngineBuilder {
  type Error = EngineError;

  /// `ort:///path/to/yolov8n.onnx?threads=4`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EngineError::Load(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let intra_threads = url
      .query_pairs()
      .find(|(k, _)| k == "threads")
      .map(|(_, v)| {
        v.parse::<usize>()
          .map_err(|e| EngineError::Load(format!("无效的线程数 '{}': {}", v, e)))
      })
      .transpose()?;

    Ok(OrtEngineBuilder {
      model_path: url.path().to_string(),
      intra_threads,
    })
  }
}

impl OrtEngineBuilder {
  pub fn new<S: Into<String>>(model_path: S) -> Self {
    Self {
      model_path: model_path.into(),
      intra_threads: None,
    }
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = Some(threads);
    self
  }

  pub fn build(self) -> Result<OrtEngine, EngineError> {
    info!("加载模型文件: {}", self.model_path);
    let mut builder = Session::builder()
      .map_err(load_err)?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(load_err)?;
    if let Some(threads) = self.intra_threads {
      debug!("推理线程数: {}", threads);
      builder = builder.with_intra_threads(threads).map_err(load_err)?;
    }
    let session = builder.commit_from_file(&self.model_path).map_err(load_err)?;

    if session.inputs.len() != ORT_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        ORT_NUM_INPUTS,
        session.inputs.len()
      );
      return Err(EngineError::Load(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        ORT_NUM_INPUTS,
        session.inputs.len()
      )));
    }
    if session.outputs.is_empty() {
      return Err(EngineError::Load("模型没有输出".to_string()));
    }

    debug!("模型输入: {}", session.inputs[0].name);
    debug!("模型输出: {}", session.outputs[0].name);
    info!("模型加载完成");

    Ok(OrtEngine { session })
  }
}

fn load_err<E: Display>(e: E) -> EngineError {
  EngineError::Load(e.to_string())
}

fn infer_err<E: Display>(e: E) -> EngineError {
  EngineError::Inference(e.to_string())
}

impl OrtEngine {
  pub fn load<S: Into<String>>(model_path: S) -> Result<Self, EngineError> {
    OrtEngineBuilder::new(model_path).build()
  }
}

impl InferenceEngine for OrtEngine {
  fn run(&mut self, tensor: &Tensor) -> Result<RawOutput, EngineError> {
    let input =
      OrtTensor::from_array((tensor.shape().dims(), tensor.as_slice().to_vec())).map_err(infer_err)?;
    let outputs = self.session.run(ort::inputs![input]).map_err(infer_err)?;

    // YOLOv8 只有一个输出 [1, 4 + C, N]
    let (shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(infer_err)?;
    debug!("模型输出形状: {:?}", shape);

    Ok(RawOutput::from(data.to_vec()))
  }
}
