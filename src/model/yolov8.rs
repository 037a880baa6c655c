// 该文件是 Beifeng （北风） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 检测器
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

use tracing::{debug, info, warn};

use crate::{
  config::{ConfigError, DetectorConfig},
  engine::InferenceEngine,
  frame::Frame,
  model::{DetectError, Model},
  postprocess::{Detection, postprocess},
  preprocess::{Tensor, TensorShape, preprocess},
};

/// 预处理 → 推理 → 后处理 的单帧检测器
pub struct Yolov8Detector<E> {
  engine: E,
  config: DetectorConfig,
  warmed_up: bool,
}

impl<E: InferenceEngine> Yolov8Detector<E> {
  pub fn new(engine: E, config: DetectorConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    debug!("检测器配置: {:?}", config);
    Ok(Self {
      engine,
      config,
      warmed_up: false,
    })
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn is_warmed_up(&self) -> bool {
    self.warmed_up
  }

  pub fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
    let config = &self.config;
    let (tensor, transform) = preprocess(frame, config.model_input_width, config.model_input_height)?;

    let output = self.engine.run(&tensor)?;

    let mut detections = postprocess(
      output.as_slice(),
      config.num_predictions,
      config.num_classes,
      config.confidence_threshold,
      config.iou_threshold,
      &transform,
      frame.width(),
      frame.height(),
      &config.class_names,
    )?;
    detections.truncate(config.max_detections);

    Ok(detections)
  }
}

impl<E: InferenceEngine> Model for Yolov8Detector<E> {
  type Input = Frame;
  type Output = Vec<Detection>;
  type Error = DetectError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.detect(input)
  }

  fn warmup(&mut self) {
    if self.warmed_up {
      return;
    }
    self.warmed_up = true;

    info!("预热模型...");
    let shape = TensorShape::nchw(self.config.model_input_height, self.config.model_input_width);
    let now = std::time::Instant::now();
    match self.engine.run(&Tensor::zeros(shape)) {
      Ok(_) => info!("模型预热完成，耗时: {:.2?}", now.elapsed()),
      Err(e) => warn!("模型预热失败（可忽略）: {}", e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    engine::{EngineError, RawOutput},
    frame::PixelFormat,
    labels::ClassNames,
    postprocess::PostprocessError,
    preprocess::PreprocessError,
  };

  struct FixedEngine {
    output: Result<RawOutput, EngineError>,
    calls: usize,
    last_shape: Option<TensorShape>,
  }

  impl FixedEngine {
    fn new(output: Result<RawOutput, EngineError>) -> Self {
      Self {
        output,
        calls: 0,
        last_shape: None,
      }
    }
  }

  impl InferenceEngine for FixedEngine {
    fn run(&mut self, tensor: &Tensor) -> Result<RawOutput, EngineError> {
      self.calls += 1;
      self.last_shape = Some(tensor.shape());
      self.output.clone()
    }
  }

  fn small_config() -> DetectorConfig {
    DetectorConfig::default()
      .with_input_size(64, 64)
      .with_num_classes(2)
      .with_num_predictions(3)
      .with_class_names(ClassNames::new(["cat", "dog"]))
  }

  fn three_predictions() -> RawOutput {
    // cx: 20, 21, 50 / cy: 32 / w, h: 10 / scores: class1 0.9, 0.8; class0 0.6
    let n = 3;
    let mut raw = vec![0.0; 6 * n];
    raw[..3].copy_from_slice(&[20.0, 21.0, 50.0]);
    raw[3..6].copy_from_slice(&[32.0; 3]);
    raw[6..9].copy_from_slice(&[10.0; 3]);
    raw[9..12].copy_from_slice(&[10.0; 3]);
    raw[12..15].copy_from_slice(&[0.0, 0.0, 0.6]);
    raw[15..18].copy_from_slice(&[0.9, 0.8, 0.0]);
    RawOutput::from(raw)
  }

  #[test]
  fn test_detect_full_pipeline() {
    let engine = FixedEngine::new(Ok(three_predictions()));
    let mut detector = Yolov8Detector::new(engine, small_config()).unwrap();

    // 128x64 帧 -> 比例 0.5，纵向偏移 16
    let frame = Frame::filled(128, 64, PixelFormat::Rgb, 10);
    let dets = detector.detect(&frame).unwrap();

    assert_eq!(detector.engine().last_shape.unwrap().dims(), [1, 3, 64, 64]);
    assert_eq!(dets.len(), 2);
    assert_eq!(dets[0].class_name, "dog");
    assert_eq!(dets[0].confidence, 0.9);
    assert_eq!(dets[0].x, 30.0);
    assert_eq!(dets[0].y, 22.0);
    assert_eq!(dets[0].width, 20.0);
    assert_eq!(dets[1].class_name, "cat");
  }

  #[test]
  fn test_detect_truncates_to_max_detections() {
    let engine = FixedEngine::new(Ok(three_predictions()));
    let config = small_config().with_max_detections(1);
    let mut detector = Yolov8Detector::new(engine, config).unwrap();
    let dets = detector
      .detect(&Frame::filled(64, 64, PixelFormat::Rgb, 0))
      .unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].confidence, 0.9);
  }

  #[test]
  fn test_detect_reports_shape_mismatch() {
    let engine = FixedEngine::new(Ok(RawOutput::from(vec![0.0; 5])));
    let mut detector = Yolov8Detector::new(engine, small_config()).unwrap();
    let err = detector
      .detect(&Frame::filled(8, 8, PixelFormat::Rgb, 0))
      .unwrap_err();
    assert_eq!(
      err,
      DetectError::Postprocess(PostprocessError::ShapeMismatch {
        expected: 18,
        actual: 5
      })
    );
    assert!(!err.is_fatal());
  }

  #[test]
  fn test_detect_skips_engine_for_invalid_frame() {
    let engine = FixedEngine::new(Ok(three_predictions()));
    let mut detector = Yolov8Detector::new(engine, small_config()).unwrap();
    let err = detector.detect(&Frame::not_ready()).unwrap_err();
    assert!(matches!(
      err,
      DetectError::Preprocess(PreprocessError::InvalidFrame { .. })
    ));
    assert_eq!(detector.engine().calls, 0);
  }

  #[test]
  fn test_engine_errors_classified() {
    let engine = FixedEngine::new(Err(EngineError::Unusable("device lost".into())));
    let mut detector = Yolov8Detector::new(engine, small_config()).unwrap();
    let err = detector
      .detect(&Frame::filled(8, 8, PixelFormat::Rgb, 0))
      .unwrap_err();
    assert!(err.is_fatal());
    assert!(err.is_engine_failure());
  }

  #[test]
  fn test_warmup_runs_once_and_tolerates_failure() {
    let engine = FixedEngine::new(Err(EngineError::Inference("cold".into())));
    let mut detector = Yolov8Detector::new(engine, small_config()).unwrap();
    detector.warmup();
    detector.warmup();
    assert!(detector.is_warmed_up());
    assert_eq!(detector.engine().calls, 1);
    assert_eq!(detector.engine().last_shape.unwrap().num_elements(), 3 * 64 * 64);
  }

  #[test]
  fn test_invalid_config_rejected() {
    let engine = FixedEngine::new(Ok(RawOutput::default()));
    let config = DetectorConfig::default().with_input_size(0, 0);
    assert!(Yolov8Detector::new(engine, config).is_err());
  }
}
