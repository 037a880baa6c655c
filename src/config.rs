// 该文件是 Beifeng （北风） 项目的一部分。
// src/config.rs - 检测器配置
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

use crate::labels::ClassNames;

pub const DEFAULT_INPUT_WIDTH: u32 = 640;
pub const DEFAULT_INPUT_HEIGHT: u32 = 640;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.2;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const DEFAULT_NUM_CLASSES: usize = 80;
/// YOLOv8 在 640x640 输入下的候选框数量 (80*80 + 40*40 + 20*20)
pub const DEFAULT_NUM_PREDICTIONS: usize = 8400;
pub const DEFAULT_MAX_DETECTIONS: usize = 100;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("模型输入尺寸必须大于 0: {0}x{1}")]
  InvalidInputSize(u32, u32),
  #[error("类别数量必须大于 0")]
  NoClasses,
  #[error("候选框数量必须大于 0")]
  NoPredictions,
  #[error("{name} 必须在 [0, 1] 区间内, 实际为 {value}")]
  ThresholdOutOfRange { name: &'static str, value: f32 },
}

/// 检测流水线的可注入参数
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
  pub model_input_width: u32,
  pub model_input_height: u32,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  pub num_classes: usize,
  pub num_predictions: usize,
  pub max_detections: usize,
  pub class_names: ClassNames,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      model_input_width: DEFAULT_INPUT_WIDTH,
      model_input_height: DEFAULT_INPUT_HEIGHT,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      num_classes: DEFAULT_NUM_CLASSES,
      num_predictions: DEFAULT_NUM_PREDICTIONS,
      max_detections: DEFAULT_MAX_DETECTIONS,
      class_names: ClassNames::coco(),
    }
  }
}

impl DetectorConfig {
  pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
    self.model_input_width = width;
    self.model_input_height = height;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_num_classes(mut self, num_classes: usize) -> Self {
    self.num_classes = num_classes;
    self
  }

  pub fn with_num_predictions(mut self, num_predictions: usize) -> Self {
    self.num_predictions = num_predictions;
    self
  }

  pub fn with_max_detections(mut self, max_detections: usize) -> Self {
    self.max_detections = max_detections;
    self
  }

  pub fn with_class_names(mut self, class_names: ClassNames) -> Self {
    self.class_names = class_names;
    self
  }

  /// 模型原始输出应有的长度
  pub fn raw_output_len(&self) -> usize {
    (4 + self.num_classes) * self.num_predictions
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.model_input_width == 0 || self.model_input_height == 0 {
      return Err(ConfigError::InvalidInputSize(
        self.model_input_width,
        self.model_input_height,
      ));
    }
    if self.num_classes == 0 {
      return Err(ConfigError::NoClasses);
    }
    if self.num_predictions == 0 {
      return Err(ConfigError::NoPredictions);
    }
    for (name, value) in [
      ("confidence_threshold", self.confidence_threshold),
      ("iou_threshold", self.iou_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ThresholdOutOfRange { name, value });
      }
    }
    Ok(())
  }
}
