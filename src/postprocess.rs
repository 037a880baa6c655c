// 该文件是 Beifeng （北风） 项目的一部分。
// src/postprocess.rs - 输出解码、非极大值抑制与坐标还原
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

//! # 后处理
//!
//! YOLOv8 导出的输出为转置排列 `[1, 4 + C, N]`：先是 N 个中心 x，
//! 再是 N 个中心 y、N 个宽、N 个高，随后是 C 个类别各自的 N 个分数。
//! 解码严格按这一下标规则读取。

use thiserror::Error;
use tracing::debug;

use crate::{labels::ClassNames, preprocess::GeometricTransform};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PostprocessError {
  #[error("输出长度不匹配: 期望 {expected}, 实际 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
}

/// 模型输入空间中的检测框，`x`、`y` 为左上角
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
  pub confidence: f32,
  pub class_id: usize,
}

/// 原始帧空间中的检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 边界框左上角 x 坐标
  pub x: f32,
  /// 边界框左上角 y 坐标
  pub y: f32,
  /// 边界框宽度
  pub width: f32,
  /// 边界框高度
  pub height: f32,
  /// 置信度
  pub confidence: f32,
  /// 类别索引
  pub class_id: usize,
  /// 类别名称
  pub class_name: String,
}

/// 解码转置排列的原始输出，过滤掉最高类别分数不超过阈值的候选框
pub fn decode(
  raw: &[f32],
  num_predictions: usize,
  num_classes: usize,
  confidence_threshold: f32,
) -> Result<Vec<RawDetection>, PostprocessError> {
  let expected = (4 + num_classes) * num_predictions;
  if raw.len() != expected {
    return Err(PostprocessError::ShapeMismatch {
      expected,
      actual: raw.len(),
    });
  }

  let n = num_predictions;
  let mut detections = Vec::new();

  for i in 0..n {
    let mut max_score = 0.0f32;
    let mut class_id = 0usize;
    for c in 0..num_classes {
      let score = raw[(4 + c) * n + i];
      if score > max_score {
        max_score = score;
        class_id = c;
      }
    }

    if max_score <= confidence_threshold {
      continue;
    }

    let (cx, cy, w, h) = (raw[i], raw[n + i], raw[2 * n + i], raw[3 * n + i]);
    detections.push(RawDetection {
      x: cx - w / 2.0,
      y: cy - h / 2.0,
      width: w,
      height: h,
      confidence: max_score,
      class_id,
    });
  }

  debug!(
    "阈值 {} 过滤后剩余 {} 个候选框",
    confidence_threshold,
    detections.len()
  );
  Ok(detections)
}

/// 两个 `(x, y, width, height)` 轴对齐框的交并比
pub fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
  let x1 = a.x.max(b.x);
  let y1 = a.y.max(b.y);
  let x2 = (a.x + a.width).min(b.x + b.width);
  let y2 = (a.y + a.height).min(b.y + b.height);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let union = a.width * a.height + b.width * b.height - intersection;
  if union <= 0.0 {
    return 0.0;
  }
  intersection / union
}

/// 按类别的贪心非极大值抑制，结果按置信度降序
pub fn nms(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
  // sort_by 为稳定排序，同分保持原顺序
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut suppressed = vec![false; detections.len()];
  let mut selected = Vec::new();

  for i in 0..detections.len() {
    if suppressed[i] {
      continue;
    }
    let current = detections[i];
    selected.push(current);

    for j in (i + 1)..detections.len() {
      if suppressed[j] || detections[j].class_id != current.class_id {
        continue;
      }
      if iou(&current, &detections[j]) > iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  selected
}

/// 撤销信箱变换，丢弃完全落在原始帧之外的框
pub fn rescale(
  detections: &[RawDetection],
  transform: &GeometricTransform,
  original_width: u32,
  original_height: u32,
  class_names: &ClassNames,
) -> Vec<Detection> {
  let (ow, oh) = (original_width as f32, original_height as f32);

  detections
    .iter()
    .map(|det| Detection {
      x: (det.x - transform.offset_x) / transform.scale,
      y: (det.y - transform.offset_y) / transform.scale,
      width: det.width / transform.scale,
      height: det.height / transform.scale,
      confidence: det.confidence,
      class_id: det.class_id,
      class_name: class_names.name(det.class_id),
    })
    .filter(|det| det.x < ow && det.y < oh && det.x + det.width > 0.0 && det.y + det.height > 0.0)
    .collect()
}

/// 完整的单帧后处理：解码 → 非极大值抑制 → 坐标还原
#[allow(clippy::too_many_arguments)]
pub fn postprocess(
  raw: &[f32],
  num_predictions: usize,
  num_classes: usize,
  confidence_threshold: f32,
  iou_threshold: f32,
  transform: &GeometricTransform,
  original_width: u32,
  original_height: u32,
  class_names: &ClassNames,
) -> Result<Vec<Detection>, PostprocessError> {
  let candidates = decode(raw, num_predictions, num_classes, confidence_threshold)?;
  let kept = nms(candidates, iou_threshold);
  debug!("非极大值抑制后剩余 {} 个检测框", kept.len());
  Ok(rescale(
    &kept,
    transform,
    original_width,
    original_height,
    class_names,
  ))
}
