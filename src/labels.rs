// 该文件是 Beifeng （北风） 项目的一部分。
// src/labels.rs - 类别名称表
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

use std::{path::Path, sync::Arc};

use thiserror::Error;
use tracing::info;

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 有序类别名称表，下标即类别 id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
  names: Arc<[String]>,
}

impl Default for ClassNames {
  fn default() -> Self {
    Self::coco()
  }
}

impl ClassNames {
  pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
    Self {
      names: names.into_iter().map(Into::into).collect(),
    }
  }

  pub fn coco() -> Self {
    Self::new(COCO_CLASSES)
  }

  /// 从 JSON 字符串数组文件读取，例如 `["person", "bicycle"]`
  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let names: Vec<String> = serde_json::from_str(&text)?;
    info!("从 {} 读取 {} 个类别名称", path.as_ref().display(), names.len());
    Ok(Self::new(names))
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 未知 id 返回占位名称 `class_{id}`
  pub fn name(&self, class_id: usize) -> String {
    self
      .names
      .get(class_id)
      .cloned()
      .unwrap_or_else(|| format!("class_{}", class_id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_coco_names() {
    let names = ClassNames::coco();
    assert_eq!(names.len(), 80);
    assert_eq!(names.name(0), "person");
    assert_eq!(names.name(79), "toothbrush");
  }

  #[test]
  fn test_unknown_id_placeholder() {
    let names = ClassNames::new(["cat"]);
    assert_eq!(names.name(0), "cat");
    assert_eq!(names.name(7), "class_7");
  }

  #[test]
  fn test_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"["helmet", "vest"]"#).unwrap();
    let names = ClassNames::from_json_file(file.path()).unwrap();
    assert_eq!(names.len(), 2);
    assert_eq!(names.name(1), "vest");
  }

  #[test]
  fn test_from_json_file_rejects_garbage() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    assert!(matches!(
      ClassNames::from_json_file(file.path()),
      Err(LabelError::JsonError(_))
    ));
  }
}
