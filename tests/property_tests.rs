// 该文件是 Beifeng （北风） 项目的一部分。
// tests/property_tests.rs - 性质测试
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

use beifeng::{
  frame::{Frame, PixelFormat},
  postprocess::{RawDetection, decode, iou, nms},
  preprocess::preprocess,
};
use proptest::prelude::*;

fn raw_detection() -> impl Strategy<Value = RawDetection> {
  (
    0.0f32..600.0,
    0.0f32..600.0,
    1.0f32..200.0,
    1.0f32..200.0,
    0.0f32..1.0,
    0usize..3,
  )
    .prop_map(|(x, y, width, height, confidence, class_id)| RawDetection {
      x,
      y,
      width,
      height,
      confidence,
      class_id,
    })
}

proptest! {
  #[test]
  fn test_tensor_layout_property(
    width in 1u32..96,
    height in 1u32..96,
    model_size in 8u32..64,
    value in any::<u8>(),
  ) {
    let frame = Frame::filled(width, height, PixelFormat::Rgb, value);
    let (tensor, transform) = preprocess(&frame, model_size, model_size).unwrap();

    prop_assert_eq!(tensor.len(), 3 * model_size as usize * model_size as usize);
    prop_assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    prop_assert!(transform.scale > 0.0);
    prop_assert!(transform.offset_x >= 0.0 && transform.offset_y >= 0.0);
  }

  #[test]
  fn test_nms_property(
    detections in prop::collection::vec(raw_detection(), 0..40),
    threshold in 0.1f32..0.9,
  ) {
    let kept = nms(detections.clone(), threshold);

    prop_assert!(kept.len() <= detections.len());
    for pair in kept.windows(2) {
      prop_assert!(pair[0].confidence >= pair[1].confidence);
    }
    for (i, a) in kept.iter().enumerate() {
      for b in &kept[i + 1..] {
        if a.class_id == b.class_id {
          prop_assert!(iou(a, b) <= threshold);
        }
      }
    }
  }

  #[test]
  fn test_iou_property(a in raw_detection(), b in raw_detection()) {
    let forward = iou(&a, &b);
    prop_assert!((0.0..=1.0).contains(&forward));
    prop_assert!((forward - iou(&b, &a)).abs() < 1e-6);
  }

  #[test]
  fn test_decode_threshold_property(
    scores in prop::collection::vec(0.0f32..1.0, 2 * 16),
    threshold in 0.0f32..1.0,
  ) {
    let n = 16;
    let mut raw = vec![10.0; 4 * n];
    raw.extend_from_slice(&scores);

    let decoded = decode(&raw, n, 2, threshold).unwrap();
    let expected = (0..n)
      .filter(|&i| scores[i].max(scores[n + i]) > threshold)
      .count();

    prop_assert_eq!(decoded.len(), expected);
    prop_assert!(decoded.iter().all(|d| d.confidence > threshold));
  }
}
