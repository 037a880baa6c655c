// 该文件是 Beifeng （北风） 项目的一部分。
// src/preprocess.rs - 信箱缩放与张量转换
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

//! # 预处理
//!
//! 将任意尺寸的帧等比缩放后居中放入固定尺寸的画布（信箱缩放），
//! 空白处以中性灰 (128) 填充，再转换为 NCHW 排列、归一化到 `[0, 1]`
//! 的浮点张量。同时返回还原坐标所需的 [`GeometricTransform`]。

use image::{
  Rgb, RgbImage,
  imageops::{self, FilterType},
};
use thiserror::Error;
use tracing::debug;

use crate::frame::Frame;

const RGB_CHANNELS: usize = 3;
/// 信箱填充色
pub const LETTERBOX_PAD_VALUE: u8 = 128;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PreprocessError {
  #[error("无效帧: 尺寸 {width}x{height}, 模型输入 {model_width}x{model_height}")]
  InvalidFrame {
    width: u32,
    height: u32,
    model_width: u32,
    model_height: u32,
  },
}

/// 信箱缩放使用的统一缩放比例与填充偏移
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricTransform {
  pub scale: f32,
  pub offset_x: f32,
  pub offset_y: f32,
}

impl GeometricTransform {
  pub fn letterbox(width: u32, height: u32, model_width: u32, model_height: u32) -> Self {
    let (w, h) = (width as f32, height as f32);
    let (mw, mh) = (model_width as f32, model_height as f32);
    let scale = (mw / w).min(mh / h);
    Self {
      scale,
      offset_x: (mw - w * scale) / 2.0,
      offset_y: (mh - h * scale) / 2.0,
    }
  }

  pub fn identity() -> Self {
    Self {
      scale: 1.0,
      offset_x: 0.0,
      offset_y: 0.0,
    }
  }
}

/// 张量形状，按 `[N, C, H, W]` 排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorShape([usize; 4]);

impl TensorShape {
  pub fn nchw(height: u32, width: u32) -> Self {
    Self([1, RGB_CHANNELS, height as usize, width as usize])
  }

  pub fn dims(&self) -> [usize; 4] {
    self.0
  }

  pub fn height(&self) -> usize {
    self.0[2]
  }

  pub fn width(&self) -> usize {
    self.0[3]
  }

  pub fn num_elements(&self) -> usize {
    self.0.iter().product()
  }
}

/// 通道优先排列的输入张量：先全部 R，再全部 G，最后全部 B
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
  shape: TensorShape,
  data: Box<[f32]>,
}

impl Tensor {
  pub fn zeros(shape: TensorShape) -> Self {
    Self {
      shape,
      data: vec![0.0; shape.num_elements()].into_boxed_slice(),
    }
  }

  pub fn shape(&self) -> TensorShape {
    self.shape
  }

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

impl From<&RgbImage> for Tensor {
  fn from(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let plane = width as usize * height as usize;
    let mut data = vec![0.0f32; RGB_CHANNELS * plane];

    for (index, pixel) in image.pixels().enumerate() {
      for c in 0..RGB_CHANNELS {
        data[c * plane + index] = pixel[c] as f32 / 255.0;
      }
    }

    Self {
      shape: TensorShape::nchw(height, width),
      data: data.into_boxed_slice(),
    }
  }
}

/// 信箱缩放后转换为模型输入张量
pub fn preprocess(
  frame: &Frame,
  model_width: u32,
  model_height: u32,
) -> Result<(Tensor, GeometricTransform), PreprocessError> {
  if !frame.is_ready() || model_width == 0 || model_height == 0 {
    return Err(PreprocessError::InvalidFrame {
      width: frame.width(),
      height: frame.height(),
      model_width,
      model_height,
    });
  }

  let transform =
    GeometricTransform::letterbox(frame.width(), frame.height(), model_width, model_height);
  let canvas = letterbox_image(frame, &transform, model_width, model_height);
  debug!(
    "信箱缩放 {}x{} -> {}x{}, 比例 {:.4}, 偏移 ({:.1}, {:.1})",
    frame.width(),
    frame.height(),
    model_width,
    model_height,
    transform.scale,
    transform.offset_x,
    transform.offset_y
  );

  Ok((Tensor::from(&canvas), transform))
}

fn letterbox_image(
  frame: &Frame,
  transform: &GeometricTransform,
  model_width: u32,
  model_height: u32,
) -> RgbImage {
  let mut canvas = RgbImage::from_pixel(model_width, model_height, Rgb([LETTERBOX_PAD_VALUE; 3]));

  let scaled_w = ((frame.width() as f32 * transform.scale).round() as u32).clamp(1, model_width);
  let scaled_h = ((frame.height() as f32 * transform.scale).round() as u32).clamp(1, model_height);

  let source = frame.to_rgb_image();
  let scaled = if source.dimensions() == (scaled_w, scaled_h) {
    source
  } else {
    imageops::resize(&source, scaled_w, scaled_h, FilterType::Triangle)
  };

  // 取最接近浮点偏移的整数位置，与还原坐标时使用的偏移一致
  let x = (transform.offset_x.round() as u32).min(model_width - scaled_w);
  let y = (transform.offset_y.round() as u32).min(model_height - scaled_h);
  imageops::replace(&mut canvas, &scaled, x as i64, y as i64);
  canvas
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::PixelFormat;

  const PAD: f32 = LETTERBOX_PAD_VALUE as f32 / 255.0;

  fn at(tensor: &Tensor, c: usize, y: usize, x: usize) -> f32 {
    let shape = tensor.shape();
    let plane = shape.height() * shape.width();
    tensor.as_slice()[c * plane + y * shape.width() + x]
  }

  #[test]
  fn test_letterbox_landscape() {
    let t = GeometricTransform::letterbox(1280, 720, 640, 640);
    assert_eq!(t.scale, 0.5);
    assert_eq!(t.offset_x, 0.0);
    assert_eq!(t.offset_y, 140.0);
  }

  #[test]
  fn test_letterbox_matching_aspect() {
    let t = GeometricTransform::letterbox(320, 240, 640, 480);
    assert_eq!(t.scale, 2.0);
    assert_eq!(t.offset_x, 0.0);
    assert_eq!(t.offset_y, 0.0);
    assert_eq!(320.0 * t.scale, 640.0);
  }

  #[test]
  fn test_letterbox_portrait() {
    let t = GeometricTransform::letterbox(480, 640, 640, 640);
    assert_eq!(t.scale, 1.0);
    assert_eq!(t.offset_x, 80.0);
    assert_eq!(t.offset_y, 0.0);
  }

  #[test]
  fn test_preprocess_pads_with_gray() {
    let frame = Frame::filled(64, 32, PixelFormat::Rgb, 255);
    let (tensor, transform) = preprocess(&frame, 32, 32).unwrap();

    assert_eq!(tensor.shape().dims(), [1, 3, 32, 32]);
    assert_eq!(tensor.len(), 3 * 32 * 32);
    assert_eq!(transform.scale, 0.5);
    assert_eq!(transform.offset_y, 8.0);

    for c in 0..3 {
      // 上下填充区
      assert_eq!(at(&tensor, c, 0, 0), PAD);
      assert_eq!(at(&tensor, c, 31, 31), PAD);
      // 图像区
      assert_eq!(at(&tensor, c, 16, 16), 1.0);
    }
  }

  #[test]
  fn test_preprocess_rounds_fractional_offset() {
    // 1280x721 -> 比例 0.5，纵向偏移 139.75，图像从第 140 行开始
    let frame = Frame::filled(1280, 721, PixelFormat::Rgb, 255);
    let (tensor, transform) = preprocess(&frame, 640, 640).unwrap();
    assert_eq!(transform.offset_y, 139.75);

    assert_eq!(at(&tensor, 0, 139, 320), PAD);
    assert_eq!(at(&tensor, 0, 140, 320), 1.0);
    assert_eq!(at(&tensor, 0, 500, 320), 1.0);
    assert_eq!(at(&tensor, 0, 501, 320), PAD);
  }

  #[test]
  fn test_preprocess_channel_major() {
    let mut data = Vec::new();
    for _ in 0..4 {
      data.extend_from_slice(&[255, 0, 51, 7]);
    }
    let frame = Frame::new(2, 2, PixelFormat::Rgba, data).unwrap();
    let (tensor, transform) = preprocess(&frame, 2, 2).unwrap();

    assert_eq!(transform, GeometricTransform::identity());
    assert_eq!(&tensor.as_slice()[0..4], &[1.0; 4]);
    assert_eq!(&tensor.as_slice()[4..8], &[0.0; 4]);
    assert_eq!(&tensor.as_slice()[8..12], &[0.2; 4]);
  }

  #[test]
  fn test_preprocess_rejects_empty_frame() {
    let err = preprocess(&Frame::not_ready(), 640, 640).unwrap_err();
    assert!(matches!(
      err,
      PreprocessError::InvalidFrame {
        width: 0,
        height: 0,
        ..
      }
    ));
  }

  #[test]
  fn test_zeros_tensor() {
    let tensor = Tensor::zeros(TensorShape::nchw(4, 6));
    assert_eq!(tensor.len(), 72);
    assert!(tensor.as_slice().iter().all(|v| *v == 0.0));
  }
}
