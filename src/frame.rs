// 该文件是 Beifeng （北风） 项目的一部分。
// src/frame.rs - 交错像素帧定义
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

use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 像素排列方式，均为交错存储
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
  Rgb,
  Rgba,
}

impl PixelFormat {
  pub fn channels(&self) -> usize {
    match self {
      PixelFormat::Rgb => 3,
      PixelFormat::Rgba => 4,
    }
  }
}

/// 帧源每次产出的一帧图像。
///
/// 宽或高为 0 的帧表示帧源尚未就绪。
#[derive(Debug, Clone)]
pub struct Frame {
  width: u32,
  height: u32,
  format: PixelFormat,
  data: Box<[u8]>,
}

impl Frame {
  pub fn new(
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
  ) -> Result<Self, FrameError> {
    let expected = width as usize * height as usize * format.channels();
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      format,
      data: data.into_boxed_slice(),
    })
  }

  /// 尚未就绪的空帧
  pub fn not_ready() -> Self {
    Self {
      width: 0,
      height: 0,
      format: PixelFormat::Rgb,
      data: Box::new([]),
    }
  }

  /// 纯色帧，主要用于测试与预热
  pub fn filled(width: u32, height: u32, format: PixelFormat, value: u8) -> Self {
    let size = width as usize * height as usize * format.channels();
    Self {
      width,
      height,
      format,
      data: vec![value; size].into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn format(&self) -> PixelFormat {
    self.format
  }

  pub fn channels(&self) -> usize {
    self.format.channels()
  }

  pub fn is_ready(&self) -> bool {
    self.width > 0 && self.height > 0
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  /// 转换为 RGB 图像，RGBA 帧会丢弃 alpha 通道
  pub fn to_rgb_image(&self) -> RgbImage {
    let rgb: Vec<u8> = match self.format {
      PixelFormat::Rgb => self.data.to_vec(),
      PixelFormat::Rgba => self
        .data
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect(),
    };
    // 长度在构造时已校验
    RgbImage::from_raw(self.width, self.height, rgb).unwrap_or_default()
  }
}

impl From<RgbImage> for Frame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width,
      height,
      format: PixelFormat::Rgb,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}
