// 该文件是 Beifeng （北风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("No image found in {0}")]
  NoImage(String),
}

/// 图像文件帧源。
///
/// `image:///path/a.png` 读取单张图片，`image:///path/dir` 按文件名顺序读取目录中的图片，
/// 加上 `?loop` 则循环播放。
pub struct ImageFileInput {
  paths: Vec<PathBuf>,
  cursor: usize,
  looping: bool,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let looping = url.query_pairs().any(|(k, _)| k == "loop");
    Ok(Self::open(url.path())?.looping(looping))
  }
}

impl ImageFileInput {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let paths = if path.is_dir() {
      let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_image_file(p))
        .collect();
      paths.sort();
      paths
    } else {
      std::fs::metadata(path)?;
      vec![path.to_path_buf()]
    };

    if paths.is_empty() {
      return Err(ImageFileInputError::NoImage(path.display().to_string()));
    }
    debug!("图像输入共 {} 个文件", paths.len());

    Ok(Self {
      paths,
      cursor: 0,
      looping: false,
    })
  }

  pub fn looping(mut self, looping: bool) -> Self {
    self.looping = looping;
    self
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }
}

fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

fn load_frame(path: &Path) -> Result<Frame, image::ImageError> {
  let image = ImageReader::open(path)?.decode()?;
  Ok(Frame::from(image.into_rgb8()))
}

impl Iterator for ImageFileInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    // 每个文件最多尝试一次，全部失败时结束
    for _ in 0..self.paths.len() {
      if self.cursor >= self.paths.len() {
        if !self.looping {
          return None;
        }
        self.cursor = 0;
      }

      let path = &self.paths[self.cursor];
      self.cursor += 1;
      match load_frame(path) {
        Ok(frame) => return Some(frame),
        Err(e) => error!("读取图像 {} 失败: {}", path.display(), e),
      }
    }
    None
  }
}
