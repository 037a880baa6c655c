// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/jsonl_record.rs - JSONL 检测记录输出
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

use std::{
  fs::{File, OpenOptions},
  io::{BufWriter, Write},
  path::{Path, PathBuf},
  sync::Mutex,
};

use chrono::{SecondsFormat, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  output::Render,
  postprocess::Detection,
  task::FrameReport,
};

#[derive(Error, Debug)]
pub enum JsonlRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("记录文件锁已损坏")]
  Poisoned,
}

/// 每帧一行 JSON 追加写入文件。
///
/// `jsonl:///var/log/detections.jsonl?always` 时没有检测结果的帧也会记录。
pub struct JsonlRecordOutput {
  path: PathBuf,
  writer: Mutex<BufWriter<File>>,
  always: bool,
}

impl FromUrlWithScheme for JsonlRecordOutput {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonlRecordOutput {
  type Error = JsonlRecordOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonlRecordOutputError::SchemeMismatch);
    }

    let always = url.query_pairs().any(|(k, _)| k == "always");
    Self::open(url.path(), always)
  }
}

impl JsonlRecordOutput {
  pub fn open<P: AsRef<Path>>(path: P, always: bool) -> Result<Self, JsonlRecordOutputError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    info!("检测记录写入: {}", path.display());

    Ok(Self {
      path,
      writer: Mutex::new(BufWriter::new(file)),
      always,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

fn detection_json(det: &Detection) -> serde_json::Value {
  json!({
    "class_id": det.class_id,
    "class_name": det.class_name,
    "confidence": det.confidence,
    "bbox": [det.x, det.y, det.width, det.height],
  })
}

impl Render for JsonlRecordOutput {
  type Error = JsonlRecordOutputError;

  fn render_result(&self, frame: &Frame, report: &FrameReport) -> Result<(), Self::Error> {
    if report.detections.is_empty() && !self.always {
      return Ok(());
    }

    let record = json!({
      "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
      "frame_index": report.frame_index,
      "width": frame.width(),
      "height": frame.height(),
      "fps": report.fps,
      "detections": report.detections.iter().map(detection_json).collect::<Vec<_>>(),
    });

    let mut writer = self
      .writer
      .lock()
      .map_err(|_| JsonlRecordOutputError::Poisoned)?;
    serde_json::to_writer(&mut *writer, &record)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::PixelFormat;

  fn report(detections: Vec<Detection>) -> FrameReport {
    FrameReport {
      frame_index: 3,
      detections,
      fps: 24,
    }
  }

  fn person() -> Detection {
    Detection {
      x: 1.0,
      y: 2.0,
      width: 3.0,
      height: 4.0,
      confidence: 0.5,
      class_id: 0,
      class_name: "person".to_string(),
    }
  }

  #[test]
  fn test_writes_one_line_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("records.jsonl");
    let url = Url::parse(&format!("jsonl://{}", path.display())).unwrap();
    let output = JsonlRecordOutput::from_url(&url).unwrap();
    let frame = Frame::filled(4, 2, PixelFormat::Rgb, 0);

    output.render_result(&frame, &report(vec![person()])).unwrap();
    output.render_result(&frame, &report(Vec::new())).unwrap();
    output.render_result(&frame, &report(vec![person(), person()])).unwrap();

    let text = std::fs::read_to_string(output.path()).unwrap();
    let lines: Vec<serde_json::Value> = text
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["frame_index"], 3);
    assert_eq!(lines[0]["width"], 4);
    assert_eq!(lines[0]["fps"], 24);
    assert_eq!(lines[0]["detections"][0]["class_name"], "person");
    assert_eq!(lines[0]["detections"][0]["bbox"][3], 4.0);
    assert_eq!(lines[1]["detections"].as_array().unwrap().len(), 2);
  }

  #[test]
  fn test_always_records_empty_frames() {
    let dir = tempfile::tempdir().unwrap();
    let output = JsonlRecordOutput::open(dir.path().join("all.jsonl"), true).unwrap();
    let frame = Frame::filled(4, 2, PixelFormat::Rgb, 0);
    output.render_result(&frame, &report(Vec::new())).unwrap();

    let text = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(text.lines().count(), 1);
  }

  #[test]
  fn test_scheme_mismatch() {
    let url = Url::parse("file:///tmp/x.jsonl").unwrap();
    assert!(matches!(
      JsonlRecordOutput::from_url(&url),
      Err(JsonlRecordOutputError::SchemeMismatch)
    ));
  }
}
