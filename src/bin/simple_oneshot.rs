// 该文件是 Beifeng （北风） 项目的一部分。
// src/bin/simple_oneshot.rs - 单次推理
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use beifeng::{
  FromUrl,
  config::DetectorConfig,
  engine::OrtEngineBuilder,
  input::ImageFileInput,
  labels::ClassNames,
  model::{Model, Yolov8Detector},
  output::{OutputWrapper, Render},
  task::FrameReport,
};
use tracing::info;

/// Beifeng 单次推理参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 ort:///models/yolov8n.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，例如 image:///data/bus.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出，log:// 或 jsonl:///path/records.jsonl
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.2", value_name = "THRESHOLD")]
  pub confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou_threshold: f32,
  /// 类别名称 JSON 文件，缺省为 COCO
  #[arg(long, value_name = "FILE")]
  pub labels: Option<String>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let class_names = match &args.labels {
    Some(path) => ClassNames::from_json_file(path)?,
    None => ClassNames::coco(),
  };
  let config = DetectorConfig::default()
    .with_confidence_threshold(args.confidence)
    .with_iou_threshold(args.iou_threshold)
    .with_num_classes(class_names.len())
    .with_class_names(class_names);

  let input = ImageFileInput::from_url(&args.input)?;
  let engine = OrtEngineBuilder::from_url(&args.model)?.build()?;
  let mut model = Yolov8Detector::new(engine, config)?;
  let output = OutputWrapper::from_url(&args.output)?;

  model.warmup();

  info!("开始推理...");
  for (index, frame) in input.enumerate() {
    let now = std::time::Instant::now();
    let detections = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let report = FrameReport {
      frame_index: index as u64 + 1,
      detections,
      fps: 0,
    };
    output.render_result(&frame, &report)?;
  }

  Ok(())
}
