// 该文件是 Beifeng （北风） 项目的一部分。
// src/bin/simple_continueshot.rs - 连续推理
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
  input::InputWrapper,
  labels::ClassNames,
  model::Yolov8Detector,
  output::OutputWrapper,
  task::{DEFAULT_MAX_CONSECUTIVE_FAILURES, DetectionLoop},
};
use tracing::info;

/// Beifeng 连续推理参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 ort:///models/yolov8n.onnx?threads=4
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///data/frames?loop
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出，log:// 或 jsonl:///path/records.jsonl
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
  /// 处理帧数上限
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<u64>,
  /// 模型输入宽度
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub input_width: u32,
  /// 模型输入高度
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub input_height: u32,
  /// 候选框数量，640x640 输入时为 8400
  #[arg(long, default_value = "8400", value_name = "COUNT")]
  pub num_predictions: usize,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.2", value_name = "THRESHOLD")]
  pub confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou_threshold: f32,
  /// 单帧最多输出的检测框数量
  #[arg(long, default_value = "100", value_name = "COUNT")]
  pub max_detections: usize,
  /// 类别名称 JSON 文件，缺省为 COCO
  #[arg(long, value_name = "FILE")]
  pub labels: Option<String>,
  /// 连续推理失败多少次后停止
  #[arg(long, default_value_t = DEFAULT_MAX_CONSECUTIVE_FAILURES, value_name = "COUNT")]
  pub max_failures: u32,
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
    .with_input_size(args.input_width, args.input_height)
    .with_num_predictions(args.num_predictions)
    .with_confidence_threshold(args.confidence)
    .with_iou_threshold(args.iou_threshold)
    .with_max_detections(args.max_detections)
    .with_num_classes(class_names.len())
    .with_class_names(class_names);

  let input = InputWrapper::from_url(&args.input)?;
  let engine = OrtEngineBuilder::from_url(&args.model)?.build()?;
  let model = Yolov8Detector::new(engine, config)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let mut detection_loop = DetectionLoop::new(model)
    .with_frame_limit(args.frame_number)
    .with_max_consecutive_failures(args.max_failures);
  detection_loop.stop_handle().install_ctrlc_handler()?;

  detection_loop.run(input, &output)?;

  Ok(())
}
