// 该文件是 Beifeng （北风） 项目的一部分。
// src/task.rs - 逐帧检测循环
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

//! # 检测循环
//!
//! 状态机 `Idle → Running → Stopping → Idle`。每次 [`DetectionLoop::tick`]
//! 从帧源取一帧，完成检测后整体替换发布的 [`FrameReport`]，然后交给渲染端。
//! 同一时刻只有一帧在处理，停止请求只在两帧之间生效。

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  frame::Frame,
  model::{DetectError, Model},
  output::Render,
  postprocess::Detection,
};

mod fps;
pub use self::fps::{FPS_WINDOW, FpsCounter};

pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

#[derive(Error, Debug, PartialEq)]
pub enum LoopError {
  #[error("检测循环因致命错误停止: {0}")]
  Fatal(DetectError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
  Idle,
  Running,
  Stopping,
}

/// 每帧发布的结果，下一帧到来时整体替换
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
  pub frame_index: u64,
  pub detections: Vec<Detection>,
  pub fps: u32,
}

/// 可跨线程传递的停止请求
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
  requested: Arc<AtomicBool>,
}

impl StopHandle {
  pub fn request_stop(&self) {
    self.requested.store(true, Ordering::SeqCst);
  }

  pub fn is_stop_requested(&self) -> bool {
    self.requested.load(Ordering::SeqCst)
  }

  fn take_request(&self) -> bool {
    self.requested.swap(false, Ordering::SeqCst)
  }

  fn clear(&self) {
    self.requested.store(false, Ordering::SeqCst);
  }

  /// Ctrl-C 时请求停止；30 秒内未退出则强制结束进程
  pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
    let handle = self.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      handle.request_stop();
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
  }
}

pub struct DetectionLoop<M> {
  model: M,
  state: LoopState,
  fps: FpsCounter,
  report: FrameReport,
  stop: StopHandle,
  frame_limit: Option<u64>,
  frames_processed: u64,
  max_consecutive_failures: u32,
  consecutive_failures: u32,
}

impl<M> DetectionLoop<M>
where
  M: Model<Input = Frame, Output = Vec<Detection>, Error = DetectError>,
{
  pub fn new(model: M) -> Self {
    Self {
      model,
      state: LoopState::Idle,
      fps: FpsCounter::new(Instant::now()),
      report: FrameReport::default(),
      stop: StopHandle::default(),
      frame_limit: None,
      frames_processed: 0,
      max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
      consecutive_failures: 0,
    }
  }

  /// 处理指定帧数后自动停止
  pub fn with_frame_limit(mut self, frame_limit: Option<u64>) -> Self {
    self.frame_limit = frame_limit;
    self
  }

  /// 连续多少次推理失败后认为引擎不可用
  pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
    self.max_consecutive_failures = max.max(1);
    self
  }

  pub fn state(&self) -> LoopState {
    self.state
  }

  pub fn is_running(&self) -> bool {
    self.state == LoopState::Running
  }

  pub fn fps(&self) -> u32 {
    self.fps.fps()
  }

  pub fn report(&self) -> &FrameReport {
    &self.report
  }

  pub fn detections(&self) -> &[Detection] {
    &self.report.detections
  }

  pub fn frames_processed(&self) -> u64 {
    self.frames_processed
  }

  pub fn consecutive_failures(&self) -> u32 {
    self.consecutive_failures
  }

  pub fn stop_handle(&self) -> StopHandle {
    self.stop.clone()
  }

  pub fn model(&self) -> &M {
    &self.model
  }

  /// 进入运行状态；已在运行时不做任何事
  pub fn start(&mut self) {
    match self.state {
      LoopState::Running => {
        debug!("检测循环已在运行");
        return;
      }
      LoopState::Stopping => self.settle(),
      LoopState::Idle => {}
    }

    self.model.warmup();
    self.stop.clear();
    self.fps.reset(Instant::now());
    self.frames_processed = 0;
    self.consecutive_failures = 0;
    self.state = LoopState::Running;
    info!("开始检测循环");
  }

  /// 请求停止，清空已发布的结果并回到空闲状态
  pub fn stop(&mut self) {
    if self.state == LoopState::Idle {
      return;
    }
    self.state = LoopState::Stopping;
    info!("停止检测循环，共处理 {} 帧", self.frames_processed);
    self.settle();
  }

  /// 处于 `Stopping` 时完成收尾
  fn settle(&mut self) {
    self.report = FrameReport::default();
    self.fps.reset(Instant::now());
    self.stop.clear();
    self.state = LoopState::Idle;
  }

  /// 执行一次迭代，返回是否应继续调度下一次
  pub fn tick<I, O>(&mut self, source: &mut I, output: &O) -> Result<bool, LoopError>
  where
    I: Iterator<Item = Frame>,
    O: Render,
    O::Error: std::fmt::Display,
  {
    match self.state {
      LoopState::Idle => return Ok(false),
      LoopState::Stopping => {
        self.settle();
        return Ok(false);
      }
      LoopState::Running => {}
    }

    // 外部停止请求先进入 Stopping，下一次 tick 或 run 结束时收尾
    if self.stop.take_request() {
      warn!("收到停止请求，退出检测循环");
      self.state = LoopState::Stopping;
      return Ok(false);
    }

    if self.frame_limit.is_some_and(|n| self.frames_processed >= n) {
      info!("达到指定帧数 {}, 退出检测循环", self.frames_processed);
      self.stop();
      return Ok(false);
    }

    let Some(frame) = source.next() else {
      info!("帧源已结束");
      self.stop();
      return Ok(false);
    };

    let frame_index = self.report.frame_index.wrapping_add(1);
    let now = Instant::now();
    let detections = if !frame.is_ready() {
      debug!("第 {} 帧尚未就绪，跳过", frame_index);
      Vec::new()
    } else {
      match self.model.infer(&frame) {
        Ok(detections) => {
          self.consecutive_failures = 0;
          detections
        }
        Err(e) => self.recover(frame_index, e)?,
      }
    };
    debug!(
      "第 {} 帧检测到 {} 个物体，耗时: {:.2?}",
      frame_index,
      detections.len(),
      now.elapsed()
    );

    self.frames_processed += 1;
    if let Some(fps) = self.fps.record_frame(Instant::now()) {
      info!("FPS: {}", fps);
    }

    self.report = FrameReport {
      frame_index,
      detections,
      fps: self.fps.fps(),
    };

    if let Err(e) = output.render_result(&frame, &self.report) {
      warn!("第 {} 帧渲染失败: {}", frame_index, e);
    }

    Ok(true)
  }

  /// 可恢复的错误按空结果处理，致命错误停止循环
  fn recover(&mut self, frame_index: u64, e: DetectError) -> Result<Vec<Detection>, LoopError> {
    match e {
      DetectError::Engine(_) => self.consecutive_failures += 1,
      // 引擎已给出输出，只是输出无法解析
      DetectError::Postprocess(_) => self.consecutive_failures = 0,
      DetectError::Preprocess(_) => {}
    }

    if e.is_fatal() || self.consecutive_failures >= self.max_consecutive_failures {
      error!(
        "第 {} 帧检测失败（连续 {} 次），推理引擎不可用: {}",
        frame_index, self.consecutive_failures, e
      );
      self.stop();
      return Err(LoopError::Fatal(e));
    }

    warn!("第 {} 帧检测失败，按空结果处理: {}", frame_index, e);
    Ok(Vec::new())
  }

  /// 启动并连续执行迭代，直到停止、帧源结束或出现致命错误
  pub fn run<I, O>(&mut self, mut source: I, output: &O) -> Result<(), LoopError>
  where
    I: Iterator<Item = Frame>,
    O: Render,
    O::Error: std::fmt::Display,
  {
    self.start();
    while self.tick(&mut source, output)? {}
    if self.state == LoopState::Stopping {
      self.stop();
    }
    info!("任务完成，退出");
    Ok(())
  }
}
