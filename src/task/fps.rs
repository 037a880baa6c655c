// 该文件是 Beifeng （北风） 项目的一部分。
// src/task/fps.rs - 帧率统计
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

use std::time::{Duration, Instant};

/// 统计窗口
pub const FPS_WINDOW: Duration = Duration::from_millis(1000);

/// 按不短于 1 秒的窗口统计帧率
#[derive(Debug, Clone)]
pub struct FpsCounter {
  frame_count: u32,
  window_start: Instant,
  fps: u32,
}

impl FpsCounter {
  pub fn new(now: Instant) -> Self {
    Self {
      frame_count: 0,
      window_start: now,
      fps: 0,
    }
  }

  pub fn reset(&mut self, now: Instant) {
    *self = Self::new(now);
  }

  /// 记录一帧完成。窗口满 1 秒时返回新的帧率并开启下一个窗口。
  pub fn record_frame(&mut self, now: Instant) -> Option<u32> {
    self.frame_count += 1;

    let elapsed = now.saturating_duration_since(self.window_start);
    if elapsed < FPS_WINDOW {
      return None;
    }

    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    self.fps = (self.frame_count as f64 * 1000.0 / elapsed_ms).round() as u32;
    self.frame_count = 0;
    self.window_start = now;
    Some(self.fps)
  }

  pub fn fps(&self) -> u32 {
    self.fps
  }

  pub fn frame_count(&self) -> u32 {
    self.frame_count
  }

  pub fn window_start(&self) -> Instant {
    self.window_start
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_thirty_frames_in_one_second() {
    let start = Instant::now();
    let mut counter = FpsCounter::new(start);

    for i in 1..30u64 {
      let now = start + Duration::from_millis(i * 33);
      assert_eq!(counter.record_frame(now), None);
    }
    assert_eq!(counter.frame_count(), 29);

    let now = start + FPS_WINDOW;
    assert_eq!(counter.record_frame(now), Some(30));
    assert_eq!(counter.fps(), 30);
    assert_eq!(counter.frame_count(), 0);
    assert_eq!(counter.window_start(), now);
  }

  #[test]
  fn test_long_window_rounds() {
    let start = Instant::now();
    let mut counter = FpsCounter::new(start);
    for _ in 0..9 {
      counter.record_frame(start + Duration::from_millis(500));
    }
    // 10 帧 / 1.5 秒 = 6.67
    assert_eq!(
      counter.record_frame(start + Duration::from_millis(1500)),
      Some(7)
    );
  }

  #[test]
  fn test_reset_clears_fps() {
    let start = Instant::now();
    let mut counter = FpsCounter::new(start);
    counter.record_frame(start + Duration::from_millis(1000));
    assert_eq!(counter.fps(), 1);

    let later = start + Duration::from_secs(5);
    counter.reset(later);
    assert_eq!(counter.fps(), 0);
    assert_eq!(counter.frame_count(), 0);
    assert_eq!(counter.window_start(), later);
  }
}
