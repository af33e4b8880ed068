// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/task.rs - 推理任务
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
use tracing::{info, warn};

use crate::{model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 对第一帧推理一次并输出结果
pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;

    Ok(())
  }
}

/// 对第一帧重复推理，统计平均耗时
pub struct RepeatShotTask {
  times: usize,
  warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      times: 100,
      warmup: 2,
    }
  }
}

impl RepeatShotTask {
  pub fn with_times(mut self, times: usize) -> Self {
    self.times = times.max(1);
    self
  }

  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }
}

/// 跳过预热次数后的平均耗时；样本不足时使用全部样本
pub fn average_latency(times: &[Duration], warmup: usize) -> Option<Duration> {
  let measured = if times.len() > warmup {
    &times[warmup..]
  } else {
    times
  };
  if measured.is_empty() {
    return None;
  }
  Some(measured.iter().sum::<Duration>() / measured.len() as u32)
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.times);
    let mut last = None;
    for i in 0..self.times {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    if let Some(average) = average_latency(&times, self.warmup) {
      warn!("平均推理时间: {:.2?}", average);
    }
    if let Some(result) = last {
      output.render_result(&frame, &result)?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::Cell, convert::Infallible};

  use super::*;

  struct Echo {
    calls: Cell<usize>,
  }

  impl Model for Echo {
    type Input = u32;
    type Output = u32;
    type Error = std::io::Error;

    fn infer(&self, input: &u32) -> Result<u32, Self::Error> {
      self.calls.set(self.calls.get() + 1);
      Ok(input * 2)
    }
  }

  struct Collect {
    seen: Cell<Option<(u32, u32)>>,
  }

  impl Render<u32, u32> for &Collect {
    type Error = Infallible;

    fn render_result(&self, frame: &u32, result: &u32) -> Result<(), Self::Error> {
      self.seen.set(Some((*frame, *result)));
      Ok(())
    }
  }

  #[test]
  fn one_shot_renders_first_frame() {
    let model = Echo { calls: Cell::new(0) };
    let output = Collect {
      seen: Cell::new(None),
    };
    OneShotTask
      .run_task(vec![21u32, 5].into_iter(), &model, &output)
      .unwrap();
    assert_eq!(output.seen.get(), Some((21, 42)));
    assert_eq!(model.calls.get(), 1);
  }

  #[test]
  fn one_shot_without_input_fails() {
    let model = Echo { calls: Cell::new(0) };
    let output = Collect {
      seen: Cell::new(None),
    };
    assert!(
      OneShotTask
        .run_task(Vec::<u32>::new().into_iter(), &model, &output)
        .is_err()
    );
  }

  #[test]
  fn repeat_shot_runs_requested_times() {
    let model = Echo { calls: Cell::new(0) };
    let output = Collect {
      seen: Cell::new(None),
    };
    RepeatShotTask::default()
      .with_times(7)
      .run_task(std::iter::once(3u32), &model, &output)
      .unwrap();
    assert_eq!(model.calls.get(), 7);
    assert_eq!(output.seen.get(), Some((3, 6)));
  }

  #[test]
  fn average_skips_warmup() {
    let times = [100, 100, 10, 20, 30].map(Duration::from_millis);
    assert_eq!(average_latency(&times, 2), Some(Duration::from_millis(20)));
    assert_eq!(
      average_latency(&times[..1], 2),
      Some(Duration::from_millis(100))
    );
    assert_eq!(average_latency(&[], 2), None);
  }
}
