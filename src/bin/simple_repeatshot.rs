// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/bin/simple_repeatshot.rs - 重复推理测速
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use ruiyan::{
  FromUrl,
  input::ImageFileInput,
  model::{EngineBuilder, load_labels},
  output::{ConsoleOutput, OutputFormat},
  pipeline::{Classifier, DEFAULT_TOP_K},
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// Ruiyan 重复推理测速
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型 URL，例如 onnx:///models/resnet50.onnx?device=gpu:0&fallback=cpu
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///data/dog.jpeg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 标签文件路径
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,
  /// 重复次数
  #[arg(long, default_value_t = 100, value_name = "COUNT")]
  pub times: usize,
  /// 不计入平均耗时的预热次数
  #[arg(long, default_value_t = 2, value_name = "COUNT")]
  pub warmup: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("标签文件: {}", args.labels.display());

  let input = ImageFileInput::from_url(&args.input)?;
  let engine = EngineBuilder::from_url(&args.model)?.build()?;
  let labels = load_labels(&args.labels)?;
  let classifier = Classifier::new(engine, labels).with_top_k(DEFAULT_TOP_K);
  let output = ConsoleOutput::new(OutputFormat::Text);

  RepeatShotTask::default()
    .with_times(args.times)
    .with_warmup(args.warmup)
    .run_task(input.into_frames(), &classifier, output)?;

  Ok(())
}
