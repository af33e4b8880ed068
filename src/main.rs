// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use ruiyan::{
  input::ImageFileInput,
  model::{EngineBuilder, load_labels},
  output::ConsoleOutput,
  pipeline::{Classifier, PipelineError},
  task::{OneShotTask, Task},
};

fn run(args: &args::Args) -> Result<()> {
  info!("模型文件路径: {}", args.model.display());
  info!("输入图像: {}", args.image.display());
  info!("标签文件: {}", args.labels.display());
  info!("执行设备: {}", args.device);

  let labels = load_labels(&args.labels).map_err(PipelineError::from)?;
  let input = ImageFileInput::open(&args.image).map_err(PipelineError::from)?;
  let engine = EngineBuilder::new(&args.model)
    .input_name(&args.input_name)
    .config(args.backend_config())
    .build()
    .map_err(PipelineError::from)?;

  let classifier = Classifier::new(engine, labels).with_top_k(args.top_k);
  let title = args
    .model
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "model".to_string());
  let output = ConsoleOutput::new(args.format).with_title(title);

  OneShotTask.run_task(input.into_frames(), &classifier, output)
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .init();

  let args = args::Args::parse();

  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      let stage = err
        .chain()
        .find_map(|e| e.downcast_ref::<PipelineError>())
        .map(PipelineError::stage)
        .unwrap_or("output");
      eprintln!("错误 [{}]: {:#}", stage, err);
      ExitCode::FAILURE
    }
  }
}
