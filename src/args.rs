// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use ruiyan::{
  model::{AcceleratorProvider, BackendConfig, Device, OptimizationLevel},
  output::OutputFormat,
  pipeline::DEFAULT_TOP_K,
};

/// Ruiyan 图像分类推理
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像文件路径（*.jpg, *.jpeg, *.png）
  #[arg(long, value_name = "FILE")]
  pub image: PathBuf,

  /// 标签文件路径，每行一个标签
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,

  /// ONNX 模型文件路径
  #[arg(long, value_name = "FILE")]
  pub model: PathBuf,

  /// 输出置信度最高的前 K 个结果
  #[arg(long, default_value_t = DEFAULT_TOP_K, value_name = "K")]
  pub top_k: usize,

  /// 执行设备
  /// 支持格式:
  /// - cpu
  /// - accelerator, accelerator:0, gpu:1
  #[arg(long, default_value = "cpu", value_name = "DEVICE")]
  pub device: Device,

  /// 加速器执行提供程序（directml 或 cuda），默认随平台选择
  #[arg(long, value_name = "PROVIDER")]
  pub provider: Option<AcceleratorProvider>,

  /// 图优化等级（none, basic, extended, all）
  #[arg(long, default_value = "extended", value_name = "LEVEL")]
  pub opt_level: OptimizationLevel,

  /// 加速器不可用时回退到 CPU
  #[arg(long)]
  pub fallback_cpu: bool,

  /// 单次推理超时（毫秒），不设置表示不限制
  #[arg(long, value_name = "MS")]
  pub timeout_ms: Option<u64>,

  /// 推理线程数
  #[arg(long, value_name = "COUNT")]
  pub threads: Option<usize>,

  /// 模型输入张量名称
  #[arg(long, default_value = "data", value_name = "NAME")]
  pub input_name: String,

  /// 输出格式（text 或 json）
  #[arg(long, default_value = "text", value_name = "FORMAT")]
  pub format: OutputFormat,
}

impl Args {
  pub fn backend_config(&self) -> BackendConfig {
    let mut config = BackendConfig::default()
      .with_device(self.device)
      .with_optimization_level(self.opt_level)
      .with_fallback_to_cpu(self.fallback_cpu)
      .with_timeout(self.timeout_ms.map(Duration::from_millis))
      .with_intra_threads(self.threads);
    if let Some(provider) = self.provider {
      config = config.with_provider(provider);
    }
    config
  }
}
