// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/model/config.rs - 执行后端配置
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

use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("无法识别的设备: {0}（可选: cpu, accelerator[:N], gpu[:N]）")]
  UnknownDevice(String),
  #[error("无法识别的优化等级: {0}（可选: none, basic, extended, all）")]
  UnknownOptimizationLevel(String),
  #[error("无法识别的加速器: {0}（可选: directml, cuda）")]
  UnknownProvider(String),
  #[error("无效的参数值 {key}={value}")]
  InvalidValue { key: String, value: String },
}

/// 执行设备
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
  #[default]
  Cpu,
  /// 硬件加速器及其设备序号
  Accelerator(u32),
}

impl fmt::Display for Device {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Device::Cpu => write!(f, "cpu"),
      Device::Accelerator(index) => write!(f, "accelerator:{}", index),
    }
  }
}

impl FromStr for Device {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let lower = s.trim().to_ascii_lowercase();
    let (kind, index) = match lower.split_once(':') {
      Some((kind, index)) => (kind, Some(index)),
      None => (lower.as_str(), None),
    };
    match (kind, index) {
      ("cpu", None) => Ok(Device::Cpu),
      ("accelerator" | "gpu" | "npu", None) => Ok(Device::Accelerator(0)),
      ("accelerator" | "gpu" | "npu", Some(index)) => index
        .parse()
        .map(Device::Accelerator)
        .map_err(|_| ConfigError::UnknownDevice(s.to_string())),
      _ => Err(ConfigError::UnknownDevice(s.to_string())),
    }
  }
}

/// 图优化等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
  None,
  Basic,
  #[default]
  Extended,
  All,
}

impl fmt::Display for OptimizationLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      OptimizationLevel::None => "none",
      OptimizationLevel::Basic => "basic",
      OptimizationLevel::Extended => "extended",
      OptimizationLevel::All => "all",
    };
    f.write_str(name)
  }
}

impl FromStr for OptimizationLevel {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "none" | "disable" | "0" => Ok(OptimizationLevel::None),
      "basic" | "1" => Ok(OptimizationLevel::Basic),
      "extended" | "2" => Ok(OptimizationLevel::Extended),
      "all" | "3" => Ok(OptimizationLevel::All),
      _ => Err(ConfigError::UnknownOptimizationLevel(s.to_string())),
    }
  }
}

/// 加速器执行提供程序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorProvider {
  DirectMl,
  Cuda,
}

impl Default for AcceleratorProvider {
  fn default() -> Self {
    if cfg!(target_os = "windows") {
      AcceleratorProvider::DirectMl
    } else {
      AcceleratorProvider::Cuda
    }
  }
}

impl fmt::Display for AcceleratorProvider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AcceleratorProvider::DirectMl => f.write_str("directml"),
      AcceleratorProvider::Cuda => f.write_str("cuda"),
    }
  }
}

impl FromStr for AcceleratorProvider {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "directml" | "dml" => Ok(AcceleratorProvider::DirectMl),
      "cuda" => Ok(AcceleratorProvider::Cuda),
      _ => Err(ConfigError::UnknownProvider(s.to_string())),
    }
  }
}

/// 加速器专用参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceleratorOptions {
  pub provider: AcceleratorProvider,
  /// 显存上限（字节），仅 CUDA 生效
  pub memory_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
  pub device: Device,
  pub optimization_level: OptimizationLevel,
  pub accelerator: AcceleratorOptions,
  pub intra_threads: Option<usize>,
  /// 加速器不可用时回退到 CPU
  pub fallback_to_cpu: bool,
  /// 单次推理的截止时间
  pub timeout: Option<Duration>,
}

impl BackendConfig {
  pub fn with_device(mut self, device: Device) -> Self {
    self.device = device;
    self
  }

  pub fn with_optimization_level(mut self, level: OptimizationLevel) -> Self {
    self.optimization_level = level;
    self
  }

  pub fn with_provider(mut self, provider: AcceleratorProvider) -> Self {
    self.accelerator.provider = provider;
    self
  }

  pub fn with_fallback_to_cpu(mut self, fallback: bool) -> Self {
    self.fallback_to_cpu = fallback;
    self
  }

  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_intra_threads(mut self, threads: Option<usize>) -> Self {
    self.intra_threads = threads;
    self
  }

  /// 应用一组 `key=value` 参数，通常来自模型 URL 的查询串
  pub fn apply_pair(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidValue {
      key: key.to_string(),
      value: value.to_string(),
    };
    match key {
      "device" => self.device = value.parse()?,
      "opt" | "optimization" => self.optimization_level = value.parse()?,
      "provider" => self.accelerator.provider = value.parse()?,
      "mem_limit" => self.accelerator.memory_limit = Some(value.parse().map_err(|_| invalid())?),
      "threads" => self.intra_threads = Some(value.parse().map_err(|_| invalid())?),
      "timeout_ms" => {
        self.timeout = Some(Duration::from_millis(
          value.parse().map_err(|_| invalid())?,
        ))
      }
      "fallback" => {
        self.fallback_to_cpu = match value {
          "" | "cpu" | "true" | "1" => true,
          "none" | "false" | "0" => false,
          _ => return Err(invalid()),
        }
      }
      _ => return Err(invalid()),
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn device_parsing() {
    assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
    assert_eq!("accelerator".parse::<Device>().unwrap(), Device::Accelerator(0));
    assert_eq!("GPU:2".parse::<Device>().unwrap(), Device::Accelerator(2));
    assert!("cpu:1".parse::<Device>().is_err());
    assert!("tpu".parse::<Device>().is_err());
    assert!("gpu:x".parse::<Device>().is_err());
  }

  #[test]
  fn device_display_round_trips() {
    for device in [Device::Cpu, Device::Accelerator(3)] {
      assert_eq!(device.to_string().parse::<Device>().unwrap(), device);
    }
  }

  #[test]
  fn optimization_level_parsing() {
    assert_eq!(OptimizationLevel::default(), OptimizationLevel::Extended);
    assert_eq!("none".parse::<OptimizationLevel>().unwrap(), OptimizationLevel::None);
    assert_eq!("Basic".parse::<OptimizationLevel>().unwrap(), OptimizationLevel::Basic);
    assert!("turbo".parse::<OptimizationLevel>().is_err());
  }

  #[test]
  fn apply_pairs() {
    let mut config = BackendConfig::default();
    config.apply_pair("device", "accelerator:1").unwrap();
    config.apply_pair("provider", "dml").unwrap();
    config.apply_pair("fallback", "cpu").unwrap();
    config.apply_pair("timeout_ms", "250").unwrap();
    config.apply_pair("opt", "basic").unwrap();

    assert_eq!(config.device, Device::Accelerator(1));
    assert_eq!(config.accelerator.provider, AcceleratorProvider::DirectMl);
    assert!(config.fallback_to_cpu);
    assert_eq!(config.timeout, Some(Duration::from_millis(250)));
    assert_eq!(config.optimization_level, OptimizationLevel::Basic);

    assert!(config.apply_pair("timeout_ms", "soon").is_err());
    assert!(config.apply_pair("color", "red").is_err());
  }
}
