// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/model/ort_backend.rs - ONNX Runtime 后端
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

use ort::{
  execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, DirectMLExecutionProvider, ExecutionProvider,
    ExecutionProviderDispatch,
  },
  logging::LogLevel,
  session::{Session, builder::GraphOptimizationLevel},
  value::{TensorRef, ValueType},
};
use tracing::{debug, info};

use super::{
  AcceleratorOptions, AcceleratorProvider, Backend, BackendConfig, DeclaredInput, Device,
  EngineError, ModelInfo, OptimizationLevel, Runtime, ScoreVector,
};
use crate::preprocess::InputTensor;

impl From<OptimizationLevel> for GraphOptimizationLevel {
  fn from(level: OptimizationLevel) -> Self {
    match level {
      OptimizationLevel::None => GraphOptimizationLevel::Disable,
      OptimizationLevel::Basic => GraphOptimizationLevel::Level1,
      OptimizationLevel::Extended => GraphOptimizationLevel::Level2,
      OptimizationLevel::All => GraphOptimizationLevel::Level3,
    }
  }
}

fn execution_provider(
  device: Device,
  options: &AcceleratorOptions,
) -> Result<ExecutionProviderDispatch, EngineError> {
  let index = match device {
    Device::Cpu => return Ok(CPUExecutionProvider::default().build()),
    Device::Accelerator(index) => {
      i32::try_from(index).map_err(|_| EngineError::BackendUnavailable {
        device,
        reason: format!("设备序号 {} 超出范围", index),
      })?
    }
  };

  let dispatch = match options.provider {
    AcceleratorProvider::DirectMl => DirectMLExecutionProvider::default()
      .with_device_id(index)
      .build()
      .error_on_failure(),
    AcceleratorProvider::Cuda => {
      let mut cuda = CUDAExecutionProvider::default().with_device_id(index);
      if let Some(limit) = options.memory_limit {
        cuda = cuda.with_memory_limit(limit);
      }
      cuda.build().error_on_failure()
    }
  };
  Ok(dispatch)
}

/// 基于 ONNX Runtime 的运行时，CPU 与加速器共用同一套会话逻辑
#[derive(Debug, Clone, Copy, Default)]
pub struct OrtRuntime;

impl Runtime for OrtRuntime {
  type Backend = OrtSession;

  fn is_available(&self, device: Device, config: &BackendConfig) -> bool {
    let available = match device {
      Device::Cpu => Ok(true),
      Device::Accelerator(_) => match config.accelerator.provider {
        AcceleratorProvider::DirectMl => DirectMLExecutionProvider::default().is_available(),
        AcceleratorProvider::Cuda => CUDAExecutionProvider::default().is_available(),
      },
    };
    debug!("设备 {} 可用性: {:?}", device, available);
    available.unwrap_or(false)
  }

  fn open(
    &self,
    model: &ModelInfo,
    device: Device,
    config: &BackendConfig,
  ) -> Result<OrtSession, EngineError> {
    let path = model.path.as_path();
    info!(
      "创建 ONNX Runtime 会话: 设备 {}, 优化等级 {}",
      device, config.optimization_level
    );

    let mut builder = Session::builder().map_err(|e| EngineError::model_load(path, e))?;
    builder = builder
      .with_log_level(LogLevel::Error)
      .map_err(|e| EngineError::model_load(path, e))?;
    builder = builder
      .with_optimization_level(config.optimization_level.into())
      .map_err(|e| EngineError::model_load(path, e))?;

    if let Some(threads) = config.intra_threads {
      builder = builder
        .with_intra_threads(threads)
        .map_err(|e| EngineError::model_load(path, e))?;
    }

    builder = builder
      .with_execution_providers([execution_provider(device, &config.accelerator)?])
      .map_err(|e| match device {
        Device::Cpu => EngineError::model_load(path, e),
        Device::Accelerator(_) => EngineError::BackendUnavailable {
          device,
          reason: e.to_string(),
        },
      })?;

    let session = builder
      .commit_from_file(path)
      .map_err(|e| EngineError::model_load(path, e))?;

    let inputs: Vec<DeclaredInput> = session
      .inputs
      .iter()
      .filter_map(|input| match &input.input_type {
        ValueType::Tensor { shape, .. } => Some(DeclaredInput::new(
          input.name.as_str(),
          shape.iter().copied().collect(),
        )),
        _ => None,
      })
      .collect();
    debug!("模型声明的输入: {:?}", inputs);

    Ok(OrtSession {
      session,
      input_name: model.input_name.clone(),
      inputs,
      device,
    })
  }
}

pub struct OrtSession {
  session: Session,
  input_name: String,
  inputs: Vec<DeclaredInput>,
  device: Device,
}

impl Backend for OrtSession {
  fn device(&self) -> Device {
    self.device
  }

  fn inputs(&self) -> Vec<DeclaredInput> {
    self.inputs.clone()
  }

  fn run(&mut self, tensor: &InputTensor) -> Result<ScoreVector, EngineError> {
    let dims: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
    let input = TensorRef::from_array_view((dims, tensor.as_slice()))
      .map_err(|e| EngineError::Inference(format!("无法创建输入张量: {}", e)))?;

    let outputs = self
      .session
      .run(ort::inputs![self.input_name.as_str() => input])
      .map_err(|e| EngineError::Inference(format!("前向计算失败: {}", e)))?;

    let output = outputs
      .values()
      .next()
      .ok_or_else(|| EngineError::Inference("模型没有输出".to_string()))?;
    let (shape, scores) = output
      .try_extract_tensor::<f32>()
      .map_err(|e| EngineError::Inference(format!("无法读取输出张量: {}", e)))?;
    debug!("模型输出形状: {:?}", shape);

    Ok(ScoreVector::from(scores.to_vec()))
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;
  use crate::model::InferenceEngine;

  fn garbage_model() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".onnx").tempfile().unwrap();
    file.write_all(b"this is not an onnx graph").unwrap();
    file
  }

  #[test]
  fn cpu_is_always_available() {
    assert!(OrtRuntime.is_available(Device::Cpu, &BackendConfig::default()));
  }

  #[test]
  fn malformed_model_is_a_load_error() {
    let file = garbage_model();
    let err = InferenceEngine::load(file.path(), BackendConfig::default())
      .err()
      .unwrap();
    assert!(matches!(err, EngineError::ModelLoad { .. }), "{err}");
  }

  #[test]
  fn missing_cuda_without_fallback_is_unavailable() {
    let config = BackendConfig::default()
      .with_device(Device::Accelerator(0))
      .with_provider(AcceleratorProvider::Cuda);
    if OrtRuntime.is_available(Device::Accelerator(0), &config) {
      return;
    }

    let file = garbage_model();
    let err = InferenceEngine::load(file.path(), config).err().unwrap();
    assert!(matches!(
      err,
      EngineError::BackendUnavailable {
        device: Device::Accelerator(0),
        ..
      }
    ));
  }

  #[test]
  fn oversized_device_index_is_unavailable() {
    let device = Device::Accelerator(u32::MAX);
    let result = execution_provider(device, &AcceleratorOptions::default());
    assert!(matches!(
      result,
      Err(EngineError::BackendUnavailable { device: Device::Accelerator(u32::MAX), .. })
    ));
    assert!(execution_provider(Device::Accelerator(0), &AcceleratorOptions::default()).is_ok());
  }

  #[test]
  fn optimization_levels_map_to_graph_levels() {
    assert!(matches!(
      GraphOptimizationLevel::from(OptimizationLevel::None),
      GraphOptimizationLevel::Disable
    ));
    assert!(matches!(
      GraphOptimizationLevel::from(OptimizationLevel::Extended),
      GraphOptimizationLevel::Level2
    ));
  }
}
