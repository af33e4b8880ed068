// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/model/engine.rs - 推理引擎
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

use std::{
  path::{Path, PathBuf},
  sync::{
    Arc, Mutex,
    atomic::{AtomicU8, AtomicUsize, Ordering},
    mpsc::{self, RecvTimeoutError},
  },
  thread,
  time::Duration,
};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{
  BackendConfig, ConfigError, Device, OrtRuntime, OrtSession, ScoreVector,
};
use crate::{
  FromUrl, FromUrlWithScheme,
  preprocess::{InputTensor, MODEL_INPUT_HEIGHT, MODEL_INPUT_WIDTH},
};

const DEFAULT_INPUT_NAME: &str = "data";
const DEFAULT_INPUT_SHAPE: [usize; 4] = [1, 3, MODEL_INPUT_HEIGHT, MODEL_INPUT_WIDTH];

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("模型加载错误: {}, 原因: {reason}", .path.display())]
  ModelLoad { path: PathBuf, reason: String },
  #[error("后端不可用: {device}, 原因: {reason}")]
  BackendUnavailable { device: Device, reason: String },
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("推理超时: 超过 {0:.2?} 未完成")]
  InferenceTimeout(Duration),
  #[error("模型路径错误: {0}")]
  ModelPath(String),
  #[error("后端配置错误: {0}")]
  Config(#[from] ConfigError),
}

impl EngineError {
  pub fn model_load(path: &Path, reason: impl ToString) -> Self {
    EngineError::ModelLoad {
      path: path.to_path_buf(),
      reason: reason.to_string(),
    }
  }
}

/// 模型文件及其输入约定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
  pub path: PathBuf,
  pub input_name: String,
  pub input_shape: [usize; 4],
}

/// 模型声明的输入张量，形状中的负数表示动态维度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredInput {
  pub name: String,
  pub shape: Vec<i64>,
}

impl DeclaredInput {
  pub fn new(name: impl Into<String>, shape: Vec<i64>) -> Self {
    Self {
      name: name.into(),
      shape,
    }
  }

  /// 形状与期望一致，动态维度匹配任意值
  pub fn accepts(&self, shape: &[usize]) -> bool {
    self.shape.len() == shape.len()
      && self
        .shape
        .iter()
        .zip(shape)
        .all(|(&declared, &actual)| declared < 0 || usize::try_from(declared) == Ok(actual))
  }
}

/// 执行一次前向计算的后端
pub trait Backend: Send + 'static {
  fn device(&self) -> Device;
  /// 模型声明的全部张量输入
  fn inputs(&self) -> Vec<DeclaredInput>;
  fn run(&mut self, tensor: &InputTensor) -> Result<ScoreVector, EngineError>;
}

/// 创建后端并报告设备可用性
pub trait Runtime {
  type Backend: Backend;

  fn is_available(&self, device: Device, config: &BackendConfig) -> bool;
  fn open(
    &self,
    model: &ModelInfo,
    device: Device,
    config: &BackendConfig,
  ) -> Result<Self::Backend, EngineError>;
}

pub struct EngineBuilder {
  model: ModelInfo,
  config: BackendConfig,
}

const ONNX_SCHEME: &str = "onnx";

impl FromUrlWithScheme for EngineBuilder {
  const SCHEME: &'static str = ONNX_SCHEME;
}

impl FromUrl for EngineBuilder {
  type Error = EngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EngineError::ModelPath(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let path = url
      .to_file_path()
      .map_err(|_| EngineError::ModelPath(format!("无法解析模型路径: {}", url)))?;
    let mut builder = EngineBuilder::new(path);
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "input" => builder.model.input_name = value.into_owned(),
        _ => builder.config.apply_pair(&key, &value)?,
      }
    }
    Ok(builder)
  }
}

impl EngineBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model: ModelInfo {
        path: model_path.into(),
        input_name: DEFAULT_INPUT_NAME.to_string(),
        input_shape: DEFAULT_INPUT_SHAPE,
      },
      config: BackendConfig::default(),
    }
  }

  pub fn config(mut self, config: BackendConfig) -> Self {
    self.config = config;
    self
  }

  pub fn input_name(mut self, name: impl Into<String>) -> Self {
    self.model.input_name = name.into();
    self
  }

  pub fn input_shape(mut self, shape: [usize; 4]) -> Self {
    self.model.input_shape = shape;
    self
  }

  pub fn backend_config(&self) -> &BackendConfig {
    &self.config
  }

  pub fn model_info(&self) -> &ModelInfo {
    &self.model
  }

  /// 使用 ONNX Runtime 构建引擎
  pub fn build(self) -> Result<InferenceEngine<OrtSession>, EngineError> {
    self.build_with(&OrtRuntime)
  }

  pub fn build_with<R: Runtime>(
    self,
    runtime: &R,
  ) -> Result<InferenceEngine<R::Backend>, EngineError> {
    let EngineBuilder { model, config } = self;

    info!("加载模型文件: {}", model.path.display());
    if !model.path.is_file() {
      error!("模型文件不存在: {}", model.path.display());
      return Err(EngineError::model_load(&model.path, "文件不存在"));
    }

    let backend = match config.device {
      Device::Cpu => runtime.open(&model, Device::Cpu, &config)?,
      device @ Device::Accelerator(_) => {
        let attempt = if runtime.is_available(device, &config) {
          runtime.open(&model, device, &config)
        } else {
          Err(EngineError::BackendUnavailable {
            device,
            reason: format!("{} 执行提供程序不可用", config.accelerator.provider),
          })
        };

        match attempt {
          Ok(backend) => backend,
          Err(err @ EngineError::BackendUnavailable { .. }) if config.fallback_to_cpu => {
            warn!("{}，回退到 CPU 后端", err);
            runtime.open(&model, Device::Cpu, &config)?
          }
          Err(err) => {
            error!("创建推理后端失败: {}", err);
            return Err(err);
          }
        }
      }
    };

    check_declared_input(&model, &backend.inputs())?;

    let device = backend.device();
    info!("模型加载完成，执行设备: {}", device);
    debug!("模型输入: {} {:?}", model.input_name, model.input_shape);

    Ok(InferenceEngine {
      backend: Arc::new(Mutex::new(backend)),
      device,
      input_shape: model.input_shape,
      timeout: config.timeout,
      abandoned: Arc::new(AtomicUsize::new(0)),
    })
  }
}

fn check_declared_input(model: &ModelInfo, inputs: &[DeclaredInput]) -> Result<(), EngineError> {
  let Some(input) = inputs.iter().find(|i| i.name == model.input_name) else {
    let names: Vec<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
    error!("模型没有名为 {} 的输入，可用输入: {:?}", model.input_name, names);
    return Err(EngineError::model_load(
      &model.path,
      format!("模型没有名为 {} 的输入，可用输入: {:?}", model.input_name, names),
    ));
  };

  if !input.accepts(&model.input_shape) {
    error!(
      "模型输入 {} 形状 {:?} 与期望 {:?} 不符",
      input.name, input.shape, model.input_shape
    );
    return Err(EngineError::model_load(
      &model.path,
      format!(
        "输入 {} 形状 {:?} 与期望 {:?} 不符",
        input.name, input.shape, model.input_shape
      ),
    ));
  }
  Ok(())
}

const WORKER_RUNNING: u8 = 0;
const WORKER_FINISHED: u8 = 1;
const WORKER_ABANDONED: u8 = 2;

/// 持有已加载模型与后端会话的推理引擎
///
/// 后端会话由内部锁串行化，同一引擎可以跨线程共享。
/// 引擎被丢弃时释放后端；若有超时的推理仍在执行，
/// 后端会在该次推理结束后释放。超时的推理未结束前，
/// 新的推理直接返回超时，不再创建线程。
pub struct InferenceEngine<B: Backend> {
  backend: Arc<Mutex<B>>,
  device: Device,
  input_shape: [usize; 4],
  timeout: Option<Duration>,
  abandoned: Arc<AtomicUsize>,
}

impl InferenceEngine<OrtSession> {
  pub fn load(
    model_path: impl Into<PathBuf>,
    config: BackendConfig,
  ) -> Result<Self, EngineError> {
    EngineBuilder::new(model_path).config(config).build()
  }
}

impl<B: Backend> InferenceEngine<B> {
  pub fn device(&self) -> Device {
    self.device
  }

  pub fn input_shape(&self) -> [usize; 4] {
    self.input_shape
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout
  }

  pub fn run(&self, tensor: &InputTensor) -> Result<ScoreVector, EngineError> {
    if tensor.shape() != self.input_shape {
      return Err(EngineError::Inference(format!(
        "输入形状不匹配: 期望 {:?}, 实际 {:?}",
        self.input_shape,
        tensor.shape()
      )));
    }

    match self.timeout {
      Some(deadline) => self.run_with_deadline(tensor.clone(), deadline),
      None => run_locked(&self.backend, tensor),
    }
  }

  fn run_with_deadline(
    &self,
    tensor: InputTensor,
    deadline: Duration,
  ) -> Result<ScoreVector, EngineError> {
    if self.abandoned.load(Ordering::Acquire) > 0 {
      warn!("上一次超时的推理仍占用后端");
      return Err(EngineError::InferenceTimeout(deadline));
    }

    let backend = Arc::clone(&self.backend);
    let abandoned = Arc::clone(&self.abandoned);
    let state = Arc::new(AtomicU8::new(WORKER_RUNNING));
    let worker_state = Arc::clone(&state);
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
      .name("ruiyan-infer".to_string())
      .spawn(move || {
        let result = run_locked(&backend, &tensor);
        if worker_state
          .compare_exchange(
            WORKER_RUNNING,
            WORKER_FINISHED,
            Ordering::AcqRel,
            Ordering::Acquire,
          )
          .is_err()
        {
          abandoned.fetch_sub(1, Ordering::AcqRel);
          debug!("超时的推理已结束，后端恢复可用");
        }
        let _ = tx.send(result);
      })
      .map_err(|e| EngineError::Inference(format!("无法启动推理线程: {}", e)))?;

    match rx.recv_timeout(deadline) {
      Ok(result) => result,
      Err(RecvTimeoutError::Timeout) => {
        self.abandoned.fetch_add(1, Ordering::AcqRel);
        let gave_up = state
          .compare_exchange(
            WORKER_RUNNING,
            WORKER_ABANDONED,
            Ordering::AcqRel,
            Ordering::Acquire,
          )
          .is_ok();
        if gave_up {
          error!("推理超过截止时间 {:.2?}", deadline);
          return Err(EngineError::InferenceTimeout(deadline));
        }
        // 推理恰好在截止时刻完成
        self.abandoned.fetch_sub(1, Ordering::AcqRel);
        rx.recv()
          .map_err(|_| EngineError::Inference("推理线程意外退出".to_string()))?
      }
      Err(RecvTimeoutError::Disconnected) => {
        Err(EngineError::Inference("推理线程意外退出".to_string()))
      }
    }
  }
}

fn run_locked<B: Backend>(
  backend: &Mutex<B>,
  tensor: &InputTensor,
) -> Result<ScoreVector, EngineError> {
  let mut guard = backend
    .lock()
    .map_err(|_| EngineError::Inference("后端会话锁已损坏".to_string()))?;
  debug!("执行模型推理");
  let scores = guard.run(tensor)?;
  if scores.is_empty() {
    return Err(EngineError::Inference("模型输出为空".to_string()));
  }
  if let Some((index, value)) = scores.first_non_finite() {
    error!("模型输出包含非有限值: 第 {} 个分数为 {}", index, value);
    return Err(EngineError::Inference(format!(
      "模型输出包含非有限值: 第 {} 个分数为 {}",
      index, value
    )));
  }
  debug!("模型输出 {} 个类别分数", scores.len());
  Ok(scores)
}
