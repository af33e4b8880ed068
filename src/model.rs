// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPrediction {
  pub class_id: usize,
  pub label: String,
  pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
  pub predictions: Box<[LabeledPrediction]>,
  pub num_classes: usize,
  pub device: Device,
}

impl Classification {
  pub fn is_empty(&self) -> bool {
    self.predictions.is_empty()
  }

  pub fn top(&self) -> Option<&LabeledPrediction> {
    self.predictions.first()
  }
}

mod config;
mod engine;
mod labels;
mod ort_backend;
mod postprocess;
mod rank;

pub use self::config::{
  AcceleratorOptions, AcceleratorProvider, BackendConfig, ConfigError, Device, OptimizationLevel,
};
pub use self::engine::{
  Backend, DeclaredInput, EngineBuilder, EngineError, InferenceEngine, ModelInfo, Runtime,
};
pub use self::labels::{LabelFileError, load_labels, parse_labels};
pub use self::ort_backend::{OrtRuntime, OrtSession};
pub use self::postprocess::{ProbabilityVector, ScoreVector, softmax};
pub use self::rank::{RankError, top_k};
