// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/pipeline.rs - 分类流水线
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

use thiserror::Error;
use tracing::debug;

use crate::{
  frame::RawImage,
  input::ImageFileInputError,
  model::{
    Backend, Classification, EngineError, InferenceEngine, LabelFileError, Model, OrtSession,
    RankError, softmax, top_k,
  },
  preprocess::{PreprocessError, preprocess},
};

pub const DEFAULT_TOP_K: usize = 10;

/// 流水线错误，变体对应失败的阶段
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("图像加载阶段失败: {0}")]
  Input(#[from] ImageFileInputError),
  #[error("标签加载阶段失败: {0}")]
  Labels(#[from] LabelFileError),
  #[error("预处理阶段失败: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("推理阶段失败: {0}")]
  Engine(#[from] EngineError),
  #[error("排序阶段失败: {0}")]
  Rank(#[from] RankError),
}

impl PipelineError {
  pub fn stage(&self) -> &'static str {
    match self {
      PipelineError::Input(_) => "input",
      PipelineError::Labels(_) => "labels",
      PipelineError::Preprocess(_) => "preprocess",
      PipelineError::Engine(_) => "inference",
      PipelineError::Rank(_) => "rank",
    }
  }
}

/// 预处理 → 推理 → softmax → Top-K
pub struct Classifier<B: Backend = OrtSession> {
  engine: InferenceEngine<B>,
  labels: Vec<String>,
  top_k: usize,
}

impl<B: Backend> Classifier<B> {
  pub fn new(engine: InferenceEngine<B>, labels: Vec<String>) -> Self {
    Self {
      engine,
      labels,
      top_k: DEFAULT_TOP_K,
    }
  }

  pub fn with_top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn engine(&self) -> &InferenceEngine<B> {
    &self.engine
  }

  pub fn labels(&self) -> &[String] {
    &self.labels
  }

  pub fn classify(&self, image: &RawImage) -> Result<Classification, PipelineError> {
    let [_, _, height, width] = self.engine.input_shape();
    let tensor = preprocess(image, height, width)?;
    let scores = self.engine.run(&tensor)?;
    let probabilities = softmax(&scores);
    let predictions = top_k(&probabilities, &self.labels, self.top_k)?;
    debug!("Top-{} 结果: {:?}", self.top_k, predictions);

    Ok(Classification {
      predictions: predictions.into_boxed_slice(),
      num_classes: probabilities.len(),
      device: self.engine.device(),
    })
  }
}

impl<B: Backend> Model for Classifier<B> {
  type Input = RawImage;
  type Output = Classification;
  type Error = PipelineError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.classify(input)
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::model::{Device, RankError};

  #[test]
  fn stage_names_follow_the_failing_stage() {
    let err = PipelineError::from(PreprocessError::InvalidDimensions {
      height: 0,
      width: 224,
    });
    assert_eq!(err.stage(), "preprocess");

    let err = PipelineError::from(EngineError::InferenceTimeout(Duration::from_millis(5)));
    assert_eq!(err.stage(), "inference");

    let err = PipelineError::from(EngineError::BackendUnavailable {
      device: Device::Accelerator(1),
      reason: "无".to_string(),
    });
    assert_eq!(err.stage(), "inference");

    let err = PipelineError::from(RankError::LabelCountMismatch {
      labels: 2,
      scores: 3,
    });
    assert_eq!(err.stage(), "rank");
    assert!(err.to_string().starts_with("排序阶段失败"));
  }
}
