// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/model/postprocess.rs - Softmax 后处理
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

/// 模型原始输出分数
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
  scores: Box<[f32]>,
}

impl From<Vec<f32>> for ScoreVector {
  fn from(scores: Vec<f32>) -> Self {
    Self {
      scores: scores.into_boxed_slice(),
    }
  }
}

impl ScoreVector {
  pub fn values(&self) -> &[f32] {
    &self.scores
  }

  pub fn len(&self) -> usize {
    self.scores.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores.is_empty()
  }

  /// 第一个非有限（NaN 或 ±inf）分数的索引与取值
  pub fn first_non_finite(&self) -> Option<(usize, f32)> {
    self
      .scores
      .iter()
      .copied()
      .enumerate()
      .find(|(_, v)| !v.is_finite())
  }
}

/// 概率分布，非负且和为 1
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector {
  probabilities: Box<[f32]>,
}

impl ProbabilityVector {
  pub fn values(&self) -> &[f32] {
    &self.probabilities
  }

  pub fn len(&self) -> usize {
    self.probabilities.len()
  }

  pub fn is_empty(&self) -> bool {
    self.probabilities.is_empty()
  }
}

impl From<Vec<f32>> for ProbabilityVector {
  fn from(probabilities: Vec<f32>) -> Self {
    Self {
      probabilities: probabilities.into_boxed_slice(),
    }
  }
}

/// 数值稳定的 softmax：先减去最大值再取指数
pub fn softmax(scores: &ScoreVector) -> ProbabilityVector {
  let values = scores.values();
  if values.is_empty() {
    return ProbabilityVector::from(Vec::new());
  }

  let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = values.iter().map(|&x| (x - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect::<Vec<_>>().into()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sum(p: &ProbabilityVector) -> f32 {
    p.values().iter().sum()
  }

  #[test]
  fn uniform_scores_give_uniform_probabilities() {
    let p = softmax(&ScoreVector::from(vec![1.0, 1.0, 1.0]));
    for v in p.values() {
      assert!((v - 1.0 / 3.0).abs() < 1e-6);
      assert!((v - 0.333).abs() < 1e-3);
    }
  }

  #[test]
  fn probabilities_sum_to_one() {
    let cases = [
      vec![0.5, -1.0, 3.0, 2.0],
      vec![0.0],
      (0..1000).map(|i| (i as f32 * 0.37).sin() * 8.0).collect(),
    ];
    for scores in cases {
      let p = softmax(&ScoreVector::from(scores));
      assert!((sum(&p) - 1.0).abs() < 1e-5);
      assert!(p.values().iter().all(|&v| v >= 0.0));
    }
  }

  #[test]
  fn shift_invariant() {
    let scores = vec![0.1, 2.5, -3.0, 0.7];
    let base = softmax(&ScoreVector::from(scores.clone()));
    for shift in [-50.0f32, 7.5, 100.0] {
      let shifted = softmax(&ScoreVector::from(
        scores.iter().map(|s| s + shift).collect::<Vec<_>>(),
      ));
      for (a, b) in base.values().iter().zip(shifted.values()) {
        assert!((a - b).abs() < 1e-5);
      }
    }
  }

  #[test]
  fn extreme_logits_do_not_overflow() {
    let p = softmax(&ScoreVector::from(vec![1000.0, 999.0, -1000.0]));
    assert!(p.values().iter().all(|v| v.is_finite()));
    assert!((sum(&p) - 1.0).abs() < 1e-5);
    assert!(p.values()[0] > p.values()[1]);
  }

  #[test]
  fn infinite_logits_are_detected_before_softmax() {
    let positive = ScoreVector::from(vec![f32::INFINITY, 1.0, 0.0]);
    assert_eq!(positive.first_non_finite(), Some((0, f32::INFINITY)));
    assert!(softmax(&positive).values().iter().any(|v| v.is_nan()));

    let negative = ScoreVector::from(vec![f32::NEG_INFINITY, f32::NEG_INFINITY]);
    assert_eq!(negative.first_non_finite(), Some((0, f32::NEG_INFINITY)));

    let nan = ScoreVector::from(vec![0.0, f32::NAN]);
    assert!(matches!(nan.first_non_finite(), Some((1, v)) if v.is_nan()));

    assert_eq!(ScoreVector::from(vec![1000.0, -1000.0]).first_non_finite(), None);
  }

  #[test]
  fn empty_scores_give_empty_probabilities() {
    assert!(softmax(&ScoreVector::from(Vec::new())).is_empty());
  }
}
