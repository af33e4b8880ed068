// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/model/rank.rs - Top-K 排序
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

use std::cmp::Ordering;

use thiserror::Error;

use super::{LabeledPrediction, ProbabilityVector};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankError {
  #[error("标签数量不匹配: 标签 {labels} 个, 分数 {scores} 个")]
  LabelCountMismatch { labels: usize, scores: usize },
}

/// 取置信度最高的 `k` 个预测，按置信度降序排列
///
/// 置信度相同时保持类别索引顺序；`k` 超过类别数时按类别数截断。
pub fn top_k<S: AsRef<str>>(
  probabilities: &ProbabilityVector,
  labels: &[S],
  k: usize,
) -> Result<Vec<LabeledPrediction>, RankError> {
  if labels.len() != probabilities.len() {
    return Err(RankError::LabelCountMismatch {
      labels: labels.len(),
      scores: probabilities.len(),
    });
  }

  let mut indexed: Vec<(usize, f32)> = probabilities.values().iter().copied().enumerate().collect();
  // sort_by 是稳定排序
  indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

  Ok(
    indexed
      .into_iter()
      .take(k.min(labels.len()))
      .map(|(class_id, confidence)| LabeledPrediction {
        class_id,
        label: labels[class_id].as_ref().to_string(),
        confidence,
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn probs(v: &[f32]) -> ProbabilityVector {
    ProbabilityVector::from(v.to_vec())
  }

  #[test]
  fn picks_top_two() {
    let result = top_k(&probs(&[0.1, 0.7, 0.2]), &["cat", "dog", "fish"], 2).unwrap();
    let pairs: Vec<_> = result
      .iter()
      .map(|p| (p.label.as_str(), p.confidence))
      .collect();
    assert_eq!(pairs, vec![("dog", 0.7), ("fish", 0.2)]);
  }

  #[test]
  fn label_count_mismatch() {
    let err = top_k(&probs(&[0.2, 0.3, 0.5]), &["a", "b"], 1).unwrap_err();
    assert_eq!(
      err,
      RankError::LabelCountMismatch {
        labels: 2,
        scores: 3
      }
    );
  }

  #[test]
  fn k_is_clamped() {
    let result = top_k(&probs(&[0.5, 0.5]), &["a", "b"], 10).unwrap();
    assert_eq!(result.len(), 2);
    assert!(top_k(&probs(&[1.0]), &["a"], 0).unwrap().is_empty());
  }

  #[test]
  fn ties_keep_class_order() {
    let result = top_k(&probs(&[0.25, 0.25, 0.25, 0.25]), &["a", "b", "c", "d"], 4).unwrap();
    let ids: Vec<_> = result.iter().map(|p| p.class_id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
  }

  #[test]
  fn output_is_sorted_subset() {
    let values: Vec<f32> = (0..50).map(|i| ((i * 37) % 50) as f32 / 1225.0).collect();
    let labels: Vec<String> = (0..50).map(|i| format!("class-{i}")).collect();
    for k in [0, 1, 5, 50, 80] {
      let result = top_k(&probs(&values), &labels, k).unwrap();
      assert_eq!(result.len(), k.min(50));
      for pair in result.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
      }
      for p in &result {
        assert_eq!(labels[p.class_id], p.label);
        assert_eq!(values[p.class_id], p.confidence);
      }
    }
  }
}
