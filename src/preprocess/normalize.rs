// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/preprocess/normalize.rs - 均值/标准差归一化
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

use super::{NormalizedPixelSequence, PixelSequence, PreprocessError, check_channels};

/// ImageNet 通道均值（R, G, B）
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet 通道标准差（R, G, B）
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[inline]
pub fn normalize_value(value: f32, channel: usize) -> f32 {
  ((value / 255.0) - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
}

#[inline]
pub fn denormalize_value(value: f32, channel: usize) -> f32 {
  (value * IMAGENET_STD[channel] + IMAGENET_MEAN[channel]) * 255.0
}

pub fn normalize(pixels: &PixelSequence) -> Result<NormalizedPixelSequence, PreprocessError> {
  check_channels(pixels.len())?;
  let values = pixels
    .values()
    .chunks_exact(IMAGENET_MEAN.len())
    .flat_map(|pixel| {
      pixel
        .iter()
        .enumerate()
        .map(|(c, &v)| normalize_value(v, c))
    })
    .collect();
  NormalizedPixelSequence::from_values(values)
}

pub fn denormalize(normalized: &NormalizedPixelSequence) -> PixelSequence {
  normalized
    .values()
    .iter()
    .enumerate()
    .map(|(i, &v)| denormalize_value(v, NormalizedPixelSequence::channel_of(i)))
    .collect::<Vec<_>>()
    .into()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_matches_formula() {
    let pixels = PixelSequence::from(vec![255.0, 0.0, 127.5]);
    let normalized = normalize(&pixels).unwrap();
    let values = normalized.values();
    assert!((values[0] - (1.0 - 0.485) / 0.229).abs() < 1e-6);
    assert!((values[1] - (0.0 - 0.456) / 0.224).abs() < 1e-6);
    assert!((values[2] - (0.5 - 0.406) / 0.225).abs() < 1e-6);
  }

  #[test]
  fn normalize_keeps_length() {
    let pixels = PixelSequence::from((0..300).map(|v| (v % 256) as f32).collect::<Vec<_>>());
    assert_eq!(normalize(&pixels).unwrap().len(), pixels.len());
  }

  #[test]
  fn normalize_is_bit_reproducible() {
    let pixels = PixelSequence::from((0..768).map(|v| (v % 256) as f32).collect::<Vec<_>>());
    let a = normalize(&pixels).unwrap();
    let b = normalize(&pixels).unwrap();
    let bits = |n: &NormalizedPixelSequence| n.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a), bits(&b));
  }

  #[test]
  fn denormalize_round_trips() {
    let pixels = PixelSequence::from((0..768).map(|v| (v % 256) as f32).collect::<Vec<_>>());
    let restored = denormalize(&normalize(&pixels).unwrap());
    for (a, b) in pixels.values().iter().zip(restored.values()) {
      assert!((a - b).abs() < 1e-3, "{a} vs {b}");
    }
  }

  #[test]
  fn length_not_divisible_by_three_is_rejected() {
    let err = normalize(&PixelSequence::from(vec![1.0; 4])).unwrap_err();
    assert_eq!(
      err,
      PreprocessError::ChannelMismatch {
        channels: 3,
        len: 4,
        expected: 6
      }
    );
  }
}
