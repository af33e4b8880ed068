// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/preprocess/pack.rs - HWC → NCHW 张量打包
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

use super::{InputTensor, NormalizedPixelSequence, PreprocessError};
use crate::frame::RGB_CHANNELS;

/// 将通道交错的像素序列重排为通道平面（NCHW）张量
///
/// 交错序列中第 `(h * width + w) * 3 + c` 个元素
/// 被放到张量的 `c * height * width + h * width + w` 位置。
pub fn pack(
  normalized: &NormalizedPixelSequence,
  height: usize,
  width: usize,
) -> Result<InputTensor, PreprocessError> {
  let plane = height * width;
  let expected = RGB_CHANNELS * plane;
  if normalized.len() != expected {
    return Err(PreprocessError::ChannelMismatch {
      channels: RGB_CHANNELS,
      len: normalized.len(),
      expected,
    });
  }

  let mut data = vec![0f32; expected];
  for (pixel, values) in normalized.values().chunks_exact(RGB_CHANNELS).enumerate() {
    for (c, &value) in values.iter().enumerate() {
      data[c * plane + pixel] = value;
    }
  }

  InputTensor::new([1, RGB_CHANNELS, height, width], data)
}

/// `pack` 的逆变换
pub fn unpack(tensor: &InputTensor) -> Result<NormalizedPixelSequence, PreprocessError> {
  let [_, channels, height, width] = tensor.shape();
  if channels != RGB_CHANNELS {
    return Err(PreprocessError::ChannelMismatch {
      channels,
      len: tensor.as_slice().len(),
      expected: RGB_CHANNELS * height * width,
    });
  }

  let plane = height * width;
  let data = tensor.as_slice();
  let mut values = Vec::with_capacity(data.len());
  for pixel in 0..plane {
    for c in 0..channels {
      values.push(data[c * plane + pixel]);
    }
  }
  NormalizedPixelSequence::from_values(values)
}
