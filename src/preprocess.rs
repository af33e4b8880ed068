// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/preprocess.rs - 图像预处理
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

//! 预处理阶段：缩放 → 像素提取 → 归一化 → 张量打包。
//!
//! 每个阶段都是纯函数，输入与输出均为不可变的值类型。

use thiserror::Error;
use tracing::debug;

use crate::frame::AsNhwcFrame;

pub const MODEL_INPUT_HEIGHT: usize = 224;
pub const MODEL_INPUT_WIDTH: usize = 224;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
  #[error("无效的尺寸: {height}x{width}")]
  InvalidDimensions { height: usize, width: usize },
  #[error("通道数不匹配: 期望长度 {expected}（{channels} 通道）, 实际长度 {len}")]
  ChannelMismatch {
    channels: usize,
    len: usize,
    expected: usize,
  },
}

/// 通道交错（HWC）顺序的浮点像素序列，取值范围 0-255
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSequence {
  values: Box<[f32]>,
}

impl From<Vec<f32>> for PixelSequence {
  fn from(values: Vec<f32>) -> Self {
    Self {
      values: values.into_boxed_slice(),
    }
  }
}

impl PixelSequence {
  pub fn values(&self) -> &[f32] {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

/// 归一化后的像素序列，第 i 个元素的通道为 `i % 3`
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPixelSequence {
  values: Box<[f32]>,
}

impl NormalizedPixelSequence {
  pub fn from_values(values: Vec<f32>) -> Result<Self, PreprocessError> {
    check_channels(values.len())?;
    Ok(Self {
      values: values.into_boxed_slice(),
    })
  }

  pub fn values(&self) -> &[f32] {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn channel_of(index: usize) -> usize {
    index % crate::frame::RGB_CHANNELS
  }
}

/// NCHW 布局的模型输入张量
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
  shape: [usize; 4],
  data: Box<[f32]>,
}

impl InputTensor {
  pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, PreprocessError> {
    let expected = shape.iter().product::<usize>();
    if data.len() != expected {
      return Err(PreprocessError::ChannelMismatch {
        channels: shape[1],
        len: data.len(),
        expected,
      });
    }
    Ok(Self {
      shape,
      data: data.into_boxed_slice(),
    })
  }

  pub fn shape(&self) -> [usize; 4] {
    self.shape
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}

pub(crate) fn check_channels(len: usize) -> Result<(), PreprocessError> {
  let channels = crate::frame::RGB_CHANNELS;
  if len % channels != 0 {
    return Err(PreprocessError::ChannelMismatch {
      channels,
      len,
      expected: len.next_multiple_of(channels),
    });
  }
  Ok(())
}

/// 从解码图像生成模型输入张量
pub fn preprocess<F: AsNhwcFrame>(
  frame: &F,
  height: usize,
  width: usize,
) -> Result<InputTensor, PreprocessError> {
  debug!(
    "预处理: {}x{} -> {}x{}",
    frame.width(),
    frame.height(),
    width,
    height
  );
  let resized = resize(frame, height, width)?;
  let pixels = extract(&resized);
  let normalized = normalize(&pixels)?;
  let tensor = pack(&normalized, height, width)?;
  debug!("输入张量形状: {:?}", tensor.shape());
  Ok(tensor)
}

mod extract;
mod normalize;
mod pack;
mod resize;

pub use self::extract::extract;
pub use self::normalize::{
  IMAGENET_MEAN, IMAGENET_STD, denormalize, denormalize_value, normalize, normalize_value,
};
pub use self::pack::{pack, unpack};
pub use self::resize::resize;

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::RawImage;

  #[test]
  fn preprocess_produces_model_shaped_tensor() {
    let raw = RawImage::new(8, 4, 3, vec![128; 8 * 4 * 3]).unwrap();
    let tensor = preprocess(&raw, MODEL_INPUT_HEIGHT, MODEL_INPUT_WIDTH).unwrap();
    assert_eq!(tensor.shape(), [1, 3, 224, 224]);
    assert_eq!(tensor.as_slice().len(), 3 * 224 * 224);
  }

  #[test]
  fn preprocess_constant_image_gives_constant_planes() {
    let raw = RawImage::new(5, 5, 3, [10u8, 20, 30].repeat(25)).unwrap();
    let tensor = preprocess(&raw, 4, 4).unwrap();
    let plane = 16;
    for (c, v) in [10.0f32, 20.0, 30.0].into_iter().enumerate() {
      let expected = normalize_value(v, c);
      for value in &tensor.as_slice()[c * plane..(c + 1) * plane] {
        assert!((value - expected).abs() < 2e-2, "{value} vs {expected}");
      }
    }
  }

  #[test]
  fn input_tensor_rejects_wrong_element_count() {
    let err = InputTensor::new([1, 3, 2, 2], vec![0.0; 11]).unwrap_err();
    assert_eq!(
      err,
      PreprocessError::ChannelMismatch {
        channels: 3,
        len: 11,
        expected: 12
      }
    );
  }

  #[test]
  fn normalized_sequence_requires_whole_pixels() {
    assert!(NormalizedPixelSequence::from_values(vec![0.0; 5]).is_err());
    assert_eq!(NormalizedPixelSequence::channel_of(7), 1);
  }
}
