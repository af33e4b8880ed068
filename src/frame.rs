// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/frame.rs - NHWC 帧定义
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

use image::RgbImage;

use crate::preprocess::PreprocessError;

pub const RGB_CHANNELS: usize = 3;

/// 以 NHWC（通道交错）顺序访问像素数据
pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
  fn width(&self) -> usize;
  fn height(&self) -> usize;
  fn channels(&self) -> usize;
}

fn check_len(width: usize, height: usize, channels: usize, len: usize) -> Result<(), PreprocessError> {
  let expected = width * height * channels;
  if len != expected {
    return Err(PreprocessError::ChannelMismatch {
      channels,
      len,
      expected,
    });
  }
  Ok(())
}

/// 解码后的原始图像，像素按加载器的 RGB 交错顺序排列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
  width: usize,
  height: usize,
  channels: usize,
  data: Box<[u8]>,
}

impl RawImage {
  pub fn new(
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
  ) -> Result<Self, PreprocessError> {
    check_len(width, height, channels, data.len())?;
    Ok(Self {
      width,
      height,
      channels,
      data: data.into_boxed_slice(),
    })
  }
}

impl From<RgbImage> for RawImage {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width: width as usize,
      height: height as usize,
      channels: RGB_CHANNELS,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl AsNhwcFrame for RawImage {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }

  fn width(&self) -> usize {
    self.width
  }

  fn height(&self) -> usize {
    self.height
  }

  fn channels(&self) -> usize {
    self.channels
  }
}

/// 缩放到模型输入尺寸后的图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedImage {
  width: usize,
  height: usize,
  data: Box<[u8]>,
}

impl ResizedImage {
  pub(crate) fn from_rgb(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width: width as usize,
      height: height as usize,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl AsNhwcFrame for ResizedImage {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }

  fn width(&self) -> usize {
    self.width
  }

  fn height(&self) -> usize {
    self.height
  }

  fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}
