// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/preprocess/resize.rs - 双线性缩放
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

use image::{RgbImage, imageops::FilterType};

use super::PreprocessError;
use crate::frame::{AsNhwcFrame, RGB_CHANNELS, ResizedImage};

fn to_u32(height: usize, width: usize) -> Result<(u32, u32), PreprocessError> {
  match (u32::try_from(height), u32::try_from(width)) {
    (Ok(h), Ok(w)) if h > 0 && w > 0 => Ok((h, w)),
    _ => Err(PreprocessError::InvalidDimensions { height, width }),
  }
}

/// 使用双线性插值（三角滤波）将图像缩放到 `height` x `width`
pub fn resize<F: AsNhwcFrame>(
  frame: &F,
  height: usize,
  width: usize,
) -> Result<ResizedImage, PreprocessError> {
  let (target_h, target_w) = to_u32(height, width)?;
  let (source_h, source_w) = to_u32(frame.height(), frame.width())?;

  if frame.channels() != RGB_CHANNELS {
    return Err(PreprocessError::ChannelMismatch {
      channels: frame.channels(),
      len: frame.as_nhwc().len(),
      expected: frame.width() * frame.height() * RGB_CHANNELS,
    });
  }

  let source = RgbImage::from_raw(source_w, source_h, frame.as_nhwc().to_vec()).ok_or(
    PreprocessError::ChannelMismatch {
      channels: RGB_CHANNELS,
      len: frame.as_nhwc().len(),
      expected: frame.width() * frame.height() * RGB_CHANNELS,
    },
  )?;

  if (source_w, source_h) == (target_w, target_h) {
    return Ok(ResizedImage::from_rgb(source));
  }

  let resized = image::imageops::resize(&source, target_w, target_h, FilterType::Triangle);
  Ok(ResizedImage::from_rgb(resized))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::RawImage;

  fn gradient(width: usize, height: usize) -> RawImage {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
      for x in 0..width {
        data.extend_from_slice(&[(x * 10) as u8, (y * 10) as u8, 200]);
      }
    }
    RawImage::new(width, height, 3, data).unwrap()
  }

  #[test]
  fn resize_hits_target_size() {
    let resized = resize(&gradient(17, 9), 224, 224).unwrap();
    assert_eq!(resized.width(), 224);
    assert_eq!(resized.height(), 224);
    assert_eq!(resized.as_nhwc().len(), 224 * 224 * 3);
  }

  #[test]
  fn resize_is_deterministic() {
    let image = gradient(13, 11);
    assert_eq!(resize(&image, 7, 5).unwrap(), resize(&image, 7, 5).unwrap());
  }

  #[test]
  fn resize_to_same_size_is_identity() {
    let image = gradient(4, 3);
    let resized = resize(&image, 3, 4).unwrap();
    assert_eq!(resized.as_nhwc(), image.as_nhwc());
  }

  #[test]
  fn zero_target_is_invalid() {
    let image = gradient(4, 4);
    assert_eq!(
      resize(&image, 0, 224).unwrap_err(),
      PreprocessError::InvalidDimensions {
        height: 0,
        width: 224
      }
    );
    assert!(matches!(
      resize(&image, 224, 0),
      Err(PreprocessError::InvalidDimensions { .. })
    ));
  }

  #[test]
  fn empty_source_is_invalid() {
    let image = RawImage::new(0, 0, 3, Vec::new()).unwrap();
    assert!(matches!(
      resize(&image, 224, 224),
      Err(PreprocessError::InvalidDimensions { .. })
    ));
  }

  #[test]
  fn non_rgb_source_is_rejected() {
    let image = RawImage::new(2, 2, 4, vec![0; 16]).unwrap();
    assert!(matches!(
      resize(&image, 224, 224),
      Err(PreprocessError::ChannelMismatch { channels: 4, .. })
    ));
  }
}
