// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RawImage};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemaMismatch { expected: String, found: String },
  #[error("无法解析图像路径: {0}")]
  InvalidPath(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageDecodeError(#[from] image::ImageError),
}

const READ_IMAGE_FILE_SCHEME: &str = "image";

/// 单张图像文件输入，解码交给 `image` crate
pub struct ImageFileInput {
  image: Option<RawImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = READ_IMAGE_FILE_SCHEME;
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch {
        expected: Self::SCHEME.to_string(),
        found: url.scheme().to_string(),
      });
    }

    let path = url
      .to_file_path()
      .map_err(|_| ImageFileInputError::InvalidPath(url.to_string()))?;
    Self::open(path)
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    info!("读取图像文件: {}", path.display());
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    debug!("图像尺寸: {}x{}", image.width(), image.height());

    Ok(ImageFileInput {
      image: Some(RawImage::from(image.into_rgb8())),
    })
  }

  pub fn into_frames(self) -> ImageFileInputIter {
    ImageFileInputIter { inner: self }
  }
}

pub struct ImageFileInputIter {
  inner: ImageFileInput,
}

impl Iterator for ImageFileInputIter {
  type Item = RawImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.inner.image.take()
  }
}
