// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/model/labels.rs - 标签文件
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LabelFileError {
  #[error("无法读取标签文件 {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// 每行一个标签，行号即类别索引
pub fn parse_labels(content: &str) -> Vec<String> {
  content
    .lines()
    .map(|line| line.trim_end_matches('\r').to_string())
    .collect()
}

pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>, LabelFileError> {
  let path = path.as_ref();
  info!("加载标签文件: {}", path.display());
  let content = std::fs::read_to_string(path).map_err(|source| LabelFileError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let labels = parse_labels(&content);
  debug!("标签数量: {}", labels.len());
  Ok(labels)
}
