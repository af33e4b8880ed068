// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/output.rs - 输出定义
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

use std::{
  fmt,
  io::{self, Write},
  str::FromStr,
};

use thiserror::Error;

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

mod console;
pub use self::console::ConsoleOutput;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("无法识别的输出格式: {0}（可选: text, json）")]
  UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl fmt::Display for OutputFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OutputFormat::Text => f.write_str("text"),
      OutputFormat::Json => f.write_str("json"),
    }
  }
}

impl FromStr for OutputFormat {
  type Err = OutputError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "text" => Ok(OutputFormat::Text),
      "json" => Ok(OutputFormat::Json),
      _ => Err(OutputError::UnknownFormat(s.to_string())),
    }
  }
}

/// 将输出写到任意 `Write`
pub trait WriteResult<Output> {
  fn write_result<W: Write>(&self, writer: &mut W, result: &Output) -> Result<(), OutputError>;
}
