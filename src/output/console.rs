// 该文件是 Ruiyan （锐眼） 项目的一部分。
// src/output/console.rs - 控制台输出
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

use std::io::{self, Write};

use serde_json::json;

use super::{OutputError, OutputFormat, Render, WriteResult};
use crate::{frame::RawImage, model::Classification};

const RULE: &str = "--------------------------------------------------------------";

/// 把分类结果打印到标准输出
#[derive(Debug, Clone, Default)]
pub struct ConsoleOutput {
  format: OutputFormat,
  title: Option<String>,
}

impl ConsoleOutput {
  pub fn new(format: OutputFormat) -> Self {
    Self {
      format,
      title: None,
    }
  }

  /// 文本格式的标题中显示的模型名
  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }
}

impl WriteResult<Classification> for ConsoleOutput {
  fn write_result<W: Write>(
    &self,
    writer: &mut W,
    result: &Classification,
  ) -> Result<(), OutputError> {
    match self.format {
      OutputFormat::Text => {
        match &self.title {
          Some(title) => writeln!(
            writer,
            "Top {} predictions for {}...",
            result.predictions.len(),
            title
          )?,
          None => writeln!(writer, "Top {} predictions...", result.predictions.len())?,
        }
        writeln!(writer, "{}", RULE)?;
        for p in result.predictions.iter() {
          writeln!(writer, "Label: {}, Confidence: {:.6}", p.label, p.confidence)?;
        }
      }
      OutputFormat::Json => {
        let predictions: Vec<_> = result
          .predictions
          .iter()
          .enumerate()
          .map(|(rank, p)| {
            json!({
              "rank": rank + 1,
              "class_id": p.class_id,
              "label": p.label,
              "confidence": p.confidence,
            })
          })
          .collect();
        let value = json!({
          "device": result.device.to_string(),
          "num_classes": result.num_classes,
          "predictions": predictions,
        });
        serde_json::to_writer_pretty(&mut *writer, &value)?;
        writeln!(writer)?;
      }
    }
    Ok(())
  }
}

impl Render<RawImage, Classification> for ConsoleOutput {
  type Error = OutputError;

  fn render_result(&self, _frame: &RawImage, result: &Classification) -> Result<(), Self::Error> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    self.write_result(&mut lock, result)?;
    lock.flush()?;
    Ok(())
  }
}
