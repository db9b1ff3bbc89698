// 该文件是 Signlens （识牌） 项目的一部分。
// src/output/json_report.rs - JSON 报告输出
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

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Finish, Render, ReportRow, ToReportRow},
  summary::Summary,
};

#[derive(Error, Debug)]
pub enum JsonReportError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径编码错误: {0}")]
  PathEncoding(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Report<'a> {
  generated_at: DateTime<Utc>,
  summary: Option<&'a Summary>,
  results: &'a [ReportRow],
}

/// 收集全部结果，在 `finish` 时写出一个 JSON 文件
pub struct JsonReportOutput {
  path: PathBuf,
  rows: Mutex<Vec<ReportRow>>,
}

impl FromUrlWithScheme for JsonReportOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonReportOutput {
  type Error = JsonReportError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonReportError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    let path = urlencoding::decode(url.path())
      .map_err(|e| JsonReportError::PathEncoding(e.to_string()))?;
    Ok(Self::new(path.as_ref()))
  }
}

impl JsonReportOutput {
  pub fn new(path: impl AsRef<Path>) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
      rows: Mutex::new(Vec::new()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn len(&self) -> usize {
    self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<F: ToReportRow<O>, O> Render<F, O> for JsonReportOutput {
  type Error = JsonReportError;

  fn render_result(&self, frame: &F, result: &O) -> Result<(), Self::Error> {
    let row = frame.to_report_row(result);
    self
      .rows
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(row);
    Ok(())
  }
}

impl Finish for JsonReportOutput {
  type Error = JsonReportError;

  fn finish(&self, summary: Option<&Summary>) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
    let report = Report {
      generated_at: Utc::now(),
      summary,
      results: rows.as_slice(),
    };
    let mut writer = BufWriter::new(File::create(&self.path)?);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.flush()?;
    info!("写出 JSON 报告: {} ({} 条)", self.path.display(), rows.len());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::ImageRef, input::IntakeFile, model::RandomRecognizer};

  #[test]
  fn report_contains_rows_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("report.json");
    let output = JsonReportOutput::new(&path);

    let recognizer = RandomRecognizer::seeded(2);
    let file = IntakeFile::new("a.png", ImageRef::new(vec![0u8], None));
    let result = recognizer.classify();
    output.render_result(&file, &result).unwrap();
    assert_eq!(output.len(), 1);

    let summary = Summary {
      total: 1,
      completed_count: 1,
      average_confidence: result.confidence,
      ..Default::default()
    };
    output.finish(Some(&summary)).unwrap();

    let value: serde_json::Value =
      serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(value["results"][0]["source"], "a.png");
    assert_eq!(value["results"][0]["label"], result.label());
    assert_eq!(value["summary"]["completed_count"], 1);
  }

  #[test]
  fn url_path_is_decoded() {
    let url = Url::parse("json:///tmp/my%20report.json").unwrap();
    let output = JsonReportOutput::from_url(&url).unwrap();
    assert_eq!(output.path(), Path::new("/tmp/my report.json"));
  }
}
