// 该文件是 Signlens （识牌） 项目的一部分。
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

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  catalog::SignCategory,
  input::IntakeFile,
  model::RecognitionResult,
  queue::QueueItem,
  simulation::Detection,
  summary::Summary,
};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

/// 运行结束时收尾，例如写出报告
pub trait Finish {
  type Error;
  fn finish(&self, summary: Option<&Summary>) -> Result<(), Self::Error>;
}

/// 统一的输出记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
  pub source: String,
  pub label: String,
  pub class_id: Option<u8>,
  pub category: Option<SignCategory>,
  pub confidence: f64,
  pub timestamp: DateTime<Utc>,
}

impl ReportRow {
  pub fn from_result(source: impl Into<String>, result: &RecognitionResult) -> Self {
    Self {
      source: source.into(),
      label: result.label().to_string(),
      class_id: None,
      category: Some(result.category()),
      confidence: result.confidence,
      timestamp: Utc::now(),
    }
  }

  pub fn from_detection(frame: u64, detection: &Detection) -> Self {
    Self {
      source: format!("frame-{}", frame),
      label: detection.name.to_string(),
      class_id: Some(detection.class_id),
      category: None,
      confidence: detection.confidence,
      timestamp: detection.timestamp,
    }
  }
}

/// 可以转换为 [`ReportRow`] 的（帧，结果）组合
pub trait ToReportRow<Output> {
  fn to_report_row(&self, result: &Output) -> ReportRow;
}

impl ToReportRow<RecognitionResult> for QueueItem {
  fn to_report_row(&self, result: &RecognitionResult) -> ReportRow {
    ReportRow::from_result(self.display_name.clone(), result)
  }
}

impl ToReportRow<RecognitionResult> for IntakeFile {
  fn to_report_row(&self, result: &RecognitionResult) -> ReportRow {
    ReportRow::from_result(self.name.clone(), result)
  }
}

impl ToReportRow<Detection> for u64 {
  fn to_report_row(&self, result: &Detection) -> ReportRow {
    ReportRow::from_detection(*self, result)
  }
}

mod console;
pub use self::console::ConsoleOutput;

#[cfg(feature = "json_report")]
mod json_report;
#[cfg(feature = "json_report")]
pub use self::json_report::{JsonReportError, JsonReportOutput};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "json_report")]
  #[error("JSON 报告错误: {0}")]
  JsonReportError(#[from] JsonReportError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  Console(ConsoleOutput),
  #[cfg(feature = "json_report")]
  JsonReport(JsonReportOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ConsoleOutput::SCHEME => Ok(OutputWrapper::Console(ConsoleOutput::default())),
      #[cfg(feature = "json_report")]
      JsonReportOutput::SCHEME => Ok(OutputWrapper::JsonReport(JsonReportOutput::from_url(url)?)),
      scheme => Err(OutputError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl<F: ToReportRow<O>, O> Render<F, O> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &F, result: &O) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Console(output) => {
        output.render_result(frame, result).map_err(|never| match never {})
      }
      #[cfg(feature = "json_report")]
      OutputWrapper::JsonReport(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

impl Finish for OutputWrapper {
  type Error = OutputError;

  fn finish(&self, summary: Option<&Summary>) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Console(output) => output.finish(summary).map_err(|never| match never {}),
      #[cfg(feature = "json_report")]
      OutputWrapper::JsonReport(output) => output.finish(summary).map_err(OutputError::from),
    }
  }
}
