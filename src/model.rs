// 该文件是 Signlens （识牌） 项目的一部分。
// src/model.rs - 识别模型
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

use serde::Serialize;

use crate::catalog::{SignCategory, SignInfo};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 一次识别的结果，创建后不可修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
  pub sign: &'static SignInfo,
  /// 百分比置信度
  pub confidence: f64,
}

impl RecognitionResult {
  pub fn label(&self) -> &'static str {
    self.sign.name
  }

  pub fn category(&self) -> SignCategory {
    self.sign.category
  }

  pub fn description(&self) -> &'static str {
    self.sign.description
  }
}

mod stub;
pub use self::stub::{CONFIDENCE_RANGE, RandomRecognizer};
