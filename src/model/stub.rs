// 该文件是 Signlens （识牌） 项目的一部分。
// src/model/stub.rs - 随机识别桩
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

use std::convert::Infallible;
use std::ops::Range;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::{
  catalog::recognition_catalog,
  frame::ImageRef,
  model::{Model, RecognitionResult},
};

/// 置信度取值区间，左闭右开
pub const CONFIDENCE_RANGE: Range<f64> = 85.0..99.0;

/// 不做任何推理的识别器：从目录中均匀随机挑选一个标志，
/// 并给出 [`CONFIDENCE_RANGE`] 内均匀分布的置信度。
///
/// 随机源由调用方注入，测试时使用固定种子即可得到确定的结果。
pub struct RandomRecognizer<R = StdRng> {
  rng: Mutex<R>,
}

impl<R: Rng> RandomRecognizer<R> {
  pub fn new(rng: R) -> Self {
    Self {
      rng: Mutex::new(rng),
    }
  }

  pub fn classify(&self) -> RecognitionResult {
    let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
    let catalog = recognition_catalog();
    let sign = &catalog[rng.gen_range(0..catalog.len())];
    let confidence = rng.gen_range(CONFIDENCE_RANGE);
    debug!("识别桩给出结果: {} ({:.1}%)", sign.name, confidence);
    RecognitionResult { sign, confidence }
  }

  /// 只取一个置信度，供不需要标志的调用方使用
  pub fn confidence(&self) -> f64 {
    self
      .rng
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .gen_range(CONFIDENCE_RANGE)
  }
}

impl RandomRecognizer<StdRng> {
  pub fn from_entropy() -> Self {
    Self::new(StdRng::from_entropy())
  }

  pub fn seeded(seed: u64) -> Self {
    Self::new(StdRng::seed_from_u64(seed))
  }
}

impl<R: Rng> Model for RandomRecognizer<R> {
  type Input = ImageRef;
  type Output = RecognitionResult;
  type Error = Infallible;

  fn infer(&self, _input: &ImageRef) -> Result<RecognitionResult, Infallible> {
    Ok(self.classify())
  }
}
