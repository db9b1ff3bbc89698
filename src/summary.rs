// 该文件是 Signlens （识牌） 项目的一部分。
// src/summary.rs - 批量结果统计
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

use crate::queue::{ItemStatus, QueueItem, QueueStore};

/// 从队列派生的统计，不保存任何独立状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
  pub total: usize,
  pub pending: usize,
  pub processing: usize,
  pub completed_count: usize,
  /// 没有完成项时为 0
  pub average_confidence: f64,
}

impl Summary {
  pub fn of(items: &[QueueItem]) -> Self {
    let mut summary = Summary {
      total: items.len(),
      ..Default::default()
    };
    let mut confidence_sum = 0.0;

    for item in items {
      match item.status() {
        ItemStatus::Pending => summary.pending += 1,
        ItemStatus::Processing => summary.processing += 1,
        ItemStatus::Complete => {
          summary.completed_count += 1;
          confidence_sum += item.result().map_or(0.0, |r| r.confidence);
        }
      }
    }

    if summary.completed_count > 0 {
      summary.average_confidence = confidence_sum / summary.completed_count as f64;
    }
    summary
  }

  pub fn from_store(store: &QueueStore) -> Self {
    Self::of(&store.get_all())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    frame::ImageRef,
    input::IntakeFile,
    model::RandomRecognizer,
  };

  fn store_with(n: usize) -> (QueueStore, Vec<crate::queue::ItemId>) {
    let store = QueueStore::new();
    let ids = store
      .append((0..n).map(|i| IntakeFile::new(format!("{i}.png"), ImageRef::new(vec![0u8], None))))
      .into_iter()
      .map(|i| i.id)
      .collect();
    (store, ids)
  }

  #[test]
  fn nothing_complete_means_zero_average() {
    let (store, ids) = store_with(2);
    store.update_status(ids[0], ItemStatus::Processing);
    let summary = Summary::from_store(&store);
    assert_eq!(summary.completed_count, 0);
    assert_eq!(summary.average_confidence, 0.0);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.processing, 1);
    assert_eq!(Summary::of(&[]), Summary::default());
  }

  #[test]
  fn average_tracks_every_completion() {
    let (store, ids) = store_with(4);
    let recognizer = RandomRecognizer::seeded(8);
    let mut confidences = Vec::new();

    for id in ids {
      let result = recognizer.classify();
      confidences.push(result.confidence);
      store.update_status(id, ItemStatus::Processing);
      store.update_result(id, result);

      let summary = Summary::from_store(&store);
      let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
      assert_eq!(summary.completed_count, confidences.len());
      assert!((summary.average_confidence - mean).abs() < 1e-9);
    }
  }
}
