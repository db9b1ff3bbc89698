// 该文件是 Signlens （识牌） 项目的一部分。
// src/intake.rs - 上传入队
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

use std::fmt::Display;

use tracing::{info, warn};

use crate::{
  input::IntakeFile,
  queue::{QueueItem, QueueStore},
};

/// 将一批文件追加到队列末尾
///
/// 读取失败的文件记录日志后跳过，其余文件按输入顺序入队，
/// 每个成功的文件对应一个 `Pending` 状态的新队列项。
pub fn enqueue<E, I>(store: &QueueStore, files: I) -> Vec<QueueItem>
where
  E: Display,
  I: IntoIterator<Item = Result<IntakeFile, E>>,
{
  let mut failed = 0usize;
  let loaded: Vec<IntakeFile> = files
    .into_iter()
    .filter_map(|file| match file {
      Ok(file) => Some(file),
      Err(e) => {
        warn!("文件读取失败，已跳过: {}", e);
        failed += 1;
        None
      }
    })
    .collect();

  if loaded.is_empty() && failed == 0 {
    return Vec::new();
  }

  let added = store.append(loaded);
  info!("入队 {} 个文件，跳过 {} 个", added.len(), failed);
  added
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::ImageRef, queue::ItemStatus};

  fn ok(name: &str) -> Result<IntakeFile, String> {
    Ok(IntakeFile::new(name, ImageRef::new(vec![1u8], None)))
  }

  #[test]
  fn empty_batch_is_a_no_op() {
    let store = QueueStore::new();
    let added = enqueue(&store, Vec::<Result<IntakeFile, String>>::new());
    assert!(added.is_empty());
    assert!(store.is_empty());
    assert_eq!(store.selected(), None);
  }

  #[test]
  fn failed_files_are_dropped_and_the_rest_kept_in_order() {
    let store = QueueStore::new();
    let added = enqueue(
      &store,
      vec![ok("a.png"), Err("disk error".to_string()), ok("c.png")],
    );

    let names: Vec<_> = added.iter().map(|i| i.display_name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "c.png"]);
    assert_eq!(store.len(), 2);
    assert!(store.get_all().iter().all(|i| i.status() == ItemStatus::Pending));
    assert_eq!(store.selected(), Some(added[0].id));
  }

  #[test]
  fn all_failed_leaves_store_untouched() {
    let store = QueueStore::new();
    let added = enqueue(&store, vec![Err::<IntakeFile, _>("bad".to_string())]);
    assert!(added.is_empty());
    assert!(store.is_empty());
  }

  #[test]
  fn ids_are_unique_across_batches() {
    let store = QueueStore::new();
    let mut ids: Vec<_> = enqueue(&store, vec![ok("a.png"), ok("b.png")])
      .into_iter()
      .chain(enqueue(&store, vec![ok("a.png")]))
      .map(|i| i.id)
      .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
  }
}
