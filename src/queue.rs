// 该文件是 Signlens （识牌） 项目的一部分。
// src/queue.rs - 批量识别队列
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

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::{frame::ImageRef, input::IntakeFile, model::RecognitionResult};

/// 队列项标识，由队列分配，永不复用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(u64);

impl fmt::Display for ItemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// 单项状态，只能向前推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ItemStatus {
  Pending,
  Processing,
  Complete,
}

#[derive(Debug, Clone)]
pub struct QueueItem {
  pub id: ItemId,
  pub display_name: String,
  pub image: ImageRef,
  status: ItemStatus,
  result: Option<RecognitionResult>,
}

impl QueueItem {
  pub fn status(&self) -> ItemStatus {
    self.status
  }

  /// 仅当状态为 `Complete` 时存在
  pub fn result(&self) -> Option<&RecognitionResult> {
    self.result.as_ref()
  }

  pub fn is_complete(&self) -> bool {
    self.status == ItemStatus::Complete
  }
}

#[derive(Debug, Default)]
struct QueueState {
  items: Vec<QueueItem>,
  selected: Option<ItemId>,
  next_id: u64,
}

impl QueueState {
  fn position(&self, id: ItemId) -> Option<usize> {
    self.items.iter().position(|item| item.id == id)
  }

  fn item_mut(&mut self, id: ItemId) -> Option<&mut QueueItem> {
    self.items.iter_mut().find(|item| item.id == id)
  }
}

/// 队列存储
///
/// 所有读写都经过同一把锁，每个操作对外都是原子的：
/// 任何时刻观察到的状态都满足
/// - 标识唯一；
/// - `result` 存在当且仅当状态为 `Complete`；
/// - 选中项要么在队列中，要么为 `None`（队列为空时必为 `None`）。
#[derive(Debug, Default)]
pub struct QueueStore {
  state: Mutex<QueueState>,
}

impl QueueStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, QueueState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// 按插入顺序返回全部队列项的快照
  pub fn get_all(&self) -> Vec<QueueItem> {
    self.lock().items.clone()
  }

  pub fn get(&self, id: ItemId) -> Option<QueueItem> {
    let state = self.lock();
    state.position(id).map(|i| state.items[i].clone())
  }

  pub fn len(&self) -> usize {
    self.lock().items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().items.is_empty()
  }

  pub fn selected(&self) -> Option<ItemId> {
    self.lock().selected
  }

  /// 按顺序返回所有待处理项的标识
  pub fn pending_ids(&self) -> Vec<ItemId> {
    self
      .lock()
      .items
      .iter()
      .filter(|item| item.status == ItemStatus::Pending)
      .map(|item| item.id)
      .collect()
  }

  /// 按顺序返回所有尚未完成（`Pending` 或 `Processing`）的项的标识
  pub fn unfinished_ids(&self) -> Vec<ItemId> {
    self
      .lock()
      .items
      .iter()
      .filter(|item| item.status != ItemStatus::Complete)
      .map(|item| item.id)
      .collect()
  }

  /// 追加一批文件，返回新建的队列项
  ///
  /// 若追加前队列为空且没有选中项，则选中第一个新项。
  pub fn append(&self, files: impl IntoIterator<Item = IntakeFile>) -> Vec<QueueItem> {
    let mut state = self.lock();
    let was_empty = state.items.is_empty() && state.selected.is_none();

    let mut added = Vec::new();
    for file in files {
      state.next_id += 1;
      let item = QueueItem {
        id: ItemId(state.next_id),
        display_name: file.name,
        image: file.image,
        status: ItemStatus::Pending,
        result: None,
      };
      debug!("加入队列: {} {}", item.id, item.display_name);
      state.items.push(item.clone());
      added.push(item);
    }

    if was_empty && let Some(first) = added.first() {
      state.selected = Some(first.id);
    }
    added
  }

  /// 选中指定项；标识不存在时不做任何事
  pub fn select(&self, id: ItemId) -> bool {
    let mut state = self.lock();
    if state.position(id).is_some() {
      state.selected = Some(id);
      true
    } else {
      debug!("忽略选中不存在的队列项: {}", id);
      false
    }
  }

  /// 删除指定项
  ///
  /// 若删除的是选中项，选中项移到剩余的第一项，队列为空时为 `None`。
  pub fn remove(&self, id: ItemId) -> Option<QueueItem> {
    let mut state = self.lock();
    let Some(index) = state.position(id) else {
      debug!("忽略删除不存在的队列项: {}", id);
      return None;
    };
    let removed = state.items.remove(index);
    if state.selected == Some(id) {
      state.selected = state.items.first().map(|item| item.id);
    }
    Some(removed)
  }

  /// 一次性清空队列和选中项
  pub fn clear(&self) -> usize {
    let mut state = self.lock();
    let count = state.items.len();
    state.items.clear();
    state.selected = None;
    count
  }

  /// 推进状态；不存在的标识或回退请求均被忽略
  ///
  /// `Complete` 只能通过 [`QueueStore::update_result`] 写入。
  pub fn update_status(&self, id: ItemId, status: ItemStatus) -> bool {
    let mut state = self.lock();
    let Some(item) = state.item_mut(id) else {
      return false;
    };
    if status == ItemStatus::Complete || status <= item.status {
      return false;
    }
    item.status = status;
    true
  }

  /// 写入结果并标记为 `Complete`，只对处理中的项生效
  pub fn update_result(&self, id: ItemId, result: RecognitionResult) -> bool {
    let mut state = self.lock();
    match state.item_mut(id) {
      Some(item) if item.status == ItemStatus::Processing => {
        item.result = Some(result);
        item.status = ItemStatus::Complete;
        true
      }
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::RandomRecognizer;

  fn files(names: &[&str]) -> Vec<IntakeFile> {
    names
      .iter()
      .map(|name| IntakeFile::new(*name, ImageRef::new(vec![0u8; 8], None)))
      .collect()
  }

  #[test]
  fn append_keeps_order_and_selects_first() {
    let store = QueueStore::new();
    let added = store.append(files(&["a.png", "b.png", "c.png"]));
    let names: Vec<_> = store.get_all().into_iter().map(|i| i.display_name).collect();
    assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    assert_eq!(store.selected(), Some(added[0].id));
    assert!(store.get_all().iter().all(|i| i.status() == ItemStatus::Pending));
  }

  #[test]
  fn later_batches_keep_selection() {
    let store = QueueStore::new();
    let first = store.append(files(&["a.png"]));
    let second = store.append(files(&["b.png"]));
    assert_eq!(store.selected(), Some(first[0].id));
    assert!(store.select(second[0].id));
    store.append(files(&["c.png"]));
    assert_eq!(store.selected(), Some(second[0].id));
  }

  #[test]
  fn ids_are_never_reused() {
    let store = QueueStore::new();
    let first = store.append(files(&["a.png", "b.png"]));
    store.clear();
    let second = store.append(files(&["a.png"]));
    assert!(first.iter().all(|item| item.id != second[0].id));
    assert_eq!(store.selected(), Some(second[0].id));
  }

  #[test]
  fn removing_selected_moves_to_first_remaining() {
    let store = QueueStore::new();
    let items = store.append(files(&["a.png", "b.png", "c.png"]));
    store.select(items[1].id);

    store.remove(items[1].id);
    assert_eq!(store.selected(), Some(items[0].id));

    store.remove(items[0].id);
    assert_eq!(store.selected(), Some(items[2].id));

    store.remove(items[2].id);
    assert_eq!(store.selected(), None);
    assert!(store.is_empty());
  }

  #[test]
  fn removing_other_item_keeps_selection() {
    let store = QueueStore::new();
    let items = store.append(files(&["a.png", "b.png", "c.png"]));
    store.select(items[2].id);
    assert!(store.remove(items[0].id).is_some());
    assert_eq!(store.selected(), Some(items[2].id));
  }

  #[test]
  fn stale_ids_are_no_ops() {
    let store = QueueStore::new();
    let items = store.append(files(&["a.png"]));
    let stale = items[0].id;
    store.clear();

    assert!(!store.select(stale));
    assert!(store.remove(stale).is_none());
    assert!(!store.update_status(stale, ItemStatus::Processing));
    let result = RandomRecognizer::seeded(1).classify();
    assert!(!store.update_result(stale, result));
    assert_eq!(store.selected(), None);
  }

  #[test]
  fn status_only_moves_forward() {
    let store = QueueStore::new();
    let id = store.append(files(&["a.png"]))[0].id;
    let result = RandomRecognizer::seeded(1).classify();

    // 必须先进入处理中
    assert!(!store.update_result(id, result.clone()));
    assert!(!store.update_status(id, ItemStatus::Complete));
    assert!(store.update_status(id, ItemStatus::Processing));
    assert!(!store.update_status(id, ItemStatus::Pending));
    assert!(store.get(id).unwrap().result().is_none());

    assert!(store.update_result(id, result.clone()));
    let item = store.get(id).unwrap();
    assert_eq!(item.status(), ItemStatus::Complete);
    assert_eq!(item.result(), Some(&result));

    assert!(!store.update_status(id, ItemStatus::Processing));
    assert!(!store.update_result(id, result));
  }

  #[test]
  fn pending_ids_skip_started_items() {
    let store = QueueStore::new();
    let items = store.append(files(&["a.png", "b.png", "c.png"]));
    store.update_status(items[0].id, ItemStatus::Processing);
    assert_eq!(store.pending_ids(), vec![items[1].id, items[2].id]);
  }

  #[test]
  fn unfinished_ids_keep_started_items() {
    let store = QueueStore::new();
    let items = store.append(files(&["a.png", "b.png", "c.png"]));
    store.update_status(items[0].id, ItemStatus::Processing);
    store.update_status(items[1].id, ItemStatus::Processing);
    store.update_result(items[1].id, RandomRecognizer::seeded(1).classify());
    assert_eq!(store.unfinished_ids(), vec![items[0].id, items[2].id]);
  }
}
