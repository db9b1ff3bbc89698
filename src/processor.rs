// 该文件是 Signlens （识牌） 项目的一部分。
// src/processor.rs - 顺序批量处理
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
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
  frame::ImageRef,
  model::{Model, RecognitionResult},
  queue::{ItemId, ItemStatus, QueueItem, QueueStore},
};

/// 每个队列项的模拟处理时长
pub trait DelayPolicy {
  fn next_delay(&self) -> Duration;
}

/// 固定时长，测试中使用
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl DelayPolicy for FixedDelay {
  fn next_delay(&self) -> Duration {
    self.0
  }
}

/// 区间内均匀分布的随机时长
pub struct RandomDelay<R = StdRng> {
  rng: Mutex<R>,
  range_us: Range<u64>,
}

/// 批量处理默认的单项时长区间
pub const BULK_DELAY_RANGE: Range<Duration> = Duration::from_millis(300)..Duration::from_millis(700);

impl<R: Rng> RandomDelay<R> {
  pub fn new(rng: R, range: Range<Duration>) -> Self {
    let start = range.start.as_micros() as u64;
    let end = (range.end.as_micros() as u64).max(start + 1);
    Self {
      rng: Mutex::new(rng),
      range_us: start..end,
    }
  }
}

impl RandomDelay<StdRng> {
  pub fn standard() -> Self {
    Self::new(StdRng::from_entropy(), BULK_DELAY_RANGE)
  }
}

impl<R: Rng> DelayPolicy for RandomDelay<R> {
  fn next_delay(&self) -> Duration {
    let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
    Duration::from_micros(rng.gen_range(self.range_us.clone()))
  }
}

/// 处理进度：`processed / total`，分母在开始时固定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
  pub running: bool,
  pub processed: usize,
  pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorEvent {
  Started { total: usize },
  ItemStarted { id: ItemId },
  ItemCompleted { id: ItemId, result: RecognitionResult, processed: usize },
  /// 队列项在处理前或处理中被删除，结果被丢弃
  ItemDropped { id: ItemId, processed: usize },
  Finished(RunReport),
}

/// 一次处理运行的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
  pub total: usize,
  pub completed: usize,
  pub dropped: usize,
}

/// 运行结束（包括 future 被丢弃）时复位运行标志
///
/// 被中断时正在处理的项保持 `Processing`，由下一次运行接着完成。
struct RunGuard<'a> {
  progress: &'a Mutex<Progress>,
  in_flight: Option<ItemId>,
}

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    if let Some(id) = self.in_flight {
      warn!("处理在 {} 进行中被中断，下次运行时继续", id);
    }
    self
      .progress
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .running = false;
  }
}

/// 顺序处理器
///
/// 一次只处理一个队列项，严格按队列顺序。运行开始时对未完成项做快照，
/// 运行期间新加入的项保持 `Pending`，直到下一次 [`SequentialProcessor::process_all`]。
/// 处理器空闲时仍为 `Processing` 的项来自被中断的运行，会被重新纳入快照。
pub struct SequentialProcessor<M, D = RandomDelay> {
  store: Arc<QueueStore>,
  model: M,
  delay: D,
  progress: Mutex<Progress>,
  events: broadcast::Sender<ProcessorEvent>,
}

impl<M, D> SequentialProcessor<M, D>
where
  M: Model<Input = ImageRef, Output = RecognitionResult, Error = Infallible>,
  D: DelayPolicy,
{
  pub fn new(store: Arc<QueueStore>, model: M, delay: D) -> Self {
    let (events, _) = broadcast::channel(64);
    Self {
      store,
      model,
      delay,
      progress: Mutex::new(Progress::default()),
      events,
    }
  }

  pub fn store(&self) -> &Arc<QueueStore> {
    &self.store
  }

  pub fn progress(&self) -> Progress {
    *self.lock_progress()
  }

  pub fn is_running(&self) -> bool {
    self.lock_progress().running
  }

  pub fn subscribe(&self) -> broadcast::Receiver<ProcessorEvent> {
    self.events.subscribe()
  }

  fn lock_progress(&self) -> MutexGuard<'_, Progress> {
    self.progress.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn emit(&self, event: ProcessorEvent) {
    // 没有订阅者时发送失败，忽略即可
    let _ = self.events.send(event);
  }

  fn advance(&self) -> usize {
    let mut progress = self.lock_progress();
    progress.processed += 1;
    progress.processed
  }

  /// 处理当前所有未完成项
  ///
  /// 已在运行或没有未完成项时立即返回 `None`，不产生任何可观察的效果。
  pub async fn process_all(&self) -> Option<RunReport> {
    let snapshot = {
      let mut progress = self.lock_progress();
      if progress.running {
        debug!("处理器已在运行，忽略重复调用");
        return None;
      }
      let pending = self.store.unfinished_ids();
      if pending.is_empty() {
        debug!("没有待处理项");
        return None;
      }
      *progress = Progress {
        running: true,
        processed: 0,
        total: pending.len(),
      };
      pending
    };
    let mut guard = RunGuard {
      progress: &self.progress,
      in_flight: None,
    };

    let mut report = RunReport {
      total: snapshot.len(),
      ..Default::default()
    };
    info!("开始批量处理 {} 项", report.total);
    self.emit(ProcessorEvent::Started {
      total: report.total,
    });

    for id in snapshot {
      let Some(item) = self.store.get(id) else {
        report.dropped += 1;
        self.drop_item(id);
        continue;
      };
      if !self.start_item(&item) {
        report.dropped += 1;
        self.drop_item(id);
        continue;
      }
      guard.in_flight = Some(id);
      self.emit(ProcessorEvent::ItemStarted { id });

      let delay = self.delay.next_delay();
      debug!("处理 {} {}，模拟耗时 {:.2?}", id, item.display_name, delay);
      tokio::time::sleep(delay).await;

      let result = self
        .model
        .infer(&item.image)
        .unwrap_or_else(|never| match never {});
      guard.in_flight = None;
      if self.store.update_result(id, result.clone()) {
        report.completed += 1;
        let processed = self.advance();
        info!(
          "({}/{}) {} -> {} {:.1}%",
          processed,
          report.total,
          item.display_name,
          result.label(),
          result.confidence
        );
        self.emit(ProcessorEvent::ItemCompleted {
          id,
          result,
          processed,
        });
      } else {
        report.dropped += 1;
        self.drop_item(id);
      }
    }

    info!(
      "批量处理结束: 完成 {}，丢弃 {}",
      report.completed, report.dropped
    );
    self.emit(ProcessorEvent::Finished(report));
    Some(report)
  }

  fn start_item(&self, item: &QueueItem) -> bool {
    match item.status() {
      ItemStatus::Pending => self.store.update_status(item.id, ItemStatus::Processing),
      ItemStatus::Processing => {
        info!("继续处理上次中断的 {} {}", item.id, item.display_name);
        true
      }
      ItemStatus::Complete => false,
    }
  }

  fn drop_item(&self, id: ItemId) {
    warn!("队列项 {} 已被删除，丢弃其结果", id);
    let processed = self.advance();
    self.emit(ProcessorEvent::ItemDropped { id, processed });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{catalog::recognition_catalog, input::IntakeFile, model::RandomRecognizer};
  use tokio::time::Instant;

  type TestProcessor = SequentialProcessor<RandomRecognizer, FixedDelay>;

  const STEP: Duration = Duration::from_millis(500);

  fn setup(names: &[&str]) -> (Arc<TestProcessor>, Vec<ItemId>) {
    let store = Arc::new(QueueStore::new());
    let ids = store
      .append(
        names
          .iter()
          .map(|n| IntakeFile::new(*n, ImageRef::new(vec![0u8; 4], None))),
      )
      .into_iter()
      .map(|i| i.id)
      .collect();
    let processor = SequentialProcessor::new(store, RandomRecognizer::seeded(3), FixedDelay(STEP));
    (Arc::new(processor), ids)
  }

  #[tokio::test(start_paused = true)]
  async fn processes_every_pending_item() {
    let (processor, ids) = setup(&["a.png", "b.png", "c.png"]);
    assert!(!processor.is_running());

    let start = Instant::now();
    let report = processor.process_all().await.unwrap();
    assert!(start.elapsed() >= STEP * 3);

    assert_eq!(
      report,
      RunReport {
        total: 3,
        completed: 3,
        dropped: 0
      }
    );
    assert_eq!(
      processor.progress(),
      Progress {
        running: false,
        processed: 3,
        total: 3
      }
    );
    for id in ids {
      let item = processor.store().get(id).unwrap();
      assert_eq!(item.status(), ItemStatus::Complete);
      let result = item.result().unwrap();
      assert!((85.0..99.0).contains(&result.confidence));
      assert!(recognition_catalog().contains(result.sign));
    }
  }

  #[tokio::test(start_paused = true)]
  async fn empty_queue_is_a_no_op() {
    let (processor, _) = setup(&[]);
    let mut events = processor.subscribe();
    assert_eq!(processor.process_all().await, None);
    assert!(events.try_recv().is_err());
    assert_eq!(processor.progress(), Progress::default());
  }

  #[tokio::test(start_paused = true)]
  async fn second_call_while_running_is_ignored() {
    let (processor, ids) = setup(&["a.png", "b.png"]);
    let mut events = processor.subscribe();

    let running = tokio::spawn({
      let processor = processor.clone();
      async move { processor.process_all().await }
    });

    assert_eq!(events.recv().await.unwrap(), ProcessorEvent::Started { total: 2 });
    assert!(processor.is_running());
    assert_eq!(processor.process_all().await, None);
    assert_eq!(processor.progress().total, 2);

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.completed, 2);

    let mut completed = Vec::new();
    while let Ok(event) = events.try_recv() {
      if let ProcessorEvent::ItemCompleted { id, .. } = event {
        completed.push(id);
      }
    }
    assert_eq!(completed, ids);
    assert!(!processor.is_running());
  }

  #[tokio::test(start_paused = true)]
  async fn one_item_at_a_time_in_queue_order() {
    let (processor, ids) = setup(&["a.png", "b.png", "c.png"]);
    let mut events = processor.subscribe();
    let running = tokio::spawn({
      let processor = processor.clone();
      async move { processor.process_all().await }
    });

    let mut started = Vec::new();
    loop {
      match events.recv().await.unwrap() {
        ProcessorEvent::ItemStarted { id } => {
          let items = processor.store().get_all();
          let processing: Vec<_> = items
            .iter()
            .filter(|i| i.status() == ItemStatus::Processing)
            .map(|i| i.id)
            .collect();
          assert_eq!(processing, vec![id]);
          started.push(id);
        }
        ProcessorEvent::Finished(_) => break,
        _ => {}
      }
    }
    assert_eq!(started, ids);
    running.await.unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn items_added_mid_run_wait_for_next_run() {
    let (processor, _) = setup(&["a.png"]);
    let mut events = processor.subscribe();
    let running = tokio::spawn({
      let processor = processor.clone();
      async move { processor.process_all().await }
    });

    events.recv().await.unwrap();
    let late = processor
      .store()
      .append([IntakeFile::new("late.png", ImageRef::new(vec![1u8], None))]);
    let report = running.await.unwrap().unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(
      processor.store().get(late[0].id).unwrap().status(),
      ItemStatus::Pending
    );

    let report = processor.process_all().await.unwrap();
    assert_eq!(report.total, 1);
    assert!(processor.store().get(late[0].id).unwrap().is_complete());
  }

  #[tokio::test(start_paused = true)]
  async fn removing_the_item_in_flight_drops_its_result() {
    let (processor, ids) = setup(&["a.png", "b.png", "c.png"]);
    let mut events = processor.subscribe();
    let running = tokio::spawn({
      let processor = processor.clone();
      async move { processor.process_all().await }
    });

    loop {
      if let ProcessorEvent::ItemStarted { id } = events.recv().await.unwrap()
        && id == ids[1]
      {
        break;
      }
    }
    processor.store().remove(ids[1]);

    let report = running.await.unwrap().unwrap();
    assert_eq!(
      report,
      RunReport {
        total: 3,
        completed: 2,
        dropped: 1
      }
    );
    let items = processor.store().get_all();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.is_complete()));
    assert_eq!(processor.progress().processed, 3);
  }

  #[tokio::test(start_paused = true)]
  async fn interrupted_item_is_finished_by_the_next_run() {
    let (processor, ids) = setup(&["a.png", "b.png"]);

    let interrupted =
      tokio::time::timeout(Duration::from_millis(100), processor.process_all()).await;
    assert!(interrupted.is_err());
    assert!(!processor.is_running());
    assert_eq!(
      processor.store().get(ids[0]).unwrap().status(),
      ItemStatus::Processing
    );
    assert_eq!(processor.store().pending_ids(), vec![ids[1]]);

    let report = processor.process_all().await.unwrap();
    assert_eq!(
      report,
      RunReport {
        total: 2,
        completed: 2,
        dropped: 0
      }
    );
    assert!(processor.store().get_all().iter().all(|i| i.is_complete()));
  }

  #[test]
  fn random_delay_stays_in_range() {
    let delay = RandomDelay::new(StdRng::seed_from_u64(11), BULK_DELAY_RANGE);
    for _ in 0..1000 {
      assert!(BULK_DELAY_RANGE.contains(&delay.next_delay()));
    }
  }
}
