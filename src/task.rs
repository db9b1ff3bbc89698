// 该文件是 Signlens （识牌） 项目的一部分。
// src/task.rs - 命令行任务
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
use std::fmt::Display;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::{thread, time::Duration};

use anyhow::anyhow;
use rand::Rng;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::{
  demo::{DemoMode, DemoSession},
  frame::ImageRef,
  input::{Camera, IntakeFile, StreamConstraints},
  intake,
  model::{Model, RandomRecognizer, RecognitionResult},
  output::{Finish, Render},
  processor::{DelayPolicy, RandomDelay, SequentialProcessor},
  queue::{QueueItem, QueueStore},
  simulation::{Detection, FRAME_INTERVAL, ScriptedSign, Simulation},
  summary::Summary,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    model: M,
    output: O,
  ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// 安装 Ctrl-C 处理函数，返回中断信号的接收端
///
/// 只能调用一次。收到信号 30 秒后仍未退出则强制结束进程。
pub fn interrupt_signal() -> Result<Receiver<()>, ctrlc::Error> {
  let (tx, rx) = mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;
  Ok(rx)
}

fn interrupted(interrupt: &Option<Receiver<()>>) -> bool {
  interrupt.as_ref().is_some_and(|rx| rx.try_recv().is_ok())
}

/// 批量识别：入队、顺序处理，最后输出每项结果与统计
pub struct BulkTask<D = RandomDelay> {
  delay: D,
}

impl BulkTask {
  pub fn new() -> Self {
    Self::with_delay(RandomDelay::standard())
  }
}

impl Default for BulkTask {
  fn default() -> Self {
    Self::new()
  }
}

impl<D> BulkTask<D> {
  pub fn with_delay(delay: D) -> Self {
    Self { delay }
  }
}

impl<
  E: Display,
  D: DelayPolicy,
  RE: std::error::Error + Sync + Send + 'static,
  FE: std::error::Error + Sync + Send + 'static,
  I: IntoIterator<Item = Result<IntakeFile, E>>,
  M: Model<Input = ImageRef, Output = RecognitionResult, Error = Infallible>,
  O: Render<QueueItem, RecognitionResult, Error = RE> + Finish<Error = FE>,
> Task<I, M, O> for BulkTask<D>
{
  type Error = anyhow::Error;

  async fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始批量任务...");
    let store = Arc::new(QueueStore::new());
    if intake::enqueue(&store, input).is_empty() {
      return Err(anyhow!("没有可处理的图像"));
    }

    let processor = SequentialProcessor::new(store.clone(), model, self.delay);
    let now = std::time::Instant::now();
    let report = processor
      .process_all()
      .await
      .ok_or_else(|| anyhow!("没有待处理项"))?;
    info!(
      "处理完成 {}/{}，耗时: {:.2?}",
      report.completed,
      report.total,
      now.elapsed()
    );

    for item in store.get_all() {
      if let Some(result) = item.result() {
        output.render_result(&item, result)?;
      }
    }
    output.finish(Some(&Summary::from_store(&store)))?;

    info!("任务完成，退出");
    Ok(())
  }
}

/// 以摄像头模式运行演示会话，持续截帧识别，直到达到指定帧数或收到中断信号
#[derive(Default, Debug)]
pub struct CameraTask {
  frame_number: Option<usize>,
  constraints: StreamConstraints,
  interrupt: Option<Receiver<()>>,
}

impl CameraTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_constraints(mut self, constraints: StreamConstraints) -> Self {
    self.constraints = constraints;
    self
  }

  pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }
}

impl<
  C: Camera,
  RE: std::error::Error + Sync + Send + 'static,
  FE: std::error::Error + Sync + Send + 'static,
  M: Model<Input = ImageRef, Output = RecognitionResult, Error = Infallible>,
  O: Render<IntakeFile, RecognitionResult, Error = RE> + Finish<Error = FE>,
> Task<C, M, O> for CameraTask
{
  type Error = anyhow::Error;

  async fn run_task(self, input: C, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始摄像头任务...");
    let mut session = DemoSession::new(input, model).with_constraints(self.constraints);
    session.set_mode(DemoMode::Camera);
    session.start_camera()?;

    let outcome: anyhow::Result<usize> = async {
      let mut frame_index = 0;
      loop {
        let now = std::time::Instant::now();
        let (image, result) = session.capture_frame().await?;
        frame_index += 1;
        let frame = IntakeFile::new(format!("frame-{:04}", frame_index), image);
        output.render_result(&frame, &result)?;
        info!("第 {} 帧处理完成，耗时: {:.2?}", frame_index, now.elapsed());

        if self.frame_number.is_some_and(|n| frame_index >= n) {
          info!("达到指定帧数 {}, 退出任务循环", frame_index);
          break;
        }
        if interrupted(&self.interrupt) {
          warn!("中断信号接收，退出任务循环");
          break;
        }
      }
      Ok(frame_index)
    }
    .await;
    session.stop_camera();

    let frames = outcome?;
    output.finish(None)?;
    info!("任务完成，共处理 {} 帧", frames);
    Ok(())
  }
}

/// 按固定帧间隔推进驾驶模拟，输出每一次检测
#[derive(Debug)]
pub struct SimulationTask {
  frame_number: Option<u64>,
  night: bool,
  interrupt: Option<Receiver<()>>,
}

impl Default for SimulationTask {
  fn default() -> Self {
    Self {
      frame_number: None,
      night: true,
      interrupt: None,
    }
  }
}

impl SimulationTask {
  pub fn with_frame_number(mut self, frame_number: Option<u64>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_night_mode(mut self, night: bool) -> Self {
    self.night = night;
    self
  }

  pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }
}

impl<
  R: Rng,
  RE: std::error::Error + Sync + Send + 'static,
  FE: std::error::Error + Sync + Send + 'static,
  O: Render<u64, Detection, Error = RE> + Finish<Error = FE>,
> Task<Vec<ScriptedSign>, RandomRecognizer<R>, O> for SimulationTask
{
  type Error = anyhow::Error;

  async fn run_task(
    self,
    input: Vec<ScriptedSign>,
    model: RandomRecognizer<R>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始驾驶模拟，共 {} 个标志", input.len());
    let mut simulation = Simulation::with_track(input, model);
    if simulation.is_night() != self.night {
      simulation.toggle_night_mode();
    }

    let mut interval = tokio::time::interval(FRAME_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut detections = 0usize;
    loop {
      interval.tick().await;
      for detection in simulation.tick() {
        output.render_result(&simulation.frame(), &detection)?;
        detections += 1;
      }

      if self.frame_number.is_some_and(|n| simulation.frame() >= n) {
        info!("达到指定帧数 {}, 退出模拟", simulation.frame());
        break;
      }
      if interrupted(&self.interrupt) {
        warn!("中断信号接收，退出模拟");
        break;
      }
    }

    output.finish(None)?;
    info!(
      "模拟结束: {} 帧，{} 次检测",
      simulation.frame(),
      detections
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Mutex, PoisonError};

  use super::*;
  use crate::{
    demo::{CAPTURE_ANALYSIS_DELAY, DemoError},
    input::CameraError,
    output::{ReportRow, ToReportRow},
    processor::FixedDelay,
    simulation::DEFAULT_TRACK,
  };

  #[derive(Default)]
  struct Collect {
    rows: Mutex<Vec<ReportRow>>,
    summary: Mutex<Option<Summary>>,
  }

  impl<F: ToReportRow<O>, O> Render<F, O> for &Collect {
    type Error = Infallible;

    fn render_result(&self, frame: &F, result: &O) -> Result<(), Self::Error> {
      self
        .rows
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(frame.to_report_row(result));
      Ok(())
    }
  }

  impl Finish for &Collect {
    type Error = Infallible;

    fn finish(&self, summary: Option<&Summary>) -> Result<(), Self::Error> {
      *self.summary.lock().unwrap() = summary.copied();
      Ok(())
    }
  }

  fn file(name: &str) -> Result<IntakeFile, String> {
    Ok(IntakeFile::new(name, ImageRef::new(vec![7u8], None)))
  }

  #[tokio::test(start_paused = true)]
  async fn bulk_task_renders_every_item_and_summary() {
    let output = Collect::default();
    BulkTask::with_delay(FixedDelay(Duration::from_millis(500)))
      .run_task(
        vec![file("a.png"), Err("broken".to_string()), file("b.png")],
        RandomRecognizer::seeded(3),
        &output,
      )
      .await
      .unwrap();

    let rows = output.rows.lock().unwrap();
    let sources: Vec<_> = rows.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["a.png", "b.png"]);

    let summary = output.summary.lock().unwrap().unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.completed_count, 2);
    let mean = rows.iter().map(|r| r.confidence).sum::<f64>() / 2.0;
    assert!((summary.average_confidence - mean).abs() < 1e-9);
  }

  #[tokio::test(start_paused = true)]
  async fn bulk_task_without_images_fails() {
    let output = Collect::default();
    let result = BulkTask::with_delay(FixedDelay(Duration::ZERO))
      .run_task(
        vec![Err::<IntakeFile, _>("broken".to_string())],
        RandomRecognizer::seeded(3),
        &output,
      )
      .await;
    assert!(result.is_err());
    assert!(output.summary.lock().unwrap().is_none());
  }

  #[derive(Default)]
  struct CountingCamera {
    deny: bool,
    released: AtomicUsize,
  }

  impl Camera for &CountingCamera {
    type Stream = u32;

    fn acquire(&self, _constraints: &StreamConstraints) -> Result<u32, CameraError> {
      if self.deny {
        return Err(CameraError::PermissionDenied("denied".into()));
      }
      Ok(0)
    }

    fn capture(&self, stream: &mut u32) -> Result<ImageRef, CameraError> {
      *stream += 1;
      Ok(ImageRef::new(vec![*stream as u8], None))
    }

    fn release(&self, _stream: u32) {
      self.released.fetch_add(1, Ordering::SeqCst);
    }
  }

  #[tokio::test(start_paused = true)]
  async fn camera_task_stops_at_frame_number_and_releases() {
    let camera = CountingCamera::default();
    let output = Collect::default();
    let start = tokio::time::Instant::now();
    CameraTask::default()
      .with_frame_number(Some(3))
      .run_task(&camera, RandomRecognizer::seeded(5), &output)
      .await
      .unwrap();
    assert!(start.elapsed() >= CAPTURE_ANALYSIS_DELAY * 3);

    let rows = output.rows.lock().unwrap();
    let sources: Vec<_> = rows.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["frame-0001", "frame-0002", "frame-0003"]);
    assert_eq!(camera.released.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn camera_task_reports_permission_denial() {
    let camera = CountingCamera {
      deny: true,
      ..Default::default()
    };
    let output = Collect::default();
    let err = CameraTask::default()
      .with_frame_number(Some(1))
      .run_task(&camera, RandomRecognizer::seeded(5), &output)
      .await
      .unwrap_err();

    assert!(matches!(
      err.downcast_ref::<DemoError>(),
      Some(DemoError::Camera(CameraError::PermissionDenied(_)))
    ));
    assert!(output.rows.lock().unwrap().is_empty());
    assert_eq!(camera.released.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn simulation_task_reports_detections_by_frame() {
    let output = Collect::default();
    SimulationTask::default()
      .with_frame_number(Some(2))
      .with_night_mode(false)
      .run_task(DEFAULT_TRACK.to_vec(), RandomRecognizer::seeded(6), &output)
      .await
      .unwrap();

    let rows = output.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source, "frame-1");
    assert_eq!(rows[0].label, "No Entry");
    assert_eq!(rows[0].class_id, Some(17));
  }
}
