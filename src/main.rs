// 该文件是 Signlens （识牌） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;

use args::{Args, BulkArgs, CameraArgs, Command, GalleryArgs, SimulateArgs};
use signlens::{
  FromUrl,
  gallery::SignGallery,
  input,
  model::RandomRecognizer,
  output::OutputWrapper,
  simulation::DEFAULT_TRACK,
  task::{BulkTask, SimulationTask, Task, interrupt_signal},
};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  match Args::parse().command {
    Command::Bulk(args) => bulk(args).await,
    Command::Camera(args) => camera(args).await,
    Command::Gallery(args) => gallery(args).await,
    Command::Simulate(args) => simulate(args).await,
  }
}

fn recognizer(seed: Option<u64>) -> RandomRecognizer {
  match seed {
    Some(seed) => RandomRecognizer::seeded(seed),
    None => RandomRecognizer::from_entropy(),
  }
}

async fn bulk(args: BulkArgs) -> Result<()> {
  for source in &args.input {
    info!("输入来源: {}", source);
  }
  info!("输出路径: {}", args.output);

  let files = input::open_files(&args.input);
  let output = OutputWrapper::from_url(&args.output)?;
  BulkTask::new()
    .run_task(files, recognizer(args.seed), output)
    .await
}

#[cfg(feature = "v4l2_camera")]
async fn camera(args: CameraArgs) -> Result<()> {
  use signlens::{input::StreamConstraints, task::CameraTask};

  info!("摄像头设备: {}", args.device);
  info!("输出路径: {}", args.output);

  let camera = input::V4l2Camera::from_url(&args.device)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let constraints = StreamConstraints {
    width: args.width,
    height: args.height,
    ..Default::default()
  };
  CameraTask::default()
    .with_frame_number((args.frames > 0).then_some(args.frames))
    .with_constraints(constraints)
    .with_interrupt(interrupt_signal()?)
    .run_task(camera, recognizer(args.seed), output)
    .await
}

#[cfg(not(feature = "v4l2_camera"))]
async fn camera(args: CameraArgs) -> Result<()> {
  Err(anyhow!(
    "未启用 v4l2_camera 特性，无法打开 {}",
    args.device
  ))
}

async fn gallery(args: GalleryArgs) -> Result<()> {
  let mut gallery = SignGallery::new(recognizer(args.seed));
  gallery.set_category(args.category);
  if let Some(query) = args.query {
    gallery.set_query(query);
  }

  let visible = gallery.visible();
  info!("共 {} 个标志", visible.len());
  for sign in visible {
    info!(
      "{:>2} {} {} [{}]",
      sign.class_id, sign.symbol, sign.name, sign.category
    );
  }

  if let Some(class_id) = args.analyze {
    let analysis = gallery
      .analyze(class_id)
      .await
      .ok_or_else(|| anyhow!("未知的标志编号: {}", class_id))?;
    info!(
      "{} -> {} {:.1}%: {}",
      analysis.sign.name,
      analysis.result.label(),
      analysis.result.confidence,
      analysis.result.description()
    );
  }
  Ok(())
}

async fn simulate(args: SimulateArgs) -> Result<()> {
  info!("输出路径: {}", args.output);

  let output = OutputWrapper::from_url(&args.output)?;
  SimulationTask::default()
    .with_frame_number((args.frames > 0).then_some(args.frames))
    .with_night_mode(!args.day)
    .with_interrupt(interrupt_signal()?)
    .run_task(DEFAULT_TRACK.to_vec(), recognizer(args.seed), output)
    .await
}
