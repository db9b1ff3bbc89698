// 该文件是 Signlens （识牌） 项目的一部分。
// src/demo.rs - 单张图像识别演示
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
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::{
  frame::ImageRef,
  input::{Camera, CameraError, IntakeFile, StreamConstraints},
  model::{Model, RecognitionResult},
};

pub const UPLOAD_ANALYSIS_DELAY: Duration = Duration::from_millis(1000);
pub const CAPTURE_ANALYSIS_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemoMode {
  #[default]
  Upload,
  Camera,
}

#[derive(Error, Debug)]
pub enum DemoError {
  #[error(transparent)]
  Camera(#[from] CameraError),
  #[error("摄像头未启动")]
  NotStreaming,
  #[error("当前模式 {0:?} 不支持该操作")]
  WrongMode(DemoMode),
}

/// 单张图像演示会话
///
/// 上传模式下每次上传替换之前的图像与结果；摄像头模式下先启动摄像头再截帧分析。
/// 只要持有视频流，停止、重置、切换到上传模式以及会话销毁都会释放它。
pub struct DemoSession<C: Camera, M> {
  camera: C,
  model: M,
  constraints: StreamConstraints,
  mode: DemoMode,
  stream: Option<C::Stream>,
  uploaded: Option<IntakeFile>,
  captured: Option<ImageRef>,
  result: Option<RecognitionResult>,
}

impl<C, M> DemoSession<C, M>
where
  C: Camera,
  M: Model<Input = ImageRef, Output = RecognitionResult, Error = Infallible>,
{
  pub fn new(camera: C, model: M) -> Self {
    Self {
      camera,
      model,
      constraints: StreamConstraints::default(),
      mode: DemoMode::default(),
      stream: None,
      uploaded: None,
      captured: None,
      result: None,
    }
  }

  pub fn with_constraints(mut self, constraints: StreamConstraints) -> Self {
    self.constraints = constraints;
    self
  }

  pub fn mode(&self) -> DemoMode {
    self.mode
  }

  pub fn is_streaming(&self) -> bool {
    self.stream.is_some()
  }

  pub fn uploaded(&self) -> Option<&IntakeFile> {
    self.uploaded.as_ref()
  }

  pub fn captured(&self) -> Option<&ImageRef> {
    self.captured.as_ref()
  }

  pub fn result(&self) -> Option<&RecognitionResult> {
    self.result.as_ref()
  }

  fn analyze(&self, image: &ImageRef) -> RecognitionResult {
    self.model.infer(image).unwrap_or_else(|never| match never {})
  }

  /// 切换模式：切到上传模式会停止摄像头，切到摄像头模式会清除已上传的图像和结果
  pub fn set_mode(&mut self, mode: DemoMode) {
    match mode {
      DemoMode::Upload => self.stop_camera(),
      DemoMode::Camera => {
        self.uploaded = None;
        self.result = None;
      }
    }
    self.mode = mode;
  }

  pub async fn upload(&mut self, file: IntakeFile) -> Result<RecognitionResult, DemoError> {
    if self.mode != DemoMode::Upload {
      return Err(DemoError::WrongMode(self.mode));
    }
    info!("分析上传的图像: {}", file.name);
    self.result = None;
    let image = file.image.clone();
    self.uploaded = Some(file);

    tokio::time::sleep(UPLOAD_ANALYSIS_DELAY).await;
    let result = self.analyze(&image);
    self.result = Some(result.clone());
    Ok(result)
  }

  /// 启动摄像头；已启动时什么都不做
  pub fn start_camera(&mut self) -> Result<(), DemoError> {
    if self.mode != DemoMode::Camera {
      return Err(DemoError::WrongMode(self.mode));
    }
    if self.stream.is_some() {
      return Ok(());
    }
    match self.camera.acquire(&self.constraints) {
      Ok(stream) => {
        self.stream = Some(stream);
        Ok(())
      }
      Err(e) => {
        warn!("无法启动摄像头: {}", e);
        Err(e.into())
      }
    }
  }

  /// 停止摄像头并清除结果，可重复调用
  pub fn stop_camera(&mut self) {
    if let Some(stream) = self.stream.take() {
      self.camera.release(stream);
    }
    self.captured = None;
    self.result = None;
  }

  pub async fn capture(&mut self) -> Result<RecognitionResult, DemoError> {
    self.capture_frame().await.map(|(_, result)| result)
  }

  /// 截帧并分析，同时返回截取的图像
  pub async fn capture_frame(&mut self) -> Result<(ImageRef, RecognitionResult), DemoError> {
    let stream = self.stream.as_mut().ok_or(DemoError::NotStreaming)?;
    let image = self.camera.capture(stream)?;
    info!("截取一帧进行分析 ({} 字节)", image.len());
    self.captured = Some(image.clone());

    tokio::time::sleep(CAPTURE_ANALYSIS_DELAY).await;
    let result = self.analyze(&image);
    self.result = Some(result.clone());
    Ok((image, result))
  }

  pub fn reset(&mut self) {
    self.uploaded = None;
    self.stop_camera();
  }
}

impl<C: Camera, M> Drop for DemoSession<C, M> {
  fn drop(&mut self) {
    if let Some(stream) = self.stream.take() {
      self.camera.release(stream);
    }
  }
}
