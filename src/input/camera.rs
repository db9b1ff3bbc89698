// 该文件是 Signlens （识牌） 项目的一部分。
// src/input/camera.rs - 摄像头能力定义
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

use thiserror::Error;

use crate::frame::ImageRef;

#[derive(Error, Debug)]
pub enum CameraError {
  #[error("摄像头权限被拒绝: {0}")]
  PermissionDenied(String),
  #[error("摄像头不可用: {0}")]
  Unavailable(String),
  #[error("无法捕获帧: {0}")]
  Capture(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
  User,
  #[default]
  Environment,
}

/// 打开视频流时的约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
  pub facing: FacingMode,
  pub width: u32,
  pub height: u32,
}

impl Default for StreamConstraints {
  fn default() -> Self {
    Self {
      facing: FacingMode::Environment,
      width: 640,
      height: 480,
    }
  }
}

/// 摄像头能力
///
/// `acquire` 在权限被拒绝时必须返回 [`CameraError::PermissionDenied`]，
/// 不能静默地什么都不返回。`release` 拿走流的所有权，同一个流不会被释放两次。
pub trait Camera {
  type Stream;

  fn acquire(&self, constraints: &StreamConstraints) -> Result<Self::Stream, CameraError>;

  /// 从活动流中截取一帧静态图像
  fn capture(&self, stream: &mut Self::Stream) -> Result<ImageRef, CameraError>;

  fn release(&self, stream: Self::Stream);
}
