// 该文件是 Signlens （识牌） 项目的一部分。
// src/input/v4l2_camera.rs - V4L2 摄像头
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

use image::RgbImage;
use tracing::{debug, info, warn};
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ImageRef,
  input::{Camera, CameraError, FacingMode, StreamConstraints},
};

/// V4L2 摄像头
pub struct V4l2Camera {
  device_path: String,
}

impl FromUrlWithScheme for V4l2Camera {
  const SCHEME: &'static str = "v4l2";
}

impl FromUrl for V4l2Camera {
  type Error = CameraError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(CameraError::Unavailable(format!(
        "期望方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Ok(Self::new(url.path()))
  }
}

impl V4l2Camera {
  pub fn new(device_path: impl Into<String>) -> Self {
    Self {
      device_path: device_path.into(),
    }
  }

  pub fn device_path(&self) -> &str {
    &self.device_path
  }
}

/// 一个已打开的 V4L2 捕获流
pub struct V4l2Stream {
  // 先于设备释放
  stream: Stream<'static>,
  _device: Device,
  width: u32,
  height: u32,
  frame_index: u64,
}

impl V4l2Stream {
  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn frames_captured(&self) -> u64 {
    self.frame_index
  }
}

fn open_error(path: &str, err: std::io::Error) -> CameraError {
  match err.kind() {
    std::io::ErrorKind::PermissionDenied => {
      CameraError::PermissionDenied(format!("{}: {}", path, err))
    }
    _ => CameraError::Unavailable(format!("{}: {}", path, err)),
  }
}

impl Camera for V4l2Camera {
  type Stream = V4l2Stream;

  fn acquire(&self, constraints: &StreamConstraints) -> Result<V4l2Stream, CameraError> {
    info!("打开摄像头: {}", self.device_path);
    if constraints.facing != FacingMode::Environment {
      debug!("V4L2 设备不区分朝向，忽略 {:?}", constraints.facing);
    }

    let device = Device::with_path(&self.device_path).map_err(|e| open_error(&self.device_path, e))?;

    let mut format = device
      .format()
      .map_err(|e| open_error(&self.device_path, e))?;
    format.width = constraints.width;
    format.height = constraints.height;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device
      .set_format(&format)
      .map_err(|e| open_error(&self.device_path, e))?;

    if format.fourcc != FourCC::new(b"YUYV") {
      return Err(CameraError::Unavailable(format!(
        "{} 不支持 YUYV 格式",
        self.device_path
      )));
    }

    let stream = Stream::with_buffers(&device, Type::VideoCapture, 4)
      .map_err(|e| open_error(&self.device_path, e))?;
    info!("摄像头已打开: {}x{}", format.width, format.height);

    Ok(V4l2Stream {
      stream,
      _device: device,
      width: format.width,
      height: format.height,
      frame_index: 0,
    })
  }

  fn capture(&self, stream: &mut V4l2Stream) -> Result<ImageRef, CameraError> {
    let (buffer, _meta) = stream
      .stream
      .next()
      .map_err(|e| CameraError::Capture(e.to_string()))?;
    let rgb = yuyv_to_rgb(buffer, stream.width, stream.height);
    let image = RgbImage::from_raw(stream.width, stream.height, rgb)
      .ok_or_else(|| CameraError::Capture("无法创建 RGB 图像".to_string()))?;

    stream.frame_index += 1;
    debug!("捕获第 {} 帧", stream.frame_index);
    ImageRef::encode_png(&image).map_err(|e| CameraError::Capture(e.to_string()))
  }

  fn release(&self, stream: V4l2Stream) {
    info!(
      "释放摄像头 {}，共捕获 {} 帧",
      self.device_path, stream.frame_index
    );
    if stream.frame_index == 0 {
      warn!("摄像头在释放前没有捕获任何帧");
    }
    drop(stream);
  }
}

/// 将 YUYV 格式转换为 RGB
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
  let mut rgb = Vec::with_capacity((width * height * 3) as usize);

  for chunk in yuyv.chunks_exact(4) {
    let y0 = chunk[0] as f32;
    let u = chunk[1] as f32 - 128.0;
    let y1 = chunk[2] as f32;
    let v = chunk[3] as f32 - 128.0;

    for y in [y0, y1] {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }
  }

  rgb
}
