// 该文件是 Signlens （识牌） 项目的一部分。
// src/input.rs - 图像文件与摄像头输入
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
use url::Url;

use crate::frame::ImageRef;
#[cfg(feature = "read_image_file")]
use crate::{FromUrl, FromUrlWithScheme};

/// 读入内存、等待入队的一个文件
#[derive(Debug, Clone)]
pub struct IntakeFile {
  /// 原始文件名，仅用于展示
  pub name: String,
  pub image: ImageRef,
}

impl IntakeFile {
  pub fn new(name: impl Into<String>, image: ImageRef) -> Self {
    Self {
      name: name.into(),
      image,
    }
  }
}

mod camera;
pub use self::camera::{Camera, CameraError, FacingMode, StreamConstraints};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError, ImageFileInputIter};

#[cfg(feature = "v4l2_camera")]
mod v4l2_camera;
#[cfg(feature = "v4l2_camera")]
pub use self::v4l2_camera::{V4l2Camera, V4l2Stream};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("Camera error: {0}")]
  CameraError(#[from] CameraError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
}

/// 把一组输入地址展开为逐个文件的读取结果
///
/// 某个地址无法打开时只产生一条错误，其余地址照常读取。
pub fn open_files(urls: &[Url]) -> Vec<Result<IntakeFile, InputError>> {
  let mut files = Vec::new();
  for url in urls {
    match url.scheme() {
      #[cfg(feature = "read_image_file")]
      scheme if scheme == ImageFileInput::SCHEME => {
        match ImageFileInput::from_url(url) {
          Ok(input) => files.extend(input.into_iter().map(|r| r.map_err(InputError::from))),
          Err(e) => files.push(Err(e.into())),
        }
      }
      scheme => files.push(Err(InputError::SchemeMismatch(scheme.to_string()))),
    }
  }
  files
}
