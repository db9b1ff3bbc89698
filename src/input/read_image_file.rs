// 该文件是 Signlens （识牌） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::ImageRef, input::IntakeFile};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("Invalid path encoding: {0}")]
  PathEncoding(String),
  #[error("I/O error on {0}: {1}")]
  IoError(PathBuf, std::io::Error),
  #[error("Not an image file: {0}")]
  NotAnImage(PathBuf),
}

/// 图像文件输入
///
/// 地址指向单个文件时读取该文件；指向目录时按路径字典序读取目录下的全部文件
/// （不递归）。
#[derive(Debug)]
pub struct ImageFileInput {
  paths: Vec<PathBuf>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| ImageFileInputError::PathEncoding(e.to_string()))?;
    Self::open(Path::new(path.as_ref()))
  }
}

impl ImageFileInput {
  pub fn open(path: &Path) -> Result<Self, ImageFileInputError> {
    let io_error = |e| ImageFileInputError::IoError(path.to_path_buf(), e);

    if !path.is_dir() {
      // 文件不存在的错误留到读取时逐个报告
      return Ok(Self {
        paths: vec![path.to_path_buf()],
      });
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_error)? {
      let entry = entry.map_err(io_error)?;
      if entry.file_type().map_err(io_error)?.is_file() {
        paths.push(entry.path());
      }
    }
    paths.sort();
    debug!("目录 {} 下共 {} 个文件", path.display(), paths.len());
    Ok(Self { paths })
  }

  pub fn paths(&self) -> &[PathBuf] {
    &self.paths
  }
}

impl IntoIterator for ImageFileInput {
  type Item = Result<IntakeFile, ImageFileInputError>;
  type IntoIter = ImageFileInputIter;

  fn into_iter(self) -> Self::IntoIter {
    ImageFileInputIter {
      paths: self.paths.into_iter(),
    }
  }
}

pub struct ImageFileInputIter {
  paths: std::vec::IntoIter<PathBuf>,
}

impl Iterator for ImageFileInputIter {
  type Item = Result<IntakeFile, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.paths.next().map(|path| read_image_file(&path))
  }
}

fn read_image_file(path: &Path) -> Result<IntakeFile, ImageFileInputError> {
  let data =
    std::fs::read(path).map_err(|e| ImageFileInputError::IoError(path.to_path_buf(), e))?;
  let image = ImageRef::from_bytes(data);
  if !image.is_image() {
    return Err(ImageFileInputError::NotAnImage(path.to_path_buf()));
  }

  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string());
  debug!("读取图像文件: {} ({} 字节)", name, image.len());
  Ok(IntakeFile::new(name, image))
}
