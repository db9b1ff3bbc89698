// 该文件是 Signlens （识牌） 项目的一部分。
// src/frame.rs - 图像缓冲引用
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

use std::sync::Arc;

/// 图像字节的共享引用
///
/// 队列只持有这个引用，从不解码像素；克隆只增加引用计数。
#[derive(Clone, PartialEq, Eq)]
pub struct ImageRef {
  data: Arc<[u8]>,
  mime: Option<&'static str>,
}

impl ImageRef {
  pub fn new(data: impl Into<Arc<[u8]>>, mime: Option<&'static str>) -> Self {
    Self {
      data: data.into(),
      mime,
    }
  }

  /// 从原始字节创建，并尝试根据文件头识别格式
  pub fn from_bytes(data: Vec<u8>) -> Self {
    let mime = sniff_mime(&data);
    Self::new(data, mime)
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// 识别出的 MIME 类型，例如 `image/png`
  pub fn mime(&self) -> Option<&'static str> {
    self.mime
  }

  pub fn is_image(&self) -> bool {
    self.mime.is_some_and(|m| m.starts_with("image/"))
  }

  /// 将 RGB 图像编码为 PNG
  #[cfg(feature = "image")]
  pub fn encode_png(image: &image::RgbImage) -> Result<Self, image::ImageError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(Self::new(
      buffer.into_inner(),
      Some(image::ImageFormat::Png.to_mime_type()),
    ))
  }
}

impl std::fmt::Debug for ImageRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ImageRef")
      .field("len", &self.data.len())
      .field("mime", &self.mime)
      .finish()
  }
}

#[cfg(feature = "image")]
fn sniff_mime(data: &[u8]) -> Option<&'static str> {
  image::guess_format(data).ok().map(|f| f.to_mime_type())
}

#[cfg(not(feature = "image"))]
fn sniff_mime(_data: &[u8]) -> Option<&'static str> {
  None
}
