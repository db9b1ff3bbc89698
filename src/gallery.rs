// 该文件是 Signlens （识牌） 项目的一部分。
// src/gallery.rs - 标志图库
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

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
  catalog::{GalleryFilter, GtsrbSign, SignCategory, gtsrb_sign},
  model::{RandomRecognizer, RecognitionResult},
};

pub const GALLERY_ANALYSIS_DELAY: Duration = Duration::from_millis(800);

/// 点击图库中某个标志后的分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryAnalysis {
  pub sign: &'static GtsrbSign,
  pub result: RecognitionResult,
}

pub struct SignGallery<R> {
  filter: GalleryFilter,
  selected: Option<u8>,
  recognizer: RandomRecognizer<R>,
}

impl<R: Rng> SignGallery<R> {
  pub fn new(recognizer: RandomRecognizer<R>) -> Self {
    Self {
      filter: GalleryFilter::default(),
      selected: None,
      recognizer,
    }
  }

  pub fn filter(&self) -> &GalleryFilter {
    &self.filter
  }

  /// 当前筛选条件下可见的标志
  pub fn visible(&self) -> Vec<&'static GtsrbSign> {
    self.filter.apply()
  }

  /// `None` 表示全部类别
  pub fn set_category(&mut self, category: Option<SignCategory>) {
    self.filter.category = category;
  }

  pub fn set_query(&mut self, query: impl Into<String>) {
    self.filter.query = query.into();
  }

  pub fn clear_query(&mut self) {
    self.filter.query.clear();
  }

  pub fn selected(&self) -> Option<&'static GtsrbSign> {
    self.selected.and_then(gtsrb_sign)
  }

  /// 分析被点击的标志；未知类别编号返回 `None`
  pub async fn analyze(&mut self, class_id: u8) -> Option<GalleryAnalysis> {
    let Some(sign) = gtsrb_sign(class_id) else {
      debug!("未知的 GTSRB 类别: {}", class_id);
      return None;
    };
    self.selected = Some(class_id);
    info!("分析图库标志 {} ({})", sign.name, sign.class_id);

    tokio::time::sleep(GALLERY_ANALYSIS_DELAY).await;
    Some(GalleryAnalysis {
      sign,
      result: self.recognizer.classify(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filter_updates_visible_signs() {
    let mut gallery = SignGallery::new(RandomRecognizer::seeded(0));
    assert_eq!(gallery.visible().len(), 43);

    gallery.set_category(Some(SignCategory::Other));
    assert_eq!(gallery.visible().len(), 3);

    gallery.set_query("passing");
    let ids: Vec<_> = gallery.visible().iter().map(|s| s.class_id).collect();
    assert_eq!(ids, vec![40, 41]);

    gallery.clear_query();
    gallery.set_category(None);
    assert_eq!(gallery.visible().len(), 43);
  }

  #[tokio::test(start_paused = true)]
  async fn analyze_selects_the_clicked_sign() {
    let mut gallery = SignGallery::new(RandomRecognizer::seeded(0));
    let start = tokio::time::Instant::now();
    let analysis = gallery.analyze(13).await.unwrap();
    assert!(start.elapsed() >= GALLERY_ANALYSIS_DELAY);
    assert_eq!(analysis.sign.name, "Stop");
    assert!((85.0..99.0).contains(&analysis.result.confidence));
    assert_eq!(gallery.selected().map(|s| s.class_id), Some(13));

    assert!(gallery.analyze(43).await.is_none());
    assert_eq!(gallery.selected().map(|s| s.class_id), Some(13));
  }
}
