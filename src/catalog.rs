// 该文件是 Signlens （识牌） 项目的一部分。
// src/catalog.rs - 交通标志目录
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

use std::fmt;

use serde::Serialize;

/// 标志类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SignCategory {
  SpeedLimit,
  Prohibitory,
  Warning,
  Mandatory,
  Priority,
  Other,
}

impl SignCategory {
  pub const ALL: [SignCategory; 6] = [
    SignCategory::SpeedLimit,
    SignCategory::Prohibitory,
    SignCategory::Warning,
    SignCategory::Mandatory,
    SignCategory::Priority,
    SignCategory::Other,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      SignCategory::SpeedLimit => "Speed Limit",
      SignCategory::Prohibitory => "Prohibitory",
      SignCategory::Warning => "Warning",
      SignCategory::Mandatory => "Mandatory",
      SignCategory::Priority => "Priority",
      SignCategory::Other => "Other",
    }
  }

  /// 按显示名称解析（忽略大小写，`-`/`_` 视作空格）
  pub fn parse(name: &str) -> Option<Self> {
    let normalized = name.trim().replace(['-', '_'], " ").to_lowercase();
    Self::ALL
      .into_iter()
      .find(|c| c.as_str().to_lowercase() == normalized)
  }
}

impl fmt::Display for SignCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 识别目录中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInfo {
  pub key: &'static str,
  pub name: &'static str,
  pub category: SignCategory,
  pub description: &'static str,
}

const fn sign(
  key: &'static str,
  name: &'static str,
  category: SignCategory,
  description: &'static str,
) -> SignInfo {
  SignInfo {
    key,
    name,
    category,
    description,
  }
}

static RECOGNITION_CATALOG: [SignInfo; 12] = [
  sign("speed_20", "Speed Limit 20", SignCategory::Prohibitory, "Maximum speed limit of 20 km/h"),
  sign("speed_30", "Speed Limit 30", SignCategory::Prohibitory, "Maximum speed limit of 30 km/h"),
  sign("speed_50", "Speed Limit 50", SignCategory::Prohibitory, "Maximum speed limit of 50 km/h"),
  sign("speed_60", "Speed Limit 60", SignCategory::Prohibitory, "Maximum speed limit of 60 km/h"),
  sign("speed_70", "Speed Limit 70", SignCategory::Prohibitory, "Maximum speed limit of 70 km/h"),
  sign("speed_80", "Speed Limit 80", SignCategory::Prohibitory, "Maximum speed limit of 80 km/h"),
  sign("stop", "Stop Sign", SignCategory::Prohibitory, "Complete stop required"),
  sign("yield", "Yield Sign", SignCategory::Priority, "Give way to other traffic"),
  sign("no_entry", "No Entry", SignCategory::Prohibitory, "Entry not permitted"),
  sign("turn_right", "Turn Right Ahead", SignCategory::Mandatory, "Right turn mandatory ahead"),
  sign("warning", "General Warning", SignCategory::Warning, "Caution - hazard ahead"),
  sign("pedestrian", "Pedestrian Crossing", SignCategory::Warning, "Watch for pedestrians"),
];

/// 识别桩可以给出的全部结果
pub fn recognition_catalog() -> &'static [SignInfo] {
  &RECOGNITION_CATALOG
}

pub fn find_sign(name: &str) -> Option<&'static SignInfo> {
  RECOGNITION_CATALOG
    .iter()
    .find(|s| s.name.eq_ignore_ascii_case(name) || s.key == name)
}

/// GTSRB 数据集中的一个类别
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GtsrbSign {
  pub class_id: u8,
  pub name: &'static str,
  pub category: SignCategory,
  pub symbol: &'static str,
}

const fn gtsrb(
  class_id: u8,
  name: &'static str,
  category: SignCategory,
  symbol: &'static str,
) -> GtsrbSign {
  GtsrbSign {
    class_id,
    name,
    category,
    symbol,
  }
}

use SignCategory::{
  Mandatory as MAN, Other as OTH, Priority as PRI, Prohibitory as PRO, SpeedLimit as SPD,
  Warning as WRN,
};

static GTSRB_SIGNS: [GtsrbSign; 43] = [
  gtsrb(0, "Speed Limit 20", SPD, "20"),
  gtsrb(1, "Speed Limit 30", SPD, "30"),
  gtsrb(2, "Speed Limit 50", SPD, "50"),
  gtsrb(3, "Speed Limit 60", SPD, "60"),
  gtsrb(4, "Speed Limit 70", SPD, "70"),
  gtsrb(5, "Speed Limit 80", SPD, "80"),
  gtsrb(6, "End of 80 Limit", SPD, "80̶"),
  gtsrb(7, "Speed Limit 100", SPD, "100"),
  gtsrb(8, "Speed Limit 120", SPD, "120"),
  gtsrb(9, "No Passing", PRO, "⊘"),
  gtsrb(10, "No Passing >3.5t", PRO, "🚛⊘"),
  gtsrb(11, "Priority Road", PRI, "◇"),
  gtsrb(12, "Yield", PRI, "△"),
  gtsrb(13, "Stop", PRI, "STOP"),
  gtsrb(14, "No Vehicles", PRO, "⊘"),
  gtsrb(15, "No Trucks", PRO, "🚛"),
  gtsrb(16, "No Entry", PRO, "⊝"),
  gtsrb(17, "General Caution", WRN, "!"),
  gtsrb(18, "Left Curve", WRN, "↰"),
  gtsrb(19, "Right Curve", WRN, "↱"),
  gtsrb(20, "Double Curve", WRN, "⤭"),
  gtsrb(21, "Bumpy Road", WRN, "⏦"),
  gtsrb(22, "Slippery Road", WRN, "⌇"),
  gtsrb(23, "Road Narrows Right", WRN, "⊳"),
  gtsrb(24, "Road Work", WRN, "🔧"),
  gtsrb(25, "Traffic Signals", WRN, "🚦"),
  gtsrb(26, "Pedestrians", WRN, "🚶"),
  gtsrb(27, "Children Crossing", WRN, "👧"),
  gtsrb(28, "Bicycles Crossing", WRN, "🚲"),
  gtsrb(29, "Ice/Snow", WRN, "❄"),
  gtsrb(30, "Wild Animals", WRN, "🦌"),
  gtsrb(31, "End All Limits", OTH, "⊘̶"),
  gtsrb(32, "Turn Right Ahead", MAN, "→"),
  gtsrb(33, "Turn Left Ahead", MAN, "←"),
  gtsrb(34, "Ahead Only", MAN, "↑"),
  gtsrb(35, "Go Straight or Right", MAN, "↗"),
  gtsrb(36, "Go Straight or Left", MAN, "↖"),
  gtsrb(37, "Keep Right", MAN, "⇨"),
  gtsrb(38, "Keep Left", MAN, "⇦"),
  gtsrb(39, "Roundabout", MAN, "↻"),
  gtsrb(40, "End No Passing", OTH, "⊘̶"),
  gtsrb(41, "End No Passing >3.5t", OTH, "🚛̶"),
  gtsrb(42, "Priority for Oncoming", PRI, "⇅"),
];

/// 图库展示的全部 43 个 GTSRB 类别，按类别编号排序
pub fn gtsrb_signs() -> &'static [GtsrbSign] {
  &GTSRB_SIGNS
}

pub fn gtsrb_sign(class_id: u8) -> Option<&'static GtsrbSign> {
  GTSRB_SIGNS.get(class_id as usize)
}

/// 图库筛选条件：类别（`None` 表示全部）与名称搜索
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryFilter {
  pub category: Option<SignCategory>,
  pub query: String,
}

impl GalleryFilter {
  pub fn matches(&self, sign: &GtsrbSign) -> bool {
    let category_ok = self.category.is_none_or(|c| c == sign.category);
    let query = self.query.to_lowercase();
    category_ok && sign.name.to_lowercase().contains(&query)
  }

  pub fn apply(&self) -> Vec<&'static GtsrbSign> {
    GTSRB_SIGNS.iter().filter(|s| self.matches(s)).collect()
  }
}
