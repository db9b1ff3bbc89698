// 该文件是 Signlens （识牌） 项目的一部分。
// src/simulation.rs - 驾驶模拟中的标志检测
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

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::model::RandomRecognizer;

/// 每帧标志向镜头移动的距离
pub const SIGN_SPEED: f32 = 0.15;
/// 检测区间 (-5, 5)，开区间
pub const DETECTION_ZONE: (f32, f32) = (-5.0, 5.0);
/// 超过该位置后标志回到起点
pub const RECYCLE_Z: f32 = 20.0;
pub const DETECTION_LOG_CAPACITY: usize = 10;
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// 道路上的一个脚本化标志
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedSign {
  pub name: &'static str,
  pub class_id: u8,
  pub start_z: f32,
}

const fn scripted(name: &'static str, class_id: u8, start_z: f32) -> ScriptedSign {
  ScriptedSign {
    name,
    class_id,
    start_z,
  }
}

pub static DEFAULT_TRACK: [ScriptedSign; 12] = [
  scripted("Speed Limit 30", 1, -100.0),
  scripted("Stop", 14, -80.0),
  scripted("Speed Limit 50", 2, -60.0),
  scripted("Yield", 13, -40.0),
  scripted("Road Work", 25, -20.0),
  scripted("No Entry", 17, 0.0),
  scripted("Speed Limit 60", 3, -140.0),
  scripted("Keep Right", 38, -120.0),
  scripted("Turn Right Ahead", 33, -160.0),
  scripted("Ahead Only", 35, -180.0),
  scripted("Right Curve", 11, -200.0),
  scripted("General Caution", 18, -220.0),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub name: &'static str,
  pub class_id: u8,
  pub confidence: f64,
  pub timestamp: DateTime<Utc>,
}

/// 昼夜主题，交给渲染层使用
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Theme {
  pub background: &'static str,
  pub ground: &'static str,
  pub fog_near: f32,
  pub fog_far: f32,
  pub ambient: f32,
  pub directional: f32,
}

impl Theme {
  pub const NIGHT: Theme = Theme {
    background: "#0a0a15",
    ground: "#0d1a0d",
    fog_near: 30.0,
    fog_far: 100.0,
    ambient: 0.2,
    directional: 0.6,
  };

  pub const DAY: Theme = Theme {
    background: "#87CEEB",
    ground: "#2d5a2d",
    fog_near: 50.0,
    fog_far: 150.0,
    ambient: 0.8,
    directional: 1.2,
  };

  pub fn for_night(night: bool) -> Self {
    if night { Self::NIGHT } else { Self::DAY }
  }
}

/// 检测记录，最新的在前，最多保留 10 条
#[derive(Debug, Clone, Default)]
pub struct DetectionLog {
  entries: VecDeque<Detection>,
}

impl DetectionLog {
  pub fn push(&mut self, detection: Detection) {
    self.entries.push_front(detection);
    self.entries.truncate(DETECTION_LOG_CAPACITY);
  }

  pub fn latest(&self) -> Option<&Detection> {
    self.entries.front()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Detection> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn reset(&mut self) {
    self.entries.clear();
  }
}

#[derive(Debug, Clone)]
struct TrackedSign {
  script: ScriptedSign,
  z: f32,
  detected: bool,
}

impl TrackedSign {
  fn new(script: ScriptedSign) -> Self {
    Self {
      script,
      z: script.start_z,
      detected: false,
    }
  }

  /// 前进一帧，进入检测区时返回 `true`
  fn step(&mut self) -> bool {
    self.z += SIGN_SPEED;

    let (near, far) = DETECTION_ZONE;
    let fired = !self.detected && self.z > near && self.z < far;
    if fired {
      self.detected = true;
    }

    if self.z > RECYCLE_Z {
      self.z = self.script.start_z;
      self.detected = false;
    }
    fired
  }
}

/// 驾驶模拟
///
/// 默认夜间模式、处于运行状态。暂停后恢复相当于重新载入场景，所有标志回到起点。
pub struct Simulation<R> {
  track: Vec<ScriptedSign>,
  signs: Vec<TrackedSign>,
  recognizer: RandomRecognizer<R>,
  log: DetectionLog,
  night: bool,
  running: bool,
  frame: u64,
}

impl<R: Rng> Simulation<R> {
  pub fn new(recognizer: RandomRecognizer<R>) -> Self {
    Self::with_track(DEFAULT_TRACK.to_vec(), recognizer)
  }

  pub fn with_track(track: Vec<ScriptedSign>, recognizer: RandomRecognizer<R>) -> Self {
    let signs = track.iter().copied().map(TrackedSign::new).collect();
    Self {
      track,
      signs,
      recognizer,
      log: DetectionLog::default(),
      night: true,
      running: true,
      frame: 0,
    }
  }

  pub fn is_running(&self) -> bool {
    self.running
  }

  pub fn is_night(&self) -> bool {
    self.night
  }

  pub fn theme(&self) -> Theme {
    Theme::for_night(self.night)
  }

  pub fn frame(&self) -> u64 {
    self.frame
  }

  pub fn log(&self) -> &DetectionLog {
    &self.log
  }

  pub fn toggle_night_mode(&mut self) -> bool {
    self.night = !self.night;
    info!("切换到{}模式", if self.night { "夜间" } else { "白天" });
    self.night
  }

  pub fn pause(&mut self) {
    self.running = false;
  }

  pub fn resume(&mut self) {
    if !self.running {
      self.signs = self.track.iter().copied().map(TrackedSign::new).collect();
      self.running = true;
    }
  }

  /// 清空检测记录，不影响标志位置
  pub fn reset(&mut self) {
    self.log.reset();
  }

  /// 推进一帧，返回本帧产生的检测
  pub fn tick(&mut self) -> Vec<Detection> {
    if !self.running {
      return Vec::new();
    }
    self.frame += 1;

    let mut detections = Vec::new();
    for index in 0..self.signs.len() {
      if !self.signs[index].step() {
        continue;
      }
      let script = self.signs[index].script;
      let detection = Detection {
        name: script.name,
        class_id: script.class_id,
        confidence: self.recognizer.confidence(),
        timestamp: Utc::now(),
      };
      debug!(
        "第 {} 帧检测到 {} (Class {}) {:.1}%",
        self.frame, detection.name, detection.class_id, detection.confidence
      );
      self.log.push(detection.clone());
      detections.push(detection);
    }
    detections
  }
}
