// 该文件是 Signlens （识牌） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::{Parser, Subcommand};
use url::Url;

use signlens::catalog::SignCategory;

/// Signlens 交通标志识别演示
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 批量识别一组图像
  Bulk(BulkArgs),
  /// 从摄像头持续截帧识别
  Camera(CameraArgs),
  /// 浏览 GTSRB 标志图库
  Gallery(GalleryArgs),
  /// 运行驾驶模拟
  Simulate(SimulateArgs),
}

#[derive(clap::Args, Debug)]
pub struct BulkArgs {
  /// 输入来源，可重复
  /// 支持格式:
  /// - 图片文件: image:///path/to/a.png
  /// - 图片目录: image:///path/to/dir
  #[arg(long, value_name = "SOURCE", required = true, num_args = 1..)]
  pub input: Vec<Url>,

  /// 输出路径
  /// 支持格式:
  /// - 日志: console:
  /// - JSON 报告: json:///path/to/report.json
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,

  /// 随机数种子，用于复现结果
  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct CameraArgs {
  /// 摄像头设备，例如 v4l2:///dev/video0
  #[arg(long, value_name = "DEVICE", default_value = "v4l2:///dev/video0")]
  pub device: Url,

  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,

  /// 最大处理帧数，0 表示无限制
  #[arg(long, value_name = "FRAME_NUMBER", default_value_t = 0)]
  pub frames: usize,

  #[arg(long, default_value_t = 640)]
  pub width: u32,

  #[arg(long, default_value_t = 480)]
  pub height: u32,

  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct GalleryArgs {
  /// 按类别筛选: speed_limit, prohibitory, warning, mandatory, priority, other
  #[arg(long, value_name = "CATEGORY", value_parser = parse_category)]
  pub category: Option<SignCategory>,

  /// 按名称搜索（忽略大小写）
  #[arg(long, value_name = "QUERY")]
  pub query: Option<String>,

  /// 分析指定编号的标志
  #[arg(long, value_name = "CLASS_ID")]
  pub analyze: Option<u8>,

  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
  /// 最大模拟帧数，0 表示直到 Ctrl-C
  #[arg(long, value_name = "FRAME_NUMBER", default_value_t = 0)]
  pub frames: u64,

  /// 白天模式，默认夜间
  #[arg(long)]
  pub day: bool,

  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,

  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
}

fn parse_category(name: &str) -> Result<SignCategory, String> {
  SignCategory::parse(name).ok_or_else(|| format!("未知的标志类别: {}", name))
}
