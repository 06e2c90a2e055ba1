// 该文件是 Xunjing （寻径） 项目的一部分。
// src/main.rs - 项目主程序
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use xunjing::{
  FromUrl,
  detector::{CONFIDENCE_THRESHOLD, DetectorBuilder, DetectorConfig, IOU_THRESHOLD},
  input::InputWrapper,
  model::{Labels, ReplayBackend},
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};

/// Xunjing 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 推理后端，例如 replay:?width=640&height=640&channels=84&elements=8400
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 标签文件路径，每行一个类别名
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,
  /// 输入来源，例如 tensor:///path/to/dumps
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 log: 或 folder:///path/to/records?record=json
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub iou: f32,
  /// 最大处理帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
  /// 每隔多少帧处理一帧
  #[arg(long, default_value_t = 1, value_name = "STRIDE")]
  pub frame_stride: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  info!("推理后端: {}", args.model);
  info!("标签文件: {}", args.labels.display());
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let labels = Labels::from_path(&args.labels)?;
  let backend = ReplayBackend::from_url(&args.model)?;
  let config = DetectorConfig::default()
    .with_confidence_threshold(args.confidence)
    .with_iou_threshold(args.iou);
  let detector = DetectorBuilder::new(backend, labels).config(config).build()?;

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_frame_stride(args.frame_stride)
    .with_ctrlc()?
    .run_task(input, detector, output)?;

  Ok(())
}
