// 该文件是 Xunjing （寻径） 项目的一部分。
// src/bin/simple_oneshot.rs - 单次解码
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
use url::Url;

use xunjing::{
  FromUrl,
  detector::{DetectOutcome, DetectorBuilder},
  input::InputWrapper,
  model::{Labels, Model, ReplayBackend},
};

/// 解码一块输出张量并打印检测结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 推理后端
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 标签文件路径
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("推理后端: {}", args.model);
  info!("输入来源: {}", args.input);

  let labels = Labels::from_path(&args.labels)?;
  let backend = ReplayBackend::from_url(&args.model)?;
  let detector = DetectorBuilder::new(backend, labels).build()?;

  let mut input = InputWrapper::from_url(&args.input)?;
  let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;

  match detector.infer(&frame)? {
    DetectOutcome::Empty => println!("未检测到物体"),
    DetectOutcome::Detected {
      result,
      inference_time,
    } => {
      println!("耗时: {:.2?}", inference_time);
      for det in result.iter() {
        let [x1, y1, x2, y2] = det.bbox.corners();
        println!(
          "  - [{}] {}: {:.2}% at ({:.3}, {:.3}, {:.3}, {:.3})",
          det.class_id,
          det.class_name,
          det.confidence * 100.0,
          x1,
          y1,
          x2,
          y2
        );
      }
      if let Some(summary) = result.summary() {
        println!("{}", summary);
      }
    }
  }

  Ok(())
}
