// 该文件是 Xunjing （寻径） 项目的一部分。
// src/output/log_output.rs - 日志播报输出
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

use std::convert::Infallible;

use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, detector::DetectorListener, model::DetectResult,
  output::OutputError,
};

/// 把检测结果写入日志，并输出 "Detected: ..." 播报文本
///
/// `log:?boxes` 会在 info 级别逐个打印检测框，否则只在 debug 级别打印。
#[derive(Debug, Default, Clone)]
pub struct LogOutput {
  boxes: bool,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(url.scheme().to_string()));
    }
    let boxes = url.query_pairs().any(|(k, _)| k == "boxes");
    Ok(LogOutput { boxes })
  }
}

impl DetectorListener for LogOutput {
  type Error = Infallible;

  fn on_empty_detect(&self) -> Result<(), Self::Error> {
    debug!("未检测到物体");
    Ok(())
  }

  fn on_detect(&self, result: &DetectResult, inference_time_ms: u64) -> Result<(), Self::Error> {
    info!("检测到 {} 个物体，耗时: {} ms", result.len(), inference_time_ms);

    for det in result.iter() {
      let [x1, y1, x2, y2] = det.bbox.corners();
      if self.boxes {
        info!(
          "  - {}: {:.2}% at ({:.3}, {:.3}, {:.3}, {:.3})",
          det.class_name,
          det.confidence * 100.0,
          x1,
          y1,
          x2,
          y2
        );
      } else {
        debug!(
          "  - {}: {:.2}% at ({:.3}, {:.3}, {:.3}, {:.3})",
          det.class_name,
          det.confidence * 100.0,
          x1,
          y1,
          x2,
          y2
        );
      }
    }

    if let Some(summary) = result.summary() {
      info!("{}", summary);
    }
    Ok(())
  }
}
