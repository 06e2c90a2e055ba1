// 该文件是 Xunjing （寻径） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{Datelike, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::{FromUrl, FromUrlWithScheme, detector::DetectorListener, model::DetectResult};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 记录文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
  /// 每行 `label, conf, x1, y1, x2, y2`
  Text { label_with_name: bool },
  Json,
}

impl RecordFormat {
  fn extension(&self) -> &'static str {
    match self {
      RecordFormat::Text { .. } => "txt",
      RecordFormat::Json => "json",
    }
  }

  fn render(
    &self,
    result: &DetectResult,
    inference_time_ms: u64,
  ) -> Result<String, serde_json::Error> {
    match self {
      RecordFormat::Text { label_with_name } => {
        let mut records = Vec::with_capacity(result.len());
        for item in result.iter() {
          let name = if *label_with_name {
            item.class_name.clone()
          } else {
            format!("{}", item.class_id)
          };
          let [x1, y1, x2, y2] = item.bbox.corners();
          records.push(format!(
            "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
            name, item.confidence, x1, y1, x2, y2
          ));
        }
        Ok(records.join("\n"))
      }
      RecordFormat::Json => {
        let detections: Vec<_> = result
          .iter()
          .map(|item| {
            json!({
              "class_id": item.class_id,
              "label": item.class_name,
              "confidence": item.confidence,
              "bbox": item.bbox.corners(),
              "center": [item.bbox.cx(), item.bbox.cy(), item.bbox.width(), item.bbox.height()],
            })
          })
          .collect();
        serde_json::to_string_pretty(&json!({
          "inference_time_ms": inference_time_ms,
          "summary": result.summary(),
          "detections": detections,
        }))
      }
    }
  }
}

/// 按日期分目录保存每帧的检测记录
///
/// URL 形如 `folder:///records?record=json&always`：
/// - `record=json` 保存 JSON，`record=id` 保存以类别序号标注的文本，其余保存以类别名标注的文本；
/// - `always` 表示没有检测结果的帧也保存一个空记录。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  format: RecordFormat,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let format = {
      let mut format = RecordFormat::Text {
        label_with_name: true,
      };
      for (k, v) in uri.query_pairs() {
        if k == "record" {
          format = match v.as_ref() {
            "json" => RecordFormat::Json,
            "id" => RecordFormat::Text {
              label_with_name: false,
            },
            _ => RecordFormat::Text {
              label_with_name: true,
            },
          };
          break;
        }
      }
      format
    };

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(Self::new(uri.path(), format).with_always(always))
  }
}

impl DirectoryRecordOutput {
  pub fn new<P: AsRef<Path>>(directory: P, format: RecordFormat) -> Self {
    Self {
      directory: directory.as_ref().to_path_buf(),
      format,
      frame_counter: AtomicU16::new(0),
      always: false,
    }
  }

  pub fn with_always(mut self, always: bool) -> Self {
    self.always = always;
    self
  }

  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self) -> Result<PathBuf, std::io::Error> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    let filename = format!(
      "{}-{:04X}.{}",
      now.format("%H-%M-%S"),
      self.frame_id(),
      self.format.extension()
    );

    Ok(directory.join(filename))
  }

  fn save(
    &self,
    result: &DetectResult,
    inference_time_ms: u64,
  ) -> Result<(), DirectoryRecordOutputError> {
    let path = self.frame_path()?;
    let content = self.format.render(result, inference_time_ms)?;
    std::fs::write(&path, content)?;
    debug!("保存检测记录: {}", path.display());
    Ok(())
  }
}

impl DetectorListener for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn on_empty_detect(&self) -> Result<(), Self::Error> {
    if self.always {
      self.save(&DetectResult::default(), 0)?;
    }
    Ok(())
  }

  fn on_detect(&self, result: &DetectResult, inference_time_ms: u64) -> Result<(), Self::Error> {
    self.save(result, inference_time_ms)
  }
}
