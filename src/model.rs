// 该文件是 Xunjing （寻径） 项目的一部分。
// src/model.rs - 模型几何、类别标签与检测结果
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

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::{frame::OutputTensor, geometry::BoundingBox};

/// 输出张量中边界框所占的通道数（cx, cy, w, h）
pub const BOX_CHANNELS: usize = 4;

/// 完整的检测模型：输入一帧，输出检测结果
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 推理后端，把固定尺寸的输入映射为固定尺寸的扁平输出张量
pub trait Backend {
  type Input;
  type Error;

  fn shape(&self) -> TensorShape;
  fn run(&self, input: &Self::Input) -> Result<OutputTensor, Self::Error>;
}

/// 模型输入输出张量的尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TensorShape {
  /// 模型输入宽度
  pub input_width: usize,
  /// 模型输入高度
  pub input_height: usize,
  /// 每个空间位置的属性数，4 个框坐标加上每个类别一个分数
  pub channels: usize,
  /// 空间位置（候选槽位）数量
  pub elements: usize,
}

impl TensorShape {
  pub fn new(input_width: usize, input_height: usize, channels: usize, elements: usize) -> Self {
    Self {
      input_width,
      input_height,
      channels,
      elements,
    }
  }

  /// 任一维度为零时模型尚未就绪
  pub fn is_ready(&self) -> bool {
    self.input_width != 0 && self.input_height != 0 && self.channels != 0 && self.elements != 0
  }

  pub fn output_len(&self) -> usize {
    self.channels * self.elements
  }

  pub fn num_classes(&self) -> usize {
    self.channels.saturating_sub(BOX_CHANNELS)
  }
}

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标签文件 {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("标签文件为空")]
  Empty,
}

/// 按类别序号排列的类别名称
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
  names: Box<[String]>,
}

impl Labels {
  /// 每行一个类别名，遇到第一个空行即停止
  pub fn parse(text: &str) -> Result<Self, LabelError> {
    let names: Vec<String> = text
      .lines()
      .take_while(|line| !line.is_empty())
      .map(str::to_owned)
      .collect();

    if names.is_empty() {
      return Err(LabelError::Empty);
    }

    Ok(Self {
      names: names.into_boxed_slice(),
    })
  }

  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
      path: path.display().to_string(),
      source,
    })?;
    let labels = Self::parse(&text)?;
    debug!("共 {} 个类别", labels.len());
    Ok(labels)
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

impl<S: Into<String>> FromIterator<S> for Labels {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().map(Into::into).collect(),
    }
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GeometryError {
  #[error("模型尚未就绪: {0:?}")]
  NotReady(TensorShape),
  #[error("输出通道数 {channels} 不足以容纳边界框与类别分数")]
  TooFewChannels { channels: usize },
  #[error("类别通道数 {classes} 与标签数量 {labels} 不一致")]
  LabelMismatch { classes: usize, labels: usize },
}

/// 模型几何配置，初始化后不再修改
///
/// `Default` 表示尚未初始化的几何，所有维度为零。
#[derive(Debug, Clone, Default)]
pub struct ModelGeometry {
  shape: TensorShape,
  labels: Labels,
}

impl ModelGeometry {
  pub fn new(shape: TensorShape, labels: Labels) -> Result<Self, GeometryError> {
    if !shape.is_ready() {
      return Err(GeometryError::NotReady(shape));
    }
    if shape.channels <= BOX_CHANNELS {
      return Err(GeometryError::TooFewChannels {
        channels: shape.channels,
      });
    }
    if shape.num_classes() != labels.len() {
      return Err(GeometryError::LabelMismatch {
        classes: shape.num_classes(),
        labels: labels.len(),
      });
    }

    Ok(Self { shape, labels })
  }

  pub fn is_ready(&self) -> bool {
    self.shape.is_ready()
  }

  pub fn shape(&self) -> TensorShape {
    self.shape
  }

  pub fn labels(&self) -> &Labels {
    &self.labels
  }
}

/// 单个检测框
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 类别索引
  pub class_id: usize,
  /// 类别名称
  pub class_name: String,
  /// 置信度
  pub confidence: f32,
  /// 归一化坐标下的边界框
  pub bbox: BoundingBox,
}

/// 一次推理的检测结果，按置信度降序排列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }

  /// 去重后的类别名称，保持首次出现的顺序
  pub fn distinct_labels(&self) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for item in self.items.iter() {
      if !names.contains(&item.class_name.as_str()) {
        names.push(&item.class_name);
      }
    }
    names
  }

  /// 形如 "Detected: person, chair" 的播报文本
  pub fn summary(&self) -> Option<String> {
    if self.is_empty() {
      return None;
    }
    Some(format!("Detected: {}", self.distinct_labels().join(", ")))
  }
}

impl From<Vec<Detection>> for DetectResult {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

pub mod decoder;
pub mod nms;
mod replay;
pub use self::replay::{ReplayBackend, ReplayError};
