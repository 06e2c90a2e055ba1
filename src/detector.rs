// 该文件是 Xunjing （寻径） 项目的一部分。
// src/detector.rs - 检测流水线
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

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  frame::{InputTensor, RgbNhwcFrame},
  model::{
    Backend, DetectResult, GeometryError, Labels, Model, ModelGeometry, decoder::decode, nms::nms,
  },
};

/// 默认置信度阈值
pub const CONFIDENCE_THRESHOLD: f32 = 0.3;
/// 默认 NMS IoU 阈值
pub const IOU_THRESHOLD: f32 = 0.5;
const INPUT_MEAN: f32 = 0.0;
const INPUT_STANDARD_DEVIATION: f32 = 255.0;

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("模型几何错误: {0}")]
  Geometry(#[from] GeometryError),
  #[error("配置无效: {0}")]
  InvalidConfig(String),
  #[error("输出张量长度不匹配: 期望 {expected}, 实际 {actual}")]
  OutputSize { expected: usize, actual: usize },
  #[error("输入尺寸不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  InputSize {
    expected: (usize, usize),
    actual: (usize, usize),
  },
  #[error("推理后端错误: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 检测器配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
  /// 置信度阈值，最高类别分数需严格大于该值
  pub confidence_threshold: f32,
  /// NMS IoU 阈值，IoU 严格大于该值的框被抑制
  pub iou_threshold: f32,
  pub input_mean: f32,
  pub input_std: f32,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      confidence_threshold: CONFIDENCE_THRESHOLD,
      iou_threshold: IOU_THRESHOLD,
      input_mean: INPUT_MEAN,
      input_std: INPUT_STANDARD_DEVIATION,
    }
  }
}

impl DetectorConfig {
  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_input_normalization(mut self, mean: f32, std: f32) -> Self {
    self.input_mean = mean;
    self.input_std = std;
    self
  }

  pub fn validate(&self) -> Result<(), DetectorError> {
    let unit = 0.0..=1.0;
    if !unit.contains(&self.confidence_threshold) {
      return Err(DetectorError::InvalidConfig(format!(
        "置信度阈值 {} 不在 [0, 1] 内",
        self.confidence_threshold
      )));
    }
    if !unit.contains(&self.iou_threshold) {
      return Err(DetectorError::InvalidConfig(format!(
        "IoU 阈值 {} 不在 [0, 1] 内",
        self.iou_threshold
      )));
    }
    if self.input_std.is_nan() || self.input_std <= 0.0 || !self.input_mean.is_finite() {
      return Err(DetectorError::InvalidConfig(format!(
        "输入归一化参数无效: mean={}, std={}",
        self.input_mean, self.input_std
      )));
    }
    Ok(())
  }
}

/// 一次检测的结果
#[derive(Debug, Clone, PartialEq)]
pub enum DetectOutcome {
  /// 没有任何框通过过滤
  Empty,
  /// 经过 NMS 的检测框，以及推理与解码的耗时
  Detected {
    result: DetectResult,
    inference_time: Duration,
  },
}

impl DetectOutcome {
  pub fn is_empty(&self) -> bool {
    matches!(self, DetectOutcome::Empty)
  }

  pub fn result(&self) -> Option<&DetectResult> {
    match self {
      DetectOutcome::Empty => None,
      DetectOutcome::Detected { result, .. } => Some(result),
    }
  }

  pub fn inference_time_ms(&self) -> Option<u64> {
    match self {
      DetectOutcome::Empty => None,
      DetectOutcome::Detected { inference_time, .. } => Some(inference_time.as_millis() as u64),
    }
  }

  /// 把结果交给监听者，恰好调用其中一个回调
  pub fn notify<L: DetectorListener + ?Sized>(&self, listener: &L) -> Result<(), L::Error> {
    match self {
      DetectOutcome::Empty => listener.on_empty_detect(),
      DetectOutcome::Detected {
        result,
        inference_time,
      } => listener.on_detect(result, inference_time.as_millis() as u64),
    }
  }
}

/// 检测结果的接收方
pub trait DetectorListener {
  type Error;

  fn on_empty_detect(&self) -> Result<(), Self::Error>;
  fn on_detect(&self, result: &DetectResult, inference_time_ms: u64) -> Result<(), Self::Error>;
}

pub struct DetectorBuilder<B> {
  backend: B,
  labels: Labels,
  config: DetectorConfig,
}

impl<B: Backend> DetectorBuilder<B> {
  pub fn new(backend: B, labels: Labels) -> Self {
    Self {
      backend,
      labels,
      config: DetectorConfig::default(),
    }
  }

  pub fn config(mut self, config: DetectorConfig) -> Self {
    self.config = config;
    self
  }

  pub fn build(self) -> Result<Detector<B>, DetectorError> {
    self.config.validate()?;

    let shape = self.backend.shape();
    info!(
      "模型输入尺寸: {}x{}, 输出: {} 通道 x {} 位置",
      shape.input_width, shape.input_height, shape.channels, shape.elements
    );

    let geometry = ModelGeometry::new(shape, self.labels).inspect_err(|e| {
      error!("模型几何校验失败: {}", e);
    })?;
    info!("共 {} 个类别", geometry.labels().len());
    debug!("检测器配置: {:?}", self.config);

    Ok(Detector {
      backend: self.backend,
      geometry,
      config: self.config,
    })
  }
}

/// 检测器：推理、解码、置信度过滤与 NMS
pub struct Detector<B> {
  backend: B,
  geometry: ModelGeometry,
  config: DetectorConfig,
}

impl<B> Detector<B> {
  pub fn geometry(&self) -> &ModelGeometry {
    &self.geometry
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  /// 把图像帧归一化为模型输入
  pub fn prepare(&self, frame: &RgbNhwcFrame) -> Result<InputTensor, DetectorError> {
    let shape = self.geometry.shape();
    let expected = (shape.input_width, shape.input_height);
    let actual = (frame.width(), frame.height());
    if expected != actual {
      return Err(DetectorError::InputSize { expected, actual });
    }

    Ok(frame.normalize(self.config.input_mean, self.config.input_std))
  }

  /// 对一块输出张量做解码、过滤与 NMS
  pub fn postprocess(&self, output: &[f32]) -> Result<DetectResult, DetectorError> {
    let expected = self.geometry.shape().output_len();
    if output.len() != expected {
      return Err(DetectorError::OutputSize {
        expected,
        actual: output.len(),
      });
    }

    let candidates = decode(output, &self.geometry, self.config.confidence_threshold);
    if candidates.is_empty() {
      return Ok(DetectResult::default());
    }

    Ok(DetectResult::from(nms(candidates, self.config.iou_threshold)))
  }
}

impl<B> Detector<B>
where
  B: Backend,
  B::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn detect(&self, input: &B::Input) -> Result<DetectOutcome, DetectorError> {
    let now = Instant::now();
    let output = self
      .backend
      .run(input)
      .map_err(|e| DetectorError::Backend(Box::new(e)))?;
    let result = self.postprocess(output.as_slice())?;
    let inference_time = now.elapsed();

    if result.is_empty() {
      debug!("未检测到物体，耗时: {:.2?}", inference_time);
      return Ok(DetectOutcome::Empty);
    }

    debug!("检测到 {} 个物体，耗时: {:.2?}", result.len(), inference_time);
    Ok(DetectOutcome::Detected {
      result,
      inference_time,
    })
  }
}

impl<B> Model for Detector<B>
where
  B: Backend,
  B::Error: std::error::Error + Send + Sync + 'static,
{
  type Input = B::Input;
  type Output = DetectOutcome;
  type Error = DetectorError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.detect(input)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{ReplayBackend, TensorShape};

  fn labels(n: usize) -> Labels {
    (0..n).map(|i| format!("class-{i}")).collect()
  }

  #[test]
  fn default_config_matches_constants() {
    let config = DetectorConfig::default();
    assert_eq!(config.confidence_threshold, 0.3);
    assert_eq!(config.iou_threshold, 0.5);
    assert_eq!((config.input_mean, config.input_std), (0.0, 255.0));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn config_rejects_out_of_range_thresholds() {
    assert!(
      DetectorConfig::default()
        .with_confidence_threshold(1.5)
        .validate()
        .is_err()
    );
    assert!(
      DetectorConfig::default()
        .with_iou_threshold(-0.1)
        .validate()
        .is_err()
    );
    assert!(
      DetectorConfig::default()
        .with_input_normalization(0.0, 0.0)
        .validate()
        .is_err()
    );
  }

  #[test]
  fn build_rejects_label_mismatch() {
    let backend = ReplayBackend::new(TensorShape::new(640, 640, 7, 10));
    let err = DetectorBuilder::new(backend, labels(2)).build().err().unwrap();
    assert!(matches!(
      err,
      DetectorError::Geometry(GeometryError::LabelMismatch {
        classes: 3,
        labels: 2
      })
    ));
  }

  #[test]
  fn build_rejects_unready_backend() {
    let backend = ReplayBackend::new(TensorShape::default());
    let err = DetectorBuilder::new(backend, labels(1)).build().err().unwrap();
    assert!(matches!(
      err,
      DetectorError::Geometry(GeometryError::NotReady(_))
    ));
  }

  #[test]
  fn prepare_checks_frame_size() {
    let backend = ReplayBackend::new(TensorShape::new(2, 1, 5, 4));
    let detector = DetectorBuilder::new(backend, labels(1)).build().unwrap();

    let frame = RgbNhwcFrame::new(2, 1, vec![255; 6]).unwrap();
    let input = detector.prepare(&frame).unwrap();
    assert_eq!(input.as_slice(), &[1.0; 6]);

    let frame = RgbNhwcFrame::new(1, 2, vec![255; 6]).unwrap();
    assert!(matches!(
      detector.prepare(&frame),
      Err(DetectorError::InputSize {
        expected: (2, 1),
        actual: (1, 2)
      })
    ));
  }

  #[test]
  fn postprocess_checks_output_length() {
    let backend = ReplayBackend::new(TensorShape::new(640, 640, 5, 4));
    let detector = DetectorBuilder::new(backend, labels(1)).build().unwrap();
    assert!(matches!(
      detector.postprocess(&[0.0; 19]),
      Err(DetectorError::OutputSize {
        expected: 20,
        actual: 19
      })
    ));
    assert!(detector.postprocess(&[0.0; 20]).unwrap().is_empty());
  }
}
