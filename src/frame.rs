// 该文件是 Xunjing （寻径） 项目的一部分。
// src/frame.rs - 输入帧与输出张量定义
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

use thiserror::Error;

const RGB_CHANNELS: usize = 3;
const F32_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("字节数 {0} 不是 f32 大小的整数倍")]
  UnalignedBytes(usize),
}

/// NHWC 排列的 RGB 帧，尺寸需与模型输入一致
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  width: usize,
  height: usize,
  data: Box<[u8]>,
}

impl RgbNhwcFrame {
  pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FrameError> {
    let expected = RGB_CHANNELS * width * height;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_nhwc(&self) -> &[u8] {
    &self.data
  }

  /// 逐像素做 `(value - mean) / std`，得到送入网络的浮点输入
  pub fn normalize(&self, mean: f32, std: f32) -> InputTensor {
    let data = self
      .data
      .iter()
      .map(|&value| (value as f32 - mean) / std)
      .collect();

    InputTensor {
      width: self.width,
      height: self.height,
      data,
    }
  }
}

/// 归一化后的 NHWC 浮点输入
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
  width: usize,
  height: usize,
  data: Box<[f32]>,
}

impl InputTensor {
  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}

/// 网络的扁平输出张量
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
  data: Box<[f32]>,
}

impl OutputTensor {
  /// 从小端序的 f32 字节流解析
  pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
    if bytes.len() % F32_BYTES != 0 {
      return Err(FrameError::UnalignedBytes(bytes.len()));
    }

    let data = bytes
      .chunks_exact(F32_BYTES)
      .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect();

    Ok(Self { data })
  }

  /// 序列化为小端序字节流，便于保存捕获的输出
  pub fn to_le_bytes(&self) -> Vec<u8> {
    self.data.iter().flat_map(|value| value.to_le_bytes()).collect()
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}

impl From<Vec<f32>> for OutputTensor {
  fn from(data: Vec<f32>) -> Self {
    Self {
      data: data.into_boxed_slice(),
    }
  }
}

impl AsRef<[f32]> for OutputTensor {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}
