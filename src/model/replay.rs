// 该文件是 Xunjing （寻径） 项目的一部分。
// src/model/replay.rs - 回放捕获的输出张量
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
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::OutputTensor,
  model::{Backend, TensorShape},
};

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch { expected: String, actual: String },
  #[error("缺少参数: {0}")]
  MissingParameter(&'static str),
  #[error("参数 {key} 无效: {value}")]
  InvalidParameter { key: &'static str, value: String },
  #[error("输出张量长度不匹配: 期望 {expected}, 实际 {actual}")]
  OutputSize { expected: usize, actual: usize },
}

/// 回放后端：输入即为离线捕获的网络输出，原样交给后处理
///
/// URL 形如 `replay:?width=640&height=640&channels=84&elements=8400`。
#[derive(Debug, Clone)]
pub struct ReplayBackend {
  shape: TensorShape,
}

impl ReplayBackend {
  pub fn new(shape: TensorShape) -> Self {
    Self { shape }
  }
}

fn query_usize(url: &Url, key: &'static str) -> Result<usize, ReplayError> {
  let value = url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
    .ok_or(ReplayError::MissingParameter(key))?;

  value
    .parse()
    .map_err(|_| ReplayError::InvalidParameter { key, value })
}

impl FromUrlWithScheme for ReplayBackend {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayBackend {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        actual: url.scheme().to_string(),
      });
    }

    let shape = TensorShape::new(
      query_usize(url, "width")?,
      query_usize(url, "height")?,
      query_usize(url, "channels")?,
      query_usize(url, "elements")?,
    );
    info!("回放后端张量尺寸: {:?}", shape);

    Ok(Self::new(shape))
  }
}

impl Backend for ReplayBackend {
  type Input = OutputTensor;
  type Error = ReplayError;

  fn shape(&self) -> TensorShape {
    self.shape
  }

  fn run(&self, input: &Self::Input) -> Result<OutputTensor, Self::Error> {
    let expected = self.shape.output_len();
    if input.len() != expected {
      error!("输出张量长度不匹配: 期望 {}, 实际 {}", expected, input.len());
      return Err(ReplayError::OutputSize {
        expected,
        actual: input.len(),
      });
    }

    debug!("回放输出张量，共 {} 个值", input.len());
    Ok(input.clone())
  }
}
