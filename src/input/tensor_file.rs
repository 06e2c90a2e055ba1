// 该文件是 Xunjing （寻径） 项目的一部分。
// src/input/tensor_file.rs - 输出张量文件输入
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

use std::{
  collections::VecDeque,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{FrameError, OutputTensor},
};

const TENSOR_FILE_EXTENSION: &str = "bin";

#[derive(Error, Debug)]
pub enum TensorFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Tensor format error: {0}")]
  FormatError(#[from] FrameError),
  #[error("No tensor file found in {0}")]
  NoTensorFile(String),
}

/// 读取离线捕获的输出张量
///
/// 路径可以是单个文件，也可以是目录；目录下的 `*.bin` 文件按文件名顺序依次读取。
/// 每个文件是小端序 f32 的原始字节。
pub struct TensorFileInput {
  files: VecDeque<PathBuf>,
}

impl FromUrlWithScheme for TensorFileInput {
  const SCHEME: &'static str = "tensor";
}

impl FromUrl for TensorFileInput {
  type Error = TensorFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(TensorFileInputError::SchemaMismatch);
    }

    Self::open(url.path())
  }
}

impl TensorFileInput {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TensorFileInputError> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)?;

    let files: VecDeque<PathBuf> = if metadata.is_dir() {
      let mut files = Vec::new();
      for entry in std::fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_file()
          && entry_path.extension().and_then(|ext| ext.to_str()) == Some(TENSOR_FILE_EXTENSION)
        {
          files.push(entry_path);
        }
      }
      files.sort();
      files.into()
    } else {
      VecDeque::from([path.to_path_buf()])
    };

    if files.is_empty() {
      return Err(TensorFileInputError::NoTensorFile(
        path.display().to_string(),
      ));
    }

    info!("张量输入: {}，共 {} 个文件", path.display(), files.len());
    Ok(Self { files })
  }

  pub fn remaining(&self) -> usize {
    self.files.len()
  }

  fn read(path: &Path) -> Result<OutputTensor, TensorFileInputError> {
    let bytes = std::fs::read(path)?;
    Ok(OutputTensor::from_le_bytes(&bytes)?)
  }
}

impl Iterator for TensorFileInput {
  type Item = OutputTensor;

  fn next(&mut self) -> Option<Self::Item> {
    // 损坏的文件记录后跳过
    while let Some(path) = self.files.pop_front() {
      match Self::read(&path) {
        Ok(tensor) => {
          debug!("读取张量文件 {}: {} 个值", path.display(), tensor.len());
          return Some(tensor);
        }
        Err(e) => error!("读取张量文件 {} 失败: {}", path.display(), e),
      }
    }
    None
  }
}
