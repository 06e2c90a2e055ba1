// 该文件是 Xunjing （寻径） 项目的一部分。
// src/model/decoder.rs - 输出张量解码
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

//! 输出张量按通道主序存放：第 `j` 个通道在空间位置 `c` 的值位于
//! `c + elements * j`。前 4 个通道为 `cx, cy, w, h`，其后每个通道对应一个类别的分数。

use tracing::{debug, warn};

use crate::{
  geometry::BoundingBox,
  model::{BOX_CHANNELS, Detection, ModelGeometry},
};

/// 在一个空间位置上对所有类别分数取最大值，返回 (通道序号, 分数)
///
/// 分数相同时取通道序号较小者。
fn argmax_class(
  output: &[f32],
  elements: usize,
  channels: usize,
  c: usize,
) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;
  for j in BOX_CHANNELS..channels {
    let score = output[c + elements * j];
    match best {
      Some((_, max)) if score <= max => {}
      _ if score.is_nan() => {}
      _ => best = Some((j, score)),
    }
  }
  best
}

/// 把扁平输出张量解码为候选框
///
/// 只保留最高类别分数严格大于 `confidence_threshold`、且四个角点都在 [0, 1] 内的候选。
/// 几何未初始化时直接返回空结果。返回顺序为空间位置顺序，未经排序。
pub fn decode(
  output: &[f32],
  geometry: &ModelGeometry,
  confidence_threshold: f32,
) -> Vec<Detection> {
  if !geometry.is_ready() {
    debug!("模型几何尚未初始化，跳过解码");
    return Vec::new();
  }

  let shape = geometry.shape();
  let (channels, elements) = (shape.channels, shape.elements);
  if output.len() < shape.output_len() {
    warn!(
      "输出张量长度不足: 期望 {}, 实际 {}",
      shape.output_len(),
      output.len()
    );
    return Vec::new();
  }

  let mut candidates = Vec::new();
  for c in 0..elements {
    let Some((channel, confidence)) = argmax_class(output, elements, channels, c) else {
      continue;
    };

    if confidence <= confidence_threshold {
      continue;
    }

    let cx = output[c];
    let cy = output[c + elements];
    let w = output[c + elements * 2];
    let h = output[c + elements * 3];
    let bbox = BoundingBox::from_center_size(cx, cy, w, h);

    // 越界的框视为画面外的无效预测
    if !bbox.is_normalized() {
      continue;
    }

    let class_id = channel - BOX_CHANNELS;
    let class_name = geometry.labels().get(class_id).unwrap_or("unknown");
    candidates.push(Detection {
      class_id,
      class_name: class_name.to_string(),
      confidence,
      bbox,
    });
  }

  debug!("解码得到 {} 个候选框", candidates.len());
  candidates
}
