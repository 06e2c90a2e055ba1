// 该文件是 Xunjing （寻径） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use tracing::debug;

use crate::{geometry::iou, model::Detection};

/// 贪心非极大值抑制
///
/// 按置信度降序（稳定排序，同分保持解码顺序）依次选出最高者，
/// 并删除与其 IoU 严格大于 `iou_threshold` 的其余框。
/// 抑制不区分类别：不同类别的重叠框同样会被抑制。
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
  // 按置信度降序排序
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut result = Vec::with_capacity(detections.len());
  let before = detections.len();

  while !detections.is_empty() {
    let best = detections.remove(0);
    detections.retain(|det| iou(&best.bbox, &det.bbox) <= iou_threshold);
    result.push(best);
  }

  debug!("NMS: {} -> {}", before, result.len());
  result
}
