// 该文件是 Xunjing （寻径） 项目的一部分。
// src/geometry.rs - 边界框与 IoU 计算
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

/// IoU 分母上的平滑项，避免两个退化框相除为零
pub const IOU_EPSILON: f32 = 1e-6;

/// 归一化坐标下的边界框
///
/// 同时保存中心-尺寸编码与角点编码，两者只能通过构造函数一起计算，
/// 不提供单独修改某一种编码的接口。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  cx: f32,
  cy: f32,
  w: f32,
  h: f32,
  x1: f32,
  y1: f32,
  x2: f32,
  y2: f32,
}

impl BoundingBox {
  /// 由中心点与宽高构造
  pub fn from_center_size(cx: f32, cy: f32, w: f32, h: f32) -> Self {
    let half_w = w / 2.0;
    let half_h = h / 2.0;
    Self {
      cx,
      cy,
      w,
      h,
      x1: cx - half_w,
      y1: cy - half_h,
      x2: cx + half_w,
      y2: cy + half_h,
    }
  }

  /// 由左上角与右下角构造
  pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
    let w = x2 - x1;
    let h = y2 - y1;
    Self {
      cx: x1 + w / 2.0,
      cy: y1 + h / 2.0,
      w,
      h,
      x1,
      y1,
      x2,
      y2,
    }
  }

  pub fn cx(&self) -> f32 {
    self.cx
  }

  pub fn cy(&self) -> f32 {
    self.cy
  }

  pub fn width(&self) -> f32 {
    self.w
  }

  pub fn height(&self) -> f32 {
    self.h
  }

  pub fn x1(&self) -> f32 {
    self.x1
  }

  pub fn y1(&self) -> f32 {
    self.y1
  }

  pub fn x2(&self) -> f32 {
    self.x2
  }

  pub fn y2(&self) -> f32 {
    self.y2
  }

  /// [x_min, y_min, x_max, y_max]
  pub fn corners(&self) -> [f32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }

  pub fn area(&self) -> f32 {
    (self.x2 - self.x1) * (self.y2 - self.y1)
  }

  /// 四个角点是否都落在闭区间 [0, 1] 内
  pub fn is_normalized(&self) -> bool {
    let unit = 0.0..=1.0;
    unit.contains(&self.x1)
      && unit.contains(&self.y1)
      && unit.contains(&self.x2)
      && unit.contains(&self.y2)
  }

  pub fn iou(&self, other: &BoundingBox) -> f32 {
    iou(self, other)
  }
}

/// 计算两个边界框的交并比
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
  let x1 = a.x1.max(b.x1);
  let y1 = a.y1.max(b.y1);
  let x2 = a.x2.min(b.x2);
  let y2 = a.y2.min(b.y2);

  // 不相交时宽或高为负，截断为零
  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let union = a.area() + b.area() - intersection;

  intersection / (union + IOU_EPSILON)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn center_size_derives_corners() {
    let bbox = BoundingBox::from_center_size(0.5, 0.5, 0.2, 0.3);
    assert!((bbox.x1() - 0.4).abs() < 1e-6);
    assert!((bbox.y1() - 0.35).abs() < 1e-6);
    assert!((bbox.x2() - 0.6).abs() < 1e-6);
    assert!((bbox.y2() - 0.65).abs() < 1e-6);
  }

  #[test]
  fn corners_derive_center_size() {
    let bbox = BoundingBox::from_corners(0.1, 0.2, 0.5, 0.6);
    assert!((bbox.cx() - 0.3).abs() < 1e-6);
    assert!((bbox.cy() - 0.4).abs() < 1e-6);
    assert!((bbox.width() - 0.4).abs() < 1e-6);
    assert!((bbox.height() - 0.4).abs() < 1e-6);
  }

  #[test]
  fn identical_boxes_have_unit_iou() {
    let a = BoundingBox::from_corners(0.0, 0.0, 1.0, 1.0);
    assert!((iou(&a, &a) - 1.0).abs() < 1e-5);
  }

  #[test]
  fn disjoint_boxes_have_zero_iou() {
    let a = BoundingBox::from_corners(0.0, 0.0, 0.2, 0.2);
    let b = BoundingBox::from_corners(0.5, 0.5, 0.8, 0.8);
    assert_eq!(iou(&a, &b), 0.0);
  }

  #[test]
  fn partial_overlap_matches_formula() {
    let a = BoundingBox::from_corners(0.0, 0.0, 0.4, 0.4);
    let b = BoundingBox::from_corners(0.2, 0.2, 0.6, 0.6);
    // 交集 0.04，并集 0.16 + 0.16 - 0.04
    let expected = 0.04 / 0.28;
    assert!((iou(&a, &b) - expected).abs() < 1e-4);
    assert!((a.iou(&b) - b.iou(&a)).abs() < 1e-7);
  }

  #[test]
  fn degenerate_boxes_do_not_divide_by_zero() {
    let a = BoundingBox::from_center_size(0.5, 0.5, 0.0, 0.0);
    let value = iou(&a, &a);
    assert!(value.is_finite());
    assert_eq!(value, 0.0);
  }

  #[test]
  fn normalized_range_is_inclusive() {
    assert!(BoundingBox::from_corners(0.0, 0.0, 1.0, 1.0).is_normalized());
    assert!(!BoundingBox::from_corners(-0.0001, 0.0, 0.5, 0.5).is_normalized());
    assert!(!BoundingBox::from_corners(0.0, 0.0, 1.0001, 0.5).is_normalized());
  }
}
