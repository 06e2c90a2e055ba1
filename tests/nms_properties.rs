use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use xunjing::{
  geometry::{BoundingBox, iou},
  model::{Detection, nms::nms},
};

const IOU_THRESHOLD: f32 = 0.5;

fn random_detections(rng: &mut StdRng, n: usize) -> Vec<Detection> {
  (0..n)
    .map(|i| {
      let w = rng.random_range(0.05..0.4);
      let h = rng.random_range(0.05..0.4);
      let cx = rng.random_range(w / 2.0..1.0 - w / 2.0);
      let cy = rng.random_range(h / 2.0..1.0 - h / 2.0);
      Detection {
        class_id: i % 3,
        class_name: format!("class-{}", i % 3),
        confidence: rng.random_range(0.3..1.0),
        bbox: BoundingBox::from_center_size(cx, cy, w, h),
      }
    })
    .collect()
}

#[test]
fn output_is_sorted_by_confidence() {
  let mut rng = StdRng::seed_from_u64(7);
  for _ in 0..20 {
    let kept = nms(random_detections(&mut rng, 60), IOU_THRESHOLD);
    assert!(!kept.is_empty());
    for pair in kept.windows(2) {
      assert!(pair[0].confidence >= pair[1].confidence);
    }
  }
}

#[test]
fn no_two_kept_boxes_overlap_beyond_threshold() {
  let mut rng = StdRng::seed_from_u64(11);
  for _ in 0..20 {
    let kept = nms(random_detections(&mut rng, 60), IOU_THRESHOLD);
    for (i, a) in kept.iter().enumerate() {
      for b in kept.iter().skip(i + 1) {
        assert!(iou(&a.bbox, &b.bbox) <= IOU_THRESHOLD);
      }
    }
  }
}

#[test]
fn rerunning_changes_nothing() {
  let mut rng = StdRng::seed_from_u64(42);
  for _ in 0..20 {
    let kept = nms(random_detections(&mut rng, 60), IOU_THRESHOLD);
    let again = nms(kept.clone(), IOU_THRESHOLD);
    assert_eq!(again, kept);
  }
}

#[test]
fn most_confident_box_always_survives() {
  let mut rng = StdRng::seed_from_u64(3);
  for _ in 0..20 {
    let detections = random_detections(&mut rng, 40);
    let best = detections
      .iter()
      .map(|d| d.confidence)
      .fold(f32::MIN, f32::max);
    let kept = nms(detections, IOU_THRESHOLD);
    assert_eq!(kept[0].confidence, best);
  }
}

#[test]
fn iou_exactly_at_threshold_is_retained() {
  let a = BoundingBox::from_corners(0.1, 0.1, 0.5, 0.5);
  let b = BoundingBox::from_corners(0.3, 0.1, 0.7, 0.5);
  let threshold = iou(&a, &b);

  let detections = vec![
    Detection {
      class_id: 0,
      class_name: "person".to_string(),
      confidence: 0.9,
      bbox: a,
    },
    Detection {
      class_id: 0,
      class_name: "person".to_string(),
      confidence: 0.8,
      bbox: b,
    },
  ];

  assert_eq!(nms(detections.clone(), threshold).len(), 2);
  assert_eq!(nms(detections, threshold - 1e-4).len(), 1);
}
