use std::cell::RefCell;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use url::Url;
use xunjing::{
  FromUrl,
  detector::{DetectorBuilder, DetectorListener},
  frame::OutputTensor,
  input::InputWrapper,
  model::{DetectResult, Labels, ReplayBackend},
  output::OutputWrapper,
  task::{ContinuousTask, OneShotTask, Task},
};

const ELEMENTS: usize = 8;
const CHANNELS: usize = 6;

/// 第 `i` 帧：`i` 为偶数时在位置 0 放一个 "exit" 框，否则全为零
fn write_frames(dir: &Path, count: usize) {
  for i in 0..count {
    let mut data = vec![0.0f32; CHANNELS * ELEMENTS];
    if i % 2 == 0 {
      data[0] = 0.5;
      data[ELEMENTS] = 0.5;
      data[ELEMENTS * 2] = 0.2;
      data[ELEMENTS * 3] = 0.2;
      data[ELEMENTS * 5] = 0.9;
    }
    let bytes = OutputTensor::from(data).to_le_bytes();
    std::fs::write(dir.join(format!("{i:04}.bin")), bytes).unwrap();
  }
}

fn tensor_url(dir: &Path) -> Url {
  Url::parse(&format!("tensor://{}", dir.display())).unwrap()
}

fn model_url() -> Url {
  Url::parse(&format!(
    "replay:?width=320&height=320&channels={CHANNELS}&elements={ELEMENTS}"
  ))
  .unwrap()
}

fn labels() -> Labels {
  Labels::parse("stairs\nexit\n").unwrap()
}

#[derive(Clone, Default)]
struct Recorder {
  calls: Rc<RefCell<Vec<Option<String>>>>,
}

impl DetectorListener for Recorder {
  type Error = Infallible;

  fn on_empty_detect(&self) -> Result<(), Self::Error> {
    self.calls.borrow_mut().push(None);
    Ok(())
  }

  fn on_detect(&self, result: &DetectResult, _inference_time_ms: u64) -> Result<(), Self::Error> {
    self.calls.borrow_mut().push(result.summary());
    Ok(())
  }
}

fn files_under(root: &Path) -> Vec<PathBuf> {
  let mut files = Vec::new();
  for entry in std::fs::read_dir(root).unwrap().flatten() {
    let path = entry.path();
    if path.is_dir() {
      files.extend(files_under(&path));
    } else {
      files.push(path);
    }
  }
  files
}

#[test]
fn labels_are_loaded_from_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("labels.txt");
  std::fs::write(&path, "stairs\nexit\n").unwrap();
  assert_eq!(Labels::from_path(&path).unwrap(), labels());
  assert!(Labels::from_path(dir.path().join("missing.txt")).is_err());
}

#[test]
fn continuous_task_processes_every_frame() {
  let dir = tempfile::tempdir().unwrap();
  write_frames(dir.path(), 4);

  let backend = ReplayBackend::from_url(&model_url()).unwrap();
  let detector = DetectorBuilder::new(backend, labels()).build().unwrap();
  let input = InputWrapper::from_url(&tensor_url(dir.path())).unwrap();
  let recorder = Recorder::default();

  ContinuousTask::default()
    .run_task(input, detector, recorder.clone())
    .unwrap();

  let expected = vec![Some("Detected: exit".to_string()), None];
  assert_eq!(
    *recorder.calls.borrow(),
    [expected.clone(), expected].concat()
  );
}

#[test]
fn frame_stride_drops_frames() {
  let dir = tempfile::tempdir().unwrap();
  write_frames(dir.path(), 7);

  let backend = ReplayBackend::from_url(&model_url()).unwrap();
  let detector = DetectorBuilder::new(backend, labels()).build().unwrap();
  let input = InputWrapper::from_url(&tensor_url(dir.path())).unwrap();
  let recorder = Recorder::default();

  // 只处理第 3、6 帧（下标 2、5）
  ContinuousTask::default()
    .with_frame_stride(3)
    .run_task(input, detector, recorder.clone())
    .unwrap();

  assert_eq!(
    *recorder.calls.borrow(),
    vec![Some("Detected: exit".to_string()), None]
  );
}

#[test]
fn frame_number_limits_processed_frames() {
  let dir = tempfile::tempdir().unwrap();
  write_frames(dir.path(), 6);

  let backend = ReplayBackend::from_url(&model_url()).unwrap();
  let detector = DetectorBuilder::new(backend, labels()).build().unwrap();
  let input = InputWrapper::from_url(&tensor_url(dir.path())).unwrap();
  let recorder = Recorder::default();

  ContinuousTask::default()
    .with_frame_number(Some(2))
    .with_frame_stride(2)
    .run_task(input, detector, recorder.clone())
    .unwrap();

  assert_eq!(*recorder.calls.borrow(), vec![None, None]);
}

#[test]
fn interrupt_stops_after_current_frame() {
  let dir = tempfile::tempdir().unwrap();
  write_frames(dir.path(), 5);

  let backend = ReplayBackend::from_url(&model_url()).unwrap();
  let detector = DetectorBuilder::new(backend, labels()).build().unwrap();
  let input = InputWrapper::from_url(&tensor_url(dir.path())).unwrap();
  let recorder = Recorder::default();

  let (tx, rx) = std::sync::mpsc::channel();
  tx.send(()).unwrap();
  ContinuousTask::default()
    .with_interrupt(rx)
    .run_task(input, detector, recorder.clone())
    .unwrap();

  assert_eq!(recorder.calls.borrow().len(), 1);
}

#[test]
fn directory_record_saves_detected_frames() {
  let input_dir = tempfile::tempdir().unwrap();
  let record_dir = tempfile::tempdir().unwrap();
  write_frames(input_dir.path(), 4);

  let backend = ReplayBackend::from_url(&model_url()).unwrap();
  let detector = DetectorBuilder::new(backend, labels()).build().unwrap();
  let input = InputWrapper::from_url(&tensor_url(input_dir.path())).unwrap();
  let output_url = Url::parse(&format!(
    "folder://{}?record=json",
    record_dir.path().display()
  ))
  .unwrap();
  let output = OutputWrapper::from_url(&output_url).unwrap();

  ContinuousTask::default()
    .run_task(input, detector, output)
    .unwrap();

  let files = files_under(record_dir.path());
  assert_eq!(files.len(), 2);
  for file in files {
    assert_eq!(file.extension().and_then(|e| e.to_str()), Some("json"));
    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(value["detections"][0]["label"], "exit");
  }
}

#[test]
fn one_shot_task_uses_first_frame() {
  let dir = tempfile::tempdir().unwrap();
  write_frames(dir.path(), 3);

  let backend = ReplayBackend::from_url(&model_url()).unwrap();
  let detector = DetectorBuilder::new(backend, labels()).build().unwrap();
  let input = InputWrapper::from_url(&tensor_url(dir.path())).unwrap();
  let recorder = Recorder::default();

  OneShotTask
    .run_task(input, detector, recorder.clone())
    .unwrap();

  assert_eq!(
    *recorder.calls.borrow(),
    vec![Some("Detected: exit".to_string())]
  );
}

#[test]
fn unknown_schemes_are_rejected() {
  let url = Url::parse("camera:///dev/video0").unwrap();
  assert!(InputWrapper::from_url(&url).is_err());
  assert!(OutputWrapper::from_url(&url).is_err());
  assert!(ReplayBackend::from_url(&url).is_err());
}
