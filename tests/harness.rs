//! 端到端基准测试: 内存帧源 + 脚本化跟踪器, 导出的CSV用 csv crate 读回校验

use image::RgbImage;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use tracker_bench::annotation::load_initial_bbox;
use tracker_bench::bench::{Benchmark, ProgressReporter};
use tracker_bench::input::{FrameSource, MemorySource, VideoInfo};
use tracker_bench::output::{FrameSink, OutputFormat, OutputPlan, SinkFactory};
use tracker_bench::renderer::MarkerSymbol;
use tracker_bench::tracking::{builtin_factory, TrackerAdapter, TrackerParams, TrackerSpec};
use tracker_bench::{BenchError, BoundingBox, Result, RunStatus};

// ========== 脚本化跟踪器 ==========

/// 始终返回初始框; `lose_at` 中的调用序号返回丢失
struct ScriptedTracker {
    bbox: Option<BoundingBox>,
    calls: usize,
    lose_at: Vec<usize>,
    panic_at: Option<usize>,
}

impl ScriptedTracker {
    fn boxed(lose_at: Vec<usize>, panic_at: Option<usize>) -> Box<dyn TrackerAdapter> {
        Box::new(Self {
            bbox: None,
            calls: 0,
            lose_at,
            panic_at,
        })
    }
}

impl TrackerAdapter for ScriptedTracker {
    fn init(&mut self, _frame: &RgbImage, bbox: BoundingBox) -> bool {
        self.bbox = Some(bbox);
        true
    }

    fn update(&mut self, _frame: &RgbImage) -> Option<BoundingBox> {
        let call = self.calls;
        self.calls += 1;
        if self.panic_at == Some(call) {
            panic!("scripted failure at call {}", call);
        }
        if self.lose_at.contains(&call) {
            return None;
        }
        self.bbox
    }
}

struct FailingInit;

impl TrackerAdapter for FailingInit {
    fn init(&mut self, _frame: &RgbImage, _bbox: BoundingBox) -> bool {
        false
    }

    fn update(&mut self, _frame: &RgbImage) -> Option<BoundingBox> {
        panic!("update after failed init");
    }
}

fn always(name: &str) -> TrackerSpec {
    TrackerSpec::new(name, (255, 0, 0), MarkerSymbol::Circle, || {
        ScriptedTracker::boxed(Vec::new(), None)
    })
}

// ========== 测试输出端 ==========

/// 记录每个跟踪器写入的帧数
#[derive(Clone, Default)]
struct CountingSinks {
    written: Rc<RefCell<HashMap<String, usize>>>,
    finished: Rc<RefCell<Vec<String>>>,
}

struct CountingSink {
    name: String,
    sinks: CountingSinks,
}

impl FrameSink for CountingSink {
    fn write_frame(&mut self, _frame: &RgbImage) -> Result<()> {
        *self.sinks.written.borrow_mut().entry(self.name.clone()).or_default() += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.sinks.finished.borrow_mut().push(self.name.clone());
        Ok(())
    }
}

impl SinkFactory for CountingSinks {
    fn create_sink(&self, tracker_name: &str, _info: &VideoInfo) -> Result<Box<dyn FrameSink>> {
        Ok(Box::new(CountingSink {
            name: tracker_name.to_string(),
            sinks: self.clone(),
        }))
    }
}

struct BrokenSinks;

impl SinkFactory for BrokenSinks {
    fn create_sink(&self, tracker_name: &str, _info: &VideoInfo) -> Result<Box<dyn FrameSink>> {
        Err(BenchError::Output {
            path: tracker_name.into(),
            reason: "disk full".to_string(),
        })
    }
}

/// 报告的总帧数少于实际可解码帧数
struct OverlongSource {
    inner: MemorySource,
    reported: usize,
}

impl FrameSource for OverlongSource {
    fn info(&self) -> VideoInfo {
        VideoInfo {
            total_frames: self.reported,
            ..self.inner.info()
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reset()
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        self.inner.next_frame()
    }
}

/// 第 `fail_at` 帧解码失败: 之后不再产出任何帧
struct FailingDecodeSource {
    inner: MemorySource,
    fail_at: usize,
    yielded: usize,
}

impl FrameSource for FailingDecodeSource {
    fn info(&self) -> VideoInfo {
        self.inner.info()
    }

    fn reset(&mut self) -> Result<()> {
        self.yielded = 0;
        self.inner.reset()
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        if self.yielded >= self.fail_at {
            return None;
        }
        self.yielded += 1;
        self.inner.next_frame()
    }
}

fn initial_bbox() -> BoundingBox {
    BoundingBox::new_from_xywh(10.0, 10.0, 20.0, 20.0)
}

fn ten_frames() -> MemorySource {
    MemorySource::synthetic(64, 64, 10, 30.0)
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, vec!["Tracker", "Frame", "Center", "FPS", "Frame Time"]);
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

// ========== 测试 ==========

#[test]
fn test_ten_frame_run_reports_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = CountingSinks::default();
    let mut source = ten_frames();
    let mut reporter = ProgressReporter::silent();

    let bench = Benchmark::new(vec![always("Always")], initial_bbox()).unwrap();
    let outcome = bench.run(&mut source, &sinks, &mut reporter).unwrap();

    let csv_path = dir.path().join("tracking_results.csv");
    assert_eq!(outcome.results.export(&csv_path).unwrap(), 10);

    let rows = read_rows(&csv_path);
    assert_eq!(rows.len(), 10);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row[0], "Always");
        assert_eq!(row[1], i.to_string());
        assert_eq!(row[2], "(20, 20)");
        assert!(row[3].parse::<f64>().unwrap() > 0.0);
        // 固定4位小数
        assert_eq!(row[4].split('.').nth(1).map(str::len), Some(4));
    }

    let summary = &outcome.summaries["Always"];
    assert_eq!(summary.status, RunStatus::Finished);
    assert_eq!(summary.processed_frames, 10);
    assert_eq!(summary.total_frames, 10);
    assert!(summary.average_fps.unwrap() > 0.0);
    assert!(summary.average_frame_time_ms.unwrap() >= 0.0);

    assert_eq!(sinks.written.borrow()["Always"], 10);
    assert_eq!(*sinks.finished.borrow(), vec!["Always".to_string()]);
}

#[test]
fn test_lost_frame_is_na_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = ten_frames();
    let mut reporter = ProgressReporter::silent();
    let spec = TrackerSpec::new("Flaky", (0, 255, 0), MarkerSymbol::Square, || {
        ScriptedTracker::boxed(vec![4], None)
    });

    let bench = Benchmark::new(vec![spec], initial_bbox()).unwrap();
    let outcome = bench
        .run(&mut source, &CountingSinks::default(), &mut reporter)
        .unwrap();
    let csv_path = dir.path().join("results.csv");
    outcome.results.export(&csv_path).unwrap();

    let rows = read_rows(&csv_path);
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[4][1], "4");
    assert_eq!(rows[4][2], "N/A");
    for (i, row) in rows.iter().enumerate().filter(|(i, _)| *i != 4) {
        assert_eq!(row[2], "(20, 20)", "frame {}", i);
    }
    assert_eq!(outcome.summaries["Flaky"].processed_frames, 10);
}

#[test]
fn test_panicking_update_counts_as_lost() {
    let mut source = ten_frames();
    let mut reporter = ProgressReporter::silent();
    let spec = TrackerSpec::new("Panicky", (0, 0, 255), MarkerSymbol::Cross, || {
        ScriptedTracker::boxed(Vec::new(), Some(2))
    });

    let bench = Benchmark::new(vec![spec], initial_bbox()).unwrap();
    let outcome = bench
        .run(&mut source, &CountingSinks::default(), &mut reporter)
        .unwrap();

    let lost: Vec<_> = outcome
        .results
        .results()
        .iter()
        .filter(|r| r.is_lost())
        .map(|r| r.frame_index)
        .collect();
    assert_eq!(lost, vec![2]);
    assert_eq!(outcome.summaries["Panicky"].processed_frames, 10);
}

#[test]
fn test_init_failure_skips_tracker_and_harness_continues() {
    let sinks = CountingSinks::default();
    let mut source = ten_frames();
    let mut reporter = ProgressReporter::silent();
    let broken = TrackerSpec::new("Broken", (9, 9, 9), MarkerSymbol::Diamond, || {
        Box::new(FailingInit)
    });

    let bench = Benchmark::new(vec![broken, always("Always")], initial_bbox()).unwrap();
    let outcome = bench.run(&mut source, &sinks, &mut reporter).unwrap();

    let broken = &outcome.summaries["Broken"];
    assert_eq!(broken.status, RunStatus::FailedToStart);
    assert_eq!(broken.processed_frames, 0);
    assert_eq!(broken.average_fps, None);
    assert_eq!(outcome.results.rows_for("Broken").count(), 0);

    // 行数 == 已处理帧数之和
    assert_eq!(outcome.results.len(), outcome.total_processed());
    assert_eq!(outcome.results.len(), 10);

    // 未启动的跟踪器不创建写入端
    assert!(!sinks.written.borrow().contains_key("Broken"));

    let order: Vec<_> = reporter.history().keys().cloned().collect();
    assert_eq!(order, vec!["Broken", "Always"]);
    assert!(reporter.render_final_report().contains("Broken: failed to start"));
}

#[test]
fn test_every_tracker_restarts_from_first_frame() {
    let mut source = ten_frames();
    let mut reporter = ProgressReporter::silent();
    let bench = Benchmark::new(vec![always("A"), always("B"), always("C")], initial_bbox()).unwrap();
    let outcome = bench
        .run(&mut source, &CountingSinks::default(), &mut reporter)
        .unwrap();

    for name in ["A", "B", "C"] {
        let indices: Vec<_> = outcome.results.rows_for(name).map(|r| r.frame_index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }
    let names: Vec<_> = outcome.summaries.keys().cloned().collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn test_builtin_trackers_are_deterministic() {
    let params = TrackerParams::default();
    let run_once = || {
        let specs: Vec<_> = ["Template", "KalmanTemplate", "Static"]
            .iter()
            .map(|name| TrackerSpec {
                name: name.to_string(),
                factory: builtin_factory(name, &params).unwrap(),
                color: (255, 255, 0),
                symbol: MarkerSymbol::Circle,
            })
            .collect();
        let mut source = MemorySource::synthetic(96, 64, 12, 30.0);
        let mut reporter = ProgressReporter::silent();
        let bench = Benchmark::new(specs, BoundingBox::new_from_xywh(0.0, 6.0, 24.0, 24.0)).unwrap();
        let outcome = bench
            .run(&mut source, &CountingSinks::default(), &mut reporter)
            .unwrap();
        outcome
            .results
            .results()
            .iter()
            .map(|r| (r.tracker_name.clone(), r.frame_index, r.bbox))
            .collect::<Vec<_>>()
    };

    let first = run_once();
    assert_eq!(first.len(), 36);
    assert_eq!(first, run_once());
}

#[test]
fn test_processed_never_exceeds_reported_total() {
    let mut source = OverlongSource {
        inner: ten_frames(),
        reported: 6,
    };
    let mut reporter = ProgressReporter::silent();
    let bench = Benchmark::new(vec![always("Always")], initial_bbox()).unwrap();
    let outcome = bench
        .run(&mut source, &CountingSinks::default(), &mut reporter)
        .unwrap();

    let summary = &outcome.summaries["Always"];
    assert_eq!(summary.processed_frames, 6);
    assert_eq!(summary.total_frames, 6);
    assert_eq!(summary.progress_percentage(), 100.0);
}

#[test]
fn test_decode_failure_ends_run_without_shifting_frames() {
    let mut source = FailingDecodeSource {
        inner: ten_frames(),
        fail_at: 6,
        yielded: 0,
    };
    let mut reporter = ProgressReporter::silent();
    let bench = Benchmark::new(vec![always("A"), always("B")], initial_bbox()).unwrap();
    let outcome = bench
        .run(&mut source, &CountingSinks::default(), &mut reporter)
        .unwrap();

    for name in ["A", "B"] {
        let summary = &outcome.summaries[name];
        assert_eq!(summary.status, RunStatus::Finished);
        assert_eq!(summary.processed_frames, 6);
        assert_eq!(summary.total_frames, 10);
        let indices: Vec<_> = outcome.results.rows_for(name).map(|r| r.frame_index).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());
    }
    assert_eq!(outcome.results.len(), outcome.total_processed());
}

#[test]
fn test_sink_failure_is_fatal() {
    let mut source = ten_frames();
    let mut reporter = ProgressReporter::silent();
    let bench = Benchmark::new(vec![always("Always")], initial_bbox()).unwrap();
    let result = bench.run(&mut source, &BrokenSinks, &mut reporter);
    assert!(matches!(result, Err(BenchError::Output { .. })));
}

#[test]
fn test_duplicate_tracker_names_rejected() {
    let result = Benchmark::new(vec![always("Same"), always("Same")], initial_bbox());
    assert!(matches!(result, Err(BenchError::Config(_))));
}

#[test]
fn test_frame_sequence_output_writes_annotated_frames() {
    let dir = tempfile::tempdir().unwrap();
    let plan = OutputPlan {
        dir: dir.path().to_path_buf(),
        prefix: "drone_tracking".to_string(),
        format: OutputFormat::Frames,
        codec: "mpeg4".to_string(),
        extension: "mp4".to_string(),
        csv_name: "tracking_results.csv".to_string(),
    };
    plan.prepare().unwrap();

    let mut source = MemorySource::synthetic(64, 64, 4, 30.0);
    let mut reporter = ProgressReporter::silent();
    let bench = Benchmark::new(vec![always("Always")], initial_bbox()).unwrap();
    let outcome = bench.run(&mut source, &plan, &mut reporter).unwrap();
    outcome.results.export(plan.csv_path()).unwrap();

    let frames_dir = plan.frames_dir("Always");
    let written = std::fs::read_dir(&frames_dir).unwrap().count();
    assert_eq!(written, 4);

    // 标记画在 (x+10, y+30) 处, 颜色为跟踪器颜色
    let first = image::open(frames_dir.join("frame_000000.png")).unwrap().to_rgb8();
    assert_eq!(first.get_pixel(26, 46), &image::Rgb([255, 0, 0]));
    assert_eq!(read_rows(&plan.csv_path()).len(), 4);
}

#[test]
fn test_annotation_errors_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = load_initial_bbox(dir.path().join("nope.json"));
    assert!(matches!(missing, Err(BenchError::Annotation { .. })));

    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, r#"{"annotations": []}"#).unwrap();
    assert!(matches!(load_initial_bbox(&empty), Err(BenchError::Annotation { .. })));

    let good = dir.path().join("good.json");
    std::fs::write(&good, r#"{"annotations": [{"bbox": [10, 10, 20, 20]}]}"#).unwrap();
    assert_eq!(load_initial_bbox(&good).unwrap(), initial_bbox());
}
