//! 进度统计与显示
//! Progress is a pure function of (processed, total, elapsed). The reporter
//! also keeps the ordered history of finished trackers; that state is only
//! rendered, never read back by the runner.

use crate::types::{RunStatus, TrackerRunSummary};
use indexmap::IndexMap;
use std::io::Write;
use std::time::{Duration, Instant};

/// 单帧进度快照
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub tracker_name: String,
    pub processed_frames: usize,
    pub total_frames: usize,
    pub percent: f64,
    pub fps: f64,
    pub frame_time_ms: f64,
    pub elapsed: Duration,
    /// processed_frames == 0 时未定义
    pub estimated_total: Option<Duration>,
    pub remaining: Option<Duration>,
}

impl ProgressSnapshot {
    pub fn compute(
        tracker_name: &str,
        processed_frames: usize,
        total_frames: usize,
        elapsed: Duration,
        fps: f64,
        frame_time_ms: f64,
    ) -> Self {
        let percent = if total_frames > 0 {
            100.0 * processed_frames as f64 / total_frames as f64
        } else {
            0.0
        };
        let estimated_total = estimate_total(processed_frames, total_frames, elapsed);
        let remaining = estimated_total.map(|t| t.saturating_sub(elapsed));

        Self {
            tracker_name: tracker_name.to_string(),
            processed_frames,
            total_frames,
            percent,
            fps,
            frame_time_ms,
            elapsed,
            estimated_total,
            remaining,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_frames > 0 && self.processed_frames >= self.total_frames
    }
}

/// estimated_total = elapsed * total / processed
pub fn estimate_total(processed: usize, total: usize, elapsed: Duration) -> Option<Duration> {
    if processed == 0 {
        return None;
    }
    Some(Duration::from_secs_f64(
        elapsed.as_secs_f64() * total as f64 / processed as f64,
    ))
}

fn fmt_secs(d: Option<Duration>) -> String {
    match d {
        Some(d) => format!("{:.2}s", d.as_secs_f64()),
        None => "--".to_string(),
    }
}

fn fmt_avg(v: Option<f64>, unit: &str) -> String {
    match v {
        Some(v) => format!("{:.2}{}", v, unit),
        None => "N/A".to_string(),
    }
}

/// 正在运行的跟踪器的一行
pub fn render_live_line(s: &ProgressSnapshot) -> String {
    format!(
        "⏳ Processing {}: {} processed frames from {} ({:.0}%) - FPS: {:.0} - Frametime: {:.2} ms - Elapsed time: {:.2}s - Estimated time: {}",
        s.tracker_name,
        s.processed_frames,
        s.total_frames,
        s.percent,
        s.fps,
        s.frame_time_ms,
        s.elapsed.as_secs_f64(),
        fmt_secs(s.remaining),
    )
}

/// 已完成跟踪器的一行
pub fn render_summary_line(s: &TrackerRunSummary) -> String {
    match s.status {
        RunStatus::FailedToStart => format!("❌ {} - {}", s.tracker_name, s.status.name()),
        RunStatus::Finished => format!(
            "✅ {} - Processed Frames: {} - Elapsed Time: {:.2}s - Average FPS: {} - Average Frame Time: {}",
            s.tracker_name,
            s.processed_frames,
            s.elapsed_time_s,
            fmt_avg(s.average_fps, ""),
            fmt_avg(s.average_frame_time_ms, " ms"),
        ),
    }
}

/// 全部结束后的汇总行
pub fn render_final_line(s: &TrackerRunSummary) -> String {
    if s.status == RunStatus::FailedToStart {
        return format!("{}: {}", s.tracker_name, s.status.name());
    }
    let elapsed = Duration::from_secs_f64(s.elapsed_time_s);
    let remaining = estimate_total(s.processed_frames, s.total_frames, elapsed)
        .map(|t| t.saturating_sub(elapsed));
    format!(
        "{}: {} processed frames from {} ({:.0}%) - Elapsed time: {:.2}s    Estimated time: {} - Average FPS: {} - Average Frame Time: {}",
        s.tracker_name,
        s.processed_frames,
        s.total_frames,
        s.progress_percentage(),
        s.elapsed_time_s,
        fmt_secs(remaining),
        fmt_avg(s.average_fps, ""),
        fmt_avg(s.average_frame_time_ms, " ms"),
    )
}

/// 一次渲染的内容: 之前跟踪器的汇总 + 当前跟踪器的实时行
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub history: Vec<String>,
    pub live: String,
    /// 本跟踪器最后一帧, 显示端不应节流丢弃
    pub complete: bool,
}

impl ProgressView {
    pub fn to_text(&self) -> String {
        let mut text = self.history.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&self.live);
        text
    }
}

/// 显示端: 覆盖刷新还是追加由实现决定
pub trait ProgressDisplay {
    fn show(&mut self, view: &ProgressView);

    /// 一个跟踪器结束
    fn tracker_done(&mut self, _summary: &TrackerRunSummary) {}
}

/// 控制台显示 (清屏重绘或逐行追加), 按最小间隔节流
pub struct ConsoleDisplay {
    redraw: bool,
    min_interval: Duration,
    last: Option<Instant>,
}

impl ConsoleDisplay {
    pub fn new(redraw: bool, min_interval: Duration) -> Self {
        Self {
            redraw,
            min_interval,
            last: None,
        }
    }
}

impl ProgressDisplay for ConsoleDisplay {
    fn show(&mut self, view: &ProgressView) {
        let due = self
            .last
            .map_or(true, |t| t.elapsed() >= self.min_interval);
        if !due && !view.complete {
            return;
        }
        self.last = Some(Instant::now());

        let mut out = std::io::stdout().lock();
        if self.redraw {
            // 清屏并回到左上角
            let _ = writeln!(out, "\x1B[2J\x1B[1;1H{}", view.to_text());
        } else {
            let _ = writeln!(out, "{}", view.live);
        }
        let _ = out.flush();
    }

    fn tracker_done(&mut self, summary: &TrackerRunSummary) {
        println!("{} - Done", summary.tracker_name);
        self.last = None;
    }
}

/// 不显示任何内容
#[derive(Debug, Default)]
pub struct SilentDisplay;

impl ProgressDisplay for SilentDisplay {
    fn show(&mut self, _view: &ProgressView) {}
}

/// 进度报告器
pub struct ProgressReporter {
    history: IndexMap<String, TrackerRunSummary>,
    display: Box<dyn ProgressDisplay>,
}

impl ProgressReporter {
    pub fn new(display: Box<dyn ProgressDisplay>) -> Self {
        Self {
            history: IndexMap::new(),
            display,
        }
    }

    pub fn silent() -> Self {
        Self::new(Box::new(SilentDisplay))
    }

    /// 渲染进度快照 (每帧调用一次)
    pub fn render_snapshot(&self, snapshot: &ProgressSnapshot) -> ProgressView {
        ProgressView {
            history: self.history.values().map(render_summary_line).collect(),
            live: render_live_line(snapshot),
            complete: snapshot.is_complete(),
        }
    }

    pub fn emit(&mut self, snapshot: &ProgressSnapshot) {
        let view = self.render_snapshot(snapshot);
        self.display.show(&view);
    }

    /// 记录已完成的跟踪器 (按完成顺序)
    pub fn record_finished(&mut self, summary: &TrackerRunSummary) {
        self.display.tracker_done(summary);
        self.history
            .insert(summary.tracker_name.clone(), summary.clone());
    }

    pub fn history(&self) -> &IndexMap<String, TrackerRunSummary> {
        &self.history
    }

    pub fn render_final_report(&self) -> String {
        self.history
            .values()
            .map(render_final_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
