//! 单个跟踪器的基准运行
//!
//! Idle → Initializing → Running → Finished
//!                  └─────────────→ Aborted (首帧缺失 / init 失败)
//!
//! 每次运行都从视频开头读取, 初始帧也作为第0帧送入 update,
//! 因此 frame_index 与视频物理帧序号一致。

use super::aggregator::ResultAggregator;
use super::progress::{ProgressReporter, ProgressSnapshot};
use crate::error::Result;
use crate::input::FrameSource;
use crate::output::SinkFactory;
use crate::renderer::{annotate_frame, LabelFont};
use crate::tracking::TrackerSpec;
use crate::types::{BoundingBox, FrameResult, TrackerRunSummary};
use image::RgbImage;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Initializing,
    Running,
    Finished,
    Aborted,
}

/// 单次运行共享的输出端
pub struct RunContext<'a> {
    pub aggregator: &'a mut ResultAggregator,
    pub reporter: &'a mut ProgressReporter,
    pub sinks: &'a dyn SinkFactory,
    pub label_font: Option<&'a LabelFont>,
}

/// 对一个跟踪器跑完整段视频
pub struct BenchmarkRunner<'a> {
    source: &'a mut dyn FrameSource,
    initial_bbox: BoundingBox,
    state: RunState,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(source: &'a mut dyn FrameSource, initial_bbox: BoundingBox) -> Self {
        Self {
            source,
            initial_bbox,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// 运行一个跟踪器
    ///
    /// 首帧缺失或 init 失败只影响本跟踪器 (返回 FailedToStart 汇总);
    /// 写入端创建/写入失败是致命错误, 通过 `Err` 返回。
    pub fn run(&mut self, spec: &TrackerSpec, ctx: &mut RunContext<'_>) -> Result<TrackerRunSummary> {
        let info = self.source.info();
        let total_frames = info.total_frames;

        // ========== Initializing ==========
        self.state = RunState::Initializing;
        info!("🎯 开始测试跟踪器: {}", spec.name);

        if let Err(e) = self.source.reset() {
            warn!("⚠️ {}: 视频无法重新打开: {}", spec.name, e);
            return Ok(self.abort(spec, total_frames, ctx));
        }
        let Some(first) = self.source.next_frame() else {
            warn!("⚠️ {}: 无法读取首帧", spec.name);
            return Ok(self.abort(spec, total_frames, ctx));
        };

        let mut tracker = spec.create();
        let initialized = catch_unwind(AssertUnwindSafe(|| tracker.init(&first, self.initial_bbox)))
            .unwrap_or(false);
        if !initialized {
            warn!("⚠️ {}: 初始化失败", spec.name);
            return Ok(self.abort(spec, total_frames, ctx));
        }

        // ========== Running ==========
        self.state = RunState::Running;
        let mut sink = ctx.sinks.create_sink(&spec.name, &info)?;
        let label = ctx.label_font.map(|font| (font, spec.name.as_str()));

        let run_start = Instant::now();
        let mut processed = 0usize;
        let mut fps_sum = 0.0f64;
        let mut frame_time_sum_ms = 0.0f64;
        let mut lost = 0usize;

        let mut next = Some(first);
        while let Some(frame) = next.take() {
            if total_frames > 0 && processed >= total_frames {
                warn!(
                    "⚠️ {}: 解码帧数超过报告的总帧数 {}, 忽略多余帧",
                    spec.name, total_frames
                );
                break;
            }

            let frame_start = Instant::now();
            let bbox = match catch_unwind(AssertUnwindSafe(|| tracker.update(&frame))) {
                Ok(bbox) => bbox,
                Err(_) => {
                    warn!("⚠️ {}: 第 {} 帧 update 异常, 按丢失处理", spec.name, processed);
                    None
                }
            };
            let elapsed = frame_start.elapsed();

            let result = FrameResult::new(&spec.name, processed, bbox, elapsed);
            if result.is_lost() {
                lost += 1;
                debug!("{}: 第 {} 帧目标丢失", spec.name, processed);
            }
            fps_sum += result.fps;
            frame_time_sum_ms += result.frame_time_ms;
            let (fps, frame_time_ms) = (result.fps, result.frame_time_ms);
            ctx.aggregator.record(result);
            processed += 1;

            // update 已结束, 跟踪器看到的始终是未标注的帧
            let mut annotated: RgbImage = frame;
            annotate_frame(&mut annotated, bbox.as_ref(), spec.color, spec.symbol, label);
            sink.write_frame(&annotated)?;

            let snapshot = ProgressSnapshot::compute(
                &spec.name,
                processed,
                total_frames,
                run_start.elapsed(),
                fps,
                frame_time_ms,
            );
            ctx.reporter.emit(&snapshot);

            next = self.source.next_frame();
        }

        sink.finish()?;
        let elapsed = run_start.elapsed();
        if processed < total_frames {
            warn!(
                "⚠️ {}: 视频在第 {} 帧提前结束 (总帧数 {})",
                spec.name, processed, total_frames
            );
        }

        // ========== Finished ==========
        self.state = RunState::Finished;
        let summary = TrackerRunSummary::finished(
            &spec.name,
            total_frames,
            processed,
            elapsed,
            fps_sum,
            frame_time_sum_ms,
        );
        info!(
            "✅ {}: {}/{} 帧, 丢失 {} 帧, 耗时 {:.2}s",
            spec.name, processed, total_frames, lost, summary.elapsed_time_s
        );
        ctx.reporter.record_finished(&summary);
        Ok(summary)
    }

    fn abort(&mut self, spec: &TrackerSpec, total_frames: usize, ctx: &mut RunContext<'_>) -> TrackerRunSummary {
        self.state = RunState::Aborted;
        let summary = TrackerRunSummary::failed_to_start(&spec.name, total_frames);
        ctx.reporter.record_finished(&summary);
        summary
    }
}
