/// 基准测试系统 (Benchmark System)
///
/// - BenchmarkRunner: 单个跟踪器的状态机
/// - ProgressReporter: 实时进度与历史汇总
/// - ResultAggregator: 逐帧结果与CSV导出
/// - Benchmark: 依次运行全部跟踪器
pub mod aggregator;
pub mod progress;
pub mod runner;

pub use aggregator::ResultAggregator;
pub use progress::{
    ConsoleDisplay, ProgressDisplay, ProgressReporter, ProgressSnapshot, ProgressView,
    SilentDisplay,
};
pub use runner::{BenchmarkRunner, RunContext, RunState};

use crate::error::Result;
use crate::input::FrameSource;
use crate::output::SinkFactory;
use crate::renderer::LabelFont;
use crate::tracking::{ensure_unique_names, TrackerSpec};
use crate::types::{BoundingBox, TrackerRunSummary};
use indexmap::IndexMap;
use tracing::info;

/// 一次完整基准测试的结果
#[derive(Debug, Default)]
pub struct BenchOutcome {
    /// 按运行顺序, 以跟踪器名称为键
    pub summaries: IndexMap<String, TrackerRunSummary>,
    pub results: ResultAggregator,
}

impl BenchOutcome {
    /// CSV行数必须等于各跟踪器处理帧数之和
    pub fn total_processed(&self) -> usize {
        self.summaries.values().map(|s| s.processed_frames).sum()
    }
}

/// 依次 (不并发) 对每个跟踪器跑完整段视频
pub struct Benchmark {
    specs: Vec<TrackerSpec>,
    initial_bbox: BoundingBox,
    label_font: Option<LabelFont>,
}

impl Benchmark {
    /// 名称重复时报错
    pub fn new(specs: Vec<TrackerSpec>, initial_bbox: BoundingBox) -> Result<Self> {
        ensure_unique_names(&specs)?;
        Ok(Self {
            specs,
            initial_bbox,
            label_font: None,
        })
    }

    pub fn with_label_font(mut self, font: LabelFont) -> Self {
        self.label_font = Some(font);
        self
    }

    /// 运行全部跟踪器; 单个跟踪器启动失败不影响其余跟踪器
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        sinks: &dyn SinkFactory,
        reporter: &mut ProgressReporter,
    ) -> Result<BenchOutcome> {
        let mut outcome = BenchOutcome::default();
        info!(
            "🚀 开始基准测试: {} 个跟踪器, 初始框 ({}, {}, {}, {})",
            self.specs.len(),
            self.initial_bbox.x(),
            self.initial_bbox.y(),
            self.initial_bbox.width(),
            self.initial_bbox.height()
        );

        for spec in &self.specs {
            let mut ctx = RunContext {
                aggregator: &mut outcome.results,
                reporter: &mut *reporter,
                sinks,
                label_font: self.label_font.as_ref(),
            };
            let summary = BenchmarkRunner::new(&mut *source, self.initial_bbox).run(spec, &mut ctx)?;
            outcome.summaries.insert(spec.name.clone(), summary);
        }

        info!(
            "🏁 基准测试完成: {} 个跟踪器, {} 条帧记录",
            outcome.summaries.len(),
            outcome.results.len()
        );
        Ok(outcome)
    }
}
