// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod annotation; // 初始框标注
pub mod bench; // 基准测试运行与汇总
pub mod config; // 命令行与JSON配置
pub mod error; // 错误类型
pub mod input; // 视频输入系统
pub mod output; // 标注输出系统
pub mod renderer; // 标注绘制
pub mod tracking; // 跟踪算法
pub mod types; // 公共数据结构

pub use crate::bench::{Benchmark, BenchOutcome, ProgressReporter, ResultAggregator};
pub use crate::config::{Args, BenchConfig};
pub use crate::error::{BenchError, Result};
pub use crate::input::{FfmpegSource, FrameSource, MemorySource, VideoInfo};
pub use crate::tracking::{TrackerAdapter, TrackerSpec};
pub use crate::types::{BoundingBox, FrameResult, RunStatus, TrackerRunSummary};

/// 本地时间字符串, 各字段之间用 `delimiter` 分隔
pub fn gen_time_string(delimiter: &str) -> String {
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    chrono::Local::now().format(&fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_time_string() {
        let s = gen_time_string("-");
        assert_eq!(s.split('-').count(), 6);
    }
}
