//! 结果汇总与CSV导出
//! All frame results stay in memory in run order and are written in one batch
//! by `export`; an interrupted run exports nothing.

use crate::error::{BenchError, Result};
use crate::types::FrameResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// CSV表头
pub const CSV_HEADER: [&str; 5] = ["Tracker", "Frame", "Center", "FPS", "Frame Time"];

/// 数值列小数位数
pub const CSV_PRECISION: usize = 4;

#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<FrameResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: FrameResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[FrameResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn rows_for<'a>(&'a self, tracker_name: &'a str) -> impl Iterator<Item = &'a FrameResult> + 'a {
        self.results
            .iter()
            .filter(move |r| r.tracker_name == tracker_name)
    }

    /// 按记录顺序写出全部行
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for r in &self.results {
            wtr.write_record([
                r.tracker_name.clone(),
                r.frame_index.to_string(),
                r.center_label(),
                format!("{:.*}", CSV_PRECISION, r.fps),
                format!("{:.*}", CSV_PRECISION, r.frame_time_ms),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// 导出CSV报表, 返回数据行数
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| BenchError::Output {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.write_csv(BufWriter::new(file))?;
        info!("📊 CSV报表已导出: {} ({} 行)", path.display(), self.results.len());
        Ok(self.results.len())
    }
}
