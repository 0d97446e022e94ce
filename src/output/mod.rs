/// 输出系统 (Output System)
///
/// - FrameSink: 每个跟踪器独占的标注帧写入端
/// - FfmpegWriter: 标注视频 (与输入同分辨率/帧率)
/// - ImageSequenceWriter: 逐帧 PNG
/// - OutputPlan: 根据输出格式为每个跟踪器创建写入端
pub mod encoder;
pub mod frames;

pub use encoder::FfmpegWriter;
pub use frames::ImageSequenceWriter;

use crate::error::{BenchError, Result};
use crate::input::VideoInfo;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 标注帧写入端
///
/// `finish` 之后资源即释放; 未调用 `finish` 直接丢弃也必须释放资源。
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

/// 丢弃所有帧 (只要CSV报表时)
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn write_frame(&mut self, _frame: &RgbImage) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// 标注输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 每个跟踪器一个视频文件
    Video,
    /// 每个跟踪器一个 PNG 帧目录
    Frames,
    /// 不输出标注帧
    None,
}

/// 为每个跟踪器创建写入端
pub trait SinkFactory {
    fn create_sink(&self, tracker_name: &str, info: &VideoInfo) -> Result<Box<dyn FrameSink>>;
}

/// 输出目录布局: `<dir>/<prefix>_<tracker>.<ext>` 与 `<dir>/<csv_name>`
#[derive(Debug, Clone)]
pub struct OutputPlan {
    pub dir: PathBuf,
    pub prefix: String,
    pub format: OutputFormat,
    pub codec: String,
    pub extension: String,
    pub csv_name: String,
}

impl OutputPlan {
    /// 创建输出目录并确认可写, 失败属于致命错误 (在任何输出之前)
    pub fn prepare(&self) -> Result<()> {
        let err = |reason: String| BenchError::Output {
            path: self.dir.clone(),
            reason,
        };
        fs::create_dir_all(&self.dir).map_err(|e| err(e.to_string()))?;
        let marker = self.dir.join(".write_check");
        fs::write(&marker, b"").map_err(|e| err(format!("directory not writable: {}", e)))?;
        let _ = fs::remove_file(&marker);
        Ok(())
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(&self.csv_name)
    }

    pub fn video_path(&self, tracker_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", self.prefix, tracker_name, self.extension))
    }

    pub fn frames_dir(&self, tracker_name: &str) -> PathBuf {
        self.dir.join(format!("{}_{}", self.prefix, tracker_name))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SinkFactory for OutputPlan {
    fn create_sink(&self, tracker_name: &str, info: &VideoInfo) -> Result<Box<dyn FrameSink>> {
        Ok(match self.format {
            OutputFormat::Video => Box::new(FfmpegWriter::create(
                self.video_path(tracker_name),
                info,
                &self.codec,
            )?),
            OutputFormat::Frames => {
                Box::new(ImageSequenceWriter::create(self.frames_dir(tracker_name))?)
            }
            OutputFormat::None => Box::new(NullSink),
        })
    }
}
