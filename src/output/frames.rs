//! 逐帧图片输出 (无 FFmpeg 编码器时使用)

use super::FrameSink;
use crate::error::{BenchError, Result};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

/// 每帧保存一张 PNG: `<dir>/frame_000000.png`
pub struct ImageSequenceWriter {
    dir: PathBuf,
    next_index: usize,
}

impl ImageSequenceWriter {
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| BenchError::Output {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { dir, next_index: 0 })
    }

    pub fn frames_written(&self) -> usize {
        self.next_index
    }
}

impl FrameSink for ImageSequenceWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.next_index));
        frame.save(&path).map_err(|e| BenchError::Output {
            path,
            reason: e.to_string(),
        })?;
        self.next_index += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
