//! 帧源接口
//! Sequential frame source shared by every tracker run

use image::RgbImage;

use crate::error::Result;

/// 打开视频后不变的属性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub total_frames: usize,
    pub fps: f64,
}

/// 顺序解码的帧源
///
/// 每个跟踪器开始前必须调用 `reset`, 保证所有跟踪器看到完全相同的帧序列。
/// `next_frame` 在流结束或解码失败时返回 `None`, 而不是报错。
pub trait FrameSource {
    fn info(&self) -> VideoInfo;

    /// 回到第0帧 (幂等)
    fn reset(&mut self) -> Result<()>;

    fn next_frame(&mut self) -> Option<RgbImage>;
}

/// 预加载帧源 (合成视频 / 测试)
pub struct MemorySource {
    frames: Vec<RgbImage>,
    fps: f64,
    cursor: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            // 未 reset 前不产出帧
            cursor: usize::MAX,
        }
    }

    /// 纯色背景上移动的方块, 用于无视频文件时的演示
    pub fn synthetic(width: u32, height: u32, frame_count: usize, fps: f64) -> Self {
        let frames = (0..frame_count)
            .map(|i| {
                let offset = (i as u32 * 2) % width.max(1);
                RgbImage::from_fn(width, height, |x, y| {
                    let in_square = x >= offset && x < offset + 16 && y >= 10 && y < 26;
                    if in_square {
                        image::Rgb([255, 255, 255])
                    } else {
                        image::Rgb([((x * 255) / width.max(1)) as u8, ((y * 255) / height.max(1)) as u8, 64])
                    }
                })
            })
            .collect();
        Self::new(frames, fps)
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> VideoInfo {
        let (width, height) = self
            .frames
            .first()
            .map(|f| f.dimensions())
            .unwrap_or((0, 0));
        VideoInfo {
            width,
            height,
            total_frames: self.frames.len(),
            fps: self.fps,
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        let frame = self.frames.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(frame)
    }
}
