/// 标注视频编码器
/// Annotated video writer: raw rgb24 frames are fed to ffmpeg through a read
/// callback input and encoded into a container chosen by file extension.
use super::FrameSink;
use crate::error::{BenchError, Result};
use crate::input::VideoInfo;
use crossbeam_channel::{bounded, Receiver, Sender};
use ez_ffmpeg::{FfmpegContext, Input, Output};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing::{debug, info};

/// FFERRTAG('E','O','F',' ')
const AVERROR_EOF: i32 = -0x2046_4F45;

/// 编码线程与写入端之间的缓冲帧数
const ENCODE_QUEUE_DEPTH: usize = 8;

/// FFmpeg 视频写入器 (每个跟踪器独占一个)
pub struct FfmpegWriter {
    path: PathBuf,
    width: u32,
    height: u32,
    tx: Option<Sender<Vec<u8>>>,
    worker: Option<JoinHandle<std::result::Result<(), String>>>,
    frames_written: usize,
}

/// 读回调状态: 把整帧字节流切成 FFmpeg 请求的块
struct RawFrameReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl RawFrameReader {
    fn read(&mut self, buf: &mut [u8]) -> i32 {
        if self.pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(next) => {
                    self.pending = next;
                    self.pos = 0;
                }
                // 写入端已关闭: 输入结束
                Err(_) => return AVERROR_EOF,
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        n as i32
    }
}

impl FfmpegWriter {
    /// 创建输出视频, 分辨率与帧率与输入一致
    pub fn create<P: AsRef<Path>>(path: P, info: &VideoInfo, codec: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let url = path
            .to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BenchError::Output {
                path: path.clone(),
                reason: "path is not valid UTF-8".to_string(),
            })?;

        let (tx, rx) = bounded::<Vec<u8>>(ENCODE_QUEUE_DEPTH);
        let video_size = format!("{}x{}", info.width, info.height);
        let framerate = format!("{:.3}", info.fps);
        let codec = codec.to_string();

        let worker = std::thread::spawn(move || {
            let mut reader = RawFrameReader {
                rx,
                pending: Vec::new(),
                pos: 0,
            };
            let input = Input::new_by_read_callback(move |buf: &mut [u8]| reader.read(buf))
                .set_format("rawvideo")
                .set_input_opts(
                    [
                        ("video_size", video_size.as_str()),
                        ("pixel_format", "rgb24"),
                        ("framerate", framerate.as_str()),
                    ]
                    .into(),
                );

            let output = Output::from(url.as_str()).set_video_codec(codec.as_str());

            let sch = FfmpegContext::builder()
                .input(input)
                .filter_desc("format=yuv420p")
                .output(output)
                .build()
                .map_err(|e| format!("构建失败: {}", e))?
                .start()
                .map_err(|e| format!("启动失败: {}", e))?;

            sch.wait().map_err(|e| format!("编码失败: {}", e))
        });

        debug!("🎞️ 输出视频: {}", path.display());
        Ok(Self {
            path,
            width: info.width,
            height: info.height,
            tx: Some(tx),
            worker: Some(worker),
            frames_written: 0,
        })
    }

    fn output_error(&self, reason: String) -> BenchError {
        BenchError::Output {
            path: self.path.clone(),
            reason,
        }
    }
}

impl FrameSink for FfmpegWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(self.output_error(format!(
                "frame size {:?} does not match {}x{}",
                frame.dimensions(),
                self.width,
                self.height
            )));
        }
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| self.output_error("writer already finished".to_string()))?;
        if tx.send(frame.as_raw().clone()).is_err() {
            // 编码线程已退出, 取回其错误信息
            let reason = match self.worker.take().map(|w| w.join()) {
                Some(Ok(Err(e))) => e,
                _ => "encoder stopped".to_string(),
            };
            self.tx = None;
            return Err(self.output_error(reason));
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // 关闭发送端 → 读回调返回 EOF → 编码器冲刷并写尾
        self.tx = None;
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.join() {
            Ok(Ok(())) => {
                info!(
                    "💾 输出视频已保存: {} ({} 帧)",
                    self.path.display(),
                    self.frames_written
                );
                Ok(())
            }
            Ok(Err(reason)) => Err(self.output_error(reason)),
            Err(_) => Err(self.output_error("encoder thread panicked".to_string())),
        }
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        self.tx = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
