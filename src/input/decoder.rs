/// 视频文件解码器
/// Video file decoder: every reset re-opens the file, so each tracker sees the
/// exact same frame sequence from frame 0.
use super::decode_filter::RgbFrameFilter;
use super::source::{FrameSource, VideoInfo};
use crate::error::{BenchError, Result};
use crossbeam_channel::{bounded, Receiver};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::stream_info::{find_video_stream_info, StreamInfo};
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// 解码线程与帧源之间的缓冲帧数
const FRAME_QUEUE_DEPTH: usize = 8;

/// 正在运行的一次解码 (一个跟踪器一次)
struct DecodeSession {
    rx: Receiver<RgbImage>,
    worker: JoinHandle<()>,
}

/// FFmpeg 视频文件帧源
pub struct FfmpegSource {
    path: PathBuf,
    info: VideoInfo,
    session: Option<DecodeSession>,
}

impl FfmpegSource {
    /// 打开视频并读取流信息。文件不存在或没有视频流属于致命错误。
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(BenchError::VideoOpen {
                path,
                reason: "file not found".to_string(),
            });
        }

        let url = path_to_url(&path)?;
        let stream = find_video_stream_info(&url).map_err(|e| BenchError::VideoOpen {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let (width, height, nb_frames, fps) = match stream {
            Some(StreamInfo::Video {
                width,
                height,
                nb_frames,
                fps,
                ..
            }) => (width as u32, height as u32, nb_frames, fps as f64),
            _ => {
                return Err(BenchError::VideoOpen {
                    path,
                    reason: "no video stream".to_string(),
                })
            }
        };

        let mut source = Self {
            path,
            info: VideoInfo {
                width,
                height,
                total_frames: nb_frames.max(0) as usize,
                fps: if fps > 0.0 { fps } else { 30.0 },
            },
            session: None,
        };

        // 部分容器不记录帧数, 完整解码一遍计数
        if source.info.total_frames == 0 {
            warn!("⚠️ 容器未记录帧数, 解码一遍计数: {}", source.path.display());
            source.reset()?;
            let mut count = 0;
            while source.next_frame().is_some() {
                count += 1;
            }
            source.info.total_frames = count;
            source.stop();
        }

        info!(
            "📹 视频: {} | {}x{} | {} 帧 | {:.2} fps",
            source.path.display(),
            source.info.width,
            source.info.height,
            source.info.total_frames,
            source.info.fps
        );
        Ok(source)
    }

    /// 结束当前解码会话: 先丢弃接收端, 过滤器发送失败后管线自行退出
    fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            drop(session.rx);
            if session.worker.join().is_err() {
                warn!("⚠️ 解码线程异常退出");
            }
        }
    }

    fn start(&mut self) -> Result<()> {
        let url = path_to_url(&self.path)?;
        let (tx, rx) = bounded::<RgbImage>(FRAME_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = bounded::<std::result::Result<(), String>>(1);

        let worker = std::thread::spawn(move || {
            let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
            let pipe = pipe.filter("decode", Box::new(RgbFrameFilter::new(tx)));
            let out = create_null_output().add_frame_pipeline(pipe);

            // 构建FFmpeg上下文
            let started = FfmpegContext::builder()
                .input(Input::new(url))
                .filter_desc("format=rgb24")
                .output(out)
                .build()
                .map_err(|e| format!("构建失败: {}", e))
                .and_then(|ctx| ctx.start().map_err(|e| format!("启动失败: {}", e)));

            match started {
                Ok(sch) => {
                    let _ = ready_tx.send(Ok(()));
                    // 接收端关闭时过滤器返回错误, wait 会带错误返回, 属正常结束
                    if let Err(e) = sch.wait() {
                        debug!("解码管线结束: {}", e);
                    }
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.session = Some(DecodeSession { rx, worker });
                Ok(())
            }
            Ok(Err(reason)) => {
                let _ = worker.join();
                Err(BenchError::Decoder(reason))
            }
            Err(_) => {
                let _ = worker.join();
                Err(BenchError::Decoder("decode thread exited during startup".to_string()))
            }
        }
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn reset(&mut self) -> Result<()> {
        self.stop();
        self.start()
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        self.session.as_ref()?.rx.recv().ok()
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn path_to_url(path: &Path) -> Result<String> {
    path.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| BenchError::VideoOpen {
            path: path.to_path_buf(),
            reason: "path is not valid UTF-8".to_string(),
        })
}
