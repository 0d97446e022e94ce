/// FFmpeg解码过滤器模块
/// FFmpeg decode filter: rgb24 frames → RgbImage → bounded channel
use crossbeam_channel::Sender;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;
use tracing::{debug, warn};

/// 解码过滤器: 视频文件 → RGB帧
///
/// 上游滤镜图必须已经把像素格式转换为 `rgb24`。
/// 帧序号必须与视频物理帧一致, 所以遇到空帧/损坏帧不会跳过:
/// 立即关闭发送端并返回错误, 帧源随后返回 `None`, 本次运行到此结束。
/// 接收端被丢弃 (帧源 reset 或释放) 时同样返回错误, 使 FFmpeg 管线提前结束。
pub struct RgbFrameFilter {
    tx: Option<Sender<RgbImage>>,
    pub total_frames: usize,
}

impl RgbFrameFilter {
    pub fn new(tx: Sender<RgbImage>) -> Self {
        Self {
            tx: Some(tx),
            total_frames: 0,
        }
    }

    /// 结束帧流: 接收端读完缓冲后得到 `None`
    fn fail(&mut self, reason: String) -> Result<Option<Frame>, String> {
        warn!("⚠️ 解码中止于第 {} 帧: {}", self.total_frames, reason);
        self.tx = None;
        Err(reason)
    }
}

impl FrameFilter for RgbFrameFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        debug!("✅ 解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        if self.tx.is_none() {
            return Err("frame stream already closed".to_string());
        }
        self.total_frames += 1;

        if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
            return self.fail("empty or corrupt frame".to_string());
        }

        let image = unsafe {
            let w = (*frame.as_ptr()).width;
            let h = (*frame.as_ptr()).height;
            let data = (*frame.as_ptr()).data[0];
            let stride = (*frame.as_ptr()).linesize[0];

            match check_rgb24_layout(w, h, data.is_null(), stride) {
                Ok((w, h, stride)) => rgb24_to_image(data, stride, w, h),
                Err(reason) => return self.fail(reason),
            }
        };

        let Some(tx) = self.tx.as_ref() else {
            return Err("frame stream already closed".to_string());
        };
        // 接收端已关闭: 停止解码
        tx.send(image)
            .map_err(|_| "frame receiver closed".to_string())?;

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        debug!("✅ 解码线程退出 (总帧{})", self.total_frames);
    }
}

/// 校验 rgb24 帧的尺寸与行跨度, 返回 (宽, 高, 跨度)
fn check_rgb24_layout(
    width: i32,
    height: i32,
    data_is_null: bool,
    stride: i32,
) -> Result<(u32, u32, usize), String> {
    if width <= 0 || height <= 0 || data_is_null {
        return Err(format!("invalid frame {}x{}", width, height));
    }
    let row_bytes = width as usize * 3;
    if stride < 0 || (stride as usize) < row_bytes {
        return Err(format!(
            "invalid stride {} for {}x{} rgb24",
            stride, width, height
        ));
    }
    Ok((width as u32, height as u32, stride as usize))
}

/// 按行拷贝 rgb24 平面 (去掉行尾对齐填充)
#[inline]
unsafe fn rgb24_to_image(data: *const u8, stride: usize, width: u32, height: u32) -> RgbImage {
    let row_bytes = width as usize * 3;
    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let line = std::slice::from_raw_parts(data.add(row * stride), row_bytes);
        buffer.extend_from_slice(line);
    }
    // 长度与尺寸严格匹配, from_raw 不会失败
    RgbImage::from_raw(width, height, buffer).unwrap_or_else(|| RgbImage::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_accepts_padded_rows() {
        assert_eq!(check_rgb24_layout(10, 4, false, 32), Ok((10, 4, 32)));
        assert_eq!(check_rgb24_layout(10, 4, false, 30), Ok((10, 4, 30)));
    }

    #[test]
    fn test_layout_rejects_unusable_frames() {
        assert!(check_rgb24_layout(0, 4, false, 32).is_err());
        assert!(check_rgb24_layout(10, -1, false, 32).is_err());
        assert!(check_rgb24_layout(10, 4, true, 32).is_err());
        assert!(check_rgb24_layout(10, 4, false, 29).is_err());
        assert!(check_rgb24_layout(10, 4, false, -30).is_err());
    }

    #[test]
    fn test_bad_frame_ends_stream_instead_of_skipping() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let mut filter = RgbFrameFilter::new(tx);
        filter.tx.as_ref().unwrap().send(RgbImage::new(2, 2)).unwrap();
        filter.total_frames = 2;

        assert!(filter.fail("corrupt frame".to_string()).is_err());
        // 已缓冲的帧仍可读出, 之后帧流结束, 不会出现后续帧顶替坏帧的序号
        assert!(rx.recv().is_ok());
        assert!(rx.recv().is_err());
        assert!(filter.tx.is_none());
    }

    #[test]
    fn test_rows_copied_without_padding() {
        // 2x2, 每行 6 字节有效数据 + 2 字节填充
        let data: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let image = unsafe { rgb24_to_image(data.as_ptr(), 8, 2, 2) };
        assert_eq!(image.as_raw(), &vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }
}
