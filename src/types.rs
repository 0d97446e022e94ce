//! 基准测试数据结构定义
//! Data structures shared by the runner, the aggregator and the renderer

use std::fmt;
use std::time::Duration;

/// CSV与进度输出中"中心点不可用"的占位符
pub const CENTER_UNAVAILABLE: &str = "N/A";

/// 轴对齐边界框 (像素坐标, 左上角 + 宽高)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl BoundingBox {
    /// 负值被截断为0
    pub fn new_from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: x.max(0.0),
            y: y.max(0.0),
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn xmax(&self) -> f32 {
        self.x + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.y + self.height
    }

    /// 中心点, 向零截断为整数像素
    pub fn center(&self) -> Center {
        Center {
            x: ((self.x + self.xmax()) / 2.0) as i32,
            y: ((self.y + self.ymax()) / 2.0) as i32,
        }
    }

    /// 裁剪到图像范围内 (宽高至少1像素)
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Self {
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        let x = self.x.min((fw - 1.0).max(0.0));
        let y = self.y.min((fh - 1.0).max(0.0));
        let width = self.width.min(fw - x).max(1.0);
        let height = self.height.min(fh - y).max(1.0);
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// 边界框中心点 (整数像素)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Center {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for Center {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 单帧跟踪结果, 创建后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub tracker_name: String,
    /// 在本次运行中从0开始递增, 与视频物理帧序号一致
    pub frame_index: usize,
    /// None 表示该帧目标丢失
    pub bbox: Option<BoundingBox>,
    pub fps: f64,
    pub frame_time_ms: f64,
}

impl FrameResult {
    pub fn new(tracker_name: &str, frame_index: usize, bbox: Option<BoundingBox>, elapsed: Duration) -> Self {
        // Instant 精度不足时避免 1/0
        let secs = elapsed.as_secs_f64().max(1e-9);
        Self {
            tracker_name: tracker_name.to_string(),
            frame_index,
            bbox,
            fps: 1.0 / secs,
            frame_time_ms: secs * 1000.0,
        }
    }

    pub fn center(&self) -> Option<Center> {
        self.bbox.map(|b| b.center())
    }

    /// `(x, y)` 或 `N/A`
    pub fn center_label(&self) -> String {
        match self.center() {
            Some(c) => c.to_string(),
            None => CENTER_UNAVAILABLE.to_string(),
        }
    }

    pub fn is_lost(&self) -> bool {
        self.bbox.is_none()
    }
}

/// 跟踪器运行结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// 完整跑完整段视频
    Finished,
    /// 首帧读取失败或 init 失败, 未产生任何帧结果
    FailedToStart,
}

impl RunStatus {
    pub fn name(&self) -> &str {
        match self {
            RunStatus::Finished => "finished",
            RunStatus::FailedToStart => "failed to start",
        }
    }
}

/// 单个跟踪器的运行汇总, 每个跟踪器一份
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerRunSummary {
    pub tracker_name: String,
    pub status: RunStatus,
    pub total_frames: usize,
    pub processed_frames: usize,
    pub elapsed_time_s: f64,
    /// processed_frames == 0 时为 None
    pub average_fps: Option<f64>,
    pub average_frame_time_ms: Option<f64>,
}

impl TrackerRunSummary {
    /// 由累计和计算平均值, 零帧时平均值未定义
    pub fn finished(
        tracker_name: &str,
        total_frames: usize,
        processed_frames: usize,
        elapsed: Duration,
        fps_sum: f64,
        frame_time_sum_ms: f64,
    ) -> Self {
        let (average_fps, average_frame_time_ms) = if processed_frames > 0 {
            let n = processed_frames as f64;
            (Some(fps_sum / n), Some(frame_time_sum_ms / n))
        } else {
            (None, None)
        };

        Self {
            tracker_name: tracker_name.to_string(),
            status: RunStatus::Finished,
            total_frames,
            processed_frames,
            elapsed_time_s: elapsed.as_secs_f64(),
            average_fps,
            average_frame_time_ms,
        }
    }

    pub fn failed_to_start(tracker_name: &str, total_frames: usize) -> Self {
        Self {
            tracker_name: tracker_name.to_string(),
            status: RunStatus::FailedToStart,
            total_frames,
            processed_frames: 0,
            elapsed_time_s: 0.0,
            average_fps: None,
            average_frame_time_ms: None,
        }
    }

    /// 完成百分比 (total_frames 为0时按0处理)
    pub fn progress_percentage(&self) -> f64 {
        if self.total_frames == 0 {
            0.0
        } else {
            100.0 * self.processed_frames as f64 / self.total_frames as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_truncates() {
        let bbox = BoundingBox::new_from_xywh(10.0, 10.0, 20.0, 20.0);
        assert_eq!(bbox.center(), Center { x: 20, y: 20 });

        let bbox = BoundingBox::new_from_xywh(0.0, 0.0, 3.0, 5.0);
        assert_eq!(bbox.center(), Center { x: 1, y: 2 });
    }

    #[test]
    fn test_center_label() {
        let hit = FrameResult::new(
            "t",
            0,
            Some(BoundingBox::new_from_xywh(10.0, 10.0, 20.0, 20.0)),
            Duration::from_millis(2),
        );
        assert_eq!(hit.center_label(), "(20, 20)");

        let lost = FrameResult::new("t", 1, None, Duration::from_millis(2));
        assert_eq!(lost.center_label(), CENTER_UNAVAILABLE);
        assert!(lost.is_lost());
    }

    #[test]
    fn test_fps_positive_for_zero_duration() {
        let r = FrameResult::new("t", 0, None, Duration::ZERO);
        assert!(r.fps.is_finite() && r.fps > 0.0);
        assert!(r.frame_time_ms > 0.0);
    }

    #[test]
    fn test_zero_frame_summary_has_no_averages() {
        let s = TrackerRunSummary::finished("t", 10, 0, Duration::from_secs(1), 0.0, 0.0);
        assert_eq!(s.average_fps, None);
        assert_eq!(s.average_frame_time_ms, None);

        let s = TrackerRunSummary::finished("t", 10, 4, Duration::from_secs(1), 400.0, 10.0);
        assert_eq!(s.average_fps, Some(100.0));
        assert_eq!(s.average_frame_time_ms, Some(2.5));
    }

    #[test]
    fn test_clamp_to_frame() {
        let b = BoundingBox::new_from_xywh(90.0, 90.0, 50.0, 50.0).clamp_to(100, 100);
        assert_eq!(b.xmax(), 100.0);
        assert_eq!(b.ymax(), 100.0);
    }
}
