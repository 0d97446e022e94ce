/// 视频输入系统 (Video Input System)
///
/// - FrameSource: 顺序帧源接口 (reset → next_frame ... → None)
/// - FfmpegSource: 视频文件解码器 (每次 reset 重新打开文件)
/// - RgbFrameFilter: 解码帧 → RgbImage
/// - MemorySource: 预加载帧源 (合成视频/测试)
pub mod decode_filter;
pub mod decoder;
pub mod source;

pub use decode_filter::RgbFrameFilter;
pub use decoder::FfmpegSource;
pub use source::{FrameSource, MemorySource, VideoInfo};
