//! 基准测试错误类型
//! Harness-fatal errors. Per-frame and per-run failures are carried as data
//! (lost-target rows, failed-to-start summaries) and never surface here.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// 视频文件不存在或无法打开
    #[error("failed to open video {path}: {reason}")]
    VideoOpen { path: PathBuf, reason: String },

    /// 解码管线构建/启动失败
    #[error("decoder setup failed: {0}")]
    Decoder(String),

    /// 标注文件缺失或格式错误
    #[error("annotation error ({path}): {reason}")]
    Annotation { path: PathBuf, reason: String },

    /// 跟踪器配置错误 (未知名称、重复名称等)
    #[error("configuration error: {0}")]
    Config(String),

    /// 输出目录/视频写入失败
    #[error("output error ({path}): {reason}")]
    Output { path: PathBuf, reason: String },

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
