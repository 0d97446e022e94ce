//! 初始框标注读取
//! COCO 风格 JSON: `{"annotations": [{"bbox": [x, y, w, h], ...}, ...]}`,
//! 只使用第一条记录。

use crate::error::{BenchError, Result};
use crate::types::BoundingBox;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct AnnotationFile {
    annotations: Vec<AnnotationRecord>,
}

#[derive(Debug, Deserialize)]
struct AnnotationRecord {
    bbox: [f32; 4],
}

/// 从 JSON 文本解析第一条标注的边界框
pub fn parse_initial_bbox(json: &str) -> std::result::Result<BoundingBox, String> {
    let file: AnnotationFile = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let first = file
        .annotations
        .first()
        .ok_or_else(|| "no annotation records".to_string())?;

    let [x, y, w, h] = first.bbox;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("degenerate bbox [{}, {}, {}, {}]", x, y, w, h));
    }
    Ok(BoundingBox::new_from_xywh(x, y, w, h))
}

/// 读取标注文件; 文件缺失、格式错误或没有记录都属于致命错误
pub fn load_initial_bbox<P: AsRef<Path>>(path: P) -> Result<BoundingBox> {
    let path = path.as_ref();
    let err = |reason: String| BenchError::Annotation {
        path: path.to_path_buf(),
        reason,
    };

    let json = fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
    let bbox = parse_initial_bbox(&json).map_err(err)?;
    info!(
        "📍 初始框: ({}, {}, {}, {}) 来自 {}",
        bbox.x(),
        bbox.y(),
        bbox.width(),
        bbox.height(),
        path.display()
    );
    Ok(bbox)
}
