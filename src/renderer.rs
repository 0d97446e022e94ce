//! 标注渲染
//! Draws each tracker's marker next to its tracked box on output frames.
//! Nothing drawn here feeds back into tracking.

use crate::error::{BenchError, Result};
use crate::types::BoundingBox;
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut,
    draw_text_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 标记边长 (像素)
pub const MARKER_SIZE: i32 = 12;

/// 标记相对边界框左上角的偏移
const MARKER_OFFSET: (i32, i32) = (10, 30);

/// 跟踪器标记形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerSymbol {
    Circle,
    Square,
    Cross,
    Diamond,
}

/// 可选的名称标签字体
pub struct LabelFont {
    font: FontVec,
    scale: PxScale,
}

impl LabelFont {
    /// 加载 TTF/OTF 字体文件
    pub fn load<P: AsRef<Path>>(path: P, size: f32) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| {
            BenchError::Config(format!("invalid font {}: {}", path.display(), e))
        })?;
        Ok(Self {
            font,
            scale: PxScale::from(size),
        })
    }
}

/// 在 `position` (标记左上角) 画一个固定大小的标记
pub fn draw_marker(frame: &mut RgbImage, position: (i32, i32), color: (u8, u8, u8), symbol: MarkerSymbol) {
    let (x, y) = position;
    if !marker_visible(frame, position) {
        return;
    }
    let color = Rgb([color.0, color.1, color.2]);
    let half = MARKER_SIZE / 2;
    let (cx, cy) = (x + half, y + half);

    match symbol {
        MarkerSymbol::Circle => draw_filled_circle_mut(frame, (cx, cy), half, color),
        MarkerSymbol::Square => draw_filled_rect_mut(
            frame,
            Rect::at(x, y).of_size(MARKER_SIZE as u32, MARKER_SIZE as u32),
            color,
        ),
        MarkerSymbol::Cross => {
            // 两像素宽的 X
            for d in 0..2 {
                let d = d as f32;
                draw_line_segment_mut(
                    frame,
                    (x as f32 + d, y as f32),
                    ((x + MARKER_SIZE) as f32 + d, (y + MARKER_SIZE) as f32),
                    color,
                );
                draw_line_segment_mut(
                    frame,
                    ((x + MARKER_SIZE) as f32 - d, y as f32),
                    (x as f32 - d, (y + MARKER_SIZE) as f32),
                    color,
                );
            }
        }
        MarkerSymbol::Diamond => draw_polygon_mut(
            frame,
            &[
                Point::new(cx, y),
                Point::new(x + MARKER_SIZE, cy),
                Point::new(cx, y + MARKER_SIZE),
                Point::new(x, cy),
            ],
            color,
        ),
    }
}

/// 标记位置: 边界框左上角 + 固定偏移 (坐标极大时饱和)
pub fn marker_position(bbox: &BoundingBox) -> (i32, i32) {
    (
        (bbox.x() as i32).saturating_add(MARKER_OFFSET.0),
        (bbox.y() as i32).saturating_add(MARKER_OFFSET.1),
    )
}

/// 标记与画面是否有交集; 完全在画面外时不绘制
fn marker_visible(frame: &RgbImage, (x, y): (i32, i32)) -> bool {
    let (w, h) = frame.dimensions();
    i64::from(x) < i64::from(w)
        && i64::from(y) < i64::from(h)
        && x.saturating_add(MARKER_SIZE) >= 0
        && y.saturating_add(MARKER_SIZE) >= 0
}

/// 标注一帧; 目标丢失 (`bbox == None`) 时原样输出
pub fn annotate_frame(
    frame: &mut RgbImage,
    bbox: Option<&BoundingBox>,
    color: (u8, u8, u8),
    symbol: MarkerSymbol,
    label: Option<(&LabelFont, &str)>,
) {
    let Some(bbox) = bbox else {
        return;
    };
    let (x, y) = marker_position(bbox);
    if !marker_visible(frame, (x, y)) {
        return;
    }
    draw_marker(frame, (x, y), color, symbol);

    if let Some((font, text)) = label {
        draw_text_mut(
            frame,
            Rgb([color.0, color.1, color.2]),
            x + MARKER_SIZE + 4,
            y,
            font.scale,
            &font.font,
            text,
        );
    }
}
