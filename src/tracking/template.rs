//! 模板匹配跟踪
//! The initial target patch is located inside a local search window around
//! the previous position; a weak zero-mean correlation counts as a lost frame.

use super::{TrackerAdapter, TrackerParams};
use crate::types::BoundingBox;
use image::imageops::{crop_imm, grayscale};
use image::{GrayImage, RgbImage};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};

/// 模板最小边长 (像素)
const MIN_TEMPLATE_SIDE: u32 = 4;

/// 模板匹配核心, 供多个跟踪器复用
#[derive(Clone, Debug)]
pub struct TemplateMatcher {
    template: Option<GrayImage>,
    search_radius: u32,
    threshold: f32,
}

impl TemplateMatcher {
    pub fn new(search_radius: u32, threshold: f32) -> Self {
        Self {
            template: None,
            search_radius,
            threshold,
        }
    }

    /// 截取目标区域作为模板; 区域越界或过小返回 false
    pub fn init(&mut self, frame: &RgbImage, bbox: &BoundingBox) -> bool {
        let (fw, fh) = frame.dimensions();
        let x = bbox.x() as u32;
        let y = bbox.y() as u32;
        let w = bbox.width() as u32;
        let h = bbox.height() as u32;

        if w < MIN_TEMPLATE_SIDE || h < MIN_TEMPLATE_SIDE || x + w > fw || y + h > fh {
            return false;
        }

        self.template = Some(grayscale(&crop_imm(frame, x, y, w, h).to_image()));
        true
    }

    /// 在 `around` 周围搜索模板, 相关系数低于阈值视为丢失
    pub fn search(&self, frame: &RgbImage, around: &BoundingBox) -> Option<BoundingBox> {
        let template = self.template.as_ref()?;
        let (fw, fh) = frame.dimensions();
        let (tw, th) = template.dimensions();

        let x0 = (around.x() as u32).saturating_sub(self.search_radius);
        let y0 = (around.y() as u32).saturating_sub(self.search_radius);
        let x1 = (around.x() as u32 + tw + self.search_radius).min(fw);
        let y1 = (around.y() as u32 + th + self.search_radius).min(fh);
        if x0 >= x1 || y0 >= y1 || x1 - x0 < tw || y1 - y0 < th {
            return None;
        }

        let window = grayscale(&crop_imm(frame, x0, y0, x1 - x0, y1 - y0).to_image());
        // 误差最小处定位, 再用零均值归一化相关系数判断是否丢失
        let errors = match_template(
            &window,
            template,
            MatchTemplateMethod::SumOfSquaredErrorsNormalized,
        );
        let (dx, dy) = find_extremes(&errors).min_value_location;
        let candidate = crop_imm(&window, dx, dy, tw, th).to_image();
        if zncc(&candidate, template) < self.threshold {
            return None;
        }

        Some(BoundingBox::new_from_xywh(
            (x0 + dx) as f32,
            (y0 + dy) as f32,
            tw as f32,
            th as f32,
        ))
    }
}

/// 零均值归一化互相关, 取值 [-1, 1]; 任一方无纹理时为0
fn zncc(a: &GrayImage, b: &GrayImage) -> f32 {
    let n = a.as_raw().len().min(b.as_raw().len());
    if n == 0 {
        return 0.0;
    }
    let mean = |img: &GrayImage| img.as_raw()[..n].iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let (ma, mb) = (mean(a), mean(b));

    let (mut cov, mut va, mut vb) = (0.0f64, 0.0f64, 0.0f64);
    for (&pa, &pb) in a.as_raw()[..n].iter().zip(&b.as_raw()[..n]) {
        let da = pa as f64 - ma;
        let db = pb as f64 - mb;
        cov += da * db;
        va += da * da;
        vb += db * db;
    }
    if va <= f64::EPSILON || vb <= f64::EPSILON {
        return 0.0;
    }
    (cov / (va * vb).sqrt()) as f32
}

/// 纯模板匹配跟踪器
pub struct TemplateTracker {
    matcher: TemplateMatcher,
    last: Option<BoundingBox>,
}

impl TemplateTracker {
    pub fn new(params: &TrackerParams) -> Self {
        Self {
            matcher: TemplateMatcher::new(params.search_radius, params.match_threshold),
            last: None,
        }
    }
}

impl TrackerAdapter for TemplateTracker {
    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> bool {
        if !self.matcher.init(frame, &bbox) {
            return false;
        }
        self.last = Some(bbox);
        true
    }

    fn update(&mut self, frame: &RgbImage) -> Option<BoundingBox> {
        // 丢失时保留上一位置继续在附近搜索
        let found = self.matcher.search(frame, self.last.as_ref()?)?;
        self.last = Some(found);
        Some(found)
    }
}
