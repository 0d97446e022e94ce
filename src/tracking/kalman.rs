//! 卡尔曼平滑模板跟踪
//! Template matching around a Kalman-predicted box; the filter keeps coasting
//! through lost frames so the search window follows the target's motion.

use super::template::TemplateMatcher;
use super::{TrackerAdapter, TrackerParams};
use crate::types::BoundingBox;
use image::RgbImage;

// ========== 卡尔曼滤波器 ==========

/// 简化卡尔曼滤波器 (单个边界框的位置和尺寸平滑)
/// 状态向量: [cx, cy, w, h, vx, vy, vw, vh], 协方差简化为对角阵
#[derive(Clone, Debug)]
pub struct KalmanBoxFilter {
    state: [f32; 8],
    p: [f32; 8],
    /// 过程噪声 (越小越平滑)
    q: f32,
    /// 观测噪声 (越大越平滑)
    r: f32,
    /// 每帧保留的速度比例
    velocity_decay: f32,
}

impl KalmanBoxFilter {
    pub fn new(bbox: &BoundingBox, q: f32, r: f32) -> Self {
        let c = Self::measure(bbox);
        Self {
            state: [c[0], c[1], c[2], c[3], 0.0, 0.0, 0.0, 0.0],
            p: [10.0; 8],
            q,
            r,
            velocity_decay: 0.95,
        }
    }

    fn measure(bbox: &BoundingBox) -> [f32; 4] {
        [
            bbox.x() + bbox.width() / 2.0,
            bbox.y() + bbox.height() / 2.0,
            bbox.width(),
            bbox.height(),
        ]
    }

    /// 匀速模型 + 速度衰减
    pub fn predict(&mut self) {
        for v in 4..8 {
            self.state[v] *= self.velocity_decay;
        }
        for i in 0..4 {
            self.state[i] += self.state[i + 4];
        }
        for p in self.p.iter_mut() {
            *p += self.q;
        }
    }

    /// 融合观测值; 残差大时 (跳变) 更信任预测
    pub fn update(&mut self, bbox: &BoundingBox) {
        let z = Self::measure(bbox);
        let y = [
            z[0] - self.state[0],
            z[1] - self.state[1],
            z[2] - self.state[2],
            z[3] - self.state[3],
        ];

        let residual = (y[0] * y[0] + y[1] * y[1]).sqrt();
        let r = if residual > 10.0 { self.r * 3.0 } else { self.r };

        for i in 0..4 {
            let k = self.p[i] / (self.p[i] + r);
            let kv = self.p[i + 4] / (self.p[i + 4] + r * 10.0);
            self.state[i] += k * y[i];
            self.state[i + 4] += kv * y[i];
            self.p[i] *= 1.0 - k;
            self.p[i + 4] *= 1.0 - kv;
        }
    }

    pub fn state_bbox(&self) -> BoundingBox {
        let w = self.state[2].max(1.0);
        let h = self.state[3].max(1.0);
        BoundingBox::new_from_xywh(self.state[0] - w / 2.0, self.state[1] - h / 2.0, w, h)
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.state[4], self.state[5])
    }
}

// ========== 跟踪器 ==========

pub struct KalmanTemplateTracker {
    matcher: TemplateMatcher,
    filter: Option<KalmanBoxFilter>,
    process_noise: f32,
    observation_noise: f32,
}

impl KalmanTemplateTracker {
    pub fn new(params: &TrackerParams) -> Self {
        Self {
            matcher: TemplateMatcher::new(params.search_radius, params.match_threshold),
            filter: None,
            process_noise: params.kalman_process_noise,
            observation_noise: params.kalman_observation_noise,
        }
    }
}

impl TrackerAdapter for KalmanTemplateTracker {
    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> bool {
        if !self.matcher.init(frame, &bbox) {
            return false;
        }
        self.filter = Some(KalmanBoxFilter::new(
            &bbox,
            self.process_noise,
            self.observation_noise,
        ));
        true
    }

    fn update(&mut self, frame: &RgbImage) -> Option<BoundingBox> {
        let filter = self.filter.as_mut()?;
        filter.predict();
        let predicted = filter.state_bbox();

        let found = self.matcher.search(frame, &predicted)?;
        filter.update(&found);
        Some(filter.state_bbox().clamp_to(frame.width(), frame.height()))
    }
}
