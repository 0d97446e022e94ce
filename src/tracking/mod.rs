/// 跟踪系统 (Tracking System)
///
/// 所有单目标跟踪算法都通过 `TrackerAdapter` 暴露同一个接口:
/// - Template:       模板匹配
/// - KalmanTemplate: 卡尔曼预测 + 模板匹配
/// - Static:         始终返回初始框 (测量框架自身开销的基线)
pub mod kalman;
pub mod template;

pub use kalman::{KalmanBoxFilter, KalmanTemplateTracker};
pub use template::{TemplateMatcher, TemplateTracker};

use crate::error::{BenchError, Result};
use crate::renderer::MarkerSymbol;
use crate::types::BoundingBox;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ========== 跟踪器统一接口 ==========

/// 单目标跟踪器 Trait
pub trait TrackerAdapter {
    /// 用首帧和初始框初始化, 构造后只调用一次。返回 false 表示该跟踪器无法运行。
    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> bool;

    /// 每帧调用一次, 不跳帧。`None` 表示本帧目标丢失, 后续帧仍会继续调用。
    fn update(&mut self, frame: &RgbImage) -> Option<BoundingBox>;
}

/// 构造跟踪器实例的工厂
pub type TrackerFactory = Box<dyn Fn() -> Box<dyn TrackerAdapter>>;

/// 一个待测跟踪器的配置 (名称唯一, 配置后不可变)
pub struct TrackerSpec {
    pub name: String,
    pub factory: TrackerFactory,
    pub color: (u8, u8, u8),
    pub symbol: MarkerSymbol,
}

impl TrackerSpec {
    pub fn new<F>(name: &str, color: (u8, u8, u8), symbol: MarkerSymbol, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TrackerAdapter> + 'static,
    {
        Self {
            name: name.to_string(),
            factory: Box::new(factory),
            color,
            symbol,
        }
    }

    pub fn create(&self) -> Box<dyn TrackerAdapter> {
        (self.factory)()
    }
}

impl fmt::Debug for TrackerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerSpec")
            .field("name", &self.name)
            .field("color", &self.color)
            .field("symbol", &self.symbol)
            .finish()
    }
}

// ========== 内置跟踪器 ==========

/// 算法参数 (JSON 配置中的 `params`)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// 搜索窗口相对上一位置的外扩像素
    pub search_radius: u32,
    /// 零均值相关系数阈值, 低于此值判定丢失
    pub match_threshold: f32,
    /// 卡尔曼过程噪声 q
    pub kalman_process_noise: f32,
    /// 卡尔曼观测噪声 r
    pub kalman_observation_noise: f32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            search_radius: 32,
            match_threshold: 0.6,
            kalman_process_noise: 0.1,
            kalman_observation_noise: 1.0,
        }
    }
}

/// 始终返回初始框
#[derive(Default)]
pub struct StaticTracker {
    bbox: Option<BoundingBox>,
}

impl TrackerAdapter for StaticTracker {
    fn init(&mut self, _frame: &RgbImage, bbox: BoundingBox) -> bool {
        self.bbox = Some(bbox);
        true
    }

    fn update(&mut self, _frame: &RgbImage) -> Option<BoundingBox> {
        self.bbox
    }
}

/// 内置算法名称 (配置文件与命令行使用)
pub const BUILTIN_TRACKERS: [&str; 3] = ["Template", "KalmanTemplate", "Static"];

/// 名称 → 构造函数
pub fn builtin_factory(name: &str, params: &TrackerParams) -> Option<TrackerFactory> {
    let params = params.clone();
    let factory: TrackerFactory = match name {
        "Template" => Box::new(move || Box::new(TemplateTracker::new(&params))),
        "KalmanTemplate" => Box::new(move || Box::new(KalmanTemplateTracker::new(&params))),
        "Static" => Box::new(|| Box::new(StaticTracker::default())),
        _ => return None,
    };
    Some(factory)
}

/// 跟踪器名称必须唯一
pub fn ensure_unique_names(specs: &[TrackerSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(BenchError::Config(format!(
                "duplicate tracker name: {}",
                spec.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_factories() {
        let params = TrackerParams::default();
        for name in BUILTIN_TRACKERS {
            assert!(builtin_factory(name, &params).is_some(), "{}", name);
        }
        assert!(builtin_factory("MOSSE", &params).is_none());
    }

    #[test]
    fn test_static_tracker_returns_initial_box() {
        let frame = RgbImage::new(16, 16);
        let bbox = BoundingBox::new_from_xywh(1.0, 2.0, 3.0, 4.0);
        let mut tracker = StaticTracker::default();
        assert!(tracker.init(&frame, bbox));
        assert_eq!(tracker.update(&frame), Some(bbox));
        assert_eq!(tracker.update(&frame), Some(bbox));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let make = |name: &str| {
            TrackerSpec::new(name, (0, 0, 0), MarkerSymbol::Circle, || {
                Box::new(StaticTracker::default())
            })
        };
        assert!(ensure_unique_names(&[make("a"), make("b")]).is_ok());
        assert!(matches!(
            ensure_unique_names(&[make("a"), make("a")]),
            Err(BenchError::Config(_))
        ));
    }
}
