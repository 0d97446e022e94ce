//! 基准测试配置
//! 命令行参数 (clap) + JSON 配置文件 (跟踪器颜色、标记与算法参数)

use crate::error::{BenchError, Result};
use crate::output::{OutputFormat, OutputPlan};
use crate::renderer::MarkerSymbol;
use crate::tracking::{builtin_factory, ensure_unique_names, TrackerParams, TrackerSpec, BUILTIN_TRACKERS};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "单目标跟踪器基准测试", long_about = None)]
pub struct Args {
    /// 输入视频
    #[arg(short, long)]
    pub video: PathBuf,

    /// 标注文件 (COCO 风格 JSON, 取第一条 bbox 作为初始框)
    #[arg(short, long)]
    pub annotations: PathBuf,

    /// 输出目录 (标注视频与CSV报表)
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// 参与测试的跟踪器, 逗号分隔 (默认: 配置文件中的全部跟踪器)
    #[arg(short, long, value_delimiter = ',')]
    pub trackers: Option<Vec<String>>,

    /// JSON 配置文件, 不存在时自动创建
    #[arg(short, long, default_value = "tracker_bench.json")]
    pub config: PathBuf,

    /// 标注输出格式
    #[arg(long, value_enum, default_value = "video")]
    pub output_format: OutputFormat,

    /// 输出视频编码器
    #[arg(long, default_value = "mpeg4")]
    pub codec: String,

    /// 标签字体 (TTF/OTF); 不指定则只画标记
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 标签字号 (像素)
    #[arg(long, default_value_t = 16.0)]
    pub font_size: f32,

    /// 进度刷新最小间隔 (毫秒)
    #[arg(long, default_value_t = 100)]
    pub refresh_ms: u64,

    /// 逐行追加进度而不是清屏刷新
    #[arg(long)]
    pub append_progress: bool,
}

impl Args {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn output_plan(&self, config: &BenchConfig) -> OutputPlan {
        OutputPlan {
            dir: self.output_dir.clone(),
            prefix: config.output_prefix.clone(),
            format: self.output_format,
            codec: self.codec.clone(),
            extension: "mp4".to_string(),
            csv_name: config.csv_name.clone(),
        }
    }
}

/// 单个跟踪器的显示配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerEntry {
    pub name: String,
    /// RGB
    pub color: [u8; 3],
    pub symbol: MarkerSymbol,
}

impl TrackerEntry {
    fn new(name: &str, color: [u8; 3], symbol: MarkerSymbol) -> Self {
        Self {
            name: name.to_string(),
            color,
            symbol,
        }
    }
}

/// 未在配置中列出的跟踪器依次使用的颜色
const FALLBACK_COLORS: [[u8; 3]; 5] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [0, 255, 255],
    [255, 0, 255],
];

/// JSON 配置文件
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    // === 跟踪器 ===
    pub trackers: Vec<TrackerEntry>,
    pub params: TrackerParams,

    // === 输出 ===
    pub output_prefix: String,
    pub csv_name: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            trackers: vec![
                TrackerEntry::new("Template", [255, 0, 0], MarkerSymbol::Circle),
                TrackerEntry::new("KalmanTemplate", [0, 255, 0], MarkerSymbol::Square),
                TrackerEntry::new("Static", [0, 0, 255], MarkerSymbol::Cross),
            ],
            params: TrackerParams::default(),
            output_prefix: "drone_tracking".to_string(),
            csv_name: "tracking_results.csv".to_string(),
        }
    }
}

impl BenchConfig {
    /// 从JSON文件加载配置; 文件不存在时写入默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("📝 配置文件不存在, 创建默认配置: {}", path.display());
            let config = Self::default();
            if let Err(e) = config.save(path) {
                // 只读目录下仍可用默认值运行
                warn!("⚠️ 默认配置未能保存: {}", e);
            }
            return Ok(config);
        }

        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            BenchError::Config(format!("{}: {}", path.display(), e))
        })?;
        info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!("💾 配置已保存到 {}", path.as_ref().display());
        Ok(())
    }

    fn entry(&self, name: &str) -> Option<&TrackerEntry> {
        self.trackers.iter().find(|e| e.name == name)
    }

    /// 按名称构建待测跟踪器列表 (`selected` 为空时使用配置中的全部跟踪器)
    ///
    /// 未知名称或重复名称是致命错误。
    pub fn build_specs(&self, selected: Option<&[String]>) -> Result<Vec<TrackerSpec>> {
        let names: Vec<String> = match selected {
            Some(names) => names.iter().map(|n| n.trim().to_string()).collect(),
            None => self.trackers.iter().map(|e| e.name.clone()).collect(),
        };
        if names.is_empty() {
            return Err(BenchError::Config("no trackers selected".to_string()));
        }

        let mut specs = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let factory = builtin_factory(name, &self.params).ok_or_else(|| {
                BenchError::Config(format!(
                    "unknown tracker '{}', available: {}",
                    name,
                    BUILTIN_TRACKERS.join(", ")
                ))
            })?;
            let (color, symbol) = match self.entry(name) {
                Some(e) => (e.color, e.symbol),
                None => (FALLBACK_COLORS[i % FALLBACK_COLORS.len()], MarkerSymbol::Diamond),
            };
            specs.push(TrackerSpec {
                name: name.clone(),
                factory,
                color: (color[0], color[1], color[2]),
                symbol,
            });
        }

        ensure_unique_names(&specs)?;
        Ok(specs)
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        println!("\n🎛️  当前基准测试配置:");
        for e in &self.trackers {
            println!("  {} - 颜色 {:?} - 标记 {:?}", e.name, e.color, e.symbol);
        }
        println!("  搜索半径: {}", self.params.search_radius);
        println!("  匹配阈值: {:.2}", self.params.match_threshold);
        println!(
            "  卡尔曼噪声 q/r: {:.2}/{:.2}\n",
            self.params.kalman_process_noise, self.params.kalman_observation_noise
        );
    }
}
