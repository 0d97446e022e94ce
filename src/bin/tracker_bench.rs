/// 跟踪器基准测试 (Tracker Benchmark)
///
/// 对同一段视频依次运行每个跟踪器:
/// 1. 读取首条标注作为初始框
/// 2. 每个跟踪器从头到尾处理全部帧, 输出带标记的视频
/// 3. 全部结束后导出逐帧 CSV 报表并打印汇总
use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

use tracker_bench::annotation::load_initial_bbox;
use tracker_bench::bench::{ConsoleDisplay, ProgressDisplay, ProgressReporter};
use tracker_bench::renderer::LabelFont;
use tracker_bench::{gen_time_string, Args, BenchConfig, Benchmark, FfmpegSource, FrameSource};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // ========== 配置 ==========
    let config = BenchConfig::load(&args.config)
        .with_context(|| format!("加载配置失败: {}", args.config.display()))?;
    config.print_summary();

    let specs = config
        .build_specs(args.trackers.as_deref())
        .context("跟踪器配置无效")?;

    // ========== 输入 ==========
    let initial_bbox = load_initial_bbox(&args.annotations).context("读取初始框失败")?;
    let mut source = FfmpegSource::open(&args.video)
        .with_context(|| format!("打开视频失败: {}", args.video.display()))?;

    // ========== 输出 ==========
    let plan = args.output_plan(&config);
    plan.prepare().context("输出目录不可用")?;

    let mut benchmark = Benchmark::new(specs, initial_bbox)?;
    if let Some(path) = &args.font {
        let font = LabelFont::load(path, args.font_size)
            .with_context(|| format!("加载字体失败: {}", path.display()))?;
        benchmark = benchmark.with_label_font(font);
    }

    let info = source.info();
    println!("🚀 跟踪器基准测试启动 ({})", gen_time_string(":"));
    println!(
        "📹 视频: {} ({}x{}, {} 帧, {:.2} fps)",
        args.video.display(),
        info.width,
        info.height,
        info.total_frames,
        info.fps
    );
    println!("📂 输出: {}", plan.dir().display());
    println!();

    // ========== 运行 ==========
    let display: Box<dyn ProgressDisplay> =
        Box::new(ConsoleDisplay::new(!args.append_progress, args.refresh_interval()));
    let mut reporter = ProgressReporter::new(display);

    let outcome = benchmark.run(&mut source, &plan, &mut reporter)?;
    let rows = outcome
        .results
        .export(plan.csv_path())
        .context("导出CSV失败")?;

    // ========== 汇总 ==========
    println!();
    println!("📊 最终汇总:");
    println!("{}", reporter.render_final_report());
    println!();
    println!("💾 CSV报表: {} ({} 行)", plan.csv_path().display(), rows);
    println!("✅ 完成 ({})", gen_time_string(":"));
    Ok(())
}
