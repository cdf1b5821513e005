//! # 体积预算图片压缩：命令行入口
//!
//! 本文件仅负责参数解析、配置组装与结果写盘。
//! 搜索逻辑分布在 `compressor` 子模块中，详见 `lib.rs` 架构文档。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use image_budget::compressor::{
    BatchItem, CompressConfig, CompressService, FormatChoice, ImageSource, OutcomeReport,
    QualityRange, SearchProfile,
};
use image_budget::error::AppError;
use image_budget::settings;

/// Fit images under a byte budget by searching encode quality and scale.
#[derive(Parser, Debug)]
#[command(name = "image-budget", version)]
#[command(about = "📦 Compress images so each output fits under a byte budget")]
struct Args {
    /// Input image files (a `data:image/...;base64,` URL is also accepted)
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Byte budget per image: 204800, 200KB, 1.5MB
    #[arg(short, long, value_parser = parse_size)]
    target: u64,

    /// Output format: auto (keep source format), jpeg, png, webp
    #[arg(short, long, value_parser = parse_format)]
    format: Option<FormatChoice>,

    /// Lowest quality the search may use
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality_min: Option<u8>,

    /// Highest quality the search may use
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality_max: Option<u8>,

    /// Stop downscaling below this factor
    #[arg(long)]
    scale_floor: Option<f64>,

    /// Multiply the scale by this factor at each step
    #[arg(long)]
    scale_step: Option<f64>,

    /// Stop as soon as the best result reaches this fraction of the budget
    #[arg(long)]
    early_exit: Option<f64>,

    /// Search profile: thorough, balanced, fast
    #[arg(short, long)]
    profile: Option<String>,

    /// JSON config file; command-line flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory (defaults to each input's own directory)
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Suffix appended to the file stem
    #[arg(long, default_value = ".fit")]
    suffix: String,

    /// Print a JSON report instead of text lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            log::error!("❌ 运行失败: {}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, AppError> {
    let config = build_config(&args)?;
    let service = CompressService::with_config(config)?;

    let sources: Vec<ImageSource> = args.inputs.iter().map(|input| to_source(input)).collect();
    let items = service
        .compress_batch(sources, |index, total, item| {
            log::info!(
                "📊 进度 {}/{} - {} {}",
                index + 1,
                total,
                item.source,
                if item.result.is_ok() { "完成" } else { "失败" }
            );
        })
        .await?;

    let reports = write_outputs(&items, &args);

    if args.json {
        let json = serde_json::to_string_pretty(&reports)
            .map_err(|e| AppError::Output(format!("序列化报告失败: {}", e)))?;
        println!("{}", json);
    } else {
        for report in &reports {
            println!("{}", report.summary_line());
        }
    }

    Ok(ExitCode::from(exit_status(&reports)))
}

/// 组装配置：配置文件（或默认值）→ 档位 → 单项参数 → 目标体积。
fn build_config(args: &Args) -> Result<CompressConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => settings::load_config_file(path)?,
        None => CompressConfig::default(),
    };

    if let Some(profile) = &args.profile {
        config.apply_profile(SearchProfile::from_str(profile)?);
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if args.quality_min.is_some() || args.quality_max.is_some() {
        config.quality_range = QualityRange::new(
            args.quality_min.unwrap_or(config.quality_range.min()),
            args.quality_max.unwrap_or(config.quality_range.max()),
        );
    }
    if let Some(floor) = args.scale_floor {
        config.scale_floor = floor;
    }
    if let Some(step) = args.scale_step {
        config.scale_step = step;
    }
    if let Some(fraction) = args.early_exit {
        config.early_exit_fraction = fraction;
    }
    config.target_bytes = args.target;

    config.validate()?;
    Ok(config)
}

fn to_source(input: &str) -> ImageSource {
    if input.trim_start().starts_with("data:") {
        ImageSource::Base64(input.to_string())
    } else {
        ImageSource::FilePath(input.to_string())
    }
}

/// 逐条写盘并生成报告；写盘失败只记在该条目的报告上，其余条目照常写出。
fn write_outputs(items: &[BatchItem], args: &Args) -> Vec<OutcomeReport> {
    let mut taken = HashSet::new();
    args.inputs
        .iter()
        .zip(items)
        .enumerate()
        .map(|(index, (input, item))| {
            let Ok(outcome) = &item.result else {
                return OutcomeReport::from_item(item, None);
            };
            let path = unique_output_path(input, index, args, outcome.format.extension(), &mut taken);
            match write_output(&path, &outcome.blob) {
                Ok(()) => OutcomeReport::from_item(item, Some(&path)),
                Err(err) => {
                    log::error!("❌ 结果写盘失败 - {}: {}", item.source, err);
                    OutcomeReport::from_item(item, None).with_output_error(err.to_string())
                }
            }
        })
        .collect()
}

/// 输出目录与文件主干名：`--out-dir` 优先，否则为输入文件所在目录。
fn output_location(input: &str, index: usize, args: &Args) -> (PathBuf, String) {
    let (dir, stem) = if input.trim_start().starts_with("data:") {
        (PathBuf::from("."), format!("inline-{}", index + 1))
    } else {
        let path = Path::new(input);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("image-{}", index + 1));
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (dir, stem)
    };

    (args.out_dir.clone().unwrap_or(dir), stem)
}

/// `<stem><suffix>.<ext>`
fn output_path_for(input: &str, index: usize, args: &Args, extension: &str) -> PathBuf {
    let (dir, stem) = output_location(input, index, args);
    dir.join(format!("{}{}.{}", stem, args.suffix, extension))
}

/// 同一批次内路径重复时改为 `<stem>-<n><suffix>.<ext>`，n 从条目序号开始。
fn unique_output_path(
    input: &str,
    index: usize,
    args: &Args,
    extension: &str,
    taken: &mut HashSet<PathBuf>,
) -> PathBuf {
    let path = output_path_for(input, index, args, extension);
    if taken.insert(path.clone()) {
        return path;
    }

    let (dir, stem) = output_location(input, index, args);
    let mut n = index + 1;
    loop {
        let renamed = dir.join(format!("{}-{}{}.{}", stem, n, args.suffix, extension));
        if taken.insert(renamed.clone()) {
            log::warn!("⚠️ 输出路径重复 {}，改写为 {}", path.display(), renamed.display());
            return renamed;
        }
        n += 1;
    }
}

fn write_output(path: &Path, blob: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Output(format!("创建输出目录失败 {}: {}", parent.display(), e)))?;
    }
    std::fs::write(path, blob)
        .map_err(|e| AppError::Output(format!("写入结果失败 {}: {}", path.display(), e)))
}

/// 有条目出错（含写盘失败）返回 1；全部写出但存在超预算返回 2；否则 0。
fn exit_status(reports: &[OutcomeReport]) -> u8 {
    if reports.iter().any(|report| !report.ok) {
        return 1;
    }
    if reports.iter().any(|report| !report.success) {
        return 2;
    }
    0
}

/// Parse a byte size like "204800", "200KB", "200k", "1.5MB" (binary multiples).
fn parse_size(value: &str) -> Result<u64, String> {
    let normalized = value.trim().to_ascii_lowercase();
    let split = normalized
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(normalized.len());
    let (number, unit) = normalized.split_at(split);

    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        other => return Err(format!("invalid size unit: {} (use B, KB or MB)", other)),
    };

    let amount: f64 = number
        .parse()
        .map_err(|_| format!("invalid size: {}", value))?;
    let bytes = (amount * multiplier as f64).round();
    if !bytes.is_finite() || bytes < 1.0 {
        return Err(format!("size must be at least 1 byte: {}", value));
    }
    Ok(bytes as u64)
}

fn parse_format(value: &str) -> Result<FormatChoice, String> {
    FormatChoice::parse(value).map_err(|e| e.to_string())
}
