//! # 体积预算搜索（缩放调度 + 结果组装）
//!
//! ## 设计思路
//!
//! 在两个自由度上搜索：编码质量与空间分辨率。
//! 缩放调度从 1.0 开始按固定系数衰减，每个档位先渲染、再交给质量二分搜索，
//! 把该档位的结果合并进跨档位的双槽累加器。
//!
//! ## 选择策略
//!
//! - 档位内有预算内候选：与全局最优比较，保留体积更大者；
//!   全局最优达到 `early_exit_fraction × 目标` 后停止继续缩小。
//! - 档位内没有预算内候选：其超预算最近候选与全局比较，保留更小者。
//! - 循环结束后：预算内最优 > 超预算最近 > 全分辨率 + 最低质量的兜底编码（无条件接受）。
//!
//! 整个过程严格串行：每次决策都依赖上一次编码结果。
//! 需要渲染的档位共用同一份 RGBA8 源图，非 RGBA8 源图在首次渲染前只转换一次。

use std::borrow::Cow;
use std::time::Instant;

use bytes::Bytes;
use image::{DynamicImage, GenericImageView};

use super::candidate::{BestTracker, Candidate};
use super::encoder::{Encoder, OutputFormat};
use super::quality::{search_quality, EncodeSession, QualityRange};
use super::render::Renderer;
use super::scale::{scaled_dimensions, ScaleSchedule};
use super::CompressError;

/// 一次搜索的纯参数。
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub target_bytes: u64,
    pub format: OutputFormat,
    pub quality_range: QualityRange,
    pub schedule: ScaleSchedule,
    pub early_exit_fraction: f64,
}

/// 单张图片的最终结果。
///
/// `blob` 的所有权移交给调用方，由调用方负责命名、持久化或展示。
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// `final_bytes <= target_bytes`。
    pub success: bool,
    pub final_bytes: u64,
    pub target_bytes: u64,
    pub quality: u8,
    pub scale: f64,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// 本次运行的编码调用总数。
    pub encode_calls: u32,
    pub blob: Bytes,
}

impl SearchOutcome {
    fn assemble(winner: Candidate, target_bytes: u64, format: OutputFormat, encode_calls: u32) -> Self {
        Self {
            success: winner.size <= target_bytes,
            final_bytes: winner.size,
            target_bytes,
            quality: winner.quality,
            scale: winner.scale,
            width: winner.width,
            height: winner.height,
            format,
            encode_calls,
            blob: winner.blob,
        }
    }
}

/// 绑定编码与渲染能力的搜索器。
pub struct BudgetSearch<'a> {
    encoder: &'a dyn Encoder,
    renderer: &'a dyn Renderer,
}

impl<'a> BudgetSearch<'a> {
    pub fn new(encoder: &'a dyn Encoder, renderer: &'a dyn Renderer) -> Self {
        Self { encoder, renderer }
    }

    /// 对单张图片执行完整搜索，总是返回恰好一个结果（或一个错误）。
    ///
    /// # 示例
    /// ```rust
    /// use image::{DynamicImage, RgbImage};
    /// use image_budget::compressor::{
    ///     BudgetSearch, CompressConfig, FastResizeRenderer, ImageCrateEncoder, OutputFormat,
    /// };
    ///
    /// let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, image::Rgb([200, 80, 40])));
    /// let params = CompressConfig::with_target(4 * 1024).search_params(OutputFormat::Jpeg)?;
    /// let renderer = FastResizeRenderer::default();
    ///
    /// let outcome = BudgetSearch::new(&ImageCrateEncoder, &renderer).run(&source, &params)?;
    /// assert!(outcome.success);
    /// assert_eq!(outcome.blob.len() as u64, outcome.final_bytes);
    /// # Ok::<(), image_budget::compressor::CompressError>(())
    /// ```
    pub fn run(&self, source: &DynamicImage, params: &SearchParams) -> Result<SearchOutcome, CompressError> {
        if params.target_bytes == 0 {
            return Err(CompressError::InvalidTarget(
                "target_bytes 必须大于 0".to_string(),
            ));
        }

        let (width, height) = source.dimensions();
        if width == 0 || height == 0 {
            return Err(CompressError::Decode(format!(
                "源图尺寸无效：{}x{}",
                width, height
            )));
        }

        let started = Instant::now();
        let early_exit_at = params.target_bytes as f64 * params.early_exit_fraction;
        let mut session = EncodeSession::new(self.encoder, params.format, params.target_bytes);
        let mut overall = BestTracker::new(params.target_bytes);
        let mut scales_tried = 0u32;
        let mut render_source: Option<Cow<'_, DynamicImage>> = None;

        for scale in params.schedule.iter() {
            scales_tried += 1;
            let (scaled_width, scaled_height) = scaled_dimensions(width, height, scale);

            let raster: Cow<'_, DynamicImage> = if (scaled_width, scaled_height) == (width, height) {
                Cow::Borrowed(source)
            } else {
                let prepared = render_source.get_or_insert_with(|| rgba_source(source));
                Cow::Owned(self.renderer.render(&**prepared, scaled_width, scaled_height)?)
            };

            let at_scale = search_quality(&mut session, &raster, params.quality_range, scale)?;
            drop(raster);
            overall.absorb(at_scale);

            if let Some(best) = overall.best_under() {
                if best.size as f64 >= early_exit_at {
                    log::info!(
                        "🎯 提前结束缩放 - scale={:.4} size={} 已达目标 {:.0}%",
                        best.scale,
                        best.size,
                        params.early_exit_fraction * 100.0
                    );
                    break;
                }
            }
        }

        let winner = match overall.into_winner() {
            Some(candidate) => candidate,
            None => {
                log::warn!(
                    "⚠️ 未尝试任何缩放档位（scale_floor={}），回退为全分辨率 q={} 单次编码",
                    params.schedule.floor(),
                    params.quality_range.min()
                );
                session.attempt(source, params.quality_range.min(), 1.0)?
            }
        };

        let outcome = SearchOutcome::assemble(winner, params.target_bytes, params.format, session.calls());
        if outcome.success {
            log::info!(
                "✅ 搜索完成 - {} {}x{} q={} scale={:.4} size={}/{} 编码{}次 档位{}个 ({}ms)",
                outcome.format,
                outcome.width,
                outcome.height,
                outcome.quality,
                outcome.scale,
                outcome.final_bytes,
                outcome.target_bytes,
                outcome.encode_calls,
                scales_tried,
                started.elapsed().as_millis()
            );
        } else {
            log::warn!(
                "⚠️ 未能满足体积预算，返回最接近的结果 - {} {}x{} q={} scale={:.4} size={}/{} 编码{}次",
                outcome.format,
                outcome.width,
                outcome.height,
                outcome.quality,
                outcome.scale,
                outcome.final_bytes,
                outcome.target_bytes,
                outcome.encode_calls
            );
        }

        Ok(outcome)
    }
}

fn rgba_source(source: &DynamicImage) -> Cow<'_, DynamicImage> {
    match source {
        DynamicImage::ImageRgba8(_) => Cow::Borrowed(source),
        other => Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8())),
    }
}
