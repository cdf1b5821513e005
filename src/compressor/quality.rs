//! # 质量二分搜索
//!
//! ## 设计思路
//!
//! 固定分辨率下，对整数质量区间做经典二分：
//! - 中点体积不超过目标：记为预算内候选，继续向更高质量搜索；
//! - 否则：记为超预算候选，向更低质量搜索。
//!
//! 每个中点恰好触发一次真实编码，编码次数为 `O(log(区间长度))`。
//!
//! ## 已知限制
//!
//! 剪枝依赖“固定分辨率下体积随质量单调不减”。真实编码器在个别内容上可能违反单调性，
//! 此时结果是尽力而为而非可证明最优。

use std::time::Instant;

use bytes::Bytes;
use image::DynamicImage;

use super::candidate::{BestTracker, Candidate};
use super::encoder::{EncodeRequest, Encoder, OutputFormat};
use super::CompressError;

/// 质量下限。
pub const MIN_QUALITY: u8 = 5;
/// 质量上限。
pub const MAX_QUALITY: u8 = 100;
/// 无损格式只编码一次，使用的固定质量值（对编码结果无影响）。
pub const LOSSLESS_QUALITY: u8 = 100;

/// 闭区间质量范围，构造时钳制到 `[5, 100]`，上下颠倒时自动交换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "(u8, u8)", into = "(u8, u8)")]
pub struct QualityRange {
    min: u8,
    max: u8,
}

impl QualityRange {
    /// # 示例
    /// ```rust
    /// use image_budget::compressor::QualityRange;
    ///
    /// let range = QualityRange::new(120, 1);
    /// assert_eq!((range.min(), range.max()), (5, 100));
    /// ```
    pub fn new(a: u8, b: u8) -> Self {
        let a = a.clamp(MIN_QUALITY, MAX_QUALITY);
        let b = b.clamp(MIN_QUALITY, MAX_QUALITY);
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// 区间内的质量值个数。
    pub fn count(&self) -> usize {
        usize::from(self.max - self.min) + 1
    }

    pub fn contains(&self, quality: u8) -> bool {
        (self.min..=self.max).contains(&quality)
    }
}

impl Default for QualityRange {
    fn default() -> Self {
        Self::new(30, 95)
    }
}

impl From<(u8, u8)> for QualityRange {
    fn from((a, b): (u8, u8)) -> Self {
        Self::new(a, b)
    }
}

impl From<QualityRange> for (u8, u8) {
    fn from(range: QualityRange) -> Self {
        (range.min, range.max)
    }
}

/// 一次压缩运行内的编码会话：固定输出格式，统计编码次数。
pub(crate) struct EncodeSession<'a> {
    encoder: &'a dyn Encoder,
    format: OutputFormat,
    target_bytes: u64,
    calls: u32,
}

impl<'a> EncodeSession<'a> {
    pub(crate) fn new(encoder: &'a dyn Encoder, format: OutputFormat, target_bytes: u64) -> Self {
        Self {
            encoder,
            format,
            target_bytes,
            calls: 0,
        }
    }

    pub(crate) fn format(&self) -> OutputFormat {
        self.format
    }

    pub(crate) fn target_bytes(&self) -> u64 {
        self.target_bytes
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls
    }

    /// 执行一次真实编码并包装为候选。编码器返回空输出视为编码失败。
    pub(crate) fn attempt(
        &mut self,
        raster: &DynamicImage,
        quality: u8,
        scale: f64,
    ) -> Result<Candidate, CompressError> {
        let request = EncodeRequest {
            width: raster.width(),
            height: raster.height(),
            format: self.format,
            quality,
        };

        let started = Instant::now();
        self.calls += 1;
        let blob: Bytes = self.encoder.encode(raster, request)?;
        if blob.is_empty() {
            return Err(CompressError::Encode(format!(
                "编码器在 {}x{} q={} 下未返回可用输出",
                request.width, request.height, quality
            )));
        }

        let candidate = Candidate::new(blob, quality, scale, request.width, request.height);
        log::debug!(
            "🔎 编码尝试 #{} - {} {}x{} scale={:.4} q={} size={} {} ({}ms)",
            self.calls,
            self.format,
            request.width,
            request.height,
            scale,
            quality,
            candidate.size,
            if candidate.fits(self.target_bytes) { "≤ 目标" } else { "> 目标" },
            started.elapsed().as_millis()
        );

        Ok(candidate)
    }
}

/// 固定分辨率下搜索质量，返回该档位的双槽结果。
///
/// 无损格式不做二分，只在 `LOSSLESS_QUALITY` 编码一次。
pub(crate) fn search_quality(
    session: &mut EncodeSession<'_>,
    raster: &DynamicImage,
    range: QualityRange,
    scale: f64,
) -> Result<BestTracker, CompressError> {
    let mut local = BestTracker::new(session.target_bytes());

    if !session.format().is_lossy() {
        let candidate = session.attempt(raster, LOSSLESS_QUALITY, scale)?;
        local.offer(candidate);
        return Ok(local);
    }

    let mut low = i32::from(range.min());
    let mut high = i32::from(range.max());

    while low <= high {
        let quality = (low + high) / 2;
        let candidate = session.attempt(raster, quality as u8, scale)?;

        let fits = candidate.fits(session.target_bytes());
        local.offer(candidate);
        if fits {
            low = quality + 1;
        } else {
            high = quality - 1;
        }
    }

    Ok(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 体积 = 质量 × 每级字节数，严格单调。
    struct LinearEncoder {
        bytes_per_quality: usize,
        calls: AtomicU32,
    }

    impl Encoder for LinearEncoder {
        fn encode(&self, _raster: &DynamicImage, request: EncodeRequest) -> Result<Bytes, CompressError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(vec![0u8; usize::from(request.quality) * self.bytes_per_quality]))
        }
    }

    struct EmptyEncoder;

    impl Encoder for EmptyEncoder {
        fn encode(&self, _raster: &DynamicImage, _request: EncodeRequest) -> Result<Bytes, CompressError> {
            Ok(Bytes::new())
        }
    }

    fn raster() -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(4, 4, Rgba([1, 2, 3, 255])))
    }

    #[test]
    fn range_clamps_and_swaps() {
        assert_eq!(QualityRange::new(95, 30), QualityRange::new(30, 95));
        let range = QualityRange::new(0, 255);
        assert_eq!((range.min(), range.max()), (5, 100));
        assert_eq!(range.count(), 96);
        assert!(range.contains(5) && !range.contains(4));
    }

    #[test]
    fn finds_highest_fitting_quality() {
        let encoder = LinearEncoder {
            bytes_per_quality: 10,
            calls: AtomicU32::new(0),
        };
        let mut session = EncodeSession::new(&encoder, OutputFormat::Jpeg, 555);

        let tracker = search_quality(&mut session, &raster(), QualityRange::new(30, 95), 1.0)
            .expect("search should succeed");

        let best = tracker.best_under().expect("q55 should fit");
        assert_eq!(best.quality, 55);
        assert_eq!(best.size, 550);
        assert_eq!(tracker.closest_over().map(|c| c.quality), Some(56));
        assert!(session.calls() <= 7);
        assert_eq!(session.calls(), encoder.calls.load(Ordering::SeqCst));
    }

    #[test]
    fn reports_closest_over_when_nothing_fits() {
        let encoder = LinearEncoder {
            bytes_per_quality: 10,
            calls: AtomicU32::new(0),
        };
        let mut session = EncodeSession::new(&encoder, OutputFormat::Jpeg, 100);

        let tracker = search_quality(&mut session, &raster(), QualityRange::new(30, 95), 1.0)
            .expect("search should succeed");

        assert!(tracker.best_under().is_none());
        let over = tracker.closest_over().expect("over candidate should exist");
        assert_eq!(over.quality, 30);
        assert_eq!(over.size, 300);
        assert_eq!(session.calls(), 6);
    }

    #[test]
    fn lossless_format_encodes_once() {
        let encoder = LinearEncoder {
            bytes_per_quality: 1,
            calls: AtomicU32::new(0),
        };
        let mut session = EncodeSession::new(&encoder, OutputFormat::Png, 1_000);

        let tracker = search_quality(&mut session, &raster(), QualityRange::default(), 0.5)
            .expect("search should succeed");

        assert_eq!(session.calls(), 1);
        let best = tracker.best_under().expect("lossless output fits");
        assert_eq!(best.quality, LOSSLESS_QUALITY);
        assert_eq!(best.scale, 0.5);
    }

    #[test]
    fn empty_output_is_encode_failure() {
        let mut session = EncodeSession::new(&EmptyEncoder, OutputFormat::Jpeg, 1_000);
        let result = search_quality(&mut session, &raster(), QualityRange::default(), 1.0);
        assert!(matches!(result, Err(CompressError::Encode(_))));
    }

    /// 体积恒定，与质量无关。
    struct FlatEncoder;

    impl Encoder for FlatEncoder {
        fn encode(&self, _raster: &DynamicImage, _request: EncodeRequest) -> Result<Bytes, CompressError> {
            Ok(Bytes::from(vec![0u8; 100]))
        }
    }

    #[test]
    fn flat_sizes_yield_top_of_range() {
        let mut session = EncodeSession::new(&FlatEncoder, OutputFormat::Jpeg, 200);

        let tracker = search_quality(&mut session, &raster(), QualityRange::new(5, 20), 1.0)
            .expect("search should succeed");

        let best = tracker.best_under().expect("every quality fits");
        assert_eq!(best.quality, 20);
        assert_eq!(best.size, 100);
    }
}
