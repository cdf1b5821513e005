//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `CompressConfig`，保证运行时行为可观测、可调整、可测试。
//! 其中搜索档位（thorough / balanced / fast）作为高层语义，映射到底层缩放参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置，唯独目标体积必须由调用方给出。
//! - `validate_search` 校验缩放与提前退出参数；`validate_target` 单独校验目标体积，
//!   让“目标无效”在任何解码/编码工作开始之前就被拒绝。
//! - `SearchProfile` 负责档位字符串解析与反向输出。
//! - `search_params` 把配置快照转换成一次搜索所需的纯参数。

use image::imageops::FilterType;

use super::encoder::{FormatChoice, OutputFormat};
use super::quality::QualityRange;
use super::scale::ScaleSchedule;
use super::search::SearchParams;
use super::CompressError;

/// 压缩配置。
///
/// 字段覆盖了加载、解码、缩放调度与质量搜索四个阶段。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    /// 目标体积上限（字节），必须大于 0。
    pub target_bytes: u64,
    /// 输出格式，`auto` 表示沿用源格式。
    pub format: FormatChoice,
    /// 质量搜索区间，自动钳制到 `[5, 100]`。
    pub quality_range: QualityRange,
    /// 缩放下限，缩放系数严格小于该值时停止。
    ///
    /// 大于 1.0 时一个缩放档位都不会尝试，直接走全分辨率兜底编码。
    pub scale_floor: f64,
    /// 每一步的缩放衰减系数，取值 `(0, 1)`。
    pub scale_step: f64,
    /// 最优候选达到目标体积的该比例后不再继续缩小。
    pub early_exit_fraction: f64,
    /// 缩放滤镜策略。
    pub resize_filter: ResizeFilter,
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            target_bytes: 0,
            format: FormatChoice::Auto,
            quality_range: QualityRange::default(),
            scale_floor: 0.35,
            scale_step: 0.82,
            early_exit_fraction: 0.98,
            resize_filter: ResizeFilter::CatmullRom,
            max_file_size: 100 * 1024 * 1024,
            max_decoded_pixels: 80_000_000,
        }
    }
}

impl CompressConfig {
    /// 以默认参数和指定目标体积创建配置。
    ///
    /// # 示例
    /// ```rust
    /// use image_budget::compressor::CompressConfig;
    ///
    /// let config = CompressConfig::with_target(200 * 1024);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn with_target(target_bytes: u64) -> Self {
        Self {
            target_bytes,
            ..Self::default()
        }
    }

    /// 完整校验：目标体积 + 搜索参数。
    pub fn validate(&self) -> Result<(), CompressError> {
        self.validate_target()?;
        self.validate_search()
    }

    /// 目标体积必须为正。
    pub fn validate_target(&self) -> Result<(), CompressError> {
        if self.target_bytes == 0 {
            return Err(CompressError::InvalidTarget(
                "target_bytes 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 校验与目标体积无关的搜索参数。
    pub fn validate_search(&self) -> Result<(), CompressError> {
        ScaleSchedule::new(self.scale_step, self.scale_floor)?;

        if !self.early_exit_fraction.is_finite()
            || self.early_exit_fraction <= 0.0
            || self.early_exit_fraction > 1.0
        {
            return Err(CompressError::InvalidConfig(format!(
                "early_exit_fraction 必须在 (0, 1] 之间，当前：{}",
                self.early_exit_fraction
            )));
        }
        if self.max_file_size == 0 {
            return Err(CompressError::InvalidConfig("max_file_size 不能为 0".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(CompressError::InvalidConfig(
                "max_decoded_pixels 不能为 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 生成一次搜索的参数快照。
    pub fn search_params(&self, format: OutputFormat) -> Result<SearchParams, CompressError> {
        self.validate()?;
        Ok(SearchParams {
            target_bytes: self.target_bytes,
            format,
            quality_range: self.quality_range,
            schedule: ScaleSchedule::new(self.scale_step, self.scale_floor)?,
            early_exit_fraction: self.early_exit_fraction,
        })
    }

    /// 基于当前参数反推搜索档位。
    pub fn infer_profile(&self) -> SearchProfile {
        if self.scale_step >= 0.88 || self.scale_floor <= 0.25 {
            return SearchProfile::Thorough;
        }
        if self.scale_step <= 0.72 || self.scale_floor >= 0.5 {
            return SearchProfile::Fast;
        }
        SearchProfile::Balanced
    }

    /// 应用指定档位到实际参数。
    pub fn apply_profile(&mut self, profile: SearchProfile) {
        match profile {
            SearchProfile::Thorough => {
                self.scale_step = 0.9;
                self.scale_floor = 0.2;
                self.resize_filter = ResizeFilter::Lanczos3;
            }
            SearchProfile::Balanced => {
                self.scale_step = 0.82;
                self.scale_floor = 0.35;
                self.resize_filter = ResizeFilter::CatmullRom;
            }
            SearchProfile::Fast => {
                self.scale_step = 0.7;
                self.scale_floor = 0.5;
                self.resize_filter = ResizeFilter::Triangle;
            }
        }
    }
}

/// 缩放滤镜。与 `image` / `fast_image_resize` 的滤镜一一映射。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }

    pub fn to_fast_filter(self) -> fast_image_resize::FilterType {
        use fast_image_resize::FilterType as Fast;
        match self {
            Self::Nearest => Fast::Box,
            Self::Triangle => Fast::Bilinear,
            Self::CatmullRom => Fast::CatmullRom,
            Self::Gaussian => Fast::Mitchell,
            Self::Lanczos3 => Fast::Lanczos3,
        }
    }
}

/// 搜索档位（面向用户语义）。
///
/// - `Thorough`：缩放步进更细、下限更低，编码次数更多
/// - `Balanced`：默认参数
/// - `Fast`：步进更粗、下限更高，尽快给出结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProfile {
    Thorough,
    Balanced,
    Fast,
}

impl SearchProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use image_budget::compressor::SearchProfile;
    ///
    /// let p = SearchProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), image_budget::compressor::CompressError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(profile: &str) -> Result<Self, CompressError> {
        match profile.trim().to_lowercase().as_str() {
            "thorough" => Ok(Self::Thorough),
            "balanced" => Ok(Self::Balanced),
            "fast" => Ok(Self::Fast),
            other => Err(CompressError::InvalidConfig(format!(
                "未知搜索档位：{}（可选：thorough / balanced / fast）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thorough => "thorough",
            Self::Balanced => "balanced",
            Self::Fast => "fast",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CompressConfig::default();
        assert_eq!(config.quality_range.min(), 30);
        assert_eq!(config.quality_range.max(), 95);
        assert_eq!(config.scale_floor, 0.35);
        assert_eq!(config.scale_step, 0.82);
        assert_eq!(config.early_exit_fraction, 0.98);
        assert_eq!(config.format, FormatChoice::Auto);
        assert_eq!(config.infer_profile(), SearchProfile::Balanced);
    }

    #[test]
    fn zero_target_is_invalid_target() {
        let config = CompressConfig::default();
        assert!(matches!(config.validate(), Err(CompressError::InvalidTarget(_))));
        assert!(config.validate_search().is_ok());
    }

    #[test]
    fn rejects_out_of_range_search_knobs() {
        let mut config = CompressConfig::with_target(1024);
        config.scale_step = 1.0;
        assert!(matches!(config.validate(), Err(CompressError::InvalidConfig(_))));

        let mut config = CompressConfig::with_target(1024);
        config.scale_floor = 0.0;
        assert!(matches!(config.validate(), Err(CompressError::InvalidConfig(_))));

        let mut config = CompressConfig::with_target(1024);
        config.early_exit_fraction = 1.2;
        assert!(matches!(config.validate(), Err(CompressError::InvalidConfig(_))));
    }

    #[test]
    fn floor_above_one_is_allowed() {
        let mut config = CompressConfig::with_target(1024);
        config.scale_floor = 1.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn profiles_round_trip_through_inference() {
        let mut config = CompressConfig::with_target(1024);
        for profile in [SearchProfile::Thorough, SearchProfile::Balanced, SearchProfile::Fast] {
            config.apply_profile(profile);
            assert_eq!(config.infer_profile(), profile);
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert!(matches!(
            SearchProfile::from_str("turbo"),
            Err(CompressError::InvalidConfig(_))
        ));
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: CompressConfig = serde_json::from_str(
            r#"{ "target_bytes": 4096, "format": "webp", "quality_range": [99, 2] }"#,
        )
        .expect("config json should parse");

        assert_eq!(config.target_bytes, 4096);
        assert_eq!(config.format, FormatChoice::Explicit(OutputFormat::WebP));
        assert_eq!(config.quality_range.min(), 5);
        assert_eq!(config.quality_range.max(), 99);
        assert_eq!(config.scale_step, 0.82);
        assert_eq!(config.resize_filter, ResizeFilter::CatmullRom);
    }
}
