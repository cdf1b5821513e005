//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `CompressHandler` 只负责流程编排与配置管理，不关心调用方是 CLI 还是其他前端。
//! 处理链路固定为：
//! 1. 读取配置快照并校验目标体积
//! 2. 按来源加载原始字节
//! 3. 解码为只读栅格
//! 4. 执行体积预算搜索
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<CompressConfig>>` 支持运行时动态切档。
//! - 单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 编码器与渲染器以 trait 对象注入，测试可替换为合成实现。
//!   未注入渲染器时，每次运行按配置快照中的滤镜创建 `FastResizeRenderer`。
//! - 记录 `load/decode/search/total` 阶段耗时，便于性能诊断。
//! - 批处理按提交顺序逐张执行，单张失败不影响其余条目。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use image::DynamicImage;

use super::encoder::{Encoder, ImageCrateEncoder};
use super::render::{FastResizeRenderer, Renderer};
use super::search::{BudgetSearch, SearchOutcome};
use super::source::{DecodedImage, ImageSource};
use super::{CompressConfig, CompressError, SearchProfile};

/// 批处理中单个条目的结果。
#[derive(Debug)]
pub struct BatchItem {
    /// 来源标识。
    pub source: String,
    pub result: Result<SearchOutcome, CompressError>,
}

/// 压缩处理器。
pub struct CompressHandler {
    config: Arc<RwLock<CompressConfig>>,
    encoder: Arc<dyn Encoder>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl CompressHandler {
    /// 使用 `image` 编码器与 `fast_image_resize` 渲染器创建处理器。
    ///
    /// 此时只校验搜索参数；目标体积在每次压缩开始前校验。
    ///
    /// # 示例
    /// ```rust
    /// use image_budget::compressor::{CompressConfig, CompressHandler};
    ///
    /// let handler = CompressHandler::new(CompressConfig::with_target(150 * 1024))?;
    /// # Ok::<(), image_budget::compressor::CompressError>(())
    /// ```
    pub fn new(config: CompressConfig) -> Result<Self, CompressError> {
        Self::with_encoder(config, Arc::new(ImageCrateEncoder))
    }

    /// 注入自定义编码器，渲染沿用默认实现。
    pub fn with_encoder(config: CompressConfig, encoder: Arc<dyn Encoder>) -> Result<Self, CompressError> {
        Self::build(config, encoder, None)
    }

    /// 注入自定义编码器与渲染器。
    pub fn with_backends(
        config: CompressConfig,
        encoder: Arc<dyn Encoder>,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self, CompressError> {
        Self::build(config, encoder, Some(renderer))
    }

    fn build(
        config: CompressConfig,
        encoder: Arc<dyn Encoder>,
        renderer: Option<Arc<dyn Renderer>>,
    ) -> Result<Self, CompressError> {
        config.validate_search()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            encoder,
            renderer,
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<CompressConfig, CompressError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| CompressError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置（先校验搜索参数）。
    pub fn set_config(&self, config: CompressConfig) -> Result<(), CompressError> {
        config.validate_search()?;
        let mut current = self
            .config
            .write()
            .map_err(|_| CompressError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        *current = config;
        Ok(())
    }

    /// 设置目标体积。
    pub fn set_target_bytes(&self, target_bytes: u64) -> Result<(), CompressError> {
        if target_bytes == 0 {
            return Err(CompressError::InvalidTarget(
                "target_bytes 必须大于 0".to_string(),
            ));
        }
        let mut config = self
            .config
            .write()
            .map_err(|_| CompressError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.target_bytes = target_bytes;
        Ok(())
    }

    /// 设置搜索档位。
    pub fn set_profile(&self, profile: SearchProfile) -> Result<(), CompressError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| CompressError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_profile(profile);

        log::info!(
            "⚙️ 已切换搜索档位：{:?}（scale_step={}, scale_floor={}, filter={:?}）",
            profile,
            config.scale_step,
            config.scale_floor,
            config.resize_filter
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn profile(&self) -> Result<SearchProfile, CompressError> {
        let config = self
            .config
            .read()
            .map_err(|_| CompressError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_profile())
    }

    /// 处理主入口：从任意来源加载并压缩到目标体积以内。
    pub fn compress(&self, source: &ImageSource) -> Result<SearchOutcome, CompressError> {
        let config = self.config_snapshot()?;
        self.compress_with_config(source, &config)
    }

    /// 使用给定配置快照处理单个来源。
    pub(crate) fn compress_with_config(
        &self,
        source: &ImageSource,
        config: &CompressConfig,
    ) -> Result<SearchOutcome, CompressError> {
        config.validate()?;
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw = self.load_source(source, config)?;
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let decoded = self.decode_source(raw, config)?;
        let decode_elapsed = decode_start.elapsed();

        let search_start = Instant::now();
        let outcome = self.search_decoded(&decoded, config)?;
        let search_elapsed = search_start.elapsed();

        log::info!(
            "✅ 图片处理完成 - {} load={}ms decode={}ms search={}ms total={}ms",
            source.label(),
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            search_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(outcome)
    }

    /// 调用方已持有解码后的栅格时直接搜索。
    ///
    /// `source_format` 用于 `auto` 输出格式；未知时传 `None`（回退为 JPEG）。
    pub fn compress_decoded(
        &self,
        image: DynamicImage,
        source_format: Option<image::ImageFormat>,
    ) -> Result<SearchOutcome, CompressError> {
        let config = self.config_snapshot()?;
        config.validate()?;
        self.search_decoded(
            &DecodedImage {
                image,
                source_format,
            },
            &config,
        )
    }

    /// 批量处理：目标体积无效时在任何工作开始前整体拒绝，
    /// 否则按提交顺序逐张处理，单张失败只记录在对应条目中。
    pub fn compress_batch(&self, sources: &[ImageSource]) -> Result<Vec<BatchItem>, CompressError> {
        let config = self.config_snapshot()?;
        config.validate()?;

        let mut items = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            let result = self.compress_with_config(source, &config);
            if let Err(err) = &result {
                log::error!(
                    "❌ 第 {}/{} 张处理失败 - {} [{}:{}] {}",
                    index + 1,
                    sources.len(),
                    source.label(),
                    err.stage(),
                    err.code(),
                    err
                );
            }
            items.push(BatchItem {
                source: source.label(),
                result,
            });
        }

        Ok(items)
    }

    fn search_decoded(
        &self,
        decoded: &DecodedImage,
        config: &CompressConfig,
    ) -> Result<SearchOutcome, CompressError> {
        let format = config.format.resolve(decoded.source_format);
        let params = config.search_params(format)?;

        let default_renderer;
        let renderer: &dyn Renderer = match &self.renderer {
            Some(renderer) => renderer.as_ref(),
            None => {
                default_renderer = FastResizeRenderer::new(config.resize_filter);
                &default_renderer
            }
        };

        BudgetSearch::new(self.encoder.as_ref(), renderer).run(&decoded.image, &params)
    }
}
