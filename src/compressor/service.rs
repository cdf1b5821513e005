//! # 服务层（异步批处理）
//!
//! ## 设计思路
//!
//! 编码是耗时的 CPU 工作，不能阻塞异步运行时。`CompressService` 把每张图片交给
//! `spawn_blocking` 执行，但严格逐张等待完成：同一时刻最多只有一张图片的
//! 栅格与一次编码在内存中，以吞吐换取有界内存。
//!
//! ## 实现思路
//!
//! - 目标体积在任何工作开始前校验，无效时整批拒绝。
//! - 每张图片使用同一份配置快照。
//! - 工作线程 panic 只记为该条目的失败，批处理继续。
//! - 可选的进度回调在每个条目完成后触发。

use std::sync::Arc;

use super::handler::BatchItem;
use super::search::SearchOutcome;
use super::{CompressConfig, CompressError, CompressHandler, ImageSource, SearchProfile};

/// 异步压缩服务。
pub struct CompressService {
    handler: Arc<CompressHandler>,
}

impl CompressService {
    /// 使用默认编码/渲染能力创建服务。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use image_budget::compressor::{CompressConfig, CompressService, ImageSource};
    ///
    /// # async fn demo() -> Result<(), image_budget::compressor::CompressError> {
    /// let service = CompressService::with_config(CompressConfig::with_target(300 * 1024))?;
    /// let items = service
    ///     .compress_batch(vec![ImageSource::FilePath("photo.jpg".into())], |_, _, _| {})
    ///     .await?;
    /// assert_eq!(items.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_config(config: CompressConfig) -> Result<Self, CompressError> {
        Ok(Self::from_handler(CompressHandler::new(config)?))
    }

    pub fn from_handler(handler: CompressHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn handler(&self) -> &CompressHandler {
        &self.handler
    }

    pub fn set_profile(&self, profile: &str) -> Result<(), CompressError> {
        self.handler.set_profile(SearchProfile::from_str(profile)?)
    }

    pub fn profile(&self) -> Result<String, CompressError> {
        Ok(self.handler.profile()?.as_str().to_string())
    }

    /// 处理单张图片。
    pub async fn compress_one(&self, source: ImageSource) -> Result<SearchOutcome, CompressError> {
        let config = self.handler.config_snapshot()?;
        config.validate()?;
        self.run_blocking(source, config).await
    }

    /// 按提交顺序逐张处理，返回与输入一一对应的条目。
    pub async fn compress_batch<P>(
        &self,
        sources: Vec<ImageSource>,
        on_progress: P,
    ) -> Result<Vec<BatchItem>, CompressError>
    where
        P: Fn(usize, usize, &BatchItem) + Send + Sync,
    {
        let config = self.handler.config_snapshot()?;
        config.validate()?;

        let total = sources.len();
        log::info!(
            "📦 开始批处理 - {} 张图片，目标 {} 字节，格式 {}",
            total,
            config.target_bytes,
            config.format.as_str()
        );

        let mut items = Vec::with_capacity(total);
        for (index, source) in sources.into_iter().enumerate() {
            let label = source.label();
            let result = self.run_blocking(source, config.clone()).await;

            if let Err(err) = &result {
                log::error!(
                    "❌ 第 {}/{} 张处理失败 - {} [{}:{}] {}",
                    index + 1,
                    total,
                    label,
                    err.stage(),
                    err.code(),
                    err
                );
            }

            let item = BatchItem {
                source: label,
                result,
            };
            on_progress(index, total, &item);
            items.push(item);
        }

        Ok(items)
    }

    async fn run_blocking(
        &self,
        source: ImageSource,
        config: CompressConfig,
    ) -> Result<SearchOutcome, CompressError> {
        let handler = Arc::clone(&self.handler);
        tokio::task::spawn_blocking(move || handler.compress_with_config(&source, &config))
            .await
            .unwrap_or_else(|join_err| {
                Err(CompressError::Encode(format!("压缩任务异常终止：{}", join_err)))
            })
    }
}
