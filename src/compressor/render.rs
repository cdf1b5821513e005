//! # 渲染（重采样）模块
//!
//! ## 设计思路
//!
//! 缩放调度需要把源图按任意整数尺寸重新渲染。这里用 `Renderer` trait 抽象该能力，
//! 默认实现走 `fast_image_resize`，失败时回退 `image::resize_exact`。
//! 渲染永远不修改源图，只产出新的栅格。
//!
//! ## 实现思路
//!
//! - `fr::Resizer` 内部带有可复用的缓冲，放在 `Mutex` 中跨次调用复用。
//! - 锁中毒意味着渲染上下文已不可用，映射为 `RenderContextUnavailable`。
//! - RGBA8 源图直接借用其像素缓冲；其余像素布局才转换一次。

use std::sync::Mutex;

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};

use super::config::ResizeFilter;
use super::CompressError;

/// 渲染能力。
pub trait Renderer: Send + Sync {
    fn render(&self, source: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, CompressError>;
}

/// 基于 `fast_image_resize` 的默认渲染器。
pub struct FastResizeRenderer {
    filter: ResizeFilter,
    resizer: Mutex<fr::Resizer>,
}

impl FastResizeRenderer {
    pub fn new(filter: ResizeFilter) -> Self {
        Self {
            filter,
            resizer: Mutex::new(fr::Resizer::new()),
        }
    }

    pub fn filter(&self) -> ResizeFilter {
        self.filter
    }

    fn resize_with_fast_image_resize(
        &self,
        source: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, CompressError> {
        let converted;
        let src = match source {
            DynamicImage::ImageRgba8(buffer) => buffer,
            other => {
                converted = other.to_rgba8();
                &converted
            }
        };
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::ImageRef::new(src_width, src_height, src.as_raw(), fr::PixelType::U8x4)
            .map_err(|e| CompressError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x4);
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(self.filter.to_fast_filter()));

        let mut resizer = self.resizer.lock().map_err(|_| {
            CompressError::RenderContextUnavailable("缩放器锁已中毒".to_string())
        })?;
        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| CompressError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;
        drop(resizer);

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, dst_image.into_vec())
            .ok_or_else(|| CompressError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

impl Default for FastResizeRenderer {
    fn default() -> Self {
        Self::new(ResizeFilter::CatmullRom)
    }
}

impl Renderer for FastResizeRenderer {
    fn render(&self, source: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, CompressError> {
        if width == 0 || height == 0 {
            return Err(CompressError::InvalidConfig(format!(
                "渲染尺寸必须至少为 1x1，当前：{}x{}",
                width, height
            )));
        }

        let (src_width, src_height) = source.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(CompressError::Decode("源图尺寸为 0".to_string()));
        }

        match self.resize_with_fast_image_resize(source, width, height) {
            Ok(resized) => Ok(resized),
            Err(err @ CompressError::RenderContextUnavailable(_)) => Err(err),
            Err(err) => {
                log::warn!(
                    "⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}",
                    err
                );
                Ok(source.resize_exact(width, height, self.filter.to_image_filter()))
            }
        }
    }
}
