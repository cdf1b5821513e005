//! # 解码流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素上限快速拒绝
//! 3. 完整解码并再次确认尺寸
//! 4. 记录源格式，供 `auto` 输出格式使用

use std::io::Cursor;

use image::{GenericImageView, ImageFormat};

use super::source::{DecodedImage, RawImageData};
use super::{CompressConfig, CompressError, CompressHandler};

impl CompressHandler {
    /// 将原始字节解码为只读栅格。
    pub(crate) fn decode_source(
        &self,
        raw: RawImageData,
        config: &CompressConfig,
    ) -> Result<DecodedImage, CompressError> {
        let format: ImageFormat = image::guess_format(&raw.bytes)
            .map_err(|e| CompressError::Decode(format!("不支持的图片格式：{}", e)))?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory_with_format(&raw.bytes, format)
            .map_err(|e| CompressError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(CompressError::Decode(format!(
                "解码后尺寸无效：{}x{}",
                width, height
            )));
        }
        Self::validate_pixel_limits(config, width, height)?;

        log::info!(
            "✅ 图片解码成功 - 来源: {} 格式: {:?} 尺寸: {}x{}",
            raw.source_hint,
            format,
            width,
            height
        );

        Ok(DecodedImage {
            image: decoded,
            source_format: Some(format),
        })
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), CompressError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CompressError::Decode(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| CompressError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(
        config: &CompressConfig,
        width: u32,
        height: u32,
    ) -> Result<(), CompressError> {
        let pixels = u64::from(width)
            .checked_mul(u64::from(height))
            .ok_or_else(|| CompressError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(CompressError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }
}
