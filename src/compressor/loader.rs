//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（本地文件 / Base64 / 内存字节）的原始字节加载，
//! 并在“尽可能早”的阶段执行输入校验，减少不必要的内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - Base64：格式解析 + 按编码长度预估解码体积，超限时不做解码。
//! - 所有来源最后都通过文件签名（magic bytes）确认是图片。

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};

use super::source::{ImageSource, RawImageData};
use super::{CompressConfig, CompressError, CompressHandler};

impl CompressHandler {
    /// 按来源加载原始字节。
    pub(crate) fn load_source(
        &self,
        source: &ImageSource,
        config: &CompressConfig,
    ) -> Result<RawImageData, CompressError> {
        match source {
            ImageSource::FilePath(path) => self.load_from_file(path, config),
            ImageSource::Base64(data) => self.load_from_base64(data, config),
            ImageSource::Bytes { name, bytes } => self.load_from_bytes(name, bytes, config),
        }
    }

    /// 从本地路径加载图片原始字节。
    pub(super) fn load_from_file(
        &self,
        path: &str,
        config: &CompressConfig,
    ) -> Result<RawImageData, CompressError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path);

        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(CompressError::FileSystem(format!("文件不存在：{}", path)));
        }

        let metadata = std::fs::metadata(file_path)
            .map_err(|e| CompressError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > config.max_file_size {
            return Err(CompressError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(file_path)
            .map_err(|e| CompressError::FileSystem(format!("无法读取图片文件：{}", e)))?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
        })
    }

    /// 从 Base64 字符串加载图片原始字节。
    pub(super) fn load_from_base64(
        &self,
        data: &str,
        config: &CompressConfig,
    ) -> Result<RawImageData, CompressError> {
        log::info!("📝 开始处理 base64 图片");

        let bytes = Self::parse_base64_with_limit(data, config.max_file_size)?;

        if bytes.len() as u64 > config.max_file_size {
            return Err(CompressError::ResourceLimit(format!(
                "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "base64",
        })
    }

    /// 使用调用方已持有的字节。
    pub(super) fn load_from_bytes(
        &self,
        name: &str,
        bytes: &[u8],
        config: &CompressConfig,
    ) -> Result<RawImageData, CompressError> {
        log::info!("🧾 使用内存图片 - 名称: {} ({} 字节)", name, bytes.len());

        if bytes.len() as u64 > config.max_file_size {
            return Err(CompressError::ResourceLimit(format!(
                "图片体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Self::validate_image_signature(bytes)?;

        Ok(RawImageData {
            bytes: bytes.to_vec(),
            source_hint: "bytes",
        })
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, CompressError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| CompressError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| CompressError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, CompressError> {
        let normalized = data.trim();

        let base64_data = if normalized.starts_with("data:") {
            let base64_start = normalized
                .find(";base64,")
                .ok_or_else(|| CompressError::Decode("Data URL 缺少 base64 标记".to_string()))?;
            &normalized[base64_start + 8..]
        } else {
            normalized
        };

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(base64_data)?;
        if estimated_len > max_file_size {
            return Err(CompressError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(base64_data)
            .map_err(|e| CompressError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), CompressError> {
        if bytes.is_empty() {
            return Err(CompressError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| CompressError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(CompressError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}
