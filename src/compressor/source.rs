//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节
//! - `DecodedImage` 表示已解码、可交给搜索算法的只读栅格

use image::{DynamicImage, ImageFormat};

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 本地文件路径来源。
    FilePath(String),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 调用方已持有的原始字节，`name` 仅用于日志与报告。
    Bytes { name: String, bytes: Vec<u8> },
}

impl ImageSource {
    /// 来源标识，用于日志与批处理报告。
    pub fn label(&self) -> String {
        match self {
            Self::FilePath(path) => path.clone(),
            Self::Base64(data) => {
                let head: String = data.chars().take(24).collect();
                format!("base64:{}…", head)
            }
            Self::Bytes { name, .. } => name.clone(),
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 解码阶段输出。
///
/// 搜索过程中只读，缩放总是生成新的栅格。
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    /// 源格式，`auto` 输出格式据此决定。
    pub source_format: Option<ImageFormat>,
}
