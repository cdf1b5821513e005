//! # 编码能力模块
//!
//! ## 设计思路
//!
//! 搜索算法把编码器当作黑盒“预言机”：给定栅格、格式与质量，返回编码后的字节。
//! 这里用 `Encoder` trait 把这一能力抽象出来，核心只关心输出体积，
//! 测试可以注入体积完全可控的合成编码器。
//!
//! ## 实现思路
//!
//! - `OutputFormat` 描述可输出格式及其是否有损。
//! - `FormatChoice` 处理 `auto`（沿用源格式）与显式格式两种配置。
//! - `ImageCrateEncoder` 基于 `image` crate 实现 JPEG / PNG / WebP（无损）编码。
//! - 编码结果统一为 `bytes::Bytes`，所有权可零拷贝地移交给调用方。

use std::fmt;
use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder as _, ImageFormat};

use super::CompressError;

/// 可输出的编码格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    /// 是否为有损格式。只有有损格式才会执行质量二分搜索。
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    /// 源图片格式到输出格式的映射；不可编码的源格式返回 `None`。
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    /// 从外部字符串解析格式。
    ///
    /// # 示例
    /// ```rust
    /// use image_budget::compressor::OutputFormat;
    ///
    /// assert_eq!(OutputFormat::parse("JPG")?, OutputFormat::Jpeg);
    /// # Ok::<(), image_budget::compressor::CompressError>(())
    /// ```
    pub fn parse(value: &str) -> Result<Self, CompressError> {
        match value.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            other => Err(CompressError::UnsupportedFormat(format!(
                "未知输出格式：{}（可选：jpeg / png / webp）",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 输出格式配置：`auto` 沿用源格式，否则使用显式格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FormatChoice {
    #[default]
    Auto,
    Explicit(OutputFormat),
}

impl FormatChoice {
    pub fn parse(value: &str) -> Result<Self, CompressError> {
        if value.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        OutputFormat::parse(value).map(Self::Explicit)
    }

    /// 结合源格式确定本次实际输出格式。
    ///
    /// `auto` 且源格式无法编码（如 GIF / BMP）时回退为 JPEG。
    pub fn resolve(self, source_format: Option<ImageFormat>) -> OutputFormat {
        match self {
            Self::Explicit(format) => format,
            Self::Auto => match source_format.and_then(OutputFormat::from_image_format) {
                Some(format) => format,
                None => {
                    log::warn!(
                        "⚠️ 源格式 {:?} 无法直接编码，auto 模式回退为 jpeg",
                        source_format
                    );
                    OutputFormat::Jpeg
                }
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Explicit(format) => format.as_str(),
        }
    }
}

impl TryFrom<String> for FormatChoice {
    type Error = CompressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FormatChoice> for String {
    fn from(choice: FormatChoice) -> Self {
        choice.as_str().to_string()
    }
}

/// 单次编码尝试的描述。无损格式下 `quality` 没有意义。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeRequest {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: u8,
}

/// 编码能力。
///
/// 实现方必须保证：同一栅格、同一请求的输出确定；失败时返回错误而不是空字节。
pub trait Encoder: Send + Sync {
    fn encode(&self, raster: &DynamicImage, request: EncodeRequest) -> Result<Bytes, CompressError>;
}

/// 基于 `image` crate 的默认编码器。
///
/// `image` 只提供无损 WebP，因此 WebP 与 PNG 一样不参与质量搜索。
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateEncoder;

impl Encoder for ImageCrateEncoder {
    fn encode(&self, raster: &DynamicImage, request: EncodeRequest) -> Result<Bytes, CompressError> {
        let (width, height) = raster.dimensions();
        if (width, height) != (request.width, request.height) {
            return Err(CompressError::Encode(format!(
                "编码请求尺寸 {}x{} 与栅格尺寸 {}x{} 不一致",
                request.width, request.height, width, height
            )));
        }

        let mut output = Cursor::new(Vec::new());
        match request.format {
            OutputFormat::Jpeg => {
                // JPEG 不支持 alpha 通道
                let rgb = raster.to_rgb8();
                JpegEncoder::new_with_quality(&mut output, request.quality.clamp(1, 100))
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| CompressError::Encode(format!("jpeg 编码失败：{}", e)))?;
            }
            OutputFormat::Png => {
                let rgba = raster.to_rgba8();
                PngEncoder::new(&mut output)
                    .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(|e| CompressError::Encode(format!("png 编码失败：{}", e)))?;
            }
            OutputFormat::WebP => {
                let rgba = raster.to_rgba8();
                WebPEncoder::new_lossless(&mut output)
                    .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(|e| CompressError::Encode(format!("webp 编码失败：{}", e)))?;
            }
        }

        let bytes = output.into_inner();
        if bytes.is_empty() {
            return Err(CompressError::Encode(format!(
                "{} 编码器未产生任何输出",
                request.format
            )));
        }

        Ok(Bytes::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 255) as u8, (y * 13 % 255) as u8, ((x + y) % 255) as u8, 255])
        }))
    }

    fn request(raster: &DynamicImage, format: OutputFormat, quality: u8) -> EncodeRequest {
        EncodeRequest {
            width: raster.width(),
            height: raster.height(),
            format,
            quality,
        }
    }

    #[test]
    fn jpeg_output_grows_with_quality() {
        let raster = gradient(96, 96);
        let encoder = ImageCrateEncoder;

        let low = encoder
            .encode(&raster, request(&raster, OutputFormat::Jpeg, 10))
            .expect("jpeg encode at q10 failed");
        let high = encoder
            .encode(&raster, request(&raster, OutputFormat::Jpeg, 95))
            .expect("jpeg encode at q95 failed");

        assert!(low.len() < high.len());
        assert_eq!(&low[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn lossless_formats_produce_their_signatures() {
        let raster = gradient(32, 20);
        let encoder = ImageCrateEncoder;

        let png = encoder
            .encode(&raster, request(&raster, OutputFormat::Png, 0))
            .expect("png encode failed");
        assert_eq!(&png[1..4], b"PNG");

        let webp = encoder
            .encode(&raster, request(&raster, OutputFormat::WebP, 0))
            .expect("webp encode failed");
        assert_eq!(&webp[..4], b"RIFF");
    }

    #[test]
    fn rejects_mismatched_request_dimensions() {
        let raster = gradient(10, 10);
        let result = ImageCrateEncoder.encode(
            &raster,
            EncodeRequest {
                width: 11,
                height: 10,
                format: OutputFormat::Png,
                quality: 0,
            },
        );
        assert!(matches!(result, Err(CompressError::Encode(_))));
    }

    #[test]
    fn format_choice_resolves_auto_from_source() {
        assert_eq!(
            FormatChoice::Auto.resolve(Some(ImageFormat::Png)),
            OutputFormat::Png
        );
        assert_eq!(
            FormatChoice::Auto.resolve(Some(ImageFormat::Gif)),
            OutputFormat::Jpeg
        );
        assert_eq!(
            FormatChoice::Explicit(OutputFormat::WebP).resolve(Some(ImageFormat::Jpeg)),
            OutputFormat::WebP
        );
    }

    #[test]
    fn format_choice_parses_and_rejects() {
        assert_eq!(FormatChoice::parse(" AUTO ").unwrap(), FormatChoice::Auto);
        assert_eq!(
            FormatChoice::parse("jpg").unwrap(),
            FormatChoice::Explicit(OutputFormat::Jpeg)
        );
        assert!(matches!(
            FormatChoice::parse("tiff"),
            Err(CompressError::UnsupportedFormat(_))
        ));
    }
}
