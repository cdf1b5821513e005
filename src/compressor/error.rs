//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载压缩链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 每个错误都能给出稳定的 `code()` 与所处阶段 `stage()`，
//! 批处理报告据此告诉调用方“哪张图、在哪一步”失败。

/// 压缩链路统一错误类型。
///
/// 所有错误都只影响当前这一张图片，批处理会继续处理剩余条目。
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("目标体积无效：{0}")]
    InvalidTarget(String),

    #[error("配置错误：{0}")]
    InvalidConfig(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("渲染上下文不可用：{0}")]
    RenderContextUnavailable(String),

    #[error("格式不受支持：{0}")]
    UnsupportedFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl CompressError {
    /// 稳定的机器可读错误码，供报告与前端分支判断。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTarget(_) => "invalid_target",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Decode(_) => "decode_failure",
            Self::Encode(_) => "encode_failure",
            Self::RenderContextUnavailable(_) => "render_context_unavailable",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::FileSystem(_) => "file_system",
            Self::ResourceLimit(_) => "resource_limit",
        }
    }

    /// 错误发生的处理阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidTarget(_) | Self::InvalidConfig(_) => "validate",
            Self::FileSystem(_) | Self::ResourceLimit(_) => "load",
            Self::Decode(_) => "decode",
            Self::RenderContextUnavailable(_) => "render",
            Self::Encode(_) | Self::UnsupportedFormat(_) => "encode",
        }
    }
}

impl From<CompressError> for String {
    fn from(error: CompressError) -> Self {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_stages_are_stable() {
        let target = CompressError::InvalidTarget("0".to_string());
        assert_eq!(target.code(), "invalid_target");
        assert_eq!(target.stage(), "validate");

        let render = CompressError::RenderContextUnavailable("lock".to_string());
        assert_eq!(render.code(), "render_context_unavailable");
        assert_eq!(render.stage(), "render");

        let encode = CompressError::Encode("empty".to_string());
        assert_eq!(encode.stage(), "encode");
    }

    #[test]
    fn converts_into_display_string() {
        let message: String = CompressError::Decode("bad header".to_string()).into();
        assert!(message.contains("bad header"));
    }
}
