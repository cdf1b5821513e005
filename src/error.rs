//! 统一错误类型模块
//!
//! # 设计思路
//!
//! `CompressError` 只描述单张图片处理链路内的失败；
//! 命令行层还会遇到配置文件、输出目录、结果写盘等问题。
//! `AppError` 把两者收敛为同一个类型，`main.rs` 只需处理一种错误。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `CompressError` 与 `std::io::Error` 提供 `From` 转换，`?` 直接传播。
//! - 实现 `Serialize` 将错误序列化为字符串，便于写入 JSON 报告。

use serde::Serialize;

use crate::compressor::CompressError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 压缩流水线错误（加载 / 解码 / 搜索）
    #[error("{0}")]
    Compress(#[from] CompressError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件读取或解析失败
    #[error("配置文件错误: {0}")]
    Settings(String),

    /// 输出写入或报告序列化失败
    #[error("输出失败: {0}")]
    Output(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
