//! # 结果报告
//!
//! 把 `BatchItem` 压平为可序列化的结构，供 CLI 输出 JSON 或文本摘要。
//! 成功条目填充尺寸/质量等字段，失败条目填充 `error_code` / `error_stage` / `message`。
//! 结果已产出但写盘失败的条目保留结果字段，同时标记为 `output` 阶段失败。

use std::path::Path;

use serde::Serialize;

use super::handler::BatchItem;

/// 单个条目的报告。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeReport {
    pub source: String,
    /// 是否得到了一个结果（不论是否满足预算）。
    pub ok: bool,
    /// 结果是否满足预算。
    pub success: bool,
    pub final_bytes: Option<u64>,
    pub target_bytes: Option<u64>,
    pub quality: Option<u8>,
    pub scale: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub mime_type: Option<String>,
    pub encode_calls: Option<u32>,
    pub output_path: Option<String>,
    pub error_code: Option<String>,
    pub error_stage: Option<String>,
    pub message: Option<String>,
}

impl OutcomeReport {
    pub fn from_item(item: &BatchItem, output_path: Option<&Path>) -> Self {
        match &item.result {
            Ok(outcome) => Self {
                source: item.source.clone(),
                ok: true,
                success: outcome.success,
                final_bytes: Some(outcome.final_bytes),
                target_bytes: Some(outcome.target_bytes),
                quality: Some(outcome.quality),
                scale: Some(outcome.scale),
                width: Some(outcome.width),
                height: Some(outcome.height),
                format: Some(outcome.format.as_str().to_string()),
                mime_type: Some(outcome.format.mime_type().to_string()),
                encode_calls: Some(outcome.encode_calls),
                output_path: output_path.map(|p| p.to_string_lossy().into_owned()),
                error_code: None,
                error_stage: None,
                message: None,
            },
            Err(err) => Self {
                source: item.source.clone(),
                ok: false,
                success: false,
                final_bytes: None,
                target_bytes: None,
                quality: None,
                scale: None,
                width: None,
                height: None,
                format: None,
                mime_type: None,
                encode_calls: None,
                output_path: None,
                error_code: Some(err.code().to_string()),
                error_stage: Some(err.stage().to_string()),
                message: Some(err.to_string()),
            },
        }
    }

    /// 结果写盘失败：条目整体记为失败，结果字段保留。
    pub fn with_output_error(mut self, message: String) -> Self {
        self.ok = false;
        self.output_path = None;
        self.error_code = Some("output_write".to_string());
        self.error_stage = Some("output".to_string());
        self.message = Some(message);
        self
    }

    /// 单行文本摘要。
    pub fn summary_line(&self) -> String {
        if !self.ok {
            return format!(
                "❌ {} [{}:{}] {}",
                self.source,
                self.error_stage.as_deref().unwrap_or("-"),
                self.error_code.as_deref().unwrap_or("-"),
                self.message.as_deref().unwrap_or("")
            );
        }

        let marker = if self.success { "✅" } else { "⚠️" };
        format!(
            "{} {} → {} {}x{} q={} scale={:.3} {}/{} 字节 (编码 {} 次){}",
            marker,
            self.source,
            self.format.as_deref().unwrap_or("-"),
            self.width.unwrap_or(0),
            self.height.unwrap_or(0),
            self.quality.unwrap_or(0),
            self.scale.unwrap_or(0.0),
            self.final_bytes.unwrap_or(0),
            self.target_bytes.unwrap_or(0),
            self.encode_calls.unwrap_or(0),
            self.output_path
                .as_deref()
                .map(|p| format!(" → {}", p))
                .unwrap_or_default()
        )
    }
}
