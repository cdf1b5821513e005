//! # 体积预算压缩模块（compressor）
//!
//! ## 设计思路
//!
//! 给定一张图片和一个字节预算，在“编码质量”和“缩放比例”两个维度上搜索，
//! 找到满足预算且尽量保真的编码结果。按职责拆分为多个子模块：
//!
//! - `handler`：编排整条处理流水线（同步）
//! - `service`：异步批处理入口（`tokio::spawn_blocking`，逐张执行）
//! - `loader`：文件 / Base64 / 内存字节加载与签名校验
//! - `pipeline`：解码 + 像素上限
//! - `search`：缩放调度 + 结果组装
//! - `quality`：单一缩放档位内的质量二分搜索
//! - `scale`：缩放衰减序列
//! - `candidate`：候选结果与双槽最优追踪
//! - `render` / `encoder`：可替换的渲染与编码能力
//! - `config/error/source/report`：配置、错误、中间数据模型、结果报告
//!
//! ## 新同事快速上手
//!
//! ```text
//! CLI / 调用方
//!    ↓
//! service.rs（异步批处理、进度回调）
//!    ↓
//! handler.rs（配置快照 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + 体积/签名校验）
//!    ├─ pipeline.rs（解码 + 像素限制）
//!    └─ search.rs（缩放调度）
//!         ├─ render.rs（缩放渲染）
//!         └─ quality.rs（质量二分 → encoder.rs）
//!    ↓
//! SearchOutcome / CompressError
//! ```
//!
//! ## 分层职责建议
//!
//! - 搜索策略变更优先改 `search.rs` 与 `quality.rs`
//! - 配置与档位变更优先改 `config.rs`
//! - 新增输出格式优先改 `encoder.rs`

mod candidate;
mod config;
mod encoder;
mod error;
mod handler;
mod loader;
mod pipeline;
mod quality;
mod render;
mod report;
mod scale;
mod search;
mod service;
mod source;

pub use candidate::{BestTracker, Candidate};
pub use config::{CompressConfig, ResizeFilter, SearchProfile};
pub use encoder::{EncodeRequest, Encoder, FormatChoice, ImageCrateEncoder, OutputFormat};
pub use error::CompressError;
pub use handler::{BatchItem, CompressHandler};
pub use quality::{QualityRange, LOSSLESS_QUALITY, MAX_QUALITY, MIN_QUALITY};
pub use render::{FastResizeRenderer, Renderer};
pub use report::OutcomeReport;
pub use scale::{scaled_dimensions, ScaleSchedule, Scales};
pub use search::{BudgetSearch, SearchOutcome, SearchParams};
pub use service::CompressService;
pub use source::{DecodedImage, ImageSource};
