//! # 体积预算图片压缩：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  命令行 (clap, main.rs)                   │
//! │   参数解析 ── 配置文件 ── 结果写盘 ── 文本/JSON 报告        │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            库 (Rust)                              │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ settings ─── JSON 配置文件读写                         │
//! │  │                                                       │
//! │  └─ compressor ─ 加载·解码·缩放调度·质量二分·编码          │
//! │      ├─ service        异步批处理 (tokio)                 │
//! │      └─ handler        配置快照 + 阶段耗时                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行层的返回类型 |
//! | [`compressor`] | 在字节预算内搜索编码质量与缩放比例 |
//! | [`settings`] | `CompressConfig` 的 JSON 文件读写 |

pub mod compressor;
pub mod error;
pub mod settings;
