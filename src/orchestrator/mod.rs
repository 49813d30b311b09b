//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 命令行批处理：读取问卷文件，驱动 `WorkflowController` 走完整个流程，
//! 把结果写到输出目录。
//!
//! ## 层次关系
//!
//! ```text
//! questionnaire_runner (处理一份问卷文件)
//!     ↓
//! workflow::WorkflowController (阶段推进)
//!     ↓
//! services (能力层：进度 / 审阅模型 / 导出)
//!     ↓
//! clients (外部服务：提取 / 回答 / 文档生成)
//! ```

pub mod questionnaire_runner;

pub use questionnaire_runner::{App, RunOptions, RunSummary};
