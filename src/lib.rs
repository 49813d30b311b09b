//! # Auto Oracle
//!
//! 自动回答安全/合规问卷：从问卷文档中提取问题，向聊天机器人并发提问，
//! 审阅、追问后导出 CSV 或生成文档。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 外部服务层（Clients）
//! - `clients/` - 每个外部服务一个 trait，流程层只依赖 trait
//! - `ExtractionClient` - 上传文档并提取问题
//! - `AnswerClient` - 向聊天机器人提问
//! - `DocumentGenerator` - 根据问答生成文档
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 不做 I/O 的状态和算法
//! - `ProgressTracker` - 三个阶段的状态和 "K/N" 计数
//! - `ReviewModel` - 有序的问题列表和答案
//! - `exporter` - CSV 序列化和文件落盘
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义一份问卷的完整处理流程
//! - `WorkflowController` - 阶段推进（upload → processing → review）
//! - `answer_batch` - 并发获取答案，同时按固定节奏推进进度
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/questionnaire_runner` - 命令行批处理入口
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{AnswerClient, DocumentGenerator, ExtractionClient};
pub use config::{Config, WorkflowSettings};
pub use error::{ApiError, AppError, AppResult, ConfigError, WorkflowError};
pub use models::{DocumentHandle, Phase, PhaseStatus, PreviewRegistry, QaPair, Stage};
pub use orchestrator::{App, RunOptions, RunSummary};
pub use services::{GeneratedDocument, ProgressSnapshot};
pub use workflow::{WorkflowController, WorkflowSnapshot};
