//! 流程层（Workflow Layer）
//!
//! - `answer_batch` - 并发获取一批答案，同时按固定节奏推进进度
//! - `controller` - 问卷流程控制器，持有全部状态
//! - `workflow_state` - 控制器内部状态和只读快照

pub mod answer_batch;
pub mod controller;
mod workflow_state;

pub use controller::WorkflowController;
pub use workflow_state::WorkflowSnapshot;
