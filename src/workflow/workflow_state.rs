//! 流程状态
//!
//! 控制器独占的状态对象，外部只能通过只读快照观察

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::WorkflowError;
use crate::models::{DocumentHandle, QaPair, Stage};
use crate::services::{ProgressSnapshot, ReviewModel};

/// 控制器内部状态
#[derive(Debug)]
pub(crate) struct WorkflowState {
    pub stage: Stage,
    pub document: Option<DocumentHandle>,
    pub chatbot_endpoint: Option<String>,
    /// 提取到的问题，答案全部到达前不进入审阅模型
    pub extracted: Vec<String>,
    pub review: ReviewModel,
    pub pending_follow_up: Option<QaPair>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Upload,
            document: None,
            chatbot_endpoint: None,
            extracted: Vec::new(),
            review: ReviewModel::new(),
            pending_follow_up: None,
        }
    }

    pub fn ensure_stage(
        &self,
        operation: &'static str,
        allowed: &[Stage],
    ) -> Result<(), WorkflowError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidStage {
                operation,
                actual: self.stage,
            })
        }
    }
}

/// 流程只读快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    pub stage: Stage,
    pub progress: ProgressSnapshot,
    pub document_name: Option<String>,
    pub preview_url: Option<String>,
    pub extracted_questions: Vec<String>,
    pub qa_pairs: Vec<QaPair>,
    pub pending_follow_up: Option<QaPair>,
    pub is_running: bool,
    pub is_generating_doc: bool,
    pub is_loading_follow_up: bool,
}

/// 互斥标志：同一时间只允许一个请求在进行
#[derive(Debug, Default)]
pub(crate) struct BusyFlag(AtomicBool);

impl BusyFlag {
    /// 尝试占用，已被占用时返回 None
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.0))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// drop 时释放标志，future 被丢弃时同样会释放
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_flag_is_exclusive_until_guard_dropped() {
        let flag = BusyFlag::default();

        let guard = flag.try_acquire();
        assert!(guard.is_some());
        assert!(flag.is_set());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_set());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_ensure_stage() {
        let state = WorkflowState::new();
        assert!(state.ensure_stage("submit", &[Stage::Upload]).is_ok());
        assert_eq!(
            state.ensure_stage("export_csv", &[Stage::Review]),
            Err(WorkflowError::InvalidStage {
                operation: "export_csv",
                actual: Stage::Upload,
            })
        );
    }
}
