//! 进度跟踪 - 业务能力层
//!
//! 只保存状态，不做任何 I/O。观察者通过 `subscribe()` 拿到 watch 通道，
//! 每次状态变化都会推送一份新的快照。
//!
//! `answered` 只用于界面上的 "K/N" 显示，由定时推进的节奏循环更新，
//! 与答案真正到达的时间无关。

use tokio::sync::watch;

use crate::error::WorkflowError;
use crate::models::{Phase, PhaseStatus};

/// 进度快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub find_questions: PhaseStatus,
    pub answer_questions: PhaseStatus,
    pub compile_results: PhaseStatus,
    /// 已显示为完成的题数，范围 `[0, total]`
    pub answered: usize,
    pub total: usize,
}

impl ProgressSnapshot {
    pub fn status(&self, phase: Phase) -> PhaseStatus {
        match phase {
            Phase::FindQuestions => self.find_questions,
            Phase::AnswerQuestions => self.answer_questions,
            Phase::CompileResults => self.compile_results,
        }
    }

    fn status_mut(&mut self, phase: Phase) -> &mut PhaseStatus {
        match phase {
            Phase::FindQuestions => &mut self.find_questions,
            Phase::AnswerQuestions => &mut self.answer_questions,
            Phase::CompileResults => &mut self.compile_results,
        }
    }

    /// 回答阶段进行中时显示 "K/N"，其余时候为空
    pub fn label(&self) -> String {
        if self.answer_questions == PhaseStatus::Processing {
            format!("{}/{}", self.answered, self.total)
        } else {
            String::new()
        }
    }

    /// 各阶段进度条的百分比
    pub fn percent(&self, phase: Phase) -> u8 {
        match (phase, self.status(phase)) {
            (_, PhaseStatus::Done) => 100,
            (Phase::FindQuestions, PhaseStatus::Processing) => 60,
            (Phase::AnswerQuestions, _) if self.total > 0 => {
                (self.answered * 100 / self.total).min(100) as u8
            }
            _ => 0,
        }
    }
}

/// 进度跟踪器
pub struct ProgressTracker {
    tx: watch::Sender<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.tx.borrow()
    }

    /// 订阅进度变化
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    /// 新一轮运行开始前清零
    pub fn reset(&self) {
        self.tx.send_replace(ProgressSnapshot::default());
    }

    /// 推进某个阶段的状态
    ///
    /// 只能前进（允许跳过中间状态），设置为当前状态时不做任何事，
    /// 回退返回 `StatusRegression`。
    pub fn advance(&self, phase: Phase, to: PhaseStatus) -> Result<(), WorkflowError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|snapshot| {
            let from = snapshot.status(phase);
            if to < from {
                result = Err(WorkflowError::StatusRegression { phase, from, to });
                return false;
            }
            if to == from {
                return false;
            }
            *snapshot.status_mut(phase) = to;
            true
        });
        result
    }

    /// 设置本轮题目总数，已完成数归零
    pub fn start_answering(&self, total: usize) {
        self.tx.send_modify(|snapshot| {
            snapshot.total = total;
            snapshot.answered = 0;
        });
    }

    /// 更新已完成数，只增不减且不超过总数；返回更新后的值
    pub fn set_answered(&self, count: usize) -> usize {
        let mut current = 0;
        self.tx.send_if_modified(|snapshot| {
            let next = count.min(snapshot.total).max(snapshot.answered);
            current = next;
            if next == snapshot.answered {
                return false;
            }
            snapshot.answered = next;
            true
        });
        current
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
