use serde::{Deserialize, Serialize};
use std::fmt;

/// 流程所处的顶层阶段
///
/// 单次运行内只前进，不回退：`Upload → Processing → Review`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Upload,
    Processing,
    Review,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Upload => "upload",
            Stage::Processing => "processing",
            Stage::Review => "review",
        };
        f.write_str(name)
    }
}

/// 处理阶段内的三个子步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    FindQuestions,
    AnswerQuestions,
    CompileResults,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::FindQuestions => "findQuestions",
            Phase::AnswerQuestions => "answerQuestions",
            Phase::CompileResults => "compileResults",
        };
        f.write_str(name)
    }
}

/// 子步骤状态，`Waiting → Processing → Done`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    Waiting,
    Processing,
    Done,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseStatus::Waiting => "waiting",
            PhaseStatus::Processing => "processing",
            PhaseStatus::Done => "done",
        };
        f.write_str(name)
    }
}

/// 一组问答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

impl fmt::Display for QaPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q: {}\nA: {}", self.question, self.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_workflow_order() {
        assert!(Stage::Upload < Stage::Processing);
        assert!(Stage::Processing < Stage::Review);
    }

    #[test]
    fn test_phase_status_serializes_lowercase() {
        let json = serde_json::to_string(&PhaseStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert_eq!(Phase::AnswerQuestions.to_string(), "answerQuestions");
    }
}
