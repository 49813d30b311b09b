//! 审阅模型 - 业务能力层
//!
//! 有序的问题列表加上问题到答案的映射。两者始终等长，
//! 顺序既是显示顺序也是导出顺序。

use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::error::WorkflowError;
use crate::models::QaPair;
use crate::services::exporter;

/// 审阅模型
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewModel {
    questions: Vec<String>,
    answers: HashMap<String, String>,
}

impl ReviewModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用一整批问答替换当前内容
    ///
    /// 问题必须唯一；出现重复时整批拒绝，当前内容不变
    pub fn populate(&mut self, pairs: Vec<QaPair>) -> Result<(), WorkflowError> {
        {
            let mut seen = HashSet::with_capacity(pairs.len());
            if let Some(dup) = pairs.iter().find(|p| !seen.insert(p.question.as_str())) {
                return Err(WorkflowError::DuplicateQuestion {
                    question: dup.question.clone(),
                });
            }
        }

        let mut questions = Vec::with_capacity(pairs.len());
        let mut answers = HashMap::with_capacity(pairs.len());
        for QaPair { question, answer } in pairs {
            questions.push(question.clone());
            answers.insert(question, answer);
        }

        self.questions = questions;
        self.answers = answers;
        Ok(())
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn answer(&self, question: &str) -> Option<&str> {
        self.answers.get(question).map(String::as_str)
    }

    pub fn contains(&self, question: &str) -> bool {
        self.answers.contains_key(question)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// 修改某个问题的答案
    pub fn set_answer(
        &mut self,
        question: &str,
        text: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        match self.answers.get_mut(question) {
            Some(answer) => {
                *answer = text.into();
                Ok(())
            }
            None => Err(WorkflowError::UnknownQuestion {
                question: question.to_string(),
            }),
        }
    }

    /// 在末尾追加一组问答
    pub fn append(&mut self, pair: QaPair) -> Result<(), WorkflowError> {
        if self.contains(&pair.question) {
            return Err(WorkflowError::DuplicateQuestion {
                question: pair.question,
            });
        }
        self.questions.push(pair.question.clone());
        self.answers.insert(pair.question, pair.answer);
        Ok(())
    }

    /// 按顺序返回所有问答
    pub fn pairs(&self) -> Vec<QaPair> {
        self.iter().map(|(q, a)| QaPair::new(q, a)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.questions.iter().map(move |q| {
            let answer = self.answers.get(q).map(String::as_str).unwrap_or_default();
            (q.as_str(), answer)
        })
    }

    /// 导出为 CSV，同样的内容总是得到同样的输出
    pub fn to_csv(&self, header: bool) -> String {
        exporter::to_csv(self.iter(), header)
    }
}

/// 整理提取服务返回的问题：去掉首尾空白、空项和重复项（保留第一次出现）
pub fn normalize_questions(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut questions = Vec::with_capacity(raw.len());

    for question in raw {
        let question = question.trim();
        if question.is_empty() {
            warn!("⚠️ 忽略空问题");
            continue;
        }
        if !seen.insert(question.to_string()) {
            warn!("⚠️ 忽略重复问题: {}", question);
            continue;
        }
        questions.push(question.to_string());
    }

    questions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReviewModel {
        let mut model = ReviewModel::new();
        model
            .populate(vec![
                QaPair::new("Is the system SOC2 compliant?", "Yes"),
                QaPair::new(
                    "Can users delete their data?",
                    "Yes, via the account settings page",
                ),
            ])
            .unwrap();
        model
    }

    #[test]
    fn test_populate_keeps_order_and_length() {
        let model = sample();
        assert_eq!(model.len(), 2);
        assert_eq!(
            model.questions(),
            &["Is the system SOC2 compliant?", "Can users delete their data?"]
        );
        assert_eq!(model.answer("Is the system SOC2 compliant?"), Some("Yes"));
    }

    #[test]
    fn test_populate_rejects_duplicates_without_mutation() {
        let mut model = sample();
        let err = model
            .populate(vec![QaPair::new("a", "1"), QaPair::new("a", "2")])
            .unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateQuestion { .. }));
        assert_eq!(model, sample());
    }

    #[test]
    fn test_set_answer_reflected_in_csv() {
        let mut model = sample();
        let before = model.to_csv(false);
        assert_eq!(before, model.to_csv(false));

        model
            .set_answer("Is the system SOC2 compliant?", "Yes, Type II")
            .unwrap();
        let after = model.to_csv(false);
        assert_ne!(before, after);
        assert!(after.starts_with("\"Is the system SOC2 compliant?\",\"Yes, Type II\""));
    }

    #[test]
    fn test_set_answer_unknown_question() {
        let mut model = sample();
        let err = model.set_answer("What is your SLA?", "99.9%").unwrap_err();
        assert_eq!(
            err,
            WorkflowError::UnknownQuestion {
                question: "What is your SLA?".to_string()
            }
        );
    }

    #[test]
    fn test_append_goes_last_and_rejects_duplicates() {
        let mut model = sample();
        model
            .append(QaPair::new("What is your SLA?", "99.9% uptime"))
            .unwrap();
        assert_eq!(
            model.questions().last().map(String::as_str),
            Some("What is your SLA?")
        );
        assert_eq!(model.len(), 3);

        let err = model
            .append(QaPair::new("What is your SLA?", "again"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateQuestion { .. }));
        assert_eq!(model.answer("What is your SLA?"), Some("99.9% uptime"));
    }

    #[test]
    fn test_normalize_questions() {
        let raw = vec![
            " 1. Company name ".to_string(),
            "".to_string(),
            "2. Is data encrypted at rest?".to_string(),
            "1. Company name".to_string(),
            "   ".to_string(),
        ];
        assert_eq!(
            normalize_questions(raw),
            vec!["1. Company name", "2. Is data encrypted at rest?"]
        );
    }
}
