//! 并发获取答案
//!
//! 两条互相独立的挂起序列，全部完成后才算结束：
//! 1. 同时发出 N 个问答请求（不限流、不分批）
//! 2. 每隔固定时间把进度显示推进一题，共 N 步
//!
//! 可观察到的完成时间是 `max(真实请求耗时, N × 间隔)`。
//! 任何一个请求失败，整批立即失败，已到达的答案全部丢弃；
//! 被丢弃的 future 会一起取消尚未完成的请求和节奏循环。

use futures::future::try_join_all;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::clients::AnswerClient;
use crate::error::{AppError, AppResult};
use crate::models::QaPair;
use crate::services::ProgressTracker;
use crate::utils::logging::truncate_text;

/// 为每个问题获取答案，结果按问题原始顺序排列
pub async fn retrieve_answers(
    client: &dyn AnswerClient,
    questions: &[String],
    chatbot_endpoint: &str,
    progress: &ProgressTracker,
    pacing_delay: Duration,
) -> AppResult<Vec<QaPair>> {
    let total = questions.len();
    debug!("并发发出 {} 个问答请求", total);

    let requests = questions
        .iter()
        .enumerate()
        .map(|(index, question)| fetch_one(client, index, question, chatbot_endpoint));

    let (answers, ()) = tokio::try_join!(try_join_all(requests), async {
        pace_progress(progress, total, pacing_delay).await;
        Ok::<(), AppError>(())
    })?;

    // try_join_all 按输入顺序返回，与到达顺序无关
    Ok(questions
        .iter()
        .zip(answers)
        .map(|(question, answer)| QaPair::new(question.clone(), answer))
        .collect())
}

async fn fetch_one(
    client: &dyn AnswerClient,
    index: usize,
    question: &str,
    chatbot_endpoint: &str,
) -> AppResult<String> {
    match client.answer(question, chatbot_endpoint).await {
        Ok(answer) => {
            debug!(
                "✓ 第 {} 题答案已到达: {}",
                index + 1,
                truncate_text(&answer, 40)
            );
            Ok(answer)
        }
        Err(e) => {
            warn!("⚠️ 第 {} 题获取答案失败: {}", index + 1, e);
            Err(AppError::answer_retrieval(index, question, e))
        }
    }
}

/// 定时推进进度显示，与答案到达无关
async fn pace_progress(progress: &ProgressTracker, total: usize, delay: Duration) {
    for step in 1..=total {
        sleep(delay).await;
        let shown = progress.set_answered(step);
        info!("⏳ 回答进度: {}/{}", shown, total);
    }
}
