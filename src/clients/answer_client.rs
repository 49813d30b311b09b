//! 问答客户端
//!
//! 把一个问题发给指定的聊天机器人，返回一条答案

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::clients::{endpoint_url, read_json, take_field};
use crate::error::ApiError;

/// 回答服务
#[async_trait]
pub trait AnswerClient: Send + Sync {
    async fn answer(&self, question: &str, chatbot_endpoint: &str) -> Result<String, ApiError>;
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
    chatbot_link: &'a str,
}

/// 基于 HTTP 的问答客户端
pub struct HttpAnswerClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAnswerClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AnswerClient for HttpAnswerClient {
    async fn answer(&self, question: &str, chatbot_endpoint: &str) -> Result<String, ApiError> {
        let endpoint = endpoint_url(&self.base_url, "query");
        debug!("请求答案，问题长度: {} 字符", question.len());

        let response = self
            .http
            .post(&endpoint)
            .json(&QueryRequest {
                question,
                chatbot_link: chatbot_endpoint,
            })
            .send()
            .await
            .map_err(|e| ApiError::request_failed(&endpoint, e))?;

        let body = read_json(&endpoint, response).await?;
        take_field(&endpoint, body, "answer")
    }
}
