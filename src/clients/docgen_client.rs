//! 文档生成客户端
//!
//! 把完整问答列表发给生成服务，拿回二进制文档

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::clients::{endpoint_url, error_message};
use crate::error::ApiError;
use crate::models::QaPair;

/// 文档生成服务
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    async fn generate(&self, document_name: &str, qa_pairs: &[QaPair])
        -> Result<Vec<u8>, ApiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    document_name: &'a str,
    qa_array: &'a [QaPair],
}

/// 基于 HTTP 的文档生成客户端
pub struct HttpDocumentGenerator {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDocumentGenerator {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DocumentGenerator for HttpDocumentGenerator {
    async fn generate(
        &self,
        document_name: &str,
        qa_pairs: &[QaPair],
    ) -> Result<Vec<u8>, ApiError> {
        let endpoint = endpoint_url(&self.base_url, "generate");
        debug!("请求生成文档: {} ({} 组问答)", document_name, qa_pairs.len());

        let response = self
            .http
            .post(&endpoint)
            .json(&GenerateRequest {
                document_name,
                qa_array: qa_pairs,
            })
            .send()
            .await
            .map_err(|e| ApiError::request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::BadResponse {
                endpoint,
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::request_failed(&endpoint, e))?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyResponse { endpoint });
        }

        debug!("文档生成完成: {} 字节", bytes.len());
        Ok(bytes.to_vec())
    }
}
