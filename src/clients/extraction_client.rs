//! 问题提取客户端
//!
//! 先上传文档拿到服务端路径，再请求解析出问题列表

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::clients::{endpoint_url, read_json, take_field};
use crate::error::ApiError;
use crate::models::DocumentUpload;

/// 问题提取服务
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// 提交文档，返回按文档顺序排列的问题
    async fn find_questions(&self, document: &DocumentUpload) -> Result<Vec<String>, ApiError>;
}

/// 基于 HTTP 的提取客户端
pub struct HttpExtractionClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "filePath")]
    file_path: String,
}

impl HttpExtractionClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// 上传文档，返回服务端保存路径
    async fn upload(&self, document: &DocumentUpload) -> Result<String, ApiError> {
        let endpoint = endpoint_url(&self.base_url, "upload");
        debug!(
            "上传文档: {} ({} 字节, {})",
            document.file_name,
            document.content.len(),
            document.mime
        );

        let part = Part::bytes(document.content.to_vec())
            .file_name(document.file_name.clone())
            .mime_str(document.mime.mime_type())
            .map_err(|e| ApiError::request_failed(&endpoint, e))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::request_failed(&endpoint, e))?;

        let body = read_json(&endpoint, response).await?;
        if let Some(message) = body.get("error").and_then(|e| e.as_str()) {
            return Err(ApiError::service_error(&endpoint, message));
        }
        let upload: UploadResponse =
            serde_json::from_value(body).map_err(|e| ApiError::json_parse_failed(&endpoint, e))?;

        debug!("文档已上传: {}", upload.file_path);
        Ok(upload.file_path)
    }

    /// 解析已上传的文档
    async fn parse(&self, doc_path: &str) -> Result<Vec<String>, ApiError> {
        let endpoint = endpoint_url(&self.base_url, "parse");

        let response = self
            .http
            .post(&endpoint)
            .json(&json!({ "doc_path": doc_path }))
            .send()
            .await
            .map_err(|e| ApiError::request_failed(&endpoint, e))?;

        let body = read_json(&endpoint, response).await?;
        take_field(&endpoint, body, "questions")
    }
}

#[async_trait]
impl ExtractionClient for HttpExtractionClient {
    async fn find_questions(&self, document: &DocumentUpload) -> Result<Vec<String>, ApiError> {
        let doc_path = self.upload(document).await?;
        let questions = self.parse(&doc_path).await?;
        debug!("解析得到 {} 个问题", questions.len());
        Ok(questions)
    }
}
