//! 外部服务客户端
//!
//! 每个外部服务对应一个 trait（提取 / 回答 / 文档生成），流程层只依赖 trait；
//! `Http*` 实现通过 reqwest 调用后端服务。

pub mod answer_client;
pub mod docgen_client;
pub mod extraction_client;

pub use answer_client::{AnswerClient, HttpAnswerClient};
pub use docgen_client::{DocumentGenerator, HttpDocumentGenerator};
pub use extraction_client::{ExtractionClient, HttpExtractionClient};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::error::{ApiError, ConfigError};

/// 创建共享的 HTTP 客户端
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ConfigError::HttpClient)
}

/// 拼接服务地址
pub(crate) fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// 读取 JSON 响应体，非 2xx 状态转换为 `BadResponse`
pub(crate) async fn read_json(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<Value, ApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::request_failed(endpoint, e))?;

    if !status.is_success() {
        return Err(ApiError::BadResponse {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message: error_message(&text),
        });
    }

    serde_json::from_str(&text).map_err(|e| ApiError::json_parse_failed(endpoint, e))
}

/// 从错误响应体中提取说明，优先使用 `error` 字段
pub(crate) fn error_message(body: &str) -> Option<String> {
    let from_json = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));

    from_json.or_else(|| {
        let trimmed = body.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// 取出响应中的指定字段；响应带 `error` 时返回 `ServiceError`
pub(crate) fn take_field<T: DeserializeOwned>(
    endpoint: &str,
    mut body: Value,
    field: &str,
) -> Result<T, ApiError> {
    if let Some(message) = body.get("error").and_then(|e| e.as_str()) {
        return Err(ApiError::service_error(endpoint, message));
    }

    let value = match body.get_mut(field).map(Value::take) {
        Some(Value::Null) | None => {
            return Err(ApiError::EmptyResponse {
                endpoint: endpoint.to_string(),
            })
        }
        Some(value) => value,
    };

    serde_json::from_value(value).map_err(|e| ApiError::json_parse_failed(endpoint, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_url_joins_slashes() {
        assert_eq!(
            endpoint_url("http://localhost:5001/", "/query"),
            "http://localhost:5001/query"
        );
        assert_eq!(
            endpoint_url("http://localhost:5001", "parse"),
            "http://localhost:5001/parse"
        );
    }

    #[test]
    fn test_take_field_prefers_error_payload() {
        let body = json!({ "error": "Both question and chatbot_link are required" });
        let err = take_field::<String>("/query", body, "answer").unwrap_err();
        assert!(matches!(err, ApiError::ServiceError { ref message, .. }
            if message == "Both question and chatbot_link are required"));
    }

    #[test]
    fn test_take_field_missing_is_empty_response() {
        let err = take_field::<String>("/query", json!({}), "answer").unwrap_err();
        assert!(matches!(err, ApiError::EmptyResponse { .. }));

        let err = take_field::<String>("/query", json!({ "answer": null }), "answer").unwrap_err();
        assert!(matches!(err, ApiError::EmptyResponse { .. }));
    }

    #[test]
    fn test_take_field_wrong_type_is_parse_error() {
        let err = take_field::<Vec<String>>("/parse", json!({ "questions": "[]" }), "questions")
            .unwrap_err();
        assert!(matches!(err, ApiError::JsonParseFailed { .. }));
    }

    #[test]
    fn test_error_message_from_body() {
        assert_eq!(
            error_message(r#"{"error": "doc_path is required"}"#).as_deref(),
            Some("doc_path is required")
        );
        assert_eq!(error_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_message("  "), None);
    }
}
