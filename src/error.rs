use thiserror::Error;

use crate::models::{Phase, PhaseStatus, Stage};

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 提取问题失败（上传或解析阶段）
    #[error("问题提取失败: {0}")]
    Extraction(#[source] ApiError),

    /// 批量获取答案失败（任意一个失败即整批失败）
    #[error("答案获取失败 (第 {} 题: {question}): {source}", .index + 1)]
    AnswerRetrieval {
        index: usize,
        question: String,
        #[source]
        source: ApiError,
    },

    /// 追问失败，不影响已有的审阅数据
    #[error("追问失败: {0}")]
    FollowUp(#[source] ApiError),

    /// 文档生成失败
    #[error("文档生成失败: {0}")]
    Generation(#[source] ApiError),

    /// 流程状态错误（前置条件不满足）
    #[error("流程错误: {0}")]
    Workflow(#[from] WorkflowError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 文件读写错误
    #[error("文件错误 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 外部服务调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 服务返回非 2xx 状态
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message:?}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    /// 服务返回 `{error: ...}`
    #[error("服务返回错误 ({endpoint}): {message}")]
    ServiceError { endpoint: String, message: String },

    /// 服务返回空结果
    #[error("API返回空结果: {endpoint}")]
    EmptyResponse { endpoint: String },

    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 流程前置条件错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("当前阶段 {actual} 不允许执行 {operation}")]
    InvalidStage {
        operation: &'static str,
        actual: Stage,
    },

    #[error("尚未选择文档")]
    MissingDocument,

    #[error("文档内容为空: {file_name}")]
    EmptyDocument { file_name: String },

    #[error("不支持的文档类型: {file_name}")]
    UnsupportedDocument { file_name: String },

    #[error("聊天机器人地址不能为空")]
    EmptyEndpoint,

    #[error("问题不能为空")]
    EmptyQuestion,

    #[error("问题不存在: {question}")]
    UnknownQuestion { question: String },

    #[error("问题已存在: {question}")]
    DuplicateQuestion { question: String },

    #[error("已有流程正在运行")]
    RunInFlight,

    #[error("已有文档生成请求正在进行")]
    GenerationInFlight,

    #[error("已有追问请求正在进行")]
    FollowUpInFlight,

    #[error("没有待确认的追问")]
    NoPendingFollowUp,

    #[error("{phase} 状态不能从 {from} 回退到 {to}")]
    StatusRegression {
        phase: Phase,
        from: PhaseStatus,
        to: PhaseStatus,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    /// 配置文件读取失败
    #[error("无法读取配置文件 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP 客户端创建失败
    #[error("HTTP客户端创建失败: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl ApiError {
    /// 创建网络请求失败错误
    pub fn request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }

    /// 创建 JSON 解析失败错误
    pub fn json_parse_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ApiError::JsonParseFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }

    /// 创建服务端业务错误
    pub fn service_error(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ServiceError {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}

impl AppError {
    /// 创建单题答案获取失败错误
    pub fn answer_retrieval(index: usize, question: impl Into<String>, source: ApiError) -> Self {
        AppError::AnswerRetrieval {
            index,
            question: question.into(),
            source,
        }
    }

    /// 创建文件读写错误
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// 返回流程前置条件错误（如果是）
    pub fn as_workflow(&self) -> Option<&WorkflowError> {
        match self {
            AppError::Workflow(e) => Some(e),
            _ => None,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_retrieval_message_is_one_based() {
        let err = AppError::answer_retrieval(
            1,
            "Can users delete their data?",
            ApiError::service_error("/query", "chatbot not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("第 2 题"));
        assert!(msg.contains("Can users delete their data?"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_workflow_error_converts_into_app_error() {
        let err: AppError = WorkflowError::EmptyEndpoint.into();
        assert_eq!(err.as_workflow(), Some(&WorkflowError::EmptyEndpoint));
    }
}
