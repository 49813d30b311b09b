use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端服务地址（upload / parse / query / generate）
    pub service_base_url: String,
    /// 每推进一题进度显示的间隔（毫秒）
    pub pacing_delay_ms: u64,
    /// 单个请求超时（秒）
    pub request_timeout_secs: u64,
    /// 输出目录
    pub output_dir: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// CSV 是否带表头
    pub csv_header: bool,
    /// 是否同时生成 DOCX
    pub generate_doc: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 导出 CSV 的默认文件名
    pub csv_file_name: String,
    /// 生成文档的默认文件名
    pub generated_doc_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_base_url: "http://localhost:5001".to_string(),
            pacing_delay_ms: 5_000,
            request_timeout_secs: 120,
            output_dir: "output_docs".to_string(),
            output_log_file: "output.txt".to_string(),
            csv_header: false,
            generate_doc: false,
            verbose_logging: false,
            csv_file_name: "answers.csv".to_string(),
            generated_doc_file_name: "generated-document.docx".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载，未设置的字段使用默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，缺失字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    fn from_toml_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })
    }

    /// 环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            service_base_url: env_string("AUTO_ORACLE_SERVICE_URL")
                .unwrap_or(self.service_base_url),
            pacing_delay_ms: env_parse("AUTO_ORACLE_PACING_MS", "u64")?
                .unwrap_or(self.pacing_delay_ms),
            request_timeout_secs: env_parse("AUTO_ORACLE_REQUEST_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.request_timeout_secs),
            output_dir: env_string("AUTO_ORACLE_OUTPUT_DIR").unwrap_or(self.output_dir),
            output_log_file: env_string("AUTO_ORACLE_LOG_FILE").unwrap_or(self.output_log_file),
            csv_header: env_parse("AUTO_ORACLE_CSV_HEADER", "bool")?.unwrap_or(self.csv_header),
            generate_doc: env_parse("AUTO_ORACLE_GENERATE_DOC", "bool")?
                .unwrap_or(self.generate_doc),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?
                .unwrap_or(self.verbose_logging),
            csv_file_name: self.csv_file_name,
            generated_doc_file_name: self.generated_doc_file_name,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 流程控制器需要的部分
    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            pacing_delay: Duration::from_millis(self.pacing_delay_ms),
            generated_doc_file_name: self.generated_doc_file_name.clone(),
        }
    }
}

/// 流程控制器设置
#[derive(Clone, Debug)]
pub struct WorkflowSettings {
    /// 进度显示每前进一题的固定间隔
    pub pacing_delay: Duration,
    /// 生成文档下载时的默认文件名
    pub generated_doc_file_name: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Config::default().workflow_settings()
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match env_string(var_name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        None => Ok(None),
    }
}
