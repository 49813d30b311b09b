//! 问卷批处理入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：初始化日志文件、创建连接后端服务的控制器
//! 2. **读取问卷**：从磁盘读取问卷文件并交给控制器
//! 3. **运行流程**：提交后订阅进度通道并输出 "K/N"
//! 4. **落盘**：写出 CSV，按需写出生成的文档
//! 5. **清理**：释放文档，输出统计
//!
//! 不做任何业务判断，所有状态都在 `WorkflowController` 中。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::exporter::{pairs_to_csv, save_to_dir};
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};
use crate::workflow::WorkflowController;

/// 一次运行的参数
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// 问卷文件路径（pdf / doc / docx）
    pub questionnaire: PathBuf,
    /// 聊天机器人地址
    pub chatbot_link: String,
    /// 生成文档的名称，缺省时使用问卷文件名
    pub document_name: Option<String>,
}

/// 一次运行的结果
#[derive(Debug, Default)]
pub struct RunSummary {
    pub answered: usize,
    pub outputs: Vec<PathBuf>,
}

/// 应用主结构
pub struct App {
    config: Config,
    controller: Arc<WorkflowController>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        let controller = Arc::new(WorkflowController::from_config(&config)?);
        Ok(Self { config, controller })
    }

    /// 使用已有的控制器
    pub fn with_controller(config: Config, controller: Arc<WorkflowController>) -> Self {
        Self { config, controller }
    }

    pub fn controller(&self) -> &Arc<WorkflowController> {
        &self.controller
    }

    /// 运行应用主逻辑
    pub async fn run(&self, options: &RunOptions) -> AppResult<RunSummary> {
        let result = self.run_inner(options).await;

        // 无论成功与否都释放文档
        if let Err(e) = self.controller.teardown() {
            warn!("⚠️ 清理失败: {}", e);
        }

        let summary = result?;
        let outputs: Vec<String> = summary
            .outputs
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        print_final_stats(summary.answered, &outputs, &self.config.output_log_file);
        Ok(summary)
    }

    async fn run_inner(&self, options: &RunOptions) -> AppResult<RunSummary> {
        // ========== 步骤 1: 读取问卷 ==========
        let (file_name, content) = read_questionnaire(&options.questionnaire).await?;
        self.controller.select_document(file_name.as_str(), content)?;

        // ========== 步骤 2: 运行流程并输出进度 ==========
        let mut progress = self.controller.subscribe_progress();
        let watcher = tokio::spawn(async move {
            let mut last_label = String::new();
            while progress.changed().await.is_ok() {
                let label = progress.borrow_and_update().label();
                if !label.is_empty() && label != last_label {
                    info!("📈 进度: {}", label);
                    last_label = label;
                }
            }
        });

        let submitted = self.controller.submit(&options.chatbot_link).await;
        watcher.abort();
        submitted?;

        // ========== 步骤 3: 落盘 ==========
        let output_dir = Path::new(&self.config.output_dir);
        let pairs = self.controller.qa_pairs();
        let csv = if self.config.csv_header {
            pairs_to_csv(&pairs, true)
        } else {
            self.controller.export_csv()?
        };

        let mut outputs =
            vec![save_to_dir(output_dir, &self.config.csv_file_name, csv.as_bytes()).await?];

        if self.config.generate_doc {
            let document_name = options
                .document_name
                .clone()
                .unwrap_or_else(|| default_document_name(&file_name));
            let generated = self.controller.generate_document(&document_name).await?;
            outputs.push(save_to_dir(output_dir, &generated.file_name, &generated.bytes).await?);
        }

        Ok(RunSummary {
            answered: pairs.len(),
            outputs,
        })
    }
}

async fn read_questionnaire(path: &Path) -> AppResult<(String, Vec<u8>)> {
    info!("\n📁 正在读取问卷: {}", path.display());
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::io(path.display().to_string(), e))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((file_name, content))
}

/// 去掉扩展名的问卷文件名
fn default_document_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_document_name_strips_extension() {
        assert_eq!(default_document_name("vendor-review.docx"), "vendor-review");
        assert_eq!(default_document_name("form"), "form");
    }

    #[tokio::test]
    async fn test_read_questionnaire_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_questionnaire(&dir.path().join("missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }
}
