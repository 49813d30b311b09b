//! 问卷流程控制器 - 流程层
//!
//! 核心职责：按阶段推进整个问卷流程
//!
//! 流程顺序：
//! 1. 选择文档（生成预览引用，替换时释放旧引用）
//! 2. submit：提取问题 → 并发获取答案 → 进入审阅
//! 3. 审阅：修改答案、追问并确认加入列表
//! 4. 导出 CSV 或请求生成文档
//!
//! 所有状态都在控制器内部，外部通过 `snapshot()` 等只读方法观察。
//! 失败的操作不会推进阶段，已提交的数据保持不变，可以直接重试。

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::clients::{
    build_http_client, AnswerClient, DocumentGenerator, ExtractionClient, HttpAnswerClient,
    HttpDocumentGenerator, HttpExtractionClient,
};
use crate::config::{Config, WorkflowSettings};
use crate::error::{AppError, AppResult, WorkflowError};
use crate::models::{
    DocumentHandle, MimeKind, Phase, PhaseStatus, PreviewRegistry, QaPair, Stage,
};
use crate::services::{normalize_questions, GeneratedDocument, ProgressSnapshot, ProgressTracker};
use crate::utils::logging::truncate_text;
use crate::workflow::answer_batch;
use crate::workflow::workflow_state::{BusyFlag, WorkflowSnapshot, WorkflowState};

/// 问卷流程控制器
///
/// - 独占文档 handle 和流程状态
/// - 只依赖外部服务的 trait，不关心传输细节
/// - 同一时间最多一个运行、一个文档生成、一个追问请求
pub struct WorkflowController {
    extraction: Arc<dyn ExtractionClient>,
    answers: Arc<dyn AnswerClient>,
    generator: Arc<dyn DocumentGenerator>,
    settings: WorkflowSettings,
    previews: PreviewRegistry,
    state: Mutex<WorkflowState>,
    progress: ProgressTracker,
    running: BusyFlag,
    generating: BusyFlag,
    follow_up_loading: BusyFlag,
}

impl WorkflowController {
    /// 使用指定的外部服务创建控制器
    pub fn new(
        extraction: Arc<dyn ExtractionClient>,
        answers: Arc<dyn AnswerClient>,
        generator: Arc<dyn DocumentGenerator>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            extraction,
            answers,
            generator,
            settings,
            previews: PreviewRegistry::new(),
            state: Mutex::new(WorkflowState::new()),
            progress: ProgressTracker::new(),
            running: BusyFlag::default(),
            generating: BusyFlag::default(),
            follow_up_loading: BusyFlag::default(),
        }
    }

    /// 按配置创建连接后端服务的控制器
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let http = build_http_client(config.request_timeout())?;
        let base_url = config.service_base_url.as_str();

        Ok(Self::new(
            Arc::new(HttpExtractionClient::new(http.clone(), base_url)),
            Arc::new(HttpAnswerClient::new(http.clone(), base_url)),
            Arc::new(HttpDocumentGenerator::new(http, base_url)),
            config.workflow_settings(),
        ))
    }

    // ========== 只读投影 ==========

    pub fn stage(&self) -> Stage {
        self.state.lock().stage
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// 订阅进度变化（用于显示 "K/N"）
    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.subscribe()
    }

    /// 预览引用注册表（界面用它解析预览引用）
    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// 审阅模型中的问题，按显示顺序
    pub fn questions(&self) -> Vec<String> {
        self.state.lock().review.questions().to_vec()
    }

    pub fn answer(&self, question: &str) -> Option<String> {
        self.state.lock().review.answer(question).map(str::to_string)
    }

    pub fn qa_pairs(&self) -> Vec<QaPair> {
        self.state.lock().review.pairs()
    }

    pub fn pending_follow_up(&self) -> Option<QaPair> {
        self.state.lock().pending_follow_up.clone()
    }

    pub fn is_generating_doc(&self) -> bool {
        self.generating.is_set()
    }

    pub fn is_loading_follow_up(&self) -> bool {
        self.follow_up_loading.is_set()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_set()
    }

    /// 完整的只读快照
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.state.lock();
        WorkflowSnapshot {
            stage: state.stage,
            progress: self.progress.snapshot(),
            document_name: state.document.as_ref().map(|d| d.file_name().to_string()),
            preview_url: state.document.as_ref().map(|d| d.display_url().to_string()),
            extracted_questions: state.extracted.clone(),
            qa_pairs: state.review.pairs(),
            pending_follow_up: state.pending_follow_up.clone(),
            is_running: self.running.is_set(),
            is_generating_doc: self.generating.is_set(),
            is_loading_follow_up: self.follow_up_loading.is_set(),
        }
    }

    // ========== 文档选择 ==========

    /// 选择问卷文档，返回预览引用
    ///
    /// 已有文档时旧的 handle 被替换，旧预览引用随之释放。
    /// 允许在上传阶段，以及提取/回答失败后停在处理阶段时更换文档。
    pub fn select_document(
        &self,
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> AppResult<String> {
        self.install_document(|previews| DocumentHandle::new(file_name, content, previews))
    }

    /// 选择问卷文档，类型由 MIME 字符串决定而不看扩展名
    pub fn select_document_with_mime(
        &self,
        file_name: impl Into<String>,
        mime: &str,
        content: impl Into<Vec<u8>>,
    ) -> AppResult<String> {
        let file_name = file_name.into();
        let Some(kind) = MimeKind::from_mime(mime) else {
            return Err(WorkflowError::UnsupportedDocument { file_name }.into());
        };
        self.install_document(|previews| {
            DocumentHandle::with_mime(file_name, kind, content, previews)
        })
    }

    fn install_document(
        &self,
        build: impl FnOnce(&PreviewRegistry) -> Result<DocumentHandle, WorkflowError>,
    ) -> AppResult<String> {
        // 占用运行标志，替换期间 submit 无法开始
        let _run = self
            .running
            .try_acquire()
            .ok_or(WorkflowError::RunInFlight)?;
        self.state
            .lock()
            .ensure_stage("select_document", &[Stage::Upload, Stage::Processing])?;

        let handle = build(&self.previews)?;
        let preview_url = handle.display_url().to_string();
        info!(
            "📄 已选择文档: {} ({}, {} 字节)",
            handle.file_name(),
            handle.mime(),
            handle.len()
        );

        let previous = self.state.lock().document.replace(handle);
        if let Some(previous) = previous {
            info!("🗑️ 替换旧文档: {}", previous.file_name());
        }

        Ok(preview_url)
    }

    // ========== 主流程 ==========

    /// 提交已选择的文档和聊天机器人地址，运行完整流程
    ///
    /// 成功后阶段进入 `Review`。提取失败或任意答案失败时阶段停在
    /// `Processing`，审阅模型不变，可以再次调用重试。
    pub async fn submit(&self, chatbot_endpoint: &str) -> AppResult<()> {
        let _run = self
            .running
            .try_acquire()
            .ok_or(WorkflowError::RunInFlight)?;
        let endpoint = chatbot_endpoint.trim();

        let upload = {
            let mut state = self.state.lock();
            state.ensure_stage("submit", &[Stage::Upload, Stage::Processing])?;
            let document = state
                .document
                .as_ref()
                .ok_or(WorkflowError::MissingDocument)?;
            if endpoint.is_empty() {
                return Err(WorkflowError::EmptyEndpoint.into());
            }

            let upload = document.to_upload();
            state.stage = Stage::Processing;
            state.chatbot_endpoint = Some(endpoint.to_string());
            state.extracted.clear();
            upload
        };

        log_run_start(&upload.file_name, endpoint);

        // ========== 步骤 1: 提取问题 ==========
        self.progress.reset();
        self.progress
            .advance(Phase::FindQuestions, PhaseStatus::Processing)?;

        let raw = self
            .extraction
            .find_questions(&upload)
            .await
            .map_err(|e| {
                error!("❌ 提取问题失败: {}", e);
                AppError::Extraction(e)
            })?;
        let questions = normalize_questions(raw);
        self.state.lock().extracted = questions.clone();

        self.progress.advance(Phase::FindQuestions, PhaseStatus::Done)?;
        self.progress
            .advance(Phase::AnswerQuestions, PhaseStatus::Processing)?;
        self.progress.start_answering(questions.len());
        info!("✓ 找到 {} 个问题，开始获取答案", questions.len());

        // ========== 步骤 2: 并发获取答案 ==========
        let pairs = answer_batch::retrieve_answers(
            self.answers.as_ref(),
            &questions,
            endpoint,
            &self.progress,
            self.settings.pacing_delay,
        )
        .await
        .map_err(|e| {
            error!("❌ 批量获取答案失败，本轮结果全部丢弃: {}", e);
            e
        })?;

        // ========== 步骤 3: 汇总进入审阅 ==========
        {
            let mut state = self.state.lock();
            state.review.populate(pairs)?;
            state.pending_follow_up = None;
            self.progress.set_answered(questions.len());
            self.progress
                .advance(Phase::AnswerQuestions, PhaseStatus::Done)?;
            self.progress
                .advance(Phase::CompileResults, PhaseStatus::Done)?;
            state.stage = Stage::Review;
        }

        info!("✅ 全部 {} 个问题已回答，进入审阅阶段", questions.len());
        Ok(())
    }

    // ========== 审阅 ==========

    /// 修改某个问题的答案，之后的导出立即反映修改
    pub fn set_answer(&self, question: &str, text: impl Into<String>) -> AppResult<()> {
        let mut state = self.state.lock();
        state.ensure_stage("set_answer", &[Stage::Review])?;
        state.review.set_answer(question, text)?;
        info!("✏️ 已修改答案: {}", truncate_text(question, 60));
        Ok(())
    }

    /// 导出 CSV（无表头）
    ///
    /// 只是审阅模型的投影：两次调用之间没有修改时输出完全相同
    pub fn export_csv(&self) -> AppResult<String> {
        let state = self.state.lock();
        state.ensure_stage("export_csv", &[Stage::Review])?;
        Ok(state.review.to_csv(false))
    }

    /// 请求生成文档
    ///
    /// 同一时间只允许一个生成请求，进行中再次调用返回 `GenerationInFlight`
    pub async fn generate_document(&self, document_name: &str) -> AppResult<GeneratedDocument> {
        let _busy = self
            .generating
            .try_acquire()
            .ok_or(WorkflowError::GenerationInFlight)?;

        let pairs = {
            let state = self.state.lock();
            state.ensure_stage("generate_document", &[Stage::Review])?;
            state.review.pairs()
        };

        info!("📝 正在生成文档: {} ({} 组问答)", document_name, pairs.len());
        let bytes = self
            .generator
            .generate(document_name, &pairs)
            .await
            .map_err(|e| {
                error!("❌ 文档生成失败: {}", e);
                AppError::Generation(e)
            })?;

        info!("✓ 文档生成完成: {} 字节", bytes.len());
        Ok(GeneratedDocument {
            file_name: self.settings.generated_doc_file_name.clone(),
            bytes,
        })
    }

    // ========== 追问 ==========

    /// 提交一个追问，成功后作为待确认问答暂存
    ///
    /// 待确认问答不会进入审阅模型，需要调用 `commit_pending_follow_up`。
    /// 新的追问会丢弃尚未确认的旧追问；失败时不改动审阅模型。
    pub async fn submit_follow_up(&self, question: &str) -> AppResult<QaPair> {
        let _busy = self
            .follow_up_loading
            .try_acquire()
            .ok_or(WorkflowError::FollowUpInFlight)?;
        let question = question.trim();

        let endpoint = {
            let mut state = self.state.lock();
            state.ensure_stage("submit_follow_up", &[Stage::Review])?;
            if question.is_empty() {
                return Err(WorkflowError::EmptyQuestion.into());
            }
            if state.review.contains(question) {
                return Err(WorkflowError::DuplicateQuestion {
                    question: question.to_string(),
                }
                .into());
            }
            if let Some(discarded) = state.pending_follow_up.take() {
                info!("🗑️ 丢弃未确认的追问: {}", truncate_text(&discarded.question, 60));
            }
            state
                .chatbot_endpoint
                .clone()
                .ok_or(WorkflowError::EmptyEndpoint)?
        };

        info!("💬 追问: {}", truncate_text(question, 60));
        let answer = self
            .answers
            .answer(question, &endpoint)
            .await
            .map_err(|e| {
                warn!("⚠️ 追问失败: {}", e);
                AppError::FollowUp(e)
            })?;

        let pair = QaPair::new(question, answer);
        {
            let mut state = self.state.lock();
            state.ensure_stage("submit_follow_up", &[Stage::Review])?;
            state.pending_follow_up = Some(pair.clone());
        }
        info!("✓ 追问已回答，等待确认");
        Ok(pair)
    }

    /// 把待确认的追问加到列表末尾
    pub fn commit_pending_follow_up(&self) -> AppResult<QaPair> {
        let mut state = self.state.lock();
        state.ensure_stage("commit_pending_follow_up", &[Stage::Review])?;
        let pair = state
            .pending_follow_up
            .take()
            .ok_or(WorkflowError::NoPendingFollowUp)?;

        if let Err(e) = state.review.append(pair.clone()) {
            state.pending_follow_up = Some(pair);
            return Err(e.into());
        }

        info!("✓ 追问已加入列表 (共 {} 题)", state.review.len());
        Ok(pair)
    }

    /// 丢弃待确认的追问
    pub fn discard_pending_follow_up(&self) -> Option<QaPair> {
        self.state.lock().pending_follow_up.take()
    }

    // ========== 销毁 ==========

    /// 结束当前流程：释放文档预览引用，状态回到初始
    ///
    /// 运行、追问或文档生成进行中都不允许调用；
    /// 要放弃进行中的请求，先丢弃对应的 future
    pub fn teardown(&self) -> AppResult<()> {
        let _run = self
            .running
            .try_acquire()
            .ok_or(WorkflowError::RunInFlight)?;
        let _follow_up = self
            .follow_up_loading
            .try_acquire()
            .ok_or(WorkflowError::FollowUpInFlight)?;
        let _generating = self
            .generating
            .try_acquire()
            .ok_or(WorkflowError::GenerationInFlight)?;

        let previous = std::mem::replace(&mut *self.state.lock(), WorkflowState::new());
        self.progress.reset();
        if let Some(document) = previous.document {
            info!("🗑️ 释放文档: {}", document.file_name());
        }
        Ok(())
    }
}

// ========== 日志辅助函数 ==========

fn log_run_start(file_name: &str, endpoint: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始处理问卷: {}", file_name);
    info!("🤖 聊天机器人: {}", endpoint);
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::DocumentUpload;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedExtraction(Vec<&'static str>);

    #[async_trait]
    impl ExtractionClient for FixedExtraction {
        async fn find_questions(&self, _doc: &DocumentUpload) -> Result<Vec<String>, ApiError> {
            Ok(self.0.iter().map(|q| q.to_string()).collect())
        }
    }

    struct EchoAnswers;

    #[async_trait]
    impl AnswerClient for EchoAnswers {
        async fn answer(&self, question: &str, _chatbot: &str) -> Result<String, ApiError> {
            Ok(format!("answer: {}", question))
        }
    }

    struct NoGenerator;

    #[async_trait]
    impl DocumentGenerator for NoGenerator {
        async fn generate(&self, _name: &str, _pairs: &[QaPair]) -> Result<Vec<u8>, ApiError> {
            Err(ApiError::EmptyResponse {
                endpoint: "/generate".to_string(),
            })
        }
    }

    fn controller(questions: Vec<&'static str>) -> WorkflowController {
        WorkflowController::new(
            Arc::new(FixedExtraction(questions)),
            Arc::new(EchoAnswers),
            Arc::new(NoGenerator),
            WorkflowSettings {
                pacing_delay: Duration::from_millis(10),
                generated_doc_file_name: "generated-document.docx".to_string(),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_requires_document() {
        let ctl = controller(vec!["q"]);
        let err = ctl.submit("https://bot.example").await.unwrap_err();
        assert_eq!(err.as_workflow(), Some(&WorkflowError::MissingDocument));
        assert_eq!(ctl.stage(), Stage::Upload);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_rejects_blank_endpoint() {
        let ctl = controller(vec!["q"]);
        ctl.select_document("form.pdf", b"%PDF".to_vec()).unwrap();

        let err = ctl.submit("   ").await.unwrap_err();
        assert_eq!(err.as_workflow(), Some(&WorkflowError::EmptyEndpoint));
        assert_eq!(ctl.stage(), Stage::Upload);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_normalizes_extracted_questions() {
        let ctl = controller(vec![" Q1 ", "", "Q2", "Q1"]);
        ctl.select_document("form.docx", b"PK".to_vec()).unwrap();
        ctl.submit("https://bot.example").await.unwrap();

        assert_eq!(ctl.stage(), Stage::Review);
        assert_eq!(ctl.questions(), vec!["Q1".to_string(), "Q2".to_string()]);
        assert_eq!(ctl.answer("Q2").as_deref(), Some("answer: Q2"));

        let progress = ctl.progress();
        assert_eq!(progress.answered, 2);
        assert_eq!(progress.total, 2);
        assert_eq!(progress.compile_results, PhaseStatus::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_questions_reach_review_with_empty_csv() {
        let ctl = controller(vec![]);
        ctl.select_document("form.pdf", b"%PDF".to_vec()).unwrap();
        ctl.submit("https://bot.example").await.unwrap();

        assert_eq!(ctl.stage(), Stage::Review);
        assert_eq!(ctl.export_csv().unwrap(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_review_operations_rejected_before_review() {
        let ctl = controller(vec!["q"]);
        assert!(matches!(
            ctl.export_csv().unwrap_err().as_workflow(),
            Some(WorkflowError::InvalidStage { .. })
        ));
        assert!(ctl.submit_follow_up("extra?").await.is_err());
        assert!(ctl.generate_document("doc").await.is_err());
        assert!(!ctl.is_generating_doc());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_up_duplicate_rejected_without_request() {
        let ctl = controller(vec!["Q1"]);
        ctl.select_document("form.pdf", b"%PDF".to_vec()).unwrap();
        ctl.submit("https://bot.example").await.unwrap();

        let err = ctl.submit_follow_up(" Q1 ").await.unwrap_err();
        assert!(matches!(
            err.as_workflow(),
            Some(WorkflowError::DuplicateQuestion { .. })
        ));
        assert!(ctl.pending_follow_up().is_none());
        assert!(!ctl.is_loading_follow_up());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_follow_up_replaces_uncommitted_one() {
        let ctl = controller(vec!["Q1"]);
        ctl.select_document("form.pdf", b"%PDF".to_vec()).unwrap();
        ctl.submit("https://bot.example").await.unwrap();

        ctl.submit_follow_up("first?").await.unwrap();
        ctl.submit_follow_up("second?").await.unwrap();
        let committed = ctl.commit_pending_follow_up().unwrap();

        assert_eq!(committed.question, "second?");
        assert_eq!(ctl.questions().len(), 2);
        assert!(ctl.commit_pending_follow_up().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_failure_clears_busy_flag() {
        let ctl = controller(vec!["Q1"]);
        ctl.select_document("form.pdf", b"%PDF".to_vec()).unwrap();
        ctl.submit("https://bot.example").await.unwrap();

        let err = ctl.generate_document("Security Review").await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
        assert!(!ctl.is_generating_doc());
        assert_eq!(ctl.stage(), Stage::Review);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_resets_and_releases_preview() {
        let ctl = controller(vec!["Q1"]);
        let url = ctl.select_document("form.pdf", b"%PDF".to_vec()).unwrap();
        ctl.submit("https://bot.example").await.unwrap();
        assert!(ctl.previews().is_live(&url));

        ctl.teardown().unwrap();
        assert!(!ctl.previews().is_live(&url));
        assert_eq!(ctl.stage(), Stage::Upload);
        assert!(ctl.qa_pairs().is_empty());
        assert_eq!(ctl.progress(), ProgressSnapshot::default());
    }

    #[test]
    fn test_select_document_holds_run_flag() {
        let ctl = controller(vec!["Q1"]);
        let first = ctl.select_document("a.pdf", b"%PDF".to_vec()).unwrap();
        assert!(!ctl.is_running());

        let run = ctl.running.try_acquire();
        let err = ctl.select_document("b.pdf", b"%PDF".to_vec()).unwrap_err();
        assert_eq!(err.as_workflow(), Some(&WorkflowError::RunInFlight));
        assert!(ctl.is_running());
        assert!(ctl.previews().is_live(&first));
        assert_eq!(ctl.previews().live_count(), 1);

        drop(run);
        assert!(ctl.select_document("b.pdf", b"%PDF".to_vec()).is_ok());
        assert!(!ctl.previews().is_live(&first));
    }
}
