use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::WorkflowError;
use crate::models::preview::{PreviewRegistry, PreviewUrl};

/// 支持的问卷文档类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeKind {
    Pdf,
    Doc,
    Docx,
}

impl MimeKind {
    /// 根据文件扩展名判断类型
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(MimeKind::Pdf),
            "doc" => Some(MimeKind::Doc),
            "docx" => Some(MimeKind::Docx),
            _ => None,
        }
    }

    /// 根据 MIME 字符串判断类型
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Some(MimeKind::Pdf),
            "application/msword" => Some(MimeKind::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(MimeKind::Docx)
            }
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            MimeKind::Pdf => "application/pdf",
            MimeKind::Doc => "application/msword",
            MimeKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for MimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// 上传给提取服务的文档内容
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub mime: MimeKind,
    pub content: Arc<[u8]>,
}

/// 已选中的问卷文档
///
/// 持有文件内容和预览引用；handle 被替换或销毁时预览引用随之释放
#[derive(Debug)]
pub struct DocumentHandle {
    file_name: String,
    mime: MimeKind,
    content: Arc<[u8]>,
    preview: PreviewUrl,
}

impl DocumentHandle {
    /// 创建文档 handle，类型由扩展名判断
    pub fn new(
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        previews: &PreviewRegistry,
    ) -> Result<Self, WorkflowError> {
        let file_name = file_name.into();
        let mime = MimeKind::from_file_name(&file_name).ok_or_else(|| {
            WorkflowError::UnsupportedDocument {
                file_name: file_name.clone(),
            }
        })?;
        Self::with_mime(file_name, mime, content, previews)
    }

    /// 使用显式类型创建文档 handle
    pub fn with_mime(
        file_name: impl Into<String>,
        mime: MimeKind,
        content: impl Into<Vec<u8>>,
        previews: &PreviewRegistry,
    ) -> Result<Self, WorkflowError> {
        let file_name = file_name.into();
        let content: Vec<u8> = content.into();
        if content.is_empty() {
            return Err(WorkflowError::EmptyDocument { file_name });
        }

        let content: Arc<[u8]> = Arc::from(content);
        let preview = previews.create(content.clone());

        Ok(Self {
            file_name,
            mime,
            content,
            preview,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> MimeKind {
        self.mime
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// 预览引用
    pub fn display_url(&self) -> &str {
        self.preview.as_str()
    }

    /// 生成上传内容（共享同一份字节）
    pub fn to_upload(&self) -> DocumentUpload {
        DocumentUpload {
            file_name: self.file_name.clone(),
            mime: self.mime,
            content: self.content.clone(),
        }
    }
}
