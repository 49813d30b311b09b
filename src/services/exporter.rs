//! 导出服务 - 业务能力层
//!
//! CSV 序列化与生成文档的落盘

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::QaPair;

/// 生成服务返回的文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    /// 下载时使用的文件名
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// 把问答列表序列化为两列 CSV
///
/// 每个值都用双引号包裹，内部的双引号写成两个；行之间用 `\n` 分隔，末尾没有换行
pub fn to_csv<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>, header: bool) -> String {
    let mut rows = Vec::new();
    if header {
        rows.push(csv_row("Question", "Answer"));
    }
    rows.extend(pairs.into_iter().map(|(q, a)| csv_row(q, a)));
    rows.join("\n")
}

fn csv_row(question: &str, answer: &str) -> String {
    format!("{},{}", quote(question), quote(answer))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// 把导出内容写入目录，目录不存在时创建
pub async fn save_to_dir(dir: &Path, file_name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::io(dir.display().to_string(), e))?;

    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| AppError::io(path.display().to_string(), e))?;

    info!("✓ 已保存: {} ({} 字节)", path.display(), bytes.len());
    Ok(path)
}

/// 问答对转 CSV 的便捷入口
pub fn pairs_to_csv(pairs: &[QaPair], header: bool) -> String {
    to_csv(
        pairs.iter().map(|p| (p.question.as_str(), p.answer.as_str())),
        header,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_quotes_every_value() {
        let pairs = vec![
            QaPair::new("Is the system SOC2 compliant?", "Yes"),
            QaPair::new("Can users delete their data?", "Yes, via the account settings page"),
        ];
        assert_eq!(
            pairs_to_csv(&pairs, false),
            "\"Is the system SOC2 compliant?\",\"Yes\"\n\
             \"Can users delete their data?\",\"Yes, via the account settings page\""
        );
    }

    #[test]
    fn test_csv_escapes_embedded_quotes() {
        let pairs = vec![QaPair::new("What does \"uptime\" mean?", "It is \"99.9%\"")];
        assert_eq!(
            pairs_to_csv(&pairs, false),
            "\"What does \"\"uptime\"\" mean?\",\"It is \"\"99.9%\"\"\""
        );
    }

    #[test]
    fn test_csv_header_and_empty() {
        assert_eq!(pairs_to_csv(&[], false), "");
        assert_eq!(pairs_to_csv(&[], true), "\"Question\",\"Answer\"");
    }

    #[tokio::test]
    async fn test_save_to_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("output_docs");

        let path = save_to_dir(&dir, "answers.csv", b"\"q\",\"a\"").await.unwrap();

        assert_eq!(path, dir.join("answers.csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"\"q\",\"a\"");
    }
}
