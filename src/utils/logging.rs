//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 初始化 tracing 输出
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件，写入带时间的表头
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n问卷处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|e| AppError::io(log_file_path, e))
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 问卷自动作答模式");
    info!("🌐 后端服务: {}", config.service_base_url);
    info!("⏱️ 进度间隔: {} ms", config.pacing_delay_ms);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(answered: usize, outputs: &[String], log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已回答: {} 题", answered);
    for path in outputs {
        info!("💾 已保存: {}", path);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefghij", 4), "abcd...");
        assert_eq!(truncate_text("数据是否加密存储", 4), "数据是否...");
    }

    #[test]
    fn test_init_log_file_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with(&"=".repeat(60)));
        assert!(content.contains("问卷处理日志"));
    }
}
