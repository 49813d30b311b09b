use anyhow::{Context, Result};
use auto_oracle::utils::logging;
use auto_oracle::{App, Config, RunOptions};
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "auto-oracle")]
#[command(about = "根据聊天机器人自动回答问卷，导出 CSV 或生成文档")]
#[command(version)]
struct Cli {
    /// 问卷文件（pdf / doc / docx）
    #[arg(short, long)]
    questionnaire: PathBuf,

    /// 聊天机器人地址
    #[arg(short = 'b', long)]
    chatbot_link: String,

    /// TOML 配置文件，环境变量优先
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 输出目录
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// 同时生成文档
    #[arg(long)]
    generate_doc: bool,

    /// 生成文档的名称
    #[arg(long)]
    document_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?.with_env_overrides()?,
        None => Config::from_env()?,
    };
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.display().to_string();
    }
    config.generate_doc |= cli.generate_doc;

    // 初始化日志
    logging::init(config.verbose_logging);

    let options = RunOptions {
        questionnaire: cli.questionnaire,
        chatbot_link: cli.chatbot_link,
        document_name: cli.document_name,
    };

    // 初始化并运行应用
    let app = App::initialize(config).context("初始化失败")?;
    if let Err(e) = app.run(&options).await {
        error!("❌ 处理失败: {}", e);
        return Err(e.into());
    }

    Ok(())
}
