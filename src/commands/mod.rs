//! コマンドライン入口
//!
//! 引数の定義と、種別ごとの処理への振り分け。

pub mod output;
pub mod template;
pub mod youtube;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "chat-scraper",
    about = "Stream YouTube live chat or print channel info",
    version
)]
pub struct Cli {
    /// 取得する内容
    #[arg(short = 't', long = "type", value_enum, default_value_t = ScrapeType::Live)]
    pub kind: ScrapeType,

    /// 出力先
    #[arg(short, long, value_enum, default_value_t = OutputTarget::Log)]
    pub output: OutputTarget,

    /// 出力形式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Default)]
    pub format: OutputFormat,

    /// format=custom のテンプレート（例: "[TIME] AUTHOR_NAME: MESSAGE"）
    #[arg(long = "custom-output", visible_alias = "co")]
    pub custom_output: Option<String>,

    /// Netscape形式のcookies.txt
    #[arg(short, long, env = "CHAT_SCRAPER_COOKIES")]
    pub cookies: Option<PathBuf>,

    /// デバッグログを有効化
    #[arg(short, long)]
    pub verbose: bool,

    /// 動画URL・チャンネルURL・@handle
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScrapeType {
    Live,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputTarget {
    Log,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Default,
    Json,
    Custom,
}

impl Cli {
    /// format=custom のときテンプレートを必須にする
    pub fn template(&self) -> anyhow::Result<Option<&str>> {
        match (self.format, self.custom_output.as_deref()) {
            (OutputFormat::Custom, Some(t)) if !t.trim().is_empty() => Ok(Some(t)),
            (OutputFormat::Custom, _) => {
                anyhow::bail!("custom format selected but no --custom-output template provided")
            }
            _ => Ok(None),
        }
    }
}

/// 種別に応じて実行
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.kind {
        ScrapeType::Live => youtube::live(&cli).await,
        ScrapeType::Info => youtube::info(&cli).await,
    }
}
