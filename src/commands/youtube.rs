//! live / info の実行

use anyhow::Context;
use chrono::{Local, TimeZone};
use futures::StreamExt;

use super::output::JsonArrayFile;
use super::template::{render_info, render_live};
use super::{Cli, OutputFormat, OutputTarget};
use crate::config::StreamConfig;
use crate::youtube::client::YouTubeClient;
use crate::youtube::types::{ChannelInfo, ChatMessage};
use crate::youtube::{fetch_channel_info, start_live_chat_stream, Cookies};

const LIVE_OUTPUT_FILE: &str = "live_output.json";

/// ライブチャットを出力し続ける（Ctrl-Cで終了）
pub async fn live(cli: &Cli) -> anyhow::Result<()> {
    let template = cli.template()?;
    let cookies = load_cookies(cli).await?;

    let mut stream = start_live_chat_stream(&cli.url, StreamConfig::default(), cookies.as_ref())
        .await
        .context("failed to start live chat")?;

    let cancel = stream.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, stopping live chat...");
            cancel.cancel();
        }
    });

    let mut file = if cli.output == OutputTarget::File {
        if cli.format == OutputFormat::Json {
            Some(
                JsonArrayFile::open(LIVE_OUTPUT_FILE)
                    .with_context(|| format!("failed to open {}", LIVE_OUTPUT_FILE))?,
            )
        } else {
            log::warn!("File output is only supported with json format, writing to stdout");
            None
        }
    } else {
        None
    };

    while let Some(msg) = stream.next().await {
        match file.as_mut() {
            Some(file) => {
                file.write_item(&msg)
                    .with_context(|| format!("failed to write {}", LIVE_OUTPUT_FILE))?;
                println!("{}", summary_line(&msg));
            }
            None => println!("{}", format_message(cli.format, template, &msg)?),
        }
    }

    if let Some(file) = file {
        file.finish()
            .with_context(|| format!("failed to close {}", LIVE_OUTPUT_FILE))?;
        println!("Closed JSON array in {}", LIVE_OUTPUT_FILE);
    }
    Ok(())
}

/// チャンネル情報を出力
pub async fn info(cli: &Cli) -> anyhow::Result<()> {
    let template = cli.template()?;
    let cookies = load_cookies(cli).await?;

    let mut client = YouTubeClient::new(StreamConfig::default())?;
    if let Some(cookies) = &cookies {
        client.set_cookies(cookies)?;
    }

    let info = fetch_channel_info(&client, &cli.url)
        .await
        .context("failed to fetch channel info")?;
    let formatted = format_info(cli.format, template, &info)?;

    match cli.output {
        OutputTarget::File => {
            let path = match cli.format {
                OutputFormat::Json => "info_output.json",
                _ => "info_output.txt",
            };
            tokio::fs::write(path, formatted)
                .await
                .with_context(|| format!("failed to write {}", path))?;
            println!("Result written to {}", path);
        }
        OutputTarget::Log => println!("{}", formatted),
    }
    Ok(())
}

async fn load_cookies(cli: &Cli) -> anyhow::Result<Option<Cookies>> {
    match &cli.cookies {
        Some(path) => Ok(Some(Cookies::load(path).await?)),
        None => Ok(None),
    }
}

fn format_message(
    format: OutputFormat,
    template: Option<&str>,
    msg: &ChatMessage,
) -> anyhow::Result<String> {
    Ok(match (format, template) {
        (OutputFormat::Json, _) => serde_json::to_string_pretty(msg)?,
        (OutputFormat::Custom, Some(template)) => render_live(template, msg),
        _ => format!("{:?}", msg),
    })
}

fn format_info(
    format: OutputFormat,
    template: Option<&str>,
    info: &ChannelInfo,
) -> anyhow::Result<String> {
    Ok(match (format, template) {
        (OutputFormat::Json, _) => serde_json::to_string_pretty(info)?,
        (OutputFormat::Custom, Some(template)) => render_info(template, info),
        _ => format!("{:?}", info),
    })
}

/// ファイル出力時に標準出力へ流す1行
fn summary_line(msg: &ChatMessage) -> String {
    let time = Local
        .timestamp_opt(msg.timestamp, 0)
        .single()
        .map(|t| t.format("%Y/%m/%d %H:%M:%S").to_string())
        .unwrap_or_else(|| msg.timestamp.to_string());
    format!("{} :[{}] {}", time, msg.author.name, msg.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::types::Author;

    fn message() -> ChatMessage {
        ChatMessage {
            id: "m1".into(),
            message: "hello".into(),
            author: Author::new("UC1".into(), "Alice".into(), String::new()),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_format_message_json() {
        let out = format_message(OutputFormat::Json, None, &message()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["author"]["name"], "Alice");
    }

    #[test]
    fn test_format_message_custom() {
        let out = format_message(OutputFormat::Custom, Some("AUTHOR_NAME: MESSAGE"), &message())
            .unwrap();
        assert_eq!(out, "Alice: hello");
    }

    #[test]
    fn test_format_message_default() {
        let out = format_message(OutputFormat::Default, None, &message()).unwrap();
        assert!(out.starts_with("ChatMessage"));
        assert!(out.contains("hello"));
    }

    #[test]
    fn test_format_info_custom() {
        let info = ChannelInfo {
            id: "UC1".into(),
            name: "Chan".into(),
            ..Default::default()
        };
        assert_eq!(
            format_info(OutputFormat::Custom, Some("NAME/ID"), &info).unwrap(),
            "Chan/UC1"
        );
    }

    #[test]
    fn test_summary_line() {
        let line = summary_line(&message());
        assert!(line.ends_with(" :[Alice] hello"));
    }
}
