//! チャンネル情報取得（OGPメタタグから抽出）

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use super::client::YouTubeClient;
use super::errors::YouTubeError;
use super::types::ChannelInfo;
use crate::config::CHANNEL_INFO_TIMEOUT_SECS;
use crate::util::unescape_html;

/// `<meta property="og:xxx" content="...">` （属性の順序はどちらでも可）
static OG_META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<meta\s+(?:property="og:([a-z_]+)"\s+content="([^"]*)"|content="([^"]*)"\s+property="og:([a-z_]+)")[^>]*>"#,
    )
    .expect("Failed to compile og meta regex")
});

/// URLまたは `@handle` からチャンネル情報を取得
pub async fn fetch_channel_info(
    client: &YouTubeClient,
    url_or_handle: &str,
) -> Result<ChannelInfo, YouTubeError> {
    let url = channel_url(&client.config().www_base, url_or_handle);
    log::info!("Fetching channel info: {}", url);

    let response = client
        .get(&url)
        .timeout(Duration::from_secs(CHANNEL_INFO_TIMEOUT_SECS))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(YouTubeError::ParseError(format!(
            "failed to fetch channel page: {}",
            response.status()
        )));
    }

    let html = response.text().await?;
    Ok(parse_channel_info(&html))
}

/// 入力をチャンネルページのURLに正規化
fn channel_url(www_base: &str, url_or_handle: &str) -> String {
    if !url_or_handle.starts_with("http") && url_or_handle.contains('@') {
        format!("{}/{}", www_base, url_or_handle.trim_start_matches('/'))
    } else {
        url_or_handle.to_string()
    }
}

/// HTMLからOGPメタタグを読み取る（同じキーが複数ある場合は後勝ち）
fn parse_channel_info(html: &str) -> ChannelInfo {
    let mut info = ChannelInfo::default();

    for caps in OG_META_RE.captures_iter(html) {
        let (key, content) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
            (Some(key), Some(content), _, _) => (key.as_str(), content.as_str()),
            (_, _, Some(content), Some(key)) => (key.as_str(), content.as_str()),
            _ => continue,
        };
        let content = unescape_html(content);

        match key {
            "title" => info.name = content,
            "image" => info.image = content,
            "description" => info.description = content,
            "url" => {
                if let Some((_, id)) = content.split_once("/channel/") {
                    info.id = id.to_string();
                }
                info.url = content;
            }
            _ => {}
        }
    }

    info
}
