//! 初期ページ解析
//!
//! 視聴ページ（またはチャンネルの /live ページ）を取得し、埋め込まれた
//! `ytcfg.set({...})` と `ytInitialData = {...}` からAPIキー・リクエスト
//! コンテキスト・continuationトークン・動画IDを取り出す。
//!
//! ページ本文はプールしたバッファに読み込み、借用したスライス上で
//! 正規表現とJSONパースを行う。取り出すのは小さな文字列とコンテキストのみ。

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde_json::{Deserializer, Value};

use super::channel::fetch_channel_info;
use super::client::YouTubeClient;
use super::errors::YouTubeError;
use super::pool::page_buffers;
use crate::util::mask_api_key;

/// 抽出を再試行する最小の読み込み増分（128KB）
const EXTRACT_STEP_BYTES: usize = 128 * 1024;

/// `ytcfg.set({` の開始位置
static YTCFG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ytcfg\.set\(\s*\{").expect("Failed to compile ytcfg regex"));

/// `ytInitialData = {` の開始位置
static INITIAL_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:window\s*\[\s*["']ytInitialData["']\s*\]|ytInitialData)\s*=\s*\{"#)
        .expect("Failed to compile ytInitialData regex")
});

/// ライブチャットのcontinuation（サブメニュー2番目 = 全チャット）
const CONTINUATION_POINTER: &str = "/contents/twoColumnWatchNextResults/conversationBar/liveChatRenderer/header/liveChatHeaderRenderer/viewSelector/sortFilterSubMenuRenderer/subMenuItems/1/continuation/reloadContinuationData/continuation";

const VIDEO_ID_POINTER: &str = "/currentVideoEndpoint/watchEndpoint/videoId";

/// 初期ページから得た設定
#[derive(Debug, Clone)]
pub struct PageConfig {
    /// シグナラー用APIキー
    pub api_key: String,
    pub innertube_api_key: String,
    pub client_version: String,
    pub id_token: String,
    /// INNERTUBE_CONTEXT
    pub context: Value,
    pub continuation: String,
    pub video_id: String,
}

/// ytcfgから取り出す値
#[derive(Debug, Clone, PartialEq)]
struct ClientConfig {
    api_key: String,
    innertube_api_key: String,
    client_version: String,
    id_token: String,
    context: Value,
}

/// ytInitialDataから取り出す値
#[derive(Debug, Clone, PartialEq, Eq)]
struct InitialData {
    continuation: String,
    video_id: String,
}

/// 抽出結果
#[derive(Debug)]
enum Extract<T> {
    /// パターンが見つからない（まだ読み込んでいない可能性あり）
    Missing,
    /// パターンはあるが中身が壊れている
    Malformed(String),
    Found(T),
}

/// URLまたはチャンネルハンドルから取得対象のページURLを決定
///
/// `@handle` を含む場合はチャンネル情報を引いて `{チャンネルURL}/live` にする。
pub async fn resolve_page_url(
    client: &YouTubeClient,
    url_or_handle: &str,
) -> Result<String, YouTubeError> {
    if !url_or_handle.contains('@') {
        return Ok(url_or_handle.to_string());
    }

    let info = fetch_channel_info(client, url_or_handle)
        .await
        .map_err(|e| YouTubeError::Bootstrap(format!("failed to fetch channel info: {}", e)))?;
    if info.url.is_empty() {
        return Err(YouTubeError::Bootstrap(format!(
            "channel url not found for {}",
            url_or_handle
        )));
    }
    Ok(format!("{}/live", info.url.trim_end_matches('/')))
}

/// ページを取得して設定を抽出
pub async fn fetch_page_config(
    client: &YouTubeClient,
    page_url: &str,
) -> Result<PageConfig, YouTubeError> {
    log::info!("Fetching live page: {}", page_url);

    let mut response = client
        .get(page_url)
        .send()
        .await
        .map_err(|e| YouTubeError::Bootstrap(format!("error visiting URL: {}", e)))?;

    if !response.status().is_success() {
        return Err(YouTubeError::Bootstrap(format!(
            "failed to fetch live page: {}",
            response.status()
        )));
    }

    let max_bytes = client.config().max_page_bytes;
    let mut buffer = page_buffers().checkout();
    let mut config: Option<ClientConfig> = None;
    let mut initial: Option<InitialData> = None;
    let mut last_attempt = 0usize;

    loop {
        let chunk = response
            .chunk()
            .await
            .map_err(|e| YouTubeError::Bootstrap(format!("error reading page: {}", e)))?;

        let finished = match chunk {
            Some(bytes) => {
                let room = max_bytes.saturating_sub(buffer.len());
                buffer.extend_from_slice(&bytes[..bytes.len().min(room)]);
                buffer.len() >= max_bytes
            }
            None => true,
        };

        if !finished && buffer.len() - last_attempt < EXTRACT_STEP_BYTES {
            continue;
        }
        last_attempt = buffer.len();

        if config.is_none() {
            match extract_client_config(&buffer) {
                Extract::Found(found) => config = Some(found),
                Extract::Malformed(reason) if finished => {
                    return Err(YouTubeError::Bootstrap(reason));
                }
                _ => {}
            }
        }

        if initial.is_none() {
            match extract_initial_data(&buffer) {
                Extract::Found(found) => initial = Some(found),
                Extract::Malformed(reason) if finished => {
                    return Err(YouTubeError::Bootstrap(reason));
                }
                _ => {}
            }
        }

        if (config.is_some() && initial.is_some()) || finished {
            break;
        }
    }

    log::debug!("Read {} bytes of live page", buffer.len());
    drop(buffer);

    let (Some(config), Some(initial)) = (config, initial) else {
        log::warn!("Live page has no embedded chat configuration (stream not live?)");
        return Err(YouTubeError::NotLive);
    };

    if initial.continuation.is_empty() {
        log::warn!("No live chat continuation in page data");
        return Err(YouTubeError::NotLive);
    }

    log::info!(
        "Live page resolved: video={}, api_key={}, client_version={}",
        initial.video_id,
        mask_api_key(&config.api_key),
        config.client_version
    );

    Ok(PageConfig {
        api_key: config.api_key,
        innertube_api_key: config.innertube_api_key,
        client_version: config.client_version,
        id_token: config.id_token,
        context: config.context,
        continuation: initial.continuation,
        video_id: initial.video_id,
    })
}

/// `start`位置から始まるJSONオブジェクトを1つだけパース（後続のJSは無視）
fn parse_object_at(data: &[u8], start: usize) -> Result<Value, serde_json::Error> {
    let mut values = Deserializer::from_slice(&data[start..]).into_iter::<Value>();
    values
        .next()
        .unwrap_or_else(|| serde_json::from_slice::<Value>(b""))
}

/// ytcfg.set({...}) からクライアント設定を抽出
///
/// ページには複数のytcfg.setがあるため、INNERTUBE_CONTEXTを含む最初のものを採用する。
fn extract_client_config(data: &[u8]) -> Extract<ClientConfig> {
    let mut malformed = None;

    for m in YTCFG_RE.find_iter(data) {
        let value = match parse_object_at(data, m.end() - 1) {
            Ok(value) => value,
            Err(e) => {
                malformed = Some(format!("failed to parse ytcfg: {}", e));
                continue;
            }
        };

        let Some(context) = value.get("INNERTUBE_CONTEXT").filter(|c| c.is_object()) else {
            continue;
        };

        return Extract::Found(ClientConfig {
            api_key: string_at(&value, "/LIVE_CHAT_BASE_TANGO_CONFIG/apiKey"),
            innertube_api_key: string_at(&value, "/INNERTUBE_API_KEY"),
            client_version: string_at(&value, "/INNERTUBE_CLIENT_VERSION"),
            id_token: string_at(&value, "/ID_TOKEN"),
            context: context.clone(),
        });
    }

    match malformed {
        Some(reason) => Extract::Malformed(reason),
        None => Extract::Missing,
    }
}

/// ytInitialData からcontinuationと動画IDを抽出
fn extract_initial_data(data: &[u8]) -> Extract<InitialData> {
    let Some(m) = INITIAL_DATA_RE.find(data) else {
        return Extract::Missing;
    };

    match parse_object_at(data, m.end() - 1) {
        Ok(value) => Extract::Found(InitialData {
            continuation: string_at(&value, CONTINUATION_POINTER),
            video_id: string_at(&value, VIDEO_ID_POINTER),
        }),
        Err(e) => Extract::Malformed(format!("failed to parse ytInitialData: {}", e)),
    }
}

fn string_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::StreamConfig;

    /// テスト用の視聴ページ
    pub(crate) fn sample_page(continuation: &str, video_id: &str) -> String {
        format!(
            r#"<html><script>ytcfg.set({{"CSI_SERVICE_NAME":"youtube"}});</script>
<script>ytcfg.set({{"INNERTUBE_API_KEY":"AIzaInnerTubeKey123","INNERTUBE_CLIENT_VERSION":"2.20250101.00.00","ID_TOKEN":"tok","LIVE_CHAT_BASE_TANGO_CONFIG":{{"apiKey":"AIzaSignalerKey456"}},"INNERTUBE_CONTEXT":{{"client":{{"hl":"en","clientName":"WEB","clientVersion":"2.20250101.00.00"}}}}}}); window.ytcfg.x = 1;</script>
<script>var ytInitialData = {{"contents":{{"twoColumnWatchNextResults":{{"conversationBar":{{"liveChatRenderer":{{"header":{{"liveChatHeaderRenderer":{{"viewSelector":{{"sortFilterSubMenuRenderer":{{"subMenuItems":[{{"title":"Top chat","continuation":{{"reloadContinuationData":{{"continuation":"TOP"}}}}}},{{"title":"Live chat","continuation":{{"reloadContinuationData":{{"continuation":"{}"}}}}}}]}}}}}}}}}}}}}}}},"currentVideoEndpoint":{{"watchEndpoint":{{"videoId":"{}"}}}}}};var other = {{}};</script></html>"#,
            continuation, video_id
        )
    }

    #[test]
    fn test_extract_client_config() {
        let page = sample_page("CONT1", "vid1");
        let Extract::Found(config) = extract_client_config(page.as_bytes()) else {
            panic!("config not found");
        };
        assert_eq!(config.api_key, "AIzaSignalerKey456");
        assert_eq!(config.innertube_api_key, "AIzaInnerTubeKey123");
        assert_eq!(config.client_version, "2.20250101.00.00");
        assert_eq!(config.id_token, "tok");
        assert_eq!(config.context["client"]["clientName"], "WEB");
    }

    #[test]
    fn test_extract_initial_data() {
        let page = sample_page("CONT1", "vid1");
        let Extract::Found(data) = extract_initial_data(page.as_bytes()) else {
            panic!("initial data not found");
        };
        // 2番目のサブメニュー（全チャット）を採用
        assert_eq!(data.continuation, "CONT1");
        assert_eq!(data.video_id, "vid1");
    }

    #[test]
    fn test_window_bracket_form() {
        let page = r#"window["ytInitialData"] = {"currentVideoEndpoint":{"watchEndpoint":{"videoId":"abc"}}};"#;
        let Extract::Found(data) = extract_initial_data(page.as_bytes()) else {
            panic!("initial data not found");
        };
        assert_eq!(data.video_id, "abc");
        assert!(data.continuation.is_empty());
    }

    #[test]
    fn test_missing_patterns() {
        let page = b"<html>nothing here</html>";
        assert!(matches!(extract_client_config(page), Extract::Missing));
        assert!(matches!(extract_initial_data(page), Extract::Missing));
    }

    #[test]
    fn test_truncated_initial_data_is_malformed() {
        let page = br#"var ytInitialData = {"contents":{"#;
        assert!(matches!(extract_initial_data(page), Extract::Malformed(_)));
    }

    #[tokio::test]
    async fn test_fetch_page_config() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/watch")
            .match_query(mockito::Matcher::Any)
            .with_body(sample_page("CONT1", "vid1"))
            .create_async()
            .await;

        let client = YouTubeClient::new(StreamConfig::default().with_www_base(server.url())).unwrap();
        let config = fetch_page_config(&client, &format!("{}/watch?v=vid1", server.url()))
            .await
            .unwrap();
        assert_eq!(config.continuation, "CONT1");
        assert_eq!(config.video_id, "vid1");
        assert_eq!(config.api_key, "AIzaSignalerKey456");
    }

    #[tokio::test]
    async fn test_fetch_page_not_live() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/@someone/live")
            .with_body("<html><body>offline</body></html>")
            .create_async()
            .await;

        let client = YouTubeClient::new(StreamConfig::default()).unwrap();
        let result = fetch_page_config(&client, &format!("{}/@someone/live", server.url())).await;
        assert!(matches!(result, Err(YouTubeError::NotLive)));
    }

    #[tokio::test]
    async fn test_fetch_page_empty_continuation_is_not_live() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/watch")
            .with_body(sample_page("", "vid1"))
            .create_async()
            .await;

        let client = YouTubeClient::new(StreamConfig::default()).unwrap();
        let result = fetch_page_config(&client, &format!("{}/watch", server.url())).await;
        assert!(matches!(result, Err(YouTubeError::NotLive)));
    }

    #[tokio::test]
    async fn test_fetch_page_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/watch")
            .with_status(500)
            .create_async()
            .await;

        let client = YouTubeClient::new(StreamConfig::default()).unwrap();
        let result = fetch_page_config(&client, &format!("{}/watch", server.url())).await;
        assert!(matches!(result, Err(YouTubeError::Bootstrap(_))));
    }

    #[tokio::test]
    async fn test_resolve_plain_url_unchanged() {
        let client = YouTubeClient::new(StreamConfig::default()).unwrap();
        let url = resolve_page_url(&client, "https://www.youtube.com/watch?v=abc")
            .await
            .unwrap();
        assert_eq!(url, "https://www.youtube.com/watch?v=abc");
    }
}
