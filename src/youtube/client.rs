use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::{Client, RequestBuilder};

use super::{cookies::Cookies, errors::YouTubeError};
use crate::config::StreamConfig;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36";

/// ブラウザと同じヘッダー一式（シグナラーはこれがないと応答しない）
const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("accept", "*/*"),
    ("accept-language", "en-US,en;q=0.9"),
    ("cache-control", "no-cache"),
    ("origin", "https://www.youtube.com"),
    ("priority", "u=1, i"),
    ("pragma", "no-cache"),
    ("referer", "https://www.youtube.com/"),
    (
        "sec-ch-ua",
        "\"Chromium\";v=\"136\", \"Brave\";v=\"136\", \"Not.A/Brand\";v=\"99\"",
    ),
    ("sec-ch-ua-arch", "\"arm\""),
    ("sec-ch-ua-bitness", "\"64\""),
    (
        "sec-ch-ua-full-version-list",
        "\"Chromium\";v=\"136.0.0.0\", \"Brave\";v=\"136.0.0.0\", \"Not.A/Brand\";v=\"99.0.0.0\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-model", "\"\""),
    ("sec-ch-ua-platform", "\"macOS\""),
    ("sec-ch-ua-platform-version", "\"15.4.0\""),
    ("sec-ch-ua-wow64", "?0"),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-site"),
    ("sec-gpc", "1"),
];

/// YouTube向けHTTPクライアント
///
/// 単発リクエスト用とロングポーリング用（タイムアウトなし）の2本を持つ。
/// クッキーが読み込まれていれば全リクエストに付与する。
#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    stream_client: Client,
    cookie_header: Option<HeaderValue>,
    config: StreamConfig,
}

impl YouTubeClient {
    /// 新しいクライアントを作成
    ///
    /// # Errors
    /// HTTPクライアントのビルドに失敗した場合にエラーを返す
    pub fn new(config: StreamConfig) -> Result<Self, YouTubeError> {
        let headers = default_headers();

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers.clone())
            .timeout(config.http_timeout)
            .build()?;

        let stream_client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            stream_client,
            cookie_header: None,
            config,
        })
    }

    /// クッキーを設定
    pub fn set_cookies(&mut self, cookies: &Cookies) -> Result<(), YouTubeError> {
        self.cookie_header = match cookies.header_value() {
            Some(value) => Some(
                HeaderValue::from_str(value)
                    .map_err(|e| YouTubeError::Cookie(format!("invalid cookie value: {}", e)))?,
            ),
            None => None,
        };
        Ok(())
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// 単発GET
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.with_cookie(self.client.get(url))
    }

    /// 単発POST
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.with_cookie(self.client.post(url))
    }

    /// ロングポーリング用GET（タイムアウトなし）
    pub fn stream_get(&self, url: &str) -> RequestBuilder {
        self.with_cookie(self.stream_client.get(url))
    }

    fn with_cookie(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.cookie_header {
            Some(value) => builder.header(COOKIE, value.clone()),
            None => builder,
        }
    }
}

impl std::fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("www_base", &self.config.www_base)
            .field("signaler_base", &self.config.signaler_base)
            .field("has_cookies", &self.cookie_header.is_some())
            .finish()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for &(name, value) in DEFAULT_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}
