//! get_live_chat 呼び出し

use reqwest::header::CONTENT_TYPE;

use super::parser::decode_actions;
use super::types::{GetLiveChatRequest, LiveChatResponse, WebClientInfo};
use crate::youtube::client::YouTubeClient;
use crate::youtube::errors::YouTubeError;
use crate::youtube::session::Session;
use crate::youtube::types::ChatMessage;

/// 取得のきっかけ（リクエストに載せるフラグが変わる）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTrigger {
    /// 初期化時の疎通確認（invalidationトークンでcontinuationを置き換えない）
    Probe,
    /// 無条件の取得
    First,
    /// プッシュが途絶えたときの取得
    Timeout,
    /// プッシュで通知されたタイムスタンプ以降を取得
    Cursor(String),
}

impl FetchTrigger {
    fn build_request<'a>(&'a self, session: &'a Session) -> GetLiveChatRequest<'a> {
        let (cursor, timeout) = match self {
            FetchTrigger::Probe | FetchTrigger::First => (None, None),
            FetchTrigger::Timeout => (None, Some(true)),
            FetchTrigger::Cursor(ts) => (Some(ts.as_str()), None),
        };

        GetLiveChatRequest {
            context: &session.context,
            continuation: &session.continuation,
            web_client_info: WebClientInfo {
                is_document_hidden: false,
            },
            invalidation_payload_last_publish_at_usec: cursor,
            is_invalidation_timeout_request: timeout,
        }
    }
}

/// チャットを取得し、セッションのcontinuationを更新する
///
/// # Errors
/// - HTTP失敗・JSONデコード失敗: `HttpError` / `ParseError`
/// - 既知のcontinuationがない: `Protocol`（セッションは変更しない）
pub async fn fetch_live_chat(
    client: &YouTubeClient,
    session: &mut Session,
    trigger: &FetchTrigger,
) -> Result<Vec<ChatMessage>, YouTubeError> {
    let url = format!(
        "{}/youtubei/v1/live_chat/get_live_chat?prettyPrint=false",
        client.config().www_base
    );
    let body = trigger.build_request(session);

    log::debug!("Fetching live chat ({:?})", trigger);

    let response = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        log::error!("get_live_chat error: {}", status);
        return Err(YouTubeError::ParseError(format!(
            "get_live_chat returned {}",
            status
        )));
    }

    let bytes = response.bytes().await?;
    let mut data: LiveChatResponse = serde_json::from_slice(&bytes)
        .map_err(|e| YouTubeError::ParseError(format!("get_live_chat decode error: {}", e)))?;

    let Some(next) = data.next_continuation() else {
        return Err(YouTubeError::Protocol("no continuation data".into()));
    };

    session.apply_continuation(&next, *trigger == FetchTrigger::Probe);
    log::debug!(
        "Updated continuation: invalidation={}, timeout={}ms",
        session.invalidation,
        session.timeout_ms
    );

    Ok(decode_actions(data.take_actions()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::youtube::bootstrap::PageConfig;
    use mockito::Matcher;
    use serde_json::json;

    fn session() -> Session {
        Session::from_page(PageConfig {
            api_key: "key".into(),
            innertube_api_key: "ikey".into(),
            client_version: "2.0".into(),
            id_token: String::new(),
            context: json!({"client": {"clientName": "WEB"}}),
            continuation: "CONT1".into(),
            video_id: "vid1".into(),
        })
    }

    #[test]
    fn test_request_flags_are_exclusive() {
        let s = session();

        let value = serde_json::to_value(FetchTrigger::Timeout.build_request(&s)).unwrap();
        assert_eq!(value["isInvalidationTimeoutRequest"], true);
        assert!(value.get("invalidationPayloadLastPublishAtUsec").is_none());

        let cursor = FetchTrigger::Cursor("1700000000000000".into());
        let value = serde_json::to_value(cursor.build_request(&s)).unwrap();
        assert_eq!(value["invalidationPayloadLastPublishAtUsec"], "1700000000000000");
        assert!(value.get("isInvalidationTimeoutRequest").is_none());

        let value = serde_json::to_value(FetchTrigger::First.build_request(&s)).unwrap();
        assert!(value.get("isInvalidationTimeoutRequest").is_none());
        assert!(value.get("invalidationPayloadLastPublishAtUsec").is_none());
        assert_eq!(value["continuation"], "CONT1");
        assert_eq!(value["context"]["client"]["clientName"], "WEB");
    }

    async fn serve(body: serde_json::Value) -> (mockito::ServerGuard, YouTubeClient) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/youtubei/v1/live_chat/get_live_chat")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
        let client = YouTubeClient::new(StreamConfig::default().with_www_base(server.url())).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_fetch_updates_session() {
        let (_server, client) = serve(json!({
            "continuationContents": {"liveChatContinuation": {
                "continuations": [{"timedContinuationData": {"continuation": "NEXT", "timeoutMs": 5000}}],
                "actions": [{"addChatItemAction": {"item": {"liveChatTextMessageRenderer": {
                    "id": "m1",
                    "message": {"runs": [{"text": "hello"}]},
                    "authorName": {"simpleText": "A"},
                    "authorExternalChannelId": "UC1",
                    "timestampUsec": "1700000000000000"
                }}}}]
            }}
        }))
        .await;

        let mut s = session();
        let messages = fetch_live_chat(&client, &mut s, &FetchTrigger::First)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "hello");
        assert_eq!(s.continuation, "NEXT");
        assert_eq!(s.timeout_ms, 5000);
        assert!(!s.invalidation);
    }

    #[tokio::test]
    async fn test_probe_keeps_token_on_invalidation() {
        let (_server, client) = serve(json!({
            "continuationContents": {"liveChatContinuation": {
                "continuations": [{"invalidationContinuationData": {"continuation": "INV", "timeoutMs": 10000}}]
            }}
        }))
        .await;

        let mut s = session();
        let messages = fetch_live_chat(&client, &mut s, &FetchTrigger::Probe)
            .await
            .unwrap();
        assert!(messages.is_empty());
        assert!(s.invalidation);
        assert_eq!(s.continuation, "CONT1");
    }

    #[tokio::test]
    async fn test_missing_continuation_is_protocol_error() {
        let (_server, client) = serve(json!({
            "continuationContents": {"liveChatContinuation": {"continuations": []}}
        }))
        .await;

        let mut s = session();
        let result = fetch_live_chat(&client, &mut s, &FetchTrigger::First).await;
        assert!(matches!(result, Err(YouTubeError::Protocol(_))));
        assert_eq!(s.continuation, "CONT1");
    }
}
