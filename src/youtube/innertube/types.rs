//! get_live_chat の送受信型定義

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::youtube::session::ContinuationState;

/// get_live_chat リクエストボディ
///
/// `invalidation_payload_last_publish_at_usec` と `is_invalidation_timeout_request`
/// は同時に設定しない（[`FetchTrigger`]から組み立てる）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLiveChatRequest<'a> {
    pub context: &'a Value,
    pub continuation: &'a str,
    pub web_client_info: WebClientInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation_payload_last_publish_at_usec: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_invalidation_timeout_request: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct WebClientInfo {
    /// ブラウザが送る通りのキー名（先頭大文字）
    #[serde(rename = "IsDocumentHidden")]
    pub is_document_hidden: bool,
}

/// get_live_chat レスポンス
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatResponse {
    pub continuation_contents: Option<ContinuationContents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationContents {
    pub live_chat_continuation: Option<LiveChatContinuation>,
}

#[derive(Debug, Deserialize)]
pub struct LiveChatContinuation {
    /// アクションは1件ずつデコードする（1件の不正で全体を失わないため生のまま保持）
    #[serde(default)]
    pub actions: Vec<Value>,
    #[serde(default)]
    pub continuations: Vec<Continuation>,
}

/// チャットアクション（メッセージ追加のみ扱う）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAction {
    pub add_chat_item_action: Option<AddChatItemAction>,
}

#[derive(Debug, Deserialize)]
pub struct AddChatItemAction {
    pub item: ChatItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatItem {
    pub live_chat_text_message_renderer: Option<LiveChatTextMessageRenderer>,
}

/// テキストメッセージレンダラー
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatTextMessageRenderer {
    pub id: String,
    pub message: Option<MessageContent>,
    pub author_name: Option<SimpleText>,
    pub author_photo: Option<ThumbnailContainer>,
    pub author_external_channel_id: Option<String>,
    pub timestamp_usec: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageContent {
    #[serde(default)]
    pub runs: Vec<RunItem>,
}

/// runs配列の要素（テキストまたは絵文字）
#[derive(Debug, Deserialize)]
pub struct RunItem {
    pub text: Option<String>,
    pub emoji: Option<Emoji>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emoji {
    #[serde(default)]
    pub emoji_id: String,
    #[serde(default)]
    pub is_custom_emoji: bool,
    pub image: Option<ThumbnailContainer>,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailContainer {
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleText {
    pub simple_text: Option<String>,
}

/// Continuation（次回取得用トークン）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuation {
    pub invalidation_continuation_data: Option<ContinuationData>,
    pub timed_continuation_data: Option<ContinuationData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationData {
    pub continuation: String,
    #[serde(default)]
    pub timeout_ms: u64,
}

impl LiveChatResponse {
    /// 次回取得用のcontinuationを取り出す
    ///
    /// 先頭のcontinuationのみを見る。invalidationがtimedより優先。
    pub fn next_continuation(&self) -> Option<ContinuationState> {
        let continuation = self
            .continuation_contents
            .as_ref()?
            .live_chat_continuation
            .as_ref()?
            .continuations
            .first()?;

        if let Some(data) = &continuation.invalidation_continuation_data {
            return Some(ContinuationState::Invalidation {
                token: data.continuation.clone(),
                timeout_ms: data.timeout_ms,
            });
        }
        if let Some(data) = &continuation.timed_continuation_data {
            return Some(ContinuationState::Timed {
                token: data.continuation.clone(),
                timeout_ms: data.timeout_ms,
            });
        }
        None
    }

    /// アクション一覧を取り出す（所有権を移す）
    pub fn take_actions(&mut self) -> Vec<Value> {
        self.continuation_contents
            .as_mut()
            .and_then(|c| c.live_chat_continuation.as_mut())
            .map(|c| std::mem::take(&mut c.actions))
            .unwrap_or_default()
    }
}
