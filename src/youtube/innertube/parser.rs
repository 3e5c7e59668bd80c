//! get_live_chat レスポンスのデコード

use serde_json::Value;

use super::types::*;
use crate::youtube::errors::YouTubeError;
use crate::youtube::pool::text_buffers;
use crate::youtube::types::{Author, ChatMessage};

/// アクション一覧をChatMessageリストに変換
///
/// サーバーが返した順序を保つ。テキストメッセージ以外のアクション・
/// runsが空のメッセージは読み飛ばし、デコードに失敗したものはログに残して捨てる。
pub fn decode_actions(actions: Vec<Value>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(actions.len());

    for action in actions {
        match decode_action(action) {
            Ok(Some(msg)) => messages.push(msg),
            Ok(None) => {}
            Err(e) => log::warn!("{}", e),
        }
    }

    messages
}

/// 単一のアクションをデコード
fn decode_action(action: Value) -> Result<Option<ChatMessage>, YouTubeError> {
    let action: ChatAction =
        serde_json::from_value(action).map_err(|e| YouTubeError::Decode(e.to_string()))?;

    let Some(renderer) = action
        .add_chat_item_action
        .and_then(|a| a.item.live_chat_text_message_renderer)
    else {
        return Ok(None);
    };

    decode_text_message(renderer)
}

/// テキストメッセージをデコード
fn decode_text_message(
    msg: LiveChatTextMessageRenderer,
) -> Result<Option<ChatMessage>, YouTubeError> {
    let runs = msg.message.map(|m| m.runs).unwrap_or_default();
    if runs.is_empty() {
        return Ok(None);
    }

    // 時刻が読めないメッセージも捨てずに0秒として出す
    let timestamp_usec = msg.timestamp_usec.unwrap_or_default();
    let seconds = match parse_micros(&timestamp_usec) {
        Ok((seconds, _millis)) => seconds,
        Err(e) => {
            log::debug!(
                "message {}: invalid timestamp '{}': {}",
                msg.id,
                timestamp_usec,
                e
            );
            0
        }
    };

    let thumbnail = msg
        .author_photo
        .and_then(|p| p.thumbnails.into_iter().next())
        .map(|t| t.url)
        .unwrap_or_default();

    let author = Author::new(
        msg.author_external_channel_id.unwrap_or_default(),
        msg.author_name
            .and_then(|n| n.simple_text)
            .unwrap_or_default(),
        thumbnail,
    );

    Ok(Some(ChatMessage {
        id: msg.id,
        message: render_runs(&runs),
        author,
        timestamp: seconds,
    }))
}

/// runsを1つの文字列に連結
///
/// - テキストはそのまま
/// - カスタム絵文字は最大解像度（末尾）の画像URLを前後スペース付きで
/// - それ以外の絵文字はemojiId
fn render_runs(runs: &[RunItem]) -> String {
    let mut buf = text_buffers().checkout();

    for run in runs {
        match (&run.text, &run.emoji) {
            (Some(text), _) if !text.is_empty() => buf.push_str(text),
            (_, Some(emoji)) if emoji.is_custom_emoji => {
                let url = emoji
                    .image
                    .as_ref()
                    .and_then(|image| image.thumbnails.last());
                if let Some(thumbnail) = url {
                    buf.push(' ');
                    buf.push_str(&thumbnail.url);
                    buf.push(' ');
                }
            }
            (_, Some(emoji)) => buf.push_str(&emoji.emoji_id),
            _ => {}
        }
    }

    buf.as_str().to_owned()
}

/// マイクロ秒の文字列を（Unix秒, ミリ秒の端数）に変換
pub fn parse_micros(timestamp_usec: &str) -> Result<(i64, i64), std::num::ParseIntError> {
    let millis = timestamp_usec.parse::<i64>()? / 1000;
    Ok((millis / 1000, millis % 1000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_action(id: &str, runs: Value) -> Value {
        json!({
            "addChatItemAction": {
                "item": {
                    "liveChatTextMessageRenderer": {
                        "id": id,
                        "message": {"runs": runs},
                        "authorName": {"simpleText": "User"},
                        "authorPhoto": {"thumbnails": [
                            {"url": "http://img/32.png", "width": 32, "height": 32},
                            {"url": "http://img/64.png", "width": 64, "height": 64}
                        ]},
                        "authorExternalChannelId": "UC123",
                        "timestampUsec": "1700000000123456"
                    }
                }
            }
        })
    }

    #[test]
    fn test_text_and_custom_emoji() {
        let actions = vec![text_action(
            "m1",
            json!([
                {"text": "hi"},
                {"emoji": {
                    "emojiId": "UCxyz/abc",
                    "isCustomEmoji": true,
                    "image": {"thumbnails": [
                        {"url": "http://x/small.png"},
                        {"url": "http://x/e.png"}
                    ]}
                }}
            ]),
        )];

        let messages = decode_actions(actions);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "hi http://x/e.png ");
    }

    #[test]
    fn test_standard_emoji_uses_id() {
        let actions = vec![text_action(
            "m1",
            json!([
                {"text": "gg "},
                {"emoji": {"emojiId": "👍", "image": {"thumbnails": [{"url": "http://x/t.png"}]}}}
            ]),
        )];

        let messages = decode_actions(actions);
        assert_eq!(messages[0].message, "gg 👍");
    }

    #[test]
    fn test_author_and_timestamp() {
        let messages = decode_actions(vec![text_action("m1", json!([{"text": "hello"}]))]);
        let msg = &messages[0];
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.author.id, "UC123");
        assert_eq!(msg.author.name, "User");
        assert_eq!(msg.author.thumbnail, "http://img/32.png");
        assert_eq!(msg.author.url, "https://youtube.com/channel/UC123");
        assert_eq!(msg.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_zero_runs_skipped_order_preserved() {
        let actions = vec![
            text_action("a", json!([{"text": "first"}])),
            text_action("empty", json!([])),
            json!({"addLiveChatTickerItemAction": {}}),
            text_action("b", json!([{"text": "second"}])),
        ];

        let ids: Vec<_> = decode_actions(actions).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_malformed_action_skipped() {
        let actions = vec![
            text_action("a", json!([{"text": "ok"}])),
            // idが数値なのでデコード失敗
            json!({"addChatItemAction": {"item": {"liveChatTextMessageRenderer": {"id": 42}}}}),
            text_action("b", json!([{"text": "ok"}])),
        ];

        let ids: Vec<_> = decode_actions(actions).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_unreadable_timestamp_kept_as_zero() {
        let mut missing = text_action("missing", json!([{"text": "x"}]));
        missing["addChatItemAction"]["item"]["liveChatTextMessageRenderer"]
            .as_object_mut()
            .unwrap()
            .remove("timestampUsec");
        let mut garbage = text_action("garbage", json!([{"text": "y"}]));
        garbage["addChatItemAction"]["item"]["liveChatTextMessageRenderer"]["timestampUsec"] =
            json!("not-a-number");

        let messages = decode_actions(vec![missing, garbage]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "missing");
        assert_eq!(messages[0].message, "x");
        assert_eq!(messages[0].timestamp, 0);
        assert_eq!(messages[1].id, "garbage");
        assert_eq!(messages[1].timestamp, 0);
    }

    #[test]
    fn test_parse_micros() {
        assert_eq!(parse_micros("1700000000000000").unwrap(), (1_700_000_000, 0));
        assert_eq!(parse_micros("1700000000123456").unwrap(), (1_700_000_000, 123));
        assert!(parse_micros("").is_err());
        assert!(parse_micros("abc").is_err());
    }
}
