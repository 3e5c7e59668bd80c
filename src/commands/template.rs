//! カスタム出力テンプレート
//!
//! テンプレート中のキーを値に置き換える。左から順に走査し、
//! 同じ位置で複数のキーが一致する場合は先に定義したキーを採用する。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::youtube::types::{ChannelInfo, ChatMessage};

static LIVE_KEYS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("ID|MESSAGE|AUTHOR_ID|AUTHOR_NAME|AUTHOR_URL|AUTHOR_THUMBNAIL|TIME")
        .expect("Failed to compile live template regex")
});

static INFO_KEYS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("ID|NAME|DESC|IMAGE|URL").expect("Failed to compile info template regex")
});

/// チャットメッセージ用
pub fn render_live(template: &str, msg: &ChatMessage) -> String {
    LIVE_KEYS_RE
        .replace_all(template, |caps: &Captures| match &caps[0] {
            "ID" => msg.id.clone(),
            "MESSAGE" => msg.message.clone(),
            "AUTHOR_ID" => msg.author.id.clone(),
            "AUTHOR_NAME" => msg.author.name.clone(),
            "AUTHOR_URL" => msg.author.url.clone(),
            "AUTHOR_THUMBNAIL" => msg.author.thumbnail.clone(),
            "TIME" => msg.timestamp.to_string(),
            other => other.to_string(),
        })
        .into_owned()
}

/// チャンネル情報用
pub fn render_info(template: &str, info: &ChannelInfo) -> String {
    INFO_KEYS_RE
        .replace_all(template, |caps: &Captures| match &caps[0] {
            "ID" => info.id.clone(),
            "NAME" => info.name.clone(),
            "DESC" => info.description.clone(),
            "IMAGE" => info.image.clone(),
            "URL" => info.url.clone(),
            other => other.to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::types::Author;

    fn message() -> ChatMessage {
        ChatMessage {
            id: "m1".into(),
            message: "hello".into(),
            author: Author::new("UC1".into(), "Alice".into(), "http://img".into()),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_render_live() {
        let out = render_live("[TIME] AUTHOR_NAME (AUTHOR_ID): MESSAGE #ID", &message());
        assert_eq!(out, "[1700000000] Alice (UC1): hello #m1");
    }

    #[test]
    fn test_render_live_author_links() {
        let out = render_live("AUTHOR_URL AUTHOR_THUMBNAIL", &message());
        assert_eq!(out, "https://youtube.com/channel/UC1 http://img");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut msg = message();
        msg.message = "MESSAGE ID".into();
        assert_eq!(render_live("MESSAGE", &msg), "MESSAGE ID");
    }

    #[test]
    fn test_render_info() {
        let info = ChannelInfo {
            id: "UC1".into(),
            name: "Chan".into(),
            image: "http://img".into(),
            description: "desc".into(),
            url: "https://www.youtube.com/channel/UC1".into(),
        };
        assert_eq!(
            render_info("NAME <URL> ID IMAGE: DESC", &info),
            "Chan <https://www.youtube.com/channel/UC1> UC1 http://img: desc"
        );
    }
}
