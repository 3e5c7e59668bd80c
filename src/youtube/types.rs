use serde::{Deserialize, Serialize};

/// チャット投稿者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub thumbnail: String, // → 先頭のサムネイルURL（なければ空）
    pub url: String,       // → https://youtube.com/channel/{id}
}

impl Author {
    /// 投稿者を作成（チャンネルURLはIDから組み立てる）
    pub fn new(id: String, name: String, thumbnail: String) -> Self {
        let url = format!("https://youtube.com/channel/{}", id);
        Self {
            id,
            name,
            thumbnail,
            url,
        }
    }
}

/// ライブチャットの1メッセージ
///
/// サーバーが返したアクション1件につき1回だけ生成され、以後変更されない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub message: String,
    pub author: Author,
    /// Unix秒
    pub timestamp: i64,
}

/// チャンネルのメタデータ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: String,
    pub url: String,
}
