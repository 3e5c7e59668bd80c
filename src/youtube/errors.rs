use thiserror::Error;

#[derive(Error, Debug)]
pub enum YouTubeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 配信中でない（continuationが得られない）
    #[error("Stream is not live")]
    NotLive,

    /// 初期ページの取得・解析に失敗
    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    /// chooseServer / セッションID取得に失敗
    #[error("Session negotiation failed: {0}")]
    Negotiation(String),

    /// ロングポーリングの読み込み失敗（再接続で回復する）
    #[error("Long-poll transport error: {0}")]
    Transport(String),

    /// 既知のcontinuation形式がレスポンスに存在しない
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 個別メッセージのデコード失敗
    #[error("Failed to decode message: {0}")]
    Decode(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Cookie file error: {0}")]
    Cookie(String),
}

impl YouTubeError {
    /// セットアップ段階の失敗として呼び出し元へ返すべきエラーかどうか
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            YouTubeError::NotLive | YouTubeError::Bootstrap(_) | YouTubeError::Negotiation(_)
        )
    }
}
