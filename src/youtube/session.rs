use serde_json::Value;
use std::time::Duration;

use super::bootstrap::PageConfig;

/// サーバーが返すcontinuation（どちらか一方のみが有効）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuationState {
    /// invalidationContinuationData - サーバーがロングポーリングで更新を通知する
    Invalidation { token: String, timeout_ms: u64 },
    /// timedContinuationData - timeout_ms経過後に無条件で再取得する
    Timed { token: String, timeout_ms: u64 },
}

impl ContinuationState {
    pub fn token(&self) -> &str {
        match self {
            ContinuationState::Invalidation { token, .. } | ContinuationState::Timed { token, .. } => token,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        match self {
            ContinuationState::Invalidation { timeout_ms, .. }
            | ContinuationState::Timed { timeout_ms, .. } => *timeout_ms,
        }
    }

    pub fn is_invalidation(&self) -> bool {
        matches!(self, ContinuationState::Invalidation { .. })
    }
}

/// 1ストリーム分のセッション状態
///
/// ストリーミングワーカーが排他的に所有する。初期化時に作成され、
/// 配信中に更新され、停止時に破棄される。
#[derive(Debug, Clone)]
pub struct Session {
    /// 動画ID
    pub video_id: String,
    /// シグナラー用APIキー（LIVE_CHAT_BASE_TANGO_CONFIG.apiKey）
    pub api_key: String,
    /// InnerTube APIキー
    pub innertube_api_key: String,
    /// get_live_chatにそのまま渡すリクエストコンテキスト
    pub context: Value,
    /// 最新のcontinuationトークン
    pub continuation: String,
    /// サーバーが宣言したポーリング間隔（ミリ秒）
    pub timeout_ms: u64,
    /// invalidationモードかどうか
    pub invalidation: bool,
    /// サーバーアフィニティトークン（gsessionid）
    pub server_token: String,
    /// ストリームセッションID（SID）
    pub session_id: String,
    /// refreshCredsに渡すセッショントークン
    pub session_token: Option<String>,
    /// 現在の接続でのリフレッシュ回数
    pub refresh_count: u32,
}

impl Session {
    /// 初期ページの設定からセッションを作成
    pub fn from_page(page: PageConfig) -> Self {
        Self {
            video_id: page.video_id,
            api_key: page.api_key,
            innertube_api_key: page.innertube_api_key,
            context: page.context,
            continuation: page.continuation,
            timeout_ms: 0,
            invalidation: false,
            server_token: String::new(),
            session_id: String::new(),
            session_token: None,
            refresh_count: 0,
        }
    }

    /// レスポンスから得たcontinuationを反映
    ///
    /// `keep_invalidation_token`がtrueの場合、invalidationトークンでは
    /// continuationを置き換えない（初回の疎通確認用）。
    pub fn apply_continuation(&mut self, state: &ContinuationState, keep_invalidation_token: bool) {
        self.timeout_ms = state.timeout_ms();
        self.invalidation = state.is_invalidation();
        if !(self.invalidation && keep_invalidation_token) {
            self.continuation = state.token().to_string();
        }
    }

    /// ハンドシェイクが完了しているかどうか
    pub fn is_negotiated(&self) -> bool {
        !self.server_token.is_empty() && !self.session_id.is_empty()
    }

    /// バッチ内メッセージ間の待機時間
    ///
    /// timedモードではサーバー宣言の間隔をバッチ件数で等分する（整数除算）。
    /// 1件のみの場合は間隔全体を待つ。
    pub fn pacing_delay(&self, batch_len: usize, invalidation_pacing: Duration) -> Duration {
        if self.invalidation {
            return invalidation_pacing;
        }
        let len = batch_len.max(1) as u64;
        Duration::from_millis(self.timeout_ms / len)
    }
}
