// =============================================================================
// 共通設定・定数モジュール
// =============================================================================
// ストリーミングエンジン全体で使用する設定値・定数を定義
// =============================================================================

use std::time::Duration;

/// HTTPリクエストのデフォルトタイムアウト（秒）
///
/// ページ取得・ハンドシェイク・チャット取得など、単発のリクエストで使用。
/// ロングポーリングの接続には適用しない（サーバー側が接続を保持するため）。
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// チャンネル情報ページ取得のタイムアウト（秒）
pub const CHANNEL_INFO_TIMEOUT_SECS: u64 = 5;

/// 初期ページの読み込み上限（2MB）
pub const MAX_PAGE_BYTES: usize = 2 << 20;

/// セッションID取得レスポンスの読み込み上限（1MB）
pub const MAX_HANDSHAKE_BYTES: usize = 1 << 20;

/// 既定のWebエンドポイント
pub const DEFAULT_WWW_BASE: &str = "https://www.youtube.com";

/// 既定のシグナラーエンドポイント（ロングポーリング用）
pub const DEFAULT_SIGNALER_BASE: &str = "https://signaler-pa.youtube.com";

/// HTTPリクエストのデフォルトタイムアウト（Duration）
pub fn http_timeout() -> Duration {
    Duration::from_secs(HTTP_TIMEOUT_SECS)
}

/// ストリーミングエンジンの設定
///
/// 既定値は実トラフィックで観測された値に合わせてある。
/// テストではエンドポイントをローカルのモックサーバーに差し替える。
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Webエンドポイント（ページ取得・get_live_chat）
    pub www_base: String,
    /// シグナラーエンドポイント（chooseServer・チャンネル・refreshCreds）
    pub signaler_base: String,
    /// ロングポーリング切断後の再接続待機（固定、増加なし）
    pub reconnect_delay: Duration,
    /// 認証情報リフレッシュの間隔
    pub refresh_interval: Duration,
    /// 1接続あたりのリフレッシュ回数の上限（到達でセッションIDを再取得）
    pub max_refreshes_per_connection: u32,
    /// この間隔以上プッシュが途絶えたら無条件で再取得する
    pub idle_threshold: Duration,
    /// invalidationモード時のメッセージ間隔
    pub invalidation_pacing: Duration,
    /// 初期ページの読み込み上限
    pub max_page_bytes: usize,
    /// 単発リクエストのタイムアウト
    pub http_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            www_base: DEFAULT_WWW_BASE.to_string(),
            signaler_base: DEFAULT_SIGNALER_BASE.to_string(),
            reconnect_delay: Duration::from_millis(500),
            refresh_interval: Duration::from_secs(4 * 60),
            max_refreshes_per_connection: 4,
            idle_threshold: Duration::from_secs(10),
            invalidation_pacing: Duration::from_millis(50),
            max_page_bytes: MAX_PAGE_BYTES,
            http_timeout: http_timeout(),
        }
    }
}

impl StreamConfig {
    /// Webエンドポイントを差し替える
    pub fn with_www_base(mut self, base: impl Into<String>) -> Self {
        self.www_base = trim_base(base.into());
        self
    }

    /// シグナラーエンドポイントを差し替える
    pub fn with_signaler_base(mut self, base: impl Into<String>) -> Self {
        self.signaler_base = trim_base(base.into());
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_max_refreshes(mut self, count: u32) -> Self {
        self.max_refreshes_per_connection = count;
        self
    }

    pub fn with_invalidation_pacing(mut self, pacing: Duration) -> Self {
        self.invalidation_pacing = pacing;
        self
    }
}

/// 末尾のスラッシュを除去（URL組み立て時の二重スラッシュ防止）
fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}
