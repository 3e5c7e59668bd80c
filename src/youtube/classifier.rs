//! ロングポーリングで届いた行の分類
//!
//! 判定は上から順に行い、最初に一致したものを採用する。
//! パターンは実トラフィックから推定したもので、網羅的ではない。

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::{Duration, Instant};

/// 最初のチャット通知（セッショントークンを含む）
static FIRST_CHAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[\[\d+,\[\[null,null,\["([^"]+)"\]\]\]\]"#)
        .expect("Failed to compile first chat regex")
});

/// チャットなしの通知
static NO_CHAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[\[\d*,\[\[\[\[.*\[null,null,\["\d*"#).expect("Failed to compile no chat regex")
});

/// 16桁以上のタイムスタンプ（マイクロ秒）
static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{16,}").expect("Failed to compile timestamp regex"));

static SESSION_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w{8,}").expect("Failed to compile session token regex"));

/// 1行分の分類結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// 最初のチャット通知。行からセッショントークンを取り出す
    SessionAnnounce { line: String },
    /// チャットなし
    Idle,
    /// 前回の行から閾値以上経過（無条件で再取得）
    Refresh,
    /// タイムスタンプ付きの更新通知
    Timestamped(String),
    Unrecognized,
}

/// 行分類器
///
/// 直前の行を受け取った時刻を保持し、経過時間から`Refresh`を判定する。
#[derive(Debug)]
pub struct PushClassifier {
    idle_threshold: Duration,
    last_line_at: Instant,
}

impl PushClassifier {
    pub fn new(idle_threshold: Duration) -> Self {
        Self::starting_at(idle_threshold, Instant::now())
    }

    pub fn starting_at(idle_threshold: Duration, now: Instant) -> Self {
        Self {
            idle_threshold,
            last_line_at: now,
        }
    }

    /// 現在時刻で分類
    pub fn classify(&mut self, line: &str) -> PushEvent {
        self.classify_at(line, Instant::now())
    }

    /// 指定時刻に受け取った行として分類
    pub fn classify_at(&mut self, line: &str, now: Instant) -> PushEvent {
        let elapsed = now.saturating_duration_since(self.last_line_at);
        self.last_line_at = now;

        if FIRST_CHAT_RE.is_match(line) {
            return PushEvent::SessionAnnounce {
                line: line.to_string(),
            };
        }

        if elapsed >= self.idle_threshold {
            return PushEvent::Refresh;
        }

        if NO_CHAT_RE.is_match(line) {
            return PushEvent::Idle;
        }

        if let Some(m) = TIMESTAMP_RE.find(line) {
            return PushEvent::Timestamped(m.as_str().to_string());
        }

        log::warn!("[{}ms] Unrecognized push: {}", elapsed.as_millis(), line);
        PushEvent::Unrecognized
    }
}

/// 最初のチャット通知からセッショントークンを取り出す
pub fn extract_session_token(line: &str) -> Option<String> {
    let payload = FIRST_CHAT_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map_or(line, |m| m.as_str());

    SESSION_TOKEN_RE
        .find(payload)
        .map(|m| m.as_str().to_string())
}
