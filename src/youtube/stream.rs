//! ライブチャットのストリーミング
//!
//! ## 流れ
//! 1. URL解決（`@handle`ならチャンネルの /live）→ 初期ページ解析
//! 2. 疎通確認の取得でモード（invalidation / timed）を判定
//! 3. invalidationならハンドシェイク（gsessionid・SID）
//! 4. ワーカーを起動し、以後はワーカーだけがセッションを更新する
//!
//! ワーカーはモードに応じてロングポーリングまたは定期取得を行い、
//! デコードしたメッセージを容量1のチャネルへ順番に送る。
//! 受信側が読まない間は送信で待つ（バックプレッシャー）。

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::bootstrap::{fetch_page_config, resolve_page_url};
use super::classifier::{extract_session_token, PushClassifier, PushEvent};
use super::client::YouTubeClient;
use super::cookies::Cookies;
use super::errors::YouTubeError;
use super::innertube::{fetch_live_chat, FetchTrigger};
use super::negotiator::{choose_server, get_session_id};
use super::session::Session;
use super::transport::LongPollTransport;
use super::types::ChatMessage;
use crate::config::StreamConfig;

/// 配信チャネルの容量
const DELIVERY_CAPACITY: usize = 1;

/// timedモードでサーバーが間隔0を返したときの待機
const FALLBACK_TIMED_INTERVAL_MS: u64 = 1000;

/// 受信側のハンドル
///
/// `Stream`として読むか`recv`で1件ずつ受け取る。
/// `cancel`またはドロップでワーカーを停止する。停止後は残りを読み切ると`None`。
pub struct LiveChatStream {
    rx: mpsc::Receiver<ChatMessage>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl LiveChatStream {
    /// 次のメッセージを受け取る
    pub async fn recv(&mut self) -> Option<ChatMessage> {
        self.rx.recv().await
    }

    /// ワーカーを停止する（冪等）
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// シグナルハンドラなど別タスクから停止するためのトークン
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 停止してワーカーの終了を待つ
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::error!("Stream worker panicked: {}", e);
            }
        }
    }
}

impl Stream for LiveChatStream {
    type Item = ChatMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for LiveChatStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for LiveChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveChatStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// ライブチャットの購読を開始
///
/// # Errors
/// - `NotLive`: 配信中でない
/// - `Bootstrap`: ページ取得・解析の失敗
/// - `Negotiation`: ハンドシェイクの失敗
///
/// 開始後のエラー（切断・取得失敗など）はワーカー内でログに残して継続する。
pub async fn start_live_chat_stream(
    url_or_handle: &str,
    config: StreamConfig,
    cookies: Option<&Cookies>,
) -> Result<LiveChatStream, YouTubeError> {
    let mut client = YouTubeClient::new(config).map_err(setup_error)?;
    if let Some(cookies) = cookies {
        client.set_cookies(cookies).map_err(setup_error)?;
    }

    let page_url = resolve_page_url(&client, url_or_handle)
        .await
        .map_err(setup_error)?;
    let page = fetch_page_config(&client, &page_url)
        .await
        .map_err(setup_error)?;
    let mut session = Session::from_page(page);

    match fetch_live_chat(&client, &mut session, &FetchTrigger::Probe).await {
        Ok(_) => {}
        Err(YouTubeError::Protocol(reason)) => {
            log::warn!("Initial chat fetch: {}", reason);
            return Err(YouTubeError::NotLive);
        }
        Err(e) => {
            return Err(YouTubeError::Bootstrap(format!(
                "initial chat fetch failed: {}",
                e
            )));
        }
    }

    if !session.invalidation && session.timeout_ms == 0 {
        return Err(YouTubeError::NotLive);
    }

    if session.invalidation {
        negotiate(&client, &mut session).await?;
    }

    log::info!(
        "Live chat stream started: video={}, mode={}",
        session.video_id,
        if session.invalidation { "invalidation" } else { "timed" }
    );

    let (tx, rx) = mpsc::channel(DELIVERY_CAPACITY);
    let cancel = CancellationToken::new();
    let worker = Worker::new(client, session, tx, cancel.clone());
    let handle = tokio::spawn(worker.run());

    Ok(LiveChatStream {
        rx,
        cancel,
        handle: Some(handle),
    })
}

/// セットアップ中のエラーをNotLive/Bootstrap/Negotiationのいずれかに揃える
fn setup_error(err: YouTubeError) -> YouTubeError {
    if err.is_setup_failure() {
        err
    } else {
        YouTubeError::Bootstrap(err.to_string())
    }
}

/// gsessionidとSIDを取得してセッションに設定
async fn negotiate(client: &YouTubeClient, session: &mut Session) -> Result<(), YouTubeError> {
    let server_token = choose_server(client, &session.api_key, &session.video_id).await?;
    let session_id =
        get_session_id(client, &session.api_key, &server_token, &session.video_id).await?;

    session.server_token = server_token;
    session.session_id = session_id;
    session.refresh_count = 0;
    Ok(())
}

/// セッションを排他的に所有するワーカー
struct Worker {
    client: YouTubeClient,
    session: Session,
    tx: mpsc::Sender<ChatMessage>,
    cancel: CancellationToken,
    /// 抽出タスクからのセッショントークン
    token_tx: mpsc::UnboundedSender<String>,
    token_rx: mpsc::UnboundedReceiver<String>,
}

/// ループを抜けた理由
enum Exit {
    /// モードが変わった
    ModeChanged,
    /// キャンセルまたは受信側の破棄
    Stopped,
}

impl Worker {
    fn new(
        client: YouTubeClient,
        session: Session,
        tx: mpsc::Sender<ChatMessage>,
        cancel: CancellationToken,
    ) -> Self {
        let (token_tx, token_rx) = mpsc::unbounded_channel();
        Self {
            client,
            session,
            tx,
            cancel,
            token_tx,
            token_rx,
        }
    }

    async fn run(mut self) {
        loop {
            let exit = if self.session.invalidation {
                self.run_long_poll().await
            } else {
                self.run_timed().await
            };

            match exit {
                Exit::ModeChanged => log::info!(
                    "Switching to {} mode",
                    if self.session.invalidation { "invalidation" } else { "timed" }
                ),
                Exit::Stopped => break,
            }
        }
        log::info!("Live chat stream stopped");
    }

    /// invalidationモード: プッシュを受けて取得
    async fn run_long_poll(&mut self) -> Exit {
        while !self.session.is_negotiated() {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Exit::Stopped,
                result = negotiate(&self.client, &mut self.session) => result,
            };
            if let Err(e) = result {
                log::warn!("{}", e);
                if !self.sleep(self.client.config().reconnect_delay).await {
                    return Exit::Stopped;
                }
            }
        }

        let mut transport = LongPollTransport::new(self.client.clone());
        let mut classifier = PushClassifier::new(self.client.config().idle_threshold);

        loop {
            let line = tokio::select! {
                _ = self.cancel.cancelled() => return Exit::Stopped,
                line = transport.next_line(&self.session) => line,
            };

            let trigger = match classifier.classify(&line) {
                PushEvent::SessionAnnounce { line } => {
                    self.spawn_token_extraction(line);
                    Some(FetchTrigger::First)
                }
                PushEvent::Refresh => Some(FetchTrigger::Timeout),
                PushEvent::Timestamped(ts) => Some(FetchTrigger::Cursor(ts)),
                PushEvent::Idle | PushEvent::Unrecognized => None,
            };

            if let Some(trigger) = trigger {
                if !self.fetch_and_emit(&trigger).await {
                    return Exit::Stopped;
                }
            }

            self.take_session_token();
            tokio::select! {
                _ = self.cancel.cancelled() => return Exit::Stopped,
                _ = transport.after_line(&mut self.session) => {}
            }

            if !self.session.invalidation {
                return Exit::ModeChanged;
            }
        }
    }

    /// timedモード: 宣言された間隔ごとに取得
    async fn run_timed(&mut self) -> Exit {
        loop {
            let interval = match self.session.timeout_ms {
                0 => FALLBACK_TIMED_INTERVAL_MS,
                ms => ms,
            };
            if !self.sleep(Duration::from_millis(interval)).await {
                return Exit::Stopped;
            }

            if !self.fetch_and_emit(&FetchTrigger::First).await {
                return Exit::Stopped;
            }

            if self.session.invalidation {
                return Exit::ModeChanged;
            }
        }
    }

    /// 取得して順番に配信。停止すべき場合はfalse
    async fn fetch_and_emit(&mut self, trigger: &FetchTrigger) -> bool {
        let result = tokio::select! {
            _ = self.cancel.cancelled() => return false,
            result = fetch_live_chat(&self.client, &mut self.session, trigger) => result,
        };

        let messages = match result {
            Ok(messages) => messages,
            Err(e) => {
                log::warn!("Chat fetch failed: {}", e);
                return true;
            }
        };

        if messages.is_empty() {
            return true;
        }
        log::debug!("Delivering {} messages", messages.len());

        let delay = self
            .session
            .pacing_delay(messages.len(), self.client.config().invalidation_pacing);

        for msg in messages {
            let sent = tokio::select! {
                _ = self.cancel.cancelled() => return false,
                sent = self.tx.send(msg) => sent,
            };
            if sent.is_err() {
                log::debug!("Receiver dropped");
                return false;
            }
            if !self.sleep(delay).await {
                return false;
            }
        }
        true
    }

    /// 最初のチャット通知からトークンを取り出す（結果はチャネル経由で受け取る）
    fn spawn_token_extraction(&self, line: String) {
        let token_tx = self.token_tx.clone();
        tokio::spawn(async move {
            match extract_session_token(&line) {
                Some(token) => {
                    let _ = token_tx.send(token);
                }
                None => log::warn!("Session token not found in: {}", line),
            }
        });
    }

    fn take_session_token(&mut self) {
        while let Ok(token) = self.token_rx.try_recv() {
            log::debug!("Session token updated");
            self.session.session_token = Some(token);
        }
    }

    /// キャンセル可能な待機。キャンセルされたらfalse
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
