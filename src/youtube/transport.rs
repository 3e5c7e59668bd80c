//! ロングポーリング接続
//!
//! シグナラーのチャンネルにGETを張りっぱなしにし、本文を改行区切りで読む。
//! 切断（EOF・読み込みエラー・接続失敗）時は固定間隔で再接続を繰り返す。
//! 停止は呼び出し側のキャンセルで行う（`next_line`はキャンセル安全）。

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use std::io;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;

use super::client::YouTubeClient;
use super::errors::YouTubeError;
use super::negotiator::get_session_id;
use super::session::Session;
use crate::util::generate_zx;

type LineReader = Lines<StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>>;

/// ロングポーリングのトランスポート
pub struct LongPollTransport {
    client: YouTubeClient,
    reader: Option<LineReader>,
    /// 接続確立または直近のrefreshCreds
    last_refresh: Instant,
    /// 次の接続前に待機するかどうか（初回接続は待たない）
    reconnect_pending: bool,
}

impl LongPollTransport {
    pub fn new(client: YouTubeClient) -> Self {
        Self {
            client,
            reader: None,
            last_refresh: Instant::now(),
            reconnect_pending: false,
        }
    }

    /// 接続中かどうか
    pub fn is_connected(&self) -> bool {
        self.reader.is_some()
    }

    /// 次の空でない行を返す
    ///
    /// 切断されても戻らずに再接続を続ける。
    pub async fn next_line(&mut self, session: &Session) -> String {
        loop {
            if self.reader.is_none() {
                if self.reconnect_pending {
                    log::debug!("Reconnecting in {:?}", self.client.config().reconnect_delay);
                    tokio::time::sleep(self.client.config().reconnect_delay).await;
                }
                self.reconnect_pending = true;

                match Self::connect(&self.client, session).await {
                    Ok(reader) => {
                        self.reader = Some(reader);
                        self.last_refresh = Instant::now();
                        log::info!("Long poll connected, streaming...");
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        continue;
                    }
                }
            }

            let Some(reader) = self.reader.as_mut() else {
                continue;
            };

            match reader.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    log::trace!("push: {}", line);
                    return line.to_string();
                }
                Ok(None) => {
                    log::info!("Stream closed by server.");
                    self.reader = None;
                }
                Err(e) => {
                    log::warn!("Error reading stream: {}", e);
                    self.reader = None;
                }
            }
        }
    }

    /// 1行処理した後の保守
    ///
    /// 前回から`refresh_interval`以上経過していればrefreshCredsを呼ぶ。
    /// 回数が上限に達したらSIDを取り直して接続を切る（次の`next_line`で再接続）。
    /// SIDの再取得に失敗した場合は古いSIDを使い続ける。
    pub async fn after_line(&mut self, session: &mut Session) {
        let config = self.client.config().clone();

        if self.last_refresh.elapsed() >= config.refresh_interval {
            log::debug!("Refreshing credentials...");
            if let Err(e) = refresh_creds(&self.client, session).await {
                log::warn!("{}", e);
            }
            self.last_refresh = Instant::now();
            session.refresh_count += 1;
        }

        if config.max_refreshes_per_connection > 0
            && session.refresh_count >= config.max_refreshes_per_connection
        {
            log::info!("Reset SID...");
            match get_session_id(
                &self.client,
                &session.api_key,
                &session.server_token,
                &session.video_id,
            )
            .await
            {
                Ok(sid) => session.session_id = sid,
                Err(e) => log::warn!("SID rotation failed, keeping current SID: {}", e),
            }
            session.refresh_count = 0;
            self.reader = None;
        }
    }

    /// 読み込み中のストリームは`Sync`でないため、`self`を借用せずに接続する
    async fn connect(
        client: &YouTubeClient,
        session: &Session,
    ) -> Result<LineReader, YouTubeError> {
        let url = format!(
            "{}/punctual/multi-watch/channel?VER=8&gsessionid={}&key={}&RID=rpc&SID={}&AID=0&CI=0&TYPE=xmlhttp&zx={}&t=1",
            client.config().signaler_base,
            session.server_token,
            session.api_key,
            session.session_id,
            generate_zx()
        );

        let response = client
            .stream_get(&url)
            .send()
            .await
            .map_err(|e| YouTubeError::Transport(format!("HTTP error: {}", e)))?;

        if !response.status().is_success() {
            return Err(YouTubeError::Transport(format!(
                "long poll returned {}",
                response.status()
            )));
        }

        let body: BoxStream<'static, io::Result<Bytes>> =
            Box::pin(response.bytes_stream().map_err(io::Error::other));
        Ok(StreamReader::new(body).lines())
    }
}

/// 認証情報をリフレッシュ
///
/// セッショントークンをまだ受け取っていない場合は何もしない。
pub async fn refresh_creds(client: &YouTubeClient, session: &Session) -> Result<(), YouTubeError> {
    let Some(token) = session.session_token.as_deref() else {
        log::debug!("refreshCreds skipped: no session token yet");
        return Ok(());
    };

    let url = format!(
        "{}/punctual/v1/refreshCreds?key={}&gsessionid={}",
        client.config().signaler_base,
        session.api_key,
        session.server_token
    );
    let body = serde_json::to_string(&[token])
        .map_err(|e| YouTubeError::Transport(format!("refreshCreds encode error: {}", e)))?;

    let response = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json+protobuf")
        .body(body)
        .send()
        .await
        .map_err(|e| YouTubeError::Transport(format!("refreshCreds HTTP error: {}", e)))?;

    log::debug!("refreshCreds: {}", response.status());
    Ok(())
}
