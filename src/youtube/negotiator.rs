//! シグナラーとのハンドシェイク
//!
//! 1. chooseServer でサーバーアフィニティトークン（gsessionid）を取得
//! 2. チャンネルへのPOSTでストリームセッションID（SID）を取得
//!
//! 以後のロングポーリングとrefreshCredsはこの2つを使う。

use reqwest::header::CONTENT_TYPE;
use serde_json::{Deserializer, Value};

use super::client::YouTubeClient;
use super::errors::YouTubeError;
use crate::config::MAX_HANDSHAKE_BYTES;
use crate::util::generate_zx;

const PROTOBUF_JSON: &str = "application/json+protobuf";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// 購読対象（動画のチャットトピック）を含むリクエストペイロード
fn choose_server_payload(video_id: &str) -> String {
    format!(
        r#"[[null,null,null,[9,5],null,[["youtube_live_chat_web"],[1],[[["chat~{}"]]]]],null,null,0]"#,
        video_id
    )
}

fn session_payload(video_id: &str) -> String {
    format!(
        r#"count=1&ofs=0&req0___data__=[[["1",[null,null,null,[9,5],null,[["youtube_live_chat_web"],[1],[[["chat~{}"]]]],null,null,1],null,3]]]"#,
        video_id
    )
}

/// サーバーアフィニティトークンを取得
pub async fn choose_server(
    client: &YouTubeClient,
    api_key: &str,
    video_id: &str,
) -> Result<String, YouTubeError> {
    let url = format!(
        "{}/punctual/v1/chooseServer?key={}",
        client.config().signaler_base,
        api_key
    );

    let response = client
        .post(&url)
        .header(CONTENT_TYPE, PROTOBUF_JSON)
        .body(choose_server_payload(video_id))
        .send()
        .await
        .map_err(|e| YouTubeError::Negotiation(format!("chooseServer HTTP error: {}", e)))?;

    if !response.status().is_success() {
        return Err(YouTubeError::Negotiation(format!(
            "chooseServer returned {}",
            response.status()
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| YouTubeError::Negotiation(format!("chooseServer read error: {}", e)))?;

    let token = parse_server_token(&body)?;
    log::debug!("chooseServer: gsessionid={}", token);
    Ok(token)
}

/// ストリームセッションIDを取得
pub async fn get_session_id(
    client: &YouTubeClient,
    api_key: &str,
    server_token: &str,
    video_id: &str,
) -> Result<String, YouTubeError> {
    let url = format!(
        "{}/punctual/multi-watch/channel?VER=8&gsessionid={}&key={}&RID=6167&CVER=22&zx={}&t=1",
        client.config().signaler_base,
        server_token,
        api_key,
        generate_zx()
    );

    let mut response = client
        .post(&url)
        .header(CONTENT_TYPE, FORM_URLENCODED)
        .header("x-webchannel-content-type", PROTOBUF_JSON)
        .body(session_payload(video_id))
        .send()
        .await
        .map_err(|e| YouTubeError::Negotiation(format!("getSID HTTP error: {}", e)))?;

    if !response.status().is_success() {
        return Err(YouTubeError::Negotiation(format!(
            "getSID returned {}",
            response.status()
        )));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| YouTubeError::Negotiation(format!("getSID read error: {}", e)))?
    {
        let room = MAX_HANDSHAKE_BYTES.saturating_sub(body.len());
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= MAX_HANDSHAKE_BYTES {
            break;
        }
    }

    let sid = parse_session_id(&body)?;
    log::debug!("getSID: SID={}", sid);
    Ok(sid)
}

/// chooseServerのレスポンス（配列の先頭要素）からトークンを取り出す
fn parse_server_token(body: &[u8]) -> Result<String, YouTubeError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| YouTubeError::Negotiation(format!("chooseServer decode error: {}", e)))?;

    match value.get(0).and_then(Value::as_str) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(YouTubeError::Negotiation(
            "chooseServer: gsessionid not found".into(),
        )),
    }
}

/// チャンネルのレスポンスからSIDを取り出す
///
/// 本文は長さプレフィックス付きで、最初の`[[`以降が配列。
/// 各要素の`[1][1]`が文字列ならそれをSIDとする。
fn parse_session_id(body: &[u8]) -> Result<String, YouTubeError> {
    let start = body
        .windows(2)
        .position(|w| w == b"[[")
        .ok_or_else(|| YouTubeError::Negotiation("getSID: JSON array not found".into()))?;

    let value = Deserializer::from_slice(&body[start..])
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| YouTubeError::Negotiation("getSID: empty response".into()))?
        .map_err(|e| YouTubeError::Negotiation(format!("getSID decode error: {}", e)))?;

    let elements = value
        .as_array()
        .ok_or_else(|| YouTubeError::Negotiation("getSID: expected top-level array".into()))?;

    elements
        .iter()
        .filter_map(|elem| elem.get(1)?.get(1)?.as_str())
        .find(|sid| !sid.is_empty())
        .map(str::to_string)
        .ok_or_else(|| YouTubeError::Negotiation("getSID: SID not found".into()))
}
