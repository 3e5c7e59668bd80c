//! InnerTube get_live_chat モジュール
//!
//! continuationトークンを使ってチャットを取得し、レスポンスの
//! continuationでセッションを更新、メッセージをデコードする。

pub mod client;
pub mod parser;
pub mod types;

pub use client::{fetch_live_chat, FetchTrigger};
pub use parser::{decode_actions, parse_micros};
