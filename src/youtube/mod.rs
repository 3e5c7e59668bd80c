//! YouTube ライブチャット購読モジュール
//!
//! 公式APIを使わず、視聴ページとシグナラーのプッシュチャネルから
//! チャットを取得する。

pub mod bootstrap;
pub mod channel;
pub mod classifier;
pub mod client;
pub mod cookies;
pub mod errors;
pub mod innertube;
pub mod negotiator;
pub mod pool;
pub mod session;
pub mod stream;
pub mod transport;
pub mod types;

pub use channel::fetch_channel_info;
pub use cookies::Cookies;
pub use errors::YouTubeError;
pub use stream::{start_live_chat_stream, LiveChatStream};
pub use types::{Author, ChannelInfo, ChatMessage};
