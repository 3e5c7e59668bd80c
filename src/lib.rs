mod commands;
pub mod config;
pub mod util; // doctestのためpubにする
pub mod youtube;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use config::StreamConfig;
pub use youtube::{
  fetch_channel_info, start_live_chat_stream, Author, ChannelInfo, ChatMessage, Cookies,
  LiveChatStream, YouTubeError,
};

/// ログ出力を初期化（RUST_LOGがあればそちらを優先）
fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .try_init();
}

pub fn run() -> anyhow::Result<()> {
  // .envがあれば読み込む（CHAT_SCRAPER_COOKIES, RUST_LOG など）
  dotenvy::dotenv().ok();

  let cli = commands::Cli::parse();
  init_tracing(cli.verbose);

  let runtime = tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()?;
  runtime.block_on(commands::execute(cli))
}
