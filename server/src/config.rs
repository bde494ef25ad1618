use clap::Parser;
use std::path::PathBuf;

/// Realtime classroom polling server.
#[derive(Parser, Debug, Clone)]
#[command(name = "livepoll-server")]
#[command(about = "Live classroom polls over WebSocket")]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Origin allowed to call the API from a browser.
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    /// Directory for poll documents and chat logs.
    /// Polls are kept in memory only when not set.
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}
