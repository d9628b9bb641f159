use std::path::PathBuf;

use clap::Parser;
use phosphene_server::{DEFAULT_ALLOWED_ORIGINS, DEFAULT_MAX_UPLOAD_BYTES, ServerConfig, start_server};

#[derive(Debug, Parser)]
#[command(name = "phosphene_server", version, about = "Phosphene simulator HTTP API")]
struct Cli {
    /// Socket address to bind, e.g. 127.0.0.1:8000
    #[arg(long, env = "PHOSPHENE_BIND", default_value = "127.0.0.1:8000")]
    bind: String,
    /// Comma-separated CORS allow-list. Defaults to the local dev server and the published front end.
    #[arg(long, env = "PHOSPHENE_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,
    /// Directory for staged uploads and rendered percepts.
    #[arg(long, env = "PHOSPHENE_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,
    /// Largest accepted request body, in bytes.
    #[arg(long, env = "PHOSPHENE_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "phosphene_server=info,phosphene=info,info".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let allowed_origins = if cli.allowed_origins.is_empty() {
        DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect()
    } else {
        cli.allowed_origins
    };
    let cfg = ServerConfig {
        bind_addr: cli.bind,
        allowed_origins,
        scratch_dir: cli.scratch_dir,
        max_upload_bytes: cli.max_upload_bytes,
    };

    let (_, handle) = start_server(cfg).await?;
    handle.await??;
    Ok(())
}
