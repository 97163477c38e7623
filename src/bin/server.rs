//! rawhttp origin server

use clap::Parser;
use rawhttp::config::ServerConfig;
use rawhttp::http::{HttpListener, DEFAULT_HTTP_PORT};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rawhttp-server")]
#[command(about = "Serve a directory over HTTP/1.1", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    /// Directory resources are served from and written to
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Host name advertised in Location headers
    #[arg(long)]
    host: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rawhttp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = ServerConfig::default().port(cli.port).document_root(cli.root);
    if let Some(host) = cli.host {
        config = config.public_host(host);
    }

    tracing::info!(
        bind_address = %config.bind_addr,
        document_root = %config.document_root.display(),
        "starting"
    );

    HttpListener::bind(&config)?.run()?;
    Ok(())
}
