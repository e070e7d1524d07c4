//! Demo server.
//!
//! ```text
//! erica [--host 127.0.0.1] [--port 8000] [--config erica.toml]
//!
//!   GET  /hello   → "world"
//!   POST /echo    → request JSON echoed back
//!   GET  /health  → {"status": "ok", "version": ...}
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use erica::config::{load_config, ServerConfig};
use erica::observability::init_logging;
use erica::{App, BoxError, RequestContext, ResponseWriter};

#[derive(Parser)]
#[command(name = "erica")]
#[command(about = "Minimal HTTP dispatch demo server", long_about = None)]
struct Cli {
    /// Host to bind (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = cli.host {
        config.listener.host = host;
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    let mut app = App::with_config(config);
    app.get("/hello", |_req, res: ResponseWriter| async move { res.text("world") })
        .post("/echo", echo)
        .get("/health", |_req, res: ResponseWriter| async move {
            res.json(&json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
        });

    app.run_configured().await?;
    Ok(())
}

async fn echo(mut req: RequestContext, res: ResponseWriter) -> Result<erica::Reply, BoxError> {
    let body: serde_json::Value = req.json().await?;
    Ok(res.json(&body)?)
}
