use clap::Parser;
use medium_mcp::config::{Config, Mode};
use medium_mcp::logging::init_tracing;
use medium_mcp::medium::MediumClient;
use medium_mcp::tools::build_server;
use medium_mcp::transport::{http, stdio};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> medium_mcp::Result<()> {
    let client = MediumClient::new(&config.api_base, &config.access_token)?;
    client.authenticate().await?;
    let server = Arc::new(build_server(client));

    match config.mode() {
        Mode::Http(addr) => {
            info!("Starting in HTTP mode on {}", addr);
            http::serve(addr, server).await
        }
        Mode::Stdio => {
            info!("Starting in stdio mode");
            stdio::serve_stdio(server).await
        }
    }
}
