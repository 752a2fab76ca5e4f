//! BizGraph Graph Generator Service
//!
//! Serves batch generation and linear workflow runs over HTTP against the
//! configured Data API backend.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use bizgraph_data_api::{DataApi, HttpDataApi, InMemoryDataApi};
use bizgraph_graph_generator::{router, AppState};
use bizgraph_utils::{init_logging, AppConfig, DataApiMode};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting BizGraph Graph Generator");

    let api: Arc<dyn DataApi> = match config.data_api.mode {
        DataApiMode::Http => {
            info!("Using Data API at {}", config.data_api.base_url);
            Arc::new(HttpDataApi::new(&config.data_api)?)
        }
        DataApiMode::InMemory => {
            info!("Using in-memory Data API, nothing leaves this process");
            Arc::new(InMemoryDataApi::new())
        }
    };

    let app = router(AppState::new(api, config.generation.clone()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Graph Generator listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
