//! Service binary: resolve configuration, connect startup collaborators,
//! serve the invocation endpoint.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skiff::config::RuntimeConfig;
use skiff::error::Result;
use skiff::mcp::{discover_tools, McpClient};
use skiff::memory::{MemoryStore, RemoteMemoryStore};
use skiff::model::{HostedModelRuntime, ModelRuntime};
use skiff::service::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "skiff", about = "Streaming agent invocation service")]
struct Args {
    /// Override the listen address from configuration.
    #[arg(long)]
    listen: Option<String>,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,skiff=debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = RuntimeConfig::from_env()?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    let mut runtime = HostedModelRuntime::new(config.model_runtime_url.as_str());
    if let Some(model_id) = &config.model_id {
        runtime = runtime.with_model_id(model_id.as_str());
    }
    let runtime: Arc<dyn ModelRuntime> = Arc::new(runtime);
    info!(model = runtime.model_id(), "model runtime ready");

    let memory_store: Option<Arc<dyn MemoryStore>> = match (&config.memory_id, &config.memory_url) {
        (Some(memory_id), Some(url)) => {
            info!(memory_id = memory_id.as_str(), "memory enabled");
            Some(Arc::new(RemoteMemoryStore::new(url.as_str())))
        }
        _ => {
            info!("memory disabled; no memory id configured");
            None
        }
    };

    // Tool discovery happens once here; handlers reuse the result.
    let remote_tools = match &config.mcp_server_url {
        Some(url) => {
            let client = McpClient::connect(url).await?;
            let tools = discover_tools(client).await?;
            info!(count = tools.len(), "remote tools discovered");
            tools
        }
        None => {
            warn!("no MCP server configured; remote tools unavailable");
            Vec::new()
        }
    };

    let listen_addr = config.listen_addr.clone();
    let state = AppState {
        config,
        runtime,
        memory_store,
        remote_tools,
    };

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(addr = listen_addr.as_str(), "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
