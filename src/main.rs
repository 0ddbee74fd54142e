//! chatterd - in-memory real-time chat backend.

use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatterd::broadcast::FanoutRouter;
use chatterd::config::Config;
use chatterd::http::{run_http_server, HealthState};
use chatterd::network::Gateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    info!(
        server = %config.server.name,
        listen = %config.server.listen,
        seed_users = config.seed.users.len(),
        "starting chatterd"
    );

    let (engine, rooms, connections) = chatterd::build_engine(&config);
    let router = Arc::new(FanoutRouter::new(rooms, connections));

    // Health endpoint is optional; port 0 disables it (used by tests).
    if config.server.health_port == 0 {
        info!("health endpoint disabled");
    } else {
        let state = Arc::new(HealthState {
            server_name: config.server.name.clone(),
            started: Instant::now(),
        });
        let port = config.server.health_port;
        tokio::spawn(async move {
            run_http_server(port, state).await;
        });
    }

    let gateway = Gateway::bind(config.server.listen, engine, router).await?;
    gateway.run().await
}
