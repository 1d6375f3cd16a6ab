use tokio::net::TcpListener;

use ws_probe::config::loader;
use ws_probe::lifecycle::signals;
use ws_probe::observability::{logging, metrics};
use ws_probe::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = loader::load_from_env()?;
    logging::init(&config.observability.log_level);

    tracing::info!("ws-probe v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.limits.max_connections,
        connection_timeout_minutes = config.limits.connection_timeout_minutes,
        rate_limit_messages = config.rate_limit.max_messages,
        rate_limit_window_ms = config.rate_limit.window_ms,
        auto_shutdown = config.auto_shutdown.enabled,
        ip_whitelist = config.ip_whitelist.enabled,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let server = Server::new(config);
    tokio::spawn(signals::watch_signals(server.state().shutdown.clone()));

    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
