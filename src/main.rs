//! Wardrobe backend server.
//!
//! # Startup Sequence
//!
//! ```text
//!   environment (+ .env)
//!        │
//!        ▼
//!   ┌──────────────┐  invalid   ┌──────────────────────────────┐
//!   │   validate   │───────────▶│ issues to stderr, exit(1)    │
//!   └──────┬───────┘            └──────────────────────────────┘
//!          │ AppConfig (immutable, Arc)
//!          ▼
//!   ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//!   │   logging    │───▶│ bind  :PORT  │───▶│  HttpServer  │
//!   └──────────────┘    └──────────────┘    └──────┬───────┘
//!                                                   │ SIGINT / SIGTERM
//!                                                   ▼
//!                                           graceful shutdown
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use wardrobe_api::config::load_from_env;
use wardrobe_api::lifecycle::{signals, startup, Shutdown};
use wardrobe_api::observability::{init_logging, LogFormat};
use wardrobe_api::HttpServer;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            startup::report_config_error(&e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(LogFormat::for_env(config.node_env), config.node_env);
    tracing::info!("wardrobe-api v{} starting", env!("CARGO_PKG_VERSION"));
    startup::log_config(&config);

    match serve(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Arc<wardrobe_api::AppConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let listener = startup::bind_listener(&config).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    HttpServer::new(config).run(listener, server_shutdown).await?;
    Ok(())
}
