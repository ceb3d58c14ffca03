//! Tomato Timer - pomodoro timers over HTTP and Slack
//!
//! This is the main entry point for the tomato-timer server.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use tomato_timer::{
    api::create_router,
    config::Config,
    state::{AppState, TimerManager},
    tasks::completion_log_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("tomato_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting tomato-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, slack command={}",
          config.host, config.port, config.slack_command);

    let slack = config.slack_settings();
    if slack.token.is_none() {
        warn!("No Slack verification token configured, slash commands will be rejected");
    }

    let state = Arc::new(AppState::new(
        TimerManager::new(),
        slack,
        config.port,
        config.host.clone(),
    ));

    // Log and count finished timers
    let completion_state = Arc::clone(&state);
    tokio::spawn(async move {
        completion_log_task(completion_state).await;
    });

    let app = create_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /slack/command      - Slack slash command");
    info!("  POST   /timers             - Start a timer");
    info!("  GET    /timers             - List timers");
    info!("  GET    /timers/:id         - Inspect a timer");
    info!("  POST   /timers/:id/pause   - Pause a timer");
    info!("  POST   /timers/:id/resume  - Resume a timer");
    info!("  DELETE /timers/:id         - Stop a timer");
    info!("  GET    /status             - Server status");
    info!("  GET    /health             - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
