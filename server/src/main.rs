mod config;
mod routes;
mod services;
mod state;

use config::ServerConfig;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt::init();
    if let Err(e) = dotenv {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let config = ServerConfig::from_env();
    let state = state::AppState::in_memory(config);
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, max_batch_size = config.max_batch_size, "board server listening");
    axum::serve(listener, app).await
}
