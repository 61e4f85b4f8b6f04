use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use raffle_webhook::{
    alphabot::AlphabotClient,
    config::Config,
    dispatcher::RetryingDispatcher,
    server::{self, AppState},
    signature::SignatureVerifier,
    webhook::WebhookHandler,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    let client = AlphabotClient::new(&config)?;
    let dispatcher = RetryingDispatcher::from_config(client, &config);
    let verifier = SignatureVerifier::new(config.webhook_secret().as_bytes())
        .with_input_logging(config.log_signature_inputs);
    let webhook_handler = WebhookHandler::new(verifier, dispatcher);

    let app = server::router(AppState::new(webhook_handler));

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server starting on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
