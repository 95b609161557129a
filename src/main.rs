use anyhow::Result;
use batch_throttler::client::{ApiClient, RequestParams};
use batch_throttler::shutdown::cancel_on_shutdown;
use batch_throttler::{BatchExecutor, CancellationToken, Config};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::parse();

    // Logs go to stderr, the report goes to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("batch_throttler={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let executor_config = config
        .executor_config()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    let keys = config.load_keys()?;
    let params = config.request_params();

    tracing::info!(
        base_url = %params.base_url,
        max_requests = executor_config.rate_limit.max_requests,
        window_ms = executor_config.rate_limit.window.as_millis() as u64,
        buffer_ratio = executor_config.buffer_ratio,
        keys = keys.len(),
        "Configuration loaded"
    );

    let client = ApiClient::new(config.request_timeout())
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

    let cancel = CancellationToken::new();
    let executor = BatchExecutor::new(executor_config)?.with_cancellation(cancel.clone());
    let watcher = cancel_on_shutdown(cancel.clone());

    let report = executor
        .execute_with_report(
            move |key: String, params: RequestParams| {
                let client = client.clone();
                async move {
                    client
                        .fetch_json::<serde_json::Value>(&key, &params)
                        .await
                }
            },
            keys,
            params,
        )
        .await;

    cancel.cancel();
    watcher.await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
