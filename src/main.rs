use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vintage_card::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env();
    let bind_address = config.bind_address();
    let router = vintage_card::app(&config);
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!(
        address = %bind_address,
        mode = ?config.dispatch_mode(),
        generator = ?config.generator_kind(),
        "Server running on http://{}",
        bind_address
    );

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vintage_card=info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|value| value.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
