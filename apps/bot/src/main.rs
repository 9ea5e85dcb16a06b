mod config;
mod delivery;
mod job;
mod scheduler;

use stockbot_market_data::ProviderChain;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("stockbot starting");

    let config = config::load(None)?;
    let chain = ProviderChain::standard(
        std::env::var("FINNHUB_API_KEY").ok(),
        std::env::var("ALPHAVANTAGE_API_KEY").ok(),
    )?;

    scheduler::run_scheduled(&config, &chain).await
}
