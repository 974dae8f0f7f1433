use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use sundrive_core::Config;
use sundrive_twilight::{
    ConfiguredLocation, InboundMessage, JsonLinesChannel, RefreshContext, RefreshFlow,
    RefreshOptions, SunriseSunsetClient, TwilightCache,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    sundrive_core::init(&config.logging.filter)?;
    config.check()?;

    tracing::info!("Sundrive companion started");
    tracing::debug!("Cache file: {}", config.cache_path().display());

    let context = Arc::new(RefreshContext::new(TwilightCache::new(config.cache_path())));
    let location = ConfiguredLocation::from_config(&config.location)?;
    let source = SunriseSunsetClient::with_base_url(
        &config.twilight.api_url,
        config.twilight.request_timeout_secs.map(Duration::from_secs),
    )?;
    let channel = JsonLinesChannel::new(tokio::io::stdout());

    let flow = Arc::new(RefreshFlow::new(
        context,
        location,
        source,
        channel,
        RefreshOptions::from_config(&config),
    ));

    // Each message runs its own refresh; overlapping refreshes are not
    // coordinated and share the cache slot last-write-wins.
    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        tracing::debug!("AppMessage received from watchface: {}", line);
        match InboundMessage::parse(&line) {
            Ok(message) => {
                let flow = Arc::clone(&flow);
                in_flight.spawn(async move {
                    let outcome = flow.handle_message(message).await;
                    tracing::debug!("Refresh finished: {:?}", outcome);
                });
            }
            Err(e) => tracing::warn!("Ignoring malformed message: {}", e),
        }

        while in_flight.try_join_next().is_some() {}
    }

    tracing::info!("Device channel closed, waiting for {} refreshes", in_flight.len());
    while in_flight.join_next().await.is_some() {}

    tracing::info!("Sundrive companion stopped");
    Ok(())
}
