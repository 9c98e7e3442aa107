use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wallet_tracker::config::Config;
use wallet_tracker::notifier::LogNotifier;
use wallet_tracker::repository::Database;
use wallet_tracker::rpc::RpcClient;
use wallet_tracker::store::{ActivityStore, SqliteStore};
use wallet_tracker::{CycleOutcome, Dispatcher, TrackerContext};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting wallet activity watcher");

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!(
        "RPC URLs: {} endpoint(s) configured",
        config.json_rpc_urls.len()
    );

    let db = Database::new(&config.database_url)?;
    info!("Database initialized");

    let client = RpcClient::new(
        &config.json_rpc_urls,
        config.max_retries,
        config.request_timeout,
    )?;
    info!("RPC client connected");

    let store = Arc::new(SqliteStore::new(db));
    let ctx = TrackerContext::new(
        Arc::new(client),
        store.clone(),
        Arc::new(LogNotifier::new(config.native_symbol.clone())),
    )
    .with_notify_timeout(config.notify_timeout);
    let dispatcher = Dispatcher::new(ctx, config.dispatcher_settings());

    let mut interval = tokio::time::interval(config.check_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }

        let addresses = match store.active_addresses().await {
            Ok(addresses) => addresses,
            Err(e) => {
                error!("Failed to load tracked addresses: {}", e);
                continue;
            }
        };

        let outcomes = dispatcher.run_cycle(&addresses).await;

        let recorded: usize = outcomes.iter().map(|o| o.recorded).sum();
        let failed = outcomes
            .iter()
            .filter(|o| matches!(o.outcome, CycleOutcome::PartialFailure(_)))
            .count();
        for outcome in &outcomes {
            if let CycleOutcome::PartialFailure(reason) = &outcome.outcome {
                warn!("{:?} will be retried: {}", outcome.address, reason);
            }
        }
        info!(
            "Cycle done: {} address(es), {} new event(s), {} retried",
            outcomes.len(),
            recorded,
            failed
        );
    }
}
