//! # Tollgate Client
//!
//! Polls the count endpoint and backs off when the gate answers 429. The block
//! record is persisted so a restarted client keeps waiting where it left off.

use std::sync::Arc;

use anyhow::Context;
use tollgate_core::ports::{Clock, SystemClock};
use tollgate_shared::BackoffMachine;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod countdown;
mod session;
mod store;

use config::ClientConfig;
use session::Session;
use store::FileBlockStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ClientConfig::from_env();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store = FileBlockStore::new(&config.state_file);
    let machine = BackoffMachine::restore(store, clock.now_millis())
        .with_context(|| format!("loading {}", config.state_file.display()))?;
    tracing::info!(
        api_base = %config.api_base,
        state = ?machine.state(),
        "Client starting"
    );

    let mut session = Session::new(config, machine, clock.clone()).context("building HTTP client")?;

    tokio::select! {
        res = session.run() => res.context("persisting block record")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    tracing::debug!(
        state = ?session.machine().state(),
        path = %session.machine().store().path().display(),
        "Client finished"
    );
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tollgate_client=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
