//! Request loop: calls the count endpoint and feeds 429s into the backoff machine.

use std::sync::Arc;

use reqwest::StatusCode;
use tollgate_core::ports::Clock;
use tollgate_shared::dto::CountResponse;
use tollgate_shared::headers::{RATE_LIMIT_LIMIT, RETRY_AFTER};
use tollgate_shared::{BackoffMachine, BackoffPhase, BlockStore, StoreError};

use crate::config::ClientConfig;
use crate::countdown::Countdown;

/// Result of one call to the count endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Counted(CountResponse),
    /// The server answered 429; the machine has recorded it.
    Blocked {
        phase: BackoffPhase,
        limit: Option<u64>,
    },
    /// Anything else. The block record is left as it was.
    Failed(String),
}

pub struct Session<S> {
    http: reqwest::Client,
    config: ClientConfig,
    machine: BackoffMachine<S>,
    clock: Arc<dyn Clock>,
    countdown: Countdown,
    /// `X-RateLimit-Limit` from the latest 429.
    limit: Option<u64>,
}

impl<S: BlockStore> Session<S> {
    pub fn new(
        config: ClientConfig,
        machine: BackoffMachine<S>,
        clock: Arc<dyn Clock>,
    ) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            countdown: Countdown::new(clock.clone()),
            config,
            machine,
            clock,
            limit: None,
        })
    }

    pub fn machine(&self) -> &BackoffMachine<S> {
        &self.machine
    }

    /// Issue the configured number of requests, waiting out blocks in between
    /// when auto-retry is on. Without it the loop stops at the first wait.
    pub async fn run(&mut self) -> Result<(), StoreError> {
        for round in 1..=self.config.rounds {
            self.machine.tick(self.clock.now_millis())?;
            let phase = self.machine.phase(self.clock.now_millis());
            if phase.is_waiting() {
                if !self.config.auto_retry {
                    println!("{}", describe_wait(phase, self.limit));
                    return Ok(());
                }
                self.wait_out().await?;
            }

            tracing::debug!(round, "Requesting count");
            match self.fetch().await? {
                FetchOutcome::Counted(res) => println!("ip {} count {}", res.ip, res.count),
                FetchOutcome::Blocked { phase, limit } => println!("{}", describe_wait(phase, limit)),
                FetchOutcome::Failed(reason) => println!("request failed: {reason}"),
            }
        }

        let phase = self.machine.phase(self.clock.now_millis());
        if self.config.auto_retry && phase.is_waiting() {
            self.wait_out().await?;
        }
        Ok(())
    }

    /// One call to the count endpoint.
    pub async fn fetch(&mut self) -> Result<FetchOutcome, StoreError> {
        let response = match self.http.get(self.config.count_url()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Count request failed");
                return Ok(FetchOutcome::Failed(e.to_string()));
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let number = |name: &str| {
                response
                    .headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
            };
            let retry_after = number(RETRY_AFTER).unwrap_or(self.config.default_retry_after_secs);
            let limit = number(RATE_LIMIT_LIMIT);
            let phase = self
                .machine
                .observe_denial(retry_after, self.clock.now_millis())?;
            self.limit = limit;
            tracing::info!(retry_after, ?limit, attempts = self.machine.state().attempts, ?phase, "Rate limited");
            return Ok(FetchOutcome::Blocked { phase, limit });
        }

        if !status.is_success() {
            return Ok(FetchOutcome::Failed(format!("HTTP {status}")));
        }

        match response.json::<CountResponse>().await {
            Ok(body) => Ok(FetchOutcome::Counted(body)),
            Err(e) => Ok(FetchOutcome::Failed(e.to_string())),
        }
    }

    /// Render the countdown until the current wait runs out.
    async fn wait_out(&mut self) -> Result<(), StoreError> {
        let deadline = self.machine.state().unblock_at_epoch_ms;
        let mut remaining = self.countdown.start(deadline);
        let mut shown = *remaining.borrow_and_update();
        println!("retry in {shown}s");

        while remaining.changed().await.is_ok() {
            let secs = *remaining.borrow_and_update();
            if secs != shown {
                shown = secs;
                println!("retry in {secs}s");
            }
        }

        let tick = self.machine.tick(self.clock.now_millis())?;
        if tick.unlocked {
            tracing::info!("Lockout ended");
        }
        Ok(())
    }
}

fn describe_wait(phase: BackoffPhase, limit: Option<u64>) -> String {
    let wait = match phase {
        BackoffPhase::Idle => return "ready".to_string(),
        BackoffPhase::Cooling { remaining_secs } => {
            format!("too many requests, retry in {remaining_secs}s")
        }
        BackoffPhase::Locked { remaining_secs } => {
            format!("locked out, retry in {remaining_secs}s")
        }
    };
    match limit {
        Some(limit) => format!("{wait} (limit {limit} per window)"),
        None => wait,
    }
}
