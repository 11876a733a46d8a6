//! Startup initialization: authenticate + schema sync per connection with bounded retries.
//! Connections are driven one at a time, primary first; a failure is logged and recorded,
//! never propagated, so the remaining connections and the server still come up.

use crate::connection::ConnectionState;
use crate::error::{DriverError, InitError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::Instrument;

pub const MAX_ATTEMPTS: u32 = 5;
pub const RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

/// What the initializer needs from a connection.
#[async_trait]
pub trait ManagedConnection: Send + Sync {
    fn key(&self) -> &str;
    fn state(&self) -> ConnectionState;
    fn set_state(&mut self, state: ConnectionState);
    async fn authenticate(&self) -> Result<(), DriverError>;
    async fn sync(&self) -> Result<(), DriverError>;
}

/// Terminal result for one connection.
#[derive(Debug)]
pub struct InitOutcome {
    pub key: String,
    pub state: ConnectionState,
    pub attempts: u32,
    /// Retry delays waited: `attempts - 1`, or 0 when the connection was already terminal.
    pub delays: u32,
    pub error: Option<InitError>,
}

#[derive(Debug, Default)]
pub struct InitReport {
    pub outcomes: Vec<InitOutcome>,
}

impl InitReport {
    pub fn outcome(&self, key: &str) -> Option<&InitOutcome> {
        self.outcomes.iter().find(|o| o.key == key)
    }

    pub fn synced(&self) -> impl Iterator<Item = &InitOutcome> {
        self.outcomes.iter().filter(|o| o.state == ConnectionState::Synced)
    }

    pub fn failed(&self) -> impl Iterator<Item = &InitOutcome> {
        self.outcomes.iter().filter(|o| o.state == ConnectionState::Failed)
    }

    pub fn all_synced(&self) -> bool {
        self.outcomes.iter().all(|o| o.state == ConnectionState::Synced)
    }
}

fn transition<C: ManagedConnection + ?Sized>(conn: &mut C, next: ConnectionState) {
    let current = conn.state();
    debug_assert!(
        current.can_transition_to(next),
        "invalid transition {:?} -> {:?}",
        current,
        next
    );
    tracing::trace!(from = current.as_str(), to = next.as_str(), "state");
    conn.set_state(next);
}

async fn attempt<C: ManagedConnection + ?Sized>(conn: &C) -> Result<(), DriverError> {
    conn.authenticate().await?;
    tracing::info!("connection established");
    conn.sync().await?;
    Ok(())
}

/// Drive one connection to `Synced` or `Failed`.
pub async fn initialize<C: ManagedConnection + ?Sized>(conn: &mut C, policy: &RetryPolicy) -> InitOutcome {
    let key = conn.key().to_string();
    if conn.state().is_terminal() {
        tracing::warn!(state = conn.state().as_str(), "already initialized, skipping");
        return InitOutcome {
            key,
            state: conn.state(),
            attempts: 0,
            delays: 0,
            error: None,
        };
    }

    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    let mut delays = 0;
    transition(conn, ConnectionState::Authenticating);
    loop {
        attempts += 1;
        tracing::info!(attempt = attempts, max_attempts, "authenticating");
        match attempt(conn).await {
            Ok(()) => {
                transition(conn, ConnectionState::Synced);
                tracing::info!(attempts, "synced");
                return InitOutcome {
                    key,
                    state: ConnectionState::Synced,
                    attempts,
                    delays,
                    error: None,
                };
            }
            Err(e) if attempts >= max_attempts => {
                tracing::error!(attempts, error = %e, "could not connect after {} attempts", attempts);
                transition(conn, ConnectionState::Failed);
                return InitOutcome {
                    key: key.clone(),
                    state: ConnectionState::Failed,
                    attempts,
                    delays,
                    error: Some(InitError::Exhausted {
                        key,
                        attempts,
                        source: e,
                    }),
                };
            }
            Err(e) => {
                tracing::warn!(attempt = attempts, error = %e, "connection failed");
                tracing::info!(delay = ?policy.delay, "retrying");
                tokio::time::sleep(policy.delay).await;
                delays += 1;
                transition(conn, ConnectionState::Authenticating);
            }
        }
    }
}

/// Initialize `connections` strictly in order, each to a terminal state before the next.
pub async fn initialize_all<C: ManagedConnection>(connections: &mut [C], policy: &RetryPolicy) -> InitReport {
    let mut report = InitReport::default();
    for conn in connections.iter_mut() {
        let span = tracing::info_span!("init", db = %conn.key());
        let outcome = async {
            tracing::info!("initializing");
            initialize(conn, policy).await
        }
        .instrument(span)
        .await;
        match &outcome.error {
            Some(e) => tracing::error!(db = %outcome.key, error = %e, "failed to initialize"),
            None => tracing::info!(db = %outcome.key, state = outcome.state.as_str(), "initialized"),
        }
        report.outcomes.push(outcome);
    }
    report
}
