//! Connectivity precheck run before any registration artifact is written.

use crate::config::ConnectionConfig;
use crate::driver::probe;
use crate::error::DriverError;
use async_trait::async_trait;
use std::time::Duration;

pub const PRECHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// One authenticate-then-close probe. `Ok(false)` for ordinary connectivity failures, which are
/// logged; `Err` only when the dialect's driver is not compiled in.
pub async fn test_connection(
    key: &str,
    candidate: &ConnectionConfig,
    timeout: Duration,
) -> Result<bool, DriverError> {
    match probe(candidate, timeout).await {
        Ok(()) => {
            tracing::info!(db = %key, "connection successful");
            Ok(true)
        }
        Err(e @ DriverError::DriverMissing { .. }) => Err(e),
        Err(e) => {
            tracing::warn!(
                db = %key,
                host = %candidate.host,
                port = candidate.port,
                error = %e,
                "failed to connect"
            );
            Ok(false)
        }
    }
}

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn test_connection(&self, key: &str, candidate: &ConnectionConfig) -> Result<bool, DriverError>;
}

/// Probe through the compiled sqlx drivers.
#[derive(Clone, Debug)]
pub struct DriverProbe {
    pub timeout: Duration,
}

impl Default for DriverProbe {
    fn default() -> Self {
        DriverProbe {
            timeout: PRECHECK_TIMEOUT,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for DriverProbe {
    async fn test_connection(&self, key: &str, candidate: &ConnectionConfig) -> Result<bool, DriverError> {
        test_connection(key, candidate, self.timeout).await
    }
}
