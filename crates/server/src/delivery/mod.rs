//! Outbound SMS transport and its retry policy.

use async_trait::async_trait;
use std::time::Duration;

mod twilio;

pub use twilio::TwilioCarrier;

/// Attempts made before a send is recorded as failed.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("carrier rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed carrier response: {0}")]
    Malformed(String),
}

/// Submits one SMS and returns the carrier's delivery id.
#[async_trait]
pub trait SmsCarrier: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<String, DeliveryError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_DELIVERY_ATTEMPTS,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn with_backoff_unit(backoff_unit: Duration) -> Self {
        Self {
            backoff_unit,
            ..Self::default()
        }
    }

    /// Linear backoff: wait `attempt × unit` after the given failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

/// What came of a send once retries are done.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Delivered { delivery_id: String, attempts: u32 },
    Failed { error: DeliveryError, attempts: u32 },
}

impl DeliveryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts, .. }
            | DeliveryOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Send `body` to `to`, retrying with linear backoff. The first success
/// short-circuits; after the last failure the final error is returned as a
/// value, not an `Err`.
pub async fn deliver_with_retry(
    carrier: &dyn SmsCarrier,
    to: &str,
    body: &str,
    policy: &RetryPolicy,
) -> DeliveryOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match carrier.send(to, body).await {
            Ok(delivery_id) => {
                tracing::info!("Delivered SMS to {} on attempt {} ({})", to, attempt, delivery_id);
                return DeliveryOutcome::Delivered {
                    delivery_id,
                    attempts: attempt,
                };
            }
            Err(error) if attempt >= max_attempts => {
                tracing::error!("Giving up on SMS to {} after {} attempts: {}", to, attempt, error);
                return DeliveryOutcome::Failed {
                    error,
                    attempts: attempt,
                };
            }
            Err(error) => {
                tracing::warn!("Send attempt {} to {} failed: {}", attempt, to, error);
                tokio::time::sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}
