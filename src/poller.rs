use async_trait::async_trait;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::lightx::VendorApi;
use crate::models::JobState;
use crate::pipeline::ProgressSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, interval: Duration::from_secs(3) }
    }
}

/// Where the poller waits between status checks.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub state: JobState,
    pub attempts: u32,
}

pub struct StatusPoller {
    vendor: Arc<dyn VendorApi>,
    sleeper: Arc<dyn Sleeper>,
    policy: PollPolicy,
}

impl StatusPoller {
    pub fn new(vendor: Arc<dyn VendorApi>, sleeper: Arc<dyn Sleeper>, policy: PollPolicy) -> Self {
        Self { vendor, sleeper, policy }
    }

    /// Waits, then asks for the order status, up to `max_attempts` times.
    /// A failed status query still uses up its attempt.
    pub async fn poll(&self, api_key: &SecretString, order_id: &str, progress: &dyn ProgressSink) -> PollOutcome {
        let mut state = JobState::Pending;
        let mut attempts = 0;

        while attempts < self.policy.max_attempts && !state.is_terminal() {
            attempts += 1;
            self.sleeper.sleep(self.policy.interval).await;

            let reply = match self.vendor.order_status(api_key, order_id).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("⚠️ Status check for {} failed on attempt {}: {}", order_id, attempts, e);
                    progress.warning(format!("Status check failed on attempt {attempts}."));
                    continue;
                }
            };

            info!("🔄 Order {} attempt {}: status = {}", order_id, attempts, reply.status);
            progress.info(format!("Attempt {attempts}: status = {}", reply.status));
            state = match reply.status.as_str() {
                "active" => JobState::Active { output: reply.output },
                "failed" => JobState::Failed,
                _ => JobState::Pending,
            };
        }

        if state == JobState::Pending {
            warn!("⏱️ Order {} still pending after {} attempts", order_id, attempts);
            state = JobState::TimedOut;
        }
        PollOutcome { state, attempts }
    }
}
