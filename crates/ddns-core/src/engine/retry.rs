//! Per-target publish task
//!
//! One task runs per (tick, target) pair. It calls the driver until the
//! driver succeeds, sleeping a fixed delay between attempts. The default
//! policy has no attempt limit.

use super::{EngineEvent, TargetBinding, emit_event};
use crate::traits::UpdateResult;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Fixed-delay retry policy for publish tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sleep between a failed attempt and the next one
    pub delay: Duration,

    /// Stop after this many attempts; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever with a fixed delay
    pub fn forever(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` attempts
    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::forever(Duration::from_secs(60))
    }
}

/// How a publish task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { attempts: u32, result: UpdateResult },
    GaveUp { attempts: u32 },
}

/// Drive one target to convergence for `value`
pub(crate) async fn publish_until_done(
    binding: TargetBinding,
    value: IpAddr,
    policy: RetryPolicy,
    events: mpsc::Sender<EngineEvent>,
) -> PublishOutcome {
    let label = binding.target.label();
    let class = binding.target.class();
    let provider = binding.provider.provider_name();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        match binding.provider.reconcile(value).await {
            Ok(result) => {
                info!(target_label = %label, provider, %class, %value, attempt, ?result, "Published");
                emit_event(
                    &events,
                    EngineEvent::Published {
                        target: label,
                        attempts: attempt,
                        result: result.clone(),
                    },
                );
                return PublishOutcome::Published {
                    attempts: attempt,
                    result,
                };
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(target_label = %label, provider, %class, %value, attempt, error = %e, "Publish attempt failed");
                } else {
                    error!(target_label = %label, provider, %class, %value, attempt, error = %e, "Publish attempt failed; check target configuration");
                }

                emit_event(
                    &events,
                    EngineEvent::AttemptFailed {
                        target: label.clone(),
                        attempt,
                        error: e.to_string(),
                    },
                );

                if policy.exhausted(attempt) {
                    error!(target_label = %label, provider, attempts = attempt, "Giving up on target");
                    emit_event(
                        &events,
                        EngineEvent::GaveUp {
                            target: label,
                            attempts: attempt,
                            error: e.to_string(),
                        },
                    );
                    return PublishOutcome::GaveUp { attempts: attempt };
                }

                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
