// libs/notification-cell/src/services/dispatcher.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::{ChannelResult, NotificationEvent, NotificationKind};

/// A pluggable notification sink. Channels are registered by value and invoked
/// for every dispatched event; they report their outcome instead of erroring
/// into the caller.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, event: &NotificationEvent) -> ChannelResult;
}

/// One channel's outcome within a dispatch.
#[derive(Debug, Clone)]
pub struct ChannelOutcome {
    pub channel: String,
    pub result: ChannelResult,
}

/// What happened to a single event across all registered channels.
/// Observed for diagnostics; a failed channel never fails the booking.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub kind: Option<NotificationKind>,
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.ok)
    }

    pub fn failed_channels(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.result.ok)
            .map(|o| o.channel.as_str())
            .collect()
    }
}

/// Open registry of channels, iterated in registration order. An explicit
/// instance injected into the booking facade, not a process-wide singleton.
pub struct NotificationDispatcher {
    channels: RwLock<Vec<Arc<dyn NotificationChannel>>>,
    channel_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(channel_timeout_ms: u64) -> Self {
        Self {
            channels: RwLock::new(Vec::new()),
            channel_timeout: Duration::from_millis(channel_timeout_ms),
        }
    }

    pub async fn register(&self, channel: Arc<dyn NotificationChannel>) {
        let mut channels = self.channels.write().await;
        debug!("Registering notification channel: {}", channel.name());
        channels.push(channel);
    }

    /// Remove a channel by name. Unknown names are ignored.
    pub async fn unregister(&self, name: &str) {
        let mut channels = self.channels.write().await;
        channels.retain(|c| c.name() != name);
    }

    pub async fn channel_names(&self) -> Vec<String> {
        let channels = self.channels.read().await;
        channels.iter().map(|c| c.name().to_string()).collect()
    }

    /// Fan one event out to every registered channel. Each call is bounded by
    /// the channel timeout; failures and timeouts are recorded and logged but
    /// never propagated. Callers must only dispatch after the appointment
    /// state is committed.
    pub async fn dispatch(&self, event: &NotificationEvent) -> DispatchReport {
        let channels: Vec<Arc<dyn NotificationChannel>> = {
            let guard = self.channels.read().await;
            guard.clone()
        };

        debug!(
            "Dispatching {} event for appointment {} to {} channels",
            event.kind,
            event.appointment.appointment_id,
            channels.len()
        );

        let mut report = DispatchReport {
            kind: Some(event.kind),
            outcomes: Vec::with_capacity(channels.len()),
        };

        for channel in channels {
            let result = match tokio::time::timeout(self.channel_timeout, channel.handle(event)).await {
                Ok(result) => result,
                Err(_) => ChannelResult::failure(format!(
                    "channel timed out after {:?}",
                    self.channel_timeout
                )),
            };

            if !result.ok {
                warn!(
                    "Notification channel {} failed for {} event on appointment {}: {}",
                    channel.name(),
                    event.kind,
                    event.appointment.appointment_id,
                    result.detail
                );
            }

            report.outcomes.push(ChannelOutcome {
                channel: channel.name().to_string(),
                result,
            });
        }

        info!(
            "Dispatched {} event for appointment {}: {}/{} channels ok",
            event.kind,
            event.appointment.appointment_id,
            report.outcomes.iter().filter(|o| o.result.ok).count(),
            report.outcomes.len()
        );

        report
    }
}
