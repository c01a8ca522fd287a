use std::time::Duration;
use tracing::info;

/// Fixed-window throttle for the content fetch stage: after every full
/// batch of fetches, pause for the cooldown window before continuing.
///
/// Capacity is the batch size, the refill is the cooldown; the due/not-due
/// decision is pure so it can be tested without clocks or network.
#[derive(Debug, Clone)]
pub struct BatchThrottle {
    batch_size: usize,
    cooldown: Duration,
}

impl BatchThrottle {
    pub const DEFAULT_BATCH_SIZE: usize = 20;
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

    pub fn new(batch_size: usize, cooldown: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            cooldown,
        }
    }

    /// Whether a cooldown is due after `fetched` completed fetches out of
    /// `total` planned ones. Due exactly at batch boundaries, and never
    /// after the last item.
    pub fn cooldown_due(&self, fetched: usize, total: usize) -> bool {
        fetched > 0 && fetched < total && fetched % self.batch_size == 0
    }

    pub async fn pause(&self) {
        info!(
            "Batch limit reached, cooling down for {}s",
            self.cooldown.as_secs()
        );
        tokio::time::sleep(self.cooldown).await;
    }
}

impl Default for BatchThrottle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BATCH_SIZE, Self::DEFAULT_COOLDOWN)
    }
}
