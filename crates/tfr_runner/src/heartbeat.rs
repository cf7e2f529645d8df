//! Progress heartbeat for long-running steps.
//!
//! Pipelines that kill jobs after a period without output would otherwise
//! terminate a slow `terraform apply`. A [`Heartbeat`] logs a line at a fixed
//! interval until it is stopped or dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Callback invoked on every tick with the elapsed time.
pub type TickHandler = Arc<dyn Fn(Duration) + Send + Sync>;

/// Timer task bound to the lifetime of a single step.
///
/// Dropping the guard cancels the timer, so every exit path of the
/// monitored step (including `?` and panics) stops the heartbeat.
#[derive(Debug)]
pub struct Heartbeat {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Start a heartbeat that logs `label` every `interval`.
    pub fn start(label: impl Into<String>, interval: Duration) -> Self {
        let label = label.into();
        Self::start_with(
            interval,
            Arc::new(move |elapsed: Duration| {
                info!("{} still running ({}s elapsed)", label, elapsed.as_secs());
            }),
        )
    }

    /// Start a heartbeat with a custom tick handler.
    pub fn start_with(interval: Duration, on_tick: TickHandler) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let started = Instant::now();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(started + interval, interval);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => on_tick(started.elapsed()),
                }
            }
        });

        Self { token, handle }
    }

    /// Stop the heartbeat explicitly.
    pub fn stop(self) {
        drop(self);
    }

    /// Whether the timer task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.token.cancel();
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, TickHandler) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let handler_ticks = Arc::clone(&ticks);
        let handler: TickHandler = Arc::new(move |_| {
            handler_ticks.fetch_add(1, Ordering::SeqCst);
        });
        (ticks, handler)
    }

    #[tokio::test]
    async fn test_heartbeat_ticks_while_running() {
        let (ticks, handler) = counter();
        let heartbeat = Heartbeat::start_with(Duration::from_millis(20), handler);

        tokio::time::sleep(Duration::from_millis(130)).await;
        heartbeat.stop();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_heartbeat_stops_on_drop() {
        let (ticks, handler) = counter();
        {
            let _heartbeat = Heartbeat::start_with(Duration::from_millis(20), handler);
            tokio::time::sleep(Duration::from_millis(70)).await;
        }

        let after_drop = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn test_no_tick_before_first_interval() {
        let (ticks, handler) = counter();
        let heartbeat = Heartbeat::start_with(Duration::from_secs(60), handler);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!heartbeat.is_cancelled());
        heartbeat.stop();

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
