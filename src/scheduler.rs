use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::AbortHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

/// Work run on every tick of a repeating timer.
pub type Tick = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Host timer capability.
pub trait Scheduler: Send + Sync {
    /// Run `tick` every `period`, first after one full period.
    fn schedule_repeating(&self, period: Duration, tick: Tick) -> PollTimer;
}

/// Handle to a repeating task. Cancelling is idempotent.
#[derive(Debug)]
pub struct PollTimer {
    handle: Option<AbortHandle>,
}

impl PollTimer {
    pub fn new(handle: AbortHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Timers on the tokio runtime. Each tick runs as its own task, so a slow
/// tick never holds up the next one and ticks may overlap.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration, tick: Tick) -> PollTimer {
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                debug!("Poll timer tick");
                tokio::spawn(tick());
            }
        });
        PollTimer::new(task.abort_handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tick(count: Arc<AtomicUsize>) -> Tick {
        Arc::new(move || {
            let count = count.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_every_period_after_the_first() {
        let count = Arc::new(AtomicUsize::new(0));
        let _timer =
            TokioScheduler.schedule_repeating(Duration::from_secs(60), counting_tick(count.clone()));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks_and_is_idempotent() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut timer =
            TokioScheduler.schedule_repeating(Duration::from_secs(60), counting_tick(count.clone()));
        assert!(timer.is_active());

        timer.cancel();
        timer.cancel();
        assert!(!timer.is_active());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_tick_does_not_block_the_timer() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let tick: Tick = Arc::new(move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<()>().await;
            }
            .boxed()
        });
        let _timer = TokioScheduler.schedule_repeating(Duration::from_secs(60), tick);

        tokio::time::sleep(Duration::from_secs(181)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
