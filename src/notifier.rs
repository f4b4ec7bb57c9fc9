//! Overtime reminder: poll the attendance server once the day's threshold has
//! passed and show one notification until the user checks out.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::models::{OvertimeNotification, Permission, PollOutcome, ThresholdConfig};
use crate::notification::NotificationHost;
use crate::scheduler::{PollTimer, Scheduler, Tick};
use crate::status::StatusSource;

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct OvertimeNotifier {
    inner: Arc<Inner>,
}

struct Inner {
    threshold: ThresholdConfig,
    poll_period: Duration,
    notification: OvertimeNotification,
    clock: Arc<dyn Clock>,
    source: Arc<dyn StatusSource>,
    host: Arc<dyn NotificationHost>,
    scheduler: Arc<dyn Scheduler>,
    shown: AtomicBool,
    timer: Mutex<TimerSlot>,
    claims: AtomicU64,
}

/// Lifecycle of the poll timer. `Starting` is held while `initialize` runs its
/// first poll; `teardown` may revoke it before the timer is armed.
enum TimerSlot {
    Idle,
    Starting(u64),
    Armed(PollTimer),
}

pub struct NotifierBuilder {
    threshold: ThresholdConfig,
    poll_period: Duration,
    notification: OvertimeNotification,
    clock: Arc<dyn Clock>,
    source: Arc<dyn StatusSource>,
    host: Arc<dyn NotificationHost>,
    scheduler: Arc<dyn Scheduler>,
}

impl NotifierBuilder {
    pub fn threshold(mut self, threshold: ThresholdConfig) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn build(self) -> OvertimeNotifier {
        OvertimeNotifier {
            inner: Arc::new(Inner {
                threshold: self.threshold,
                poll_period: self.poll_period,
                notification: self.notification,
                clock: self.clock,
                source: self.source,
                host: self.host,
                scheduler: self.scheduler,
                shown: AtomicBool::new(false),
                timer: Mutex::new(TimerSlot::Idle),
                claims: AtomicU64::new(0),
            }),
        }
    }
}

impl OvertimeNotifier {
    /// Start from the stock threshold (18:30), a 60 s period, the system clock
    /// and tokio timers.
    pub fn builder(
        source: Arc<dyn StatusSource>,
        host: Arc<dyn NotificationHost>,
        notification: OvertimeNotification,
    ) -> NotifierBuilder {
        NotifierBuilder {
            threshold: ThresholdConfig::default(),
            poll_period: Duration::from_secs(60),
            notification,
            clock: Arc::new(crate::clock::SystemClock),
            source,
            host,
            scheduler: Arc::new(crate::scheduler::TokioScheduler),
        }
    }

    pub fn threshold(&self) -> ThresholdConfig {
        self.inner.threshold
    }

    /// Request permission, poll once if already past the threshold, then arm
    /// the poll timer. Does nothing while another `initialize` is running or
    /// the timer is armed. A `teardown` during the first poll leaves it unarmed.
    pub async fn initialize(&self) {
        let Some(claim) = self.claim_timer() else {
            debug!("Overtime notifier already initialized");
            return;
        };

        self.request_permission();

        if self.is_past_threshold_now() {
            self.check_overtime_status().await;
        }

        let Ok(mut slot) = self.inner.timer.lock() else {
            return;
        };
        if !matches!(*slot, TimerSlot::Starting(c) if c == claim) {
            debug!("Initialization cancelled by teardown");
            return;
        }
        let timer = self
            .inner
            .scheduler
            .schedule_repeating(self.inner.poll_period, self.tick());
        *slot = TimerSlot::Armed(timer);
        drop(slot);

        info!(
            threshold = %self.inner.threshold,
            period_ms = self.inner.poll_period.as_millis() as u64,
            "Attendance notification system initialized"
        );
    }

    fn claim_timer(&self) -> Option<u64> {
        let mut slot = self.inner.timer.lock().ok()?;
        match &*slot {
            TimerSlot::Starting(_) => return None,
            TimerSlot::Armed(timer) if timer.is_active() => return None,
            _ => {}
        }
        let claim = self.inner.claims.fetch_add(1, Ordering::SeqCst) + 1;
        *slot = TimerSlot::Starting(claim);
        Some(claim)
    }

    fn tick(&self) -> Tick {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let notifier = OvertimeNotifier { inner };
                if notifier.is_past_threshold_now() {
                    notifier.check_overtime_status().await;
                }
            }
            .boxed()
        })
    }

    /// Ask the host for permission if it has not been decided yet.
    pub fn request_permission(&self) -> Permission {
        let before = self.inner.host.permission();
        if before.is_decided() {
            return before;
        }
        let permission = self.inner.host.request_permission();
        info!(%permission, "Notification permission");
        permission
    }

    pub fn is_past_threshold(&self, now: chrono::NaiveTime) -> bool {
        self.inner.threshold.is_past(now)
    }

    fn is_past_threshold_now(&self) -> bool {
        self.is_past_threshold(self.inner.clock.now())
    }

    /// One poll. Failures are logged and leave the flag untouched.
    ///
    /// Presenting is decided on the flag as it was on entry; the reset
    /// condition is applied afterwards, so a response that both notifies and
    /// reports a checkout ends with the flag cleared.
    pub async fn check_overtime_status(&self) -> PollOutcome {
        let snapshot = match self.inner.source.fetch_status().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Error checking overtime status: {e}");
                return PollOutcome::failed();
            }
        };

        let mut outcome = PollOutcome {
            snapshot: Some(snapshot),
            ..Default::default()
        };

        if snapshot.should_notify && !self.inner.shown.load(Ordering::SeqCst) {
            outcome.presented = self.show_overtime_notification();
            if outcome.presented {
                self.inner.shown.store(true, Ordering::SeqCst);
            }
        }

        if snapshot.is_reset_condition() {
            self.inner.shown.store(false, Ordering::SeqCst);
            outcome.reset = true;
        }

        debug!(summary = %outcome.format_summary(), "Overtime status checked");
        outcome
    }

    fn show_overtime_notification(&self) -> bool {
        if self.inner.host.permission() != Permission::Granted {
            debug!("Notification permission not granted; skipping");
            return false;
        }
        match self.inner.host.present(&self.inner.notification) {
            Ok(()) => true,
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    }

    /// Clear the shown flag so the next eligible poll notifies again.
    pub fn reset_notification_flag(&self) {
        self.inner.shown.store(false, Ordering::SeqCst);
    }

    pub fn is_shown(&self) -> bool {
        self.inner.shown.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .timer
            .lock()
            .map(|slot| matches!(&*slot, TimerSlot::Armed(timer) if timer.is_active()))
            .unwrap_or(false)
    }

    /// Stop the poll timer. Safe to call repeatedly or before `initialize`.
    /// Requests already in flight still complete.
    pub fn teardown(&self) {
        let previous = self
            .inner
            .timer
            .lock()
            .ok()
            .map(|mut slot| std::mem::replace(&mut *slot, TimerSlot::Idle));
        match previous {
            Some(TimerSlot::Armed(mut timer)) => {
                timer.cancel();
                info!("Attendance notification system stopped");
            }
            Some(TimerSlot::Starting(_)) => {
                info!("Attendance notification system stopped before the timer was armed");
            }
            _ => {}
        }
    }
}
