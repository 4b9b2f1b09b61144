use crate::runtime::Runtime;
use futures_util::future;
use std::time::Duration;

/// One-shot flush timer owned by the batch worker.
///
/// The timer is started by the first record entering an idle buffer and fires
/// once `scheduled_delay` later. Records added while it is running do not
/// restart it, so bursts collapse into one flush cycle.
pub(crate) struct FlushScheduler<R: Runtime> {
    runtime: R,
    scheduled_delay: Duration,
    timer: Option<R::Delay>,
}

impl<R: Runtime> FlushScheduler<R> {
    pub(crate) fn new(runtime: R, scheduled_delay: Duration) -> Self {
        FlushScheduler {
            runtime,
            scheduled_delay,
            timer: None,
        }
    }

    /// Start the timer unless it is already running.
    pub(crate) fn notify_record_added(&mut self) {
        if self.timer.is_none() {
            self.timer = Some(self.runtime.delay(self.scheduled_delay));
        }
    }

    /// Stop a pending timer without firing it.
    pub(crate) fn cancel(&mut self) {
        self.timer = None;
    }

    pub(crate) fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Resolves when the running timer expires, clearing it. Never resolves
    /// while no timer is running.
    ///
    /// Dropping the returned future before it resolves leaves the timer
    /// untouched, so it can be raced against incoming messages.
    pub(crate) async fn fired(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.await;
                self.timer = None;
            }
            None => future::pending::<()>().await,
        }
    }
}

#[cfg(all(test, feature = "rt-tokio"))]
mod tests {
    use super::FlushScheduler;
    use crate::runtime;
    use futures_util::FutureExt;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn timer_fires_once_after_delay() {
        let mut scheduler = FlushScheduler::new(runtime::Tokio, Duration::from_millis(100));
        assert!(!scheduler.is_running());

        scheduler.notify_record_added();
        assert!(scheduler.is_running());
        assert!(scheduler.fired().now_or_never().is_none());

        let started = tokio::time::Instant::now();
        scheduler.fired().await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(110));
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn additions_do_not_restart_running_timer() {
        let mut scheduler = FlushScheduler::new(runtime::Tokio, Duration::from_millis(100));
        let started = tokio::time::Instant::now();
        scheduler.notify_record_added();

        tokio::time::sleep(Duration::from_millis(60)).await;
        scheduler.notify_record_added();

        scheduler.fired().await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(160));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut scheduler = FlushScheduler::new(runtime::Tokio, Duration::from_millis(10));
        scheduler.notify_record_added();
        scheduler.cancel();
        assert!(!scheduler.is_running());

        let fired = tokio::time::timeout(Duration::from_secs(1), scheduler.fired()).await;
        assert!(fired.is_err());
    }
}
