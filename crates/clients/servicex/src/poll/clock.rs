//! Time sources for the poller.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use tokio::sync::watch;

/// Source of the current time and of delays between status checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Runs `future` until it completes or `duration` passes on this clock.
    ///
    /// Resolves to `None` when the time runs out first.
    fn timeout<F>(
        &self,
        duration: Duration,
        future: F,
    ) -> impl Future<Output = Option<F::Output>> + Send
    where
        F: Future + Send,
        F::Output: Send;
}

/// Wall-clock time on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn timeout<F>(
        &self,
        duration: Duration,
        future: F,
    ) -> impl Future<Output = Option<F::Output>> + Send
    where
        F: Future + Send,
        F::Output: Send,
    {
        async move { tokio::time::timeout(duration, future).await.ok() }
    }
}

/// A clock that only moves when slept on or advanced.
///
/// Sleeping returns immediately after moving the clock forward, so sleeps of any length
/// elapse instantly. A [`Clock::timeout`] expires once the clock has been slept on or
/// advanced past its deadline. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: Instant,
    elapsed: Arc<watch::Sender<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        let (elapsed, _) = watch::channel(Duration::ZERO);
        Self {
            start: Instant::now(),
            elapsed: Arc::new(elapsed),
            sleeps: Default::default(),
        }
    }

    /// Moves the clock forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        self.elapsed.send_modify(|elapsed| *elapsed += duration);
    }

    /// Total time the clock has moved since it was created.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.borrow()
    }

    /// Every duration slept so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock_sleeps().clone()
    }

    fn lock_sleeps(&self) -> std::sync::MutexGuard<'_, Vec<Duration>> {
        self.sleeps.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.lock_sleeps().push(duration);
        self.advance(duration);
        std::future::ready(())
    }

    fn timeout<F>(
        &self,
        duration: Duration,
        future: F,
    ) -> impl Future<Output = Option<F::Output>> + Send
    where
        F: Future + Send,
        F::Output: Send,
    {
        let deadline = self.elapsed().saturating_add(duration);
        let mut elapsed = self.elapsed.subscribe();
        async move {
            let expired = async {
                while *elapsed.borrow_and_update() < deadline {
                    if elapsed.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
            };
            tokio::select! {
                biased;
                output = future => Some(output),
                () = expired => None,
            }
        }
    }
}
