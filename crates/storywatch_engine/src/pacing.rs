use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use rand::Rng;
use storywatch_logging::{watch_debug, watch_warn};

/// Time source for pacing. Production sleeps for real; tests advance a virtual clock.
#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait::async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock: `sleep` returns immediately, advances `now` and records the duration.
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ManualState {
                now: Instant::now(),
                sleeps: Vec::new(),
            }),
        }
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.lock().sleeps.iter().sum()
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        self.lock().now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // A poisoned clock only means another test thread panicked.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }
}

/// At most `max_calls` calls per `per` on average, with bursts of up to `max_calls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub max_calls: u32,
    pub per: Duration,
}

impl RateWindow {
    pub fn per_minute(max_calls: u32) -> Self {
        Self {
            max_calls,
            per: Duration::from_secs(60),
        }
    }

    fn quota(&self) -> Option<Quota> {
        let burst = NonZeroU32::new(self.max_calls)?;
        Quota::with_period(self.per / burst.get()).map(|quota| quota.allow_burst(burst))
    }
}

/// Lets `governor` read time from a pacing [`Clock`].
#[derive(Clone)]
struct LimiterClock(Arc<dyn Clock>);

impl governor::clock::Clock for LimiterClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        self.0.now()
    }
}

type WindowLimiter =
    RateLimiter<NotKeyed, InMemoryState, LimiterClock, governor::middleware::NoOpMiddleware<Instant>>;

/// How a [`Pacer`] spaces out calls to a remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacingPolicy {
    /// Pause applied after every call.
    pub fixed_delay: Duration,
    /// Extra random pause drawn from `[min, max]` after every call.
    pub jitter: Option<(Duration, Duration)>,
    /// Hard cap on call rate, enforced before each call.
    pub window: Option<RateWindow>,
}

impl PacingPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            fixed_delay: delay,
            ..Self::default()
        }
    }

    pub fn jittered(min: Duration, max: Duration) -> Self {
        Self {
            jitter: Some((min, max)),
            ..Self::default()
        }
    }

    pub fn with_window(mut self, window: RateWindow) -> Self {
        self.window = Some(window);
        self
    }
}

type JitterFn = Arc<dyn Fn(Duration, Duration) -> Duration + Send + Sync>;

/// Applies a [`PacingPolicy`] against a [`Clock`].
///
/// Call [`Pacer::acquire`] before a remote call and [`Pacer::pause`] after it.
pub struct Pacer {
    label: &'static str,
    policy: PacingPolicy,
    clock: Arc<dyn Clock>,
    jitter: JitterFn,
    limiter: Option<WindowLimiter>,
}

impl Pacer {
    pub fn new(label: &'static str, policy: PacingPolicy, clock: Arc<dyn Clock>) -> Self {
        let limiter = policy.window.and_then(|window| match window.quota() {
            Some(quota) => Some(RateLimiter::direct_with_clock(
                quota,
                LimiterClock(clock.clone()),
            )),
            None => {
                watch_warn!("{}: ignoring unusable rate window {:?}", label, window);
                None
            }
        });
        Self {
            label,
            policy,
            clock,
            jitter: Arc::new(random_between),
            limiter,
        }
    }

    /// Replace the random jitter source, e.g. with a deterministic one in tests.
    pub fn with_jitter_source(
        mut self,
        source: impl Fn(Duration, Duration) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.jitter = Arc::new(source);
        self
    }

    /// Wait until the rate window has room, then count one call.
    pub async fn acquire(&mut self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        while let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            watch_debug!("{}: rate window full, waiting {:?}", self.label, wait);
            self.clock.sleep(wait).await;
        }
    }

    /// Politeness pause after a call: fixed delay plus any jitter.
    pub async fn pause(&mut self) {
        let extra = self
            .policy
            .jitter
            .map(|(min, max)| (self.jitter)(min, max))
            .unwrap_or_default();
        let total = self.policy.fixed_delay + extra;
        if total.is_zero() {
            return;
        }
        watch_debug!("{}: pausing {:?}", self.label, total);
        self.clock.sleep(total).await;
    }
}

fn random_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    rand::rng().random_range(min..=max)
}
