//! Explicit waits against asynchronous browser state.
//!
//! Scenario steps never sleep for a fixed time. Each step names a
//! [`Condition`] and hands it to a [`WaitPoller`], which evaluates it
//! immediately and then once per poll interval until it yields a value or the
//! deadline passes.
//!
//! The clock is injected so that polling can be exercised without a browser:
//! [`SystemClock`] blocks the calling thread, [`ManualClock`] advances virtual
//! time instead of sleeping.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace};

use crate::errors::{ProbeError, ProbeResult};

/// Default timeout for HUD waits (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between evaluations (100ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Source of time for a poll
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock; `sleep` blocks the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for tests. Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    offset: Duration,
    sleeps: usize,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            inner: Arc::new(Mutex::new(ManualState::default())),
        }
    }

    /// Time elapsed on the virtual timeline
    pub fn elapsed(&self) -> Duration {
        self.state().offset
    }

    /// Move time forward without counting a sleep
    pub fn advance(&self, duration: Duration) {
        self.state().offset += duration;
    }

    /// Number of times `sleep` was called
    pub fn sleep_count(&self) -> usize {
        self.state().sleeps
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // Poisoning only happens if a test panicked mid-update; the data is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state().offset
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state();
        state.offset += duration;
        state.sleeps += 1;
    }
}

/// Timeout and poll interval for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    timeout: Duration,
    poll_interval: Duration,
}

impl WaitOptions {
    /// Requires `timeout > 0` and `0 < poll_interval <= timeout`
    pub fn new(timeout: Duration, poll_interval: Duration) -> ProbeResult<Self> {
        if timeout.is_zero() {
            return Err(ProbeError::InvalidOptions(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if poll_interval.is_zero() {
            return Err(ProbeError::InvalidOptions(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if poll_interval > timeout {
            return Err(ProbeError::InvalidOptions(format!(
                "poll interval {:?} exceeds timeout {:?}",
                poll_interval, timeout
            )));
        }
        Ok(Self {
            timeout,
            poll_interval,
        })
    }

    pub fn from_millis(timeout_ms: u64, poll_interval_ms: u64) -> ProbeResult<Self> {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_interval_ms),
        )
    }

    /// Same poll interval with a different timeout, shrinking the interval if needed
    pub fn with_timeout(self, timeout: Duration) -> ProbeResult<Self> {
        Self::new(timeout, self.poll_interval.min(timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A predicate/extractor over observable state.
///
/// `evaluate` yields `Some` once satisfied and `None` while not yet
/// satisfied. It must only read `state`. Transient errors (see
/// [`ProbeError::is_transient`]) count as "not yet" and are kept as the last
/// observation; any other error ends the poll.
pub trait Condition<S: ?Sized> {
    type Output;

    /// Human-readable description used in timeout errors and logs
    fn describe(&self) -> String;

    fn evaluate(&mut self, state: &S) -> ProbeResult<Option<Self::Output>>;

    /// What the last unsatisfied evaluation saw, if the condition tracks it
    fn last_observed(&self) -> Option<String> {
        None
    }

    /// Transform the yielded value
    fn map<F, U>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Output) -> U,
    {
        Map { inner: self, f }
    }

    /// Satisfied when either condition is; `self` is evaluated first
    fn or<C>(self, other: C) -> Or<Self, C>
    where
        Self: Sized,
        C: Condition<S, Output = Self::Output>,
    {
        Or {
            first: self,
            second: other,
        }
    }
}

/// Adapter turning a closure into a [`Condition`]
pub struct FnCondition<S: ?Sized, T, F> {
    description: String,
    f: F,
    _marker: PhantomData<fn(&S) -> T>,
}

/// Build an ad-hoc condition from a description and a closure
pub fn condition<S, T, F>(description: impl Into<String>, f: F) -> FnCondition<S, T, F>
where
    S: ?Sized,
    F: FnMut(&S) -> ProbeResult<Option<T>>,
{
    FnCondition {
        description: description.into(),
        f,
        _marker: PhantomData,
    }
}

impl<S, T, F> Condition<S> for FnCondition<S, T, F>
where
    S: ?Sized,
    F: FnMut(&S) -> ProbeResult<Option<T>>,
{
    type Output = T;

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn evaluate(&mut self, state: &S) -> ProbeResult<Option<T>> {
        (self.f)(state)
    }
}

pub struct Map<C, F> {
    inner: C,
    f: F,
}

impl<S, C, F, U> Condition<S> for Map<C, F>
where
    S: ?Sized,
    C: Condition<S>,
    F: FnMut(C::Output) -> U,
{
    type Output = U;

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn evaluate(&mut self, state: &S) -> ProbeResult<Option<U>> {
        Ok(self.inner.evaluate(state)?.map(&mut self.f))
    }

    fn last_observed(&self) -> Option<String> {
        self.inner.last_observed()
    }
}

pub struct Or<A, B> {
    first: A,
    second: B,
}

impl<S, A, B> Condition<S> for Or<A, B>
where
    S: ?Sized,
    A: Condition<S>,
    B: Condition<S, Output = A::Output>,
{
    type Output = A::Output;

    fn describe(&self) -> String {
        format!("{} or {}", self.first.describe(), self.second.describe())
    }

    fn evaluate(&mut self, state: &S) -> ProbeResult<Option<A::Output>> {
        // An error on one side must not hide a success on the other.
        let first = self.first.evaluate(state);
        if let Ok(Some(value)) = first {
            return Ok(Some(value));
        }
        match self.second.evaluate(state) {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => first,
            Err(e) => first.and(Err(e)),
        }
    }

    fn last_observed(&self) -> Option<String> {
        match (self.first.last_observed(), self.second.last_observed()) {
            (Some(a), Some(b)) => Some(format!("{a}; {b}")),
            (a, b) => a.or(b),
        }
    }
}

/// A satisfied wait
#[derive(Debug, Clone, PartialEq)]
pub struct Polled<T> {
    pub value: T,
    pub elapsed: Duration,
    pub attempts: u32,
}

impl<T> Polled<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// A wait whose condition never held before the deadline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Operation timed out after {elapsed:?} (limit {timeout:?}, {attempts} attempts) waiting for {description}{}",
    last_suffix(.last_observation)
)]
pub struct WaitTimeoutError {
    pub description: String,
    pub timeout: Duration,
    pub elapsed: Duration,
    pub attempts: u32,
    pub last_observation: Option<String>,
}

fn last_suffix(last: &Option<String>) -> String {
    match last {
        Some(seen) => format!("; last observed: {seen}"),
        None => String::new(),
    }
}

/// A satisfied wait, or the timeout or non-transient error that ended it
pub type PollResult<T> = ProbeResult<Polled<T>>;

/// Repeatedly evaluates a condition until it holds or its deadline passes
#[derive(Debug, Clone, Default)]
pub struct WaitPoller<C = SystemClock> {
    clock: C,
}

impl WaitPoller<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> WaitPoller<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Evaluate `condition` against `state` until it yields or times out.
    ///
    /// The first evaluation happens immediately. The deadline is fixed before
    /// it, and the last sleep is clamped so no evaluation starts after the
    /// deadline. A non-transient error from an evaluation is returned as is.
    pub fn until<S, K>(
        &self,
        state: &S,
        mut condition: K,
        options: &WaitOptions,
    ) -> PollResult<K::Output>
    where
        S: ?Sized,
        K: Condition<S>,
    {
        let start = self.clock.now();
        let deadline = start + options.timeout();
        let mut attempts = 0u32;
        let mut last_observation = None;

        loop {
            attempts += 1;
            match condition.evaluate(state) {
                Ok(Some(value)) => {
                    let elapsed = self.clock.now().saturating_duration_since(start);
                    debug!(
                        "Condition met after {:?} ({} attempts): {}",
                        elapsed,
                        attempts,
                        condition.describe()
                    );
                    return Ok(Polled {
                        value,
                        elapsed,
                        attempts,
                    });
                }
                Ok(None) => last_observation = condition.last_observed(),
                Err(e) if e.is_transient() => {
                    trace!("Attempt {} failed transiently: {}", attempts, e);
                    last_observation = Some(e.to_string());
                }
                Err(e) => {
                    debug!(
                        "Giving up on {} after {} attempts: {}",
                        condition.describe(),
                        attempts,
                        e
                    );
                    return Err(e);
                }
            }

            let now = self.clock.now();
            if now >= deadline {
                let err = WaitTimeoutError {
                    description: condition.describe(),
                    timeout: options.timeout(),
                    elapsed: now.saturating_duration_since(start),
                    attempts,
                    last_observation,
                };
                debug!("{}", err);
                return Err(err.into());
            }

            self.clock.sleep(options.poll_interval().min(deadline - now));
        }
    }

    /// `until` with the timeout and interval given inline
    pub fn wait_until<S, K>(
        &self,
        state: &S,
        condition: K,
        timeout: Duration,
        poll_interval: Duration,
    ) -> ProbeResult<Polled<K::Output>>
    where
        S: ?Sized,
        K: Condition<S>,
    {
        let options = WaitOptions::new(timeout, poll_interval)?;
        self.until(state, condition, &options)
    }
}

#[cfg(test)]
#[path = "wait_test.rs"]
mod wait_test;
