//! Retry session engine
//!
//! A [`RetrySession`] binds an operation to its arguments and a
//! [`BackoffConfig`], and runs it until it succeeds or the attempt budget
//! passed to [`RetrySession::execute`] runs out.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{BackoffConfig, RetryPolicy};

use super::error::RetryError;
use super::events::{EventKind, Listeners, RetryEvent};
use super::observer::RetryObserver;

/// Run `operation` with `args` until it succeeds, at most `max_attempts` times
///
/// Shorthand for a [`RetrySession`] without subscribers. `backoff` of `None`
/// means no delay between attempts.
///
/// # Example
///
/// ```rust
/// use reprise::retry::retry;
///
/// # async fn example() {
/// let doubled = retry(3, |n: u32| async move { Ok::<_, String>(n * 2) }, 21, None).await;
/// assert_eq!(doubled, Ok(42));
/// # }
/// ```
pub async fn retry<Op, A, Fut, T, E>(
    max_attempts: u32,
    operation: Op,
    args: A,
    backoff: Option<BackoffConfig>,
) -> Result<T, RetryError<E>>
where
    Op: Fn(A) -> Fut,
    A: Clone,
    Fut: Future<Output = Result<T, E>>,
    E: 'static,
{
    RetrySession::with_backoff(operation, args, backoff.unwrap_or_default())
        .execute(max_attempts)
        .await
}

/// Run `operation` with `args` using the attempt budget and backoff of `policy`
///
/// # Example
///
/// ```rust,no_run
/// use reprise::retry::retry_with_policy;
/// use reprise::types::RetryPolicy;
///
/// async fn example() {
///     let policy = RetryPolicy::default();
///
///     let result = retry_with_policy(&policy, |url: &'static str| async move {
///         // Simulated operation that might fail
///         Ok::<_, std::io::Error>(url.len())
///     }, "https://example.com").await;
/// }
/// ```
pub async fn retry_with_policy<Op, A, Fut, T, E>(
    policy: &RetryPolicy,
    operation: Op,
    args: A,
) -> Result<T, RetryError<E>>
where
    Op: Fn(A) -> Fut,
    A: Clone,
    Fut: Future<Output = Result<T, E>>,
    E: 'static,
{
    RetrySession::with_backoff(operation, args, policy.backoff.clone())
        .execute(policy.max_attempts)
        .await
}

/// A retryable operation bound to its arguments and backoff
///
/// Every attempt calls the operation with a fresh clone of the bound
/// arguments. Subscribers registered with [`on`](Self::on) and
/// [`once`](Self::once) live as long as the session, across `execute` calls.
///
/// # Example
///
/// ```rust
/// use reprise::retry::RetrySession;
/// use reprise::types::BackoffConfig;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() {
/// let calls = Arc::new(AtomicU32::new(0));
/// let counter = Arc::clone(&calls);
///
/// let mut session = RetrySession::with_backoff(
///     move |limit: u32| {
///         let counter = Arc::clone(&counter);
///         async move {
///             if counter.fetch_add(1, Ordering::SeqCst) + 1 < limit {
///                 Err("not yet")
///             } else {
///                 Ok("OK")
///             }
///         }
///     },
///     3,
///     BackoffConfig::exponential(Duration::from_millis(10), 2.0),
/// );
///
/// session.on_failure(|error, countdown, _| eprintln!("{error} ({countdown} left)"));
///
/// assert_eq!(session.execute(5).await, Ok("OK"));
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # }
/// ```
pub struct RetrySession<Op, A, E> {
    operation: Op,
    args: A,
    backoff: BackoffConfig,
    current_interval: Duration,
    listeners: Listeners<E>,
}

impl<Op, A, Fut, T, E> RetrySession<Op, A, E>
where
    Op: Fn(A) -> Fut,
    A: Clone,
    Fut: Future<Output = Result<T, E>>,
    E: 'static,
{
    /// Create a session with the default backoff (no delay)
    pub fn new(operation: Op, args: A) -> Self {
        Self::with_backoff(operation, args, BackoffConfig::default())
    }

    /// Create a session with the given backoff
    pub fn with_backoff(operation: Op, args: A, backoff: BackoffConfig) -> Self {
        let current_interval = backoff.interval;
        Self {
            operation,
            args,
            backoff,
            current_interval,
            listeners: Listeners::default(),
        }
    }

    /// Attempt the operation up to `max_attempts` times in total
    ///
    /// Returns the first successful result. When every attempt fails, the
    /// final attempt's error comes back as [`RetryError::Operation`]. A budget
    /// of zero is rejected with [`RetryError::InvalidArgument`] without
    /// calling the operation.
    ///
    /// For each failure the `failure` event fires first; unless the failure
    /// was the last allowed attempt, `retry` fires next, then the session
    /// waits the current interval (if non-zero) and grows it when backoff is
    /// exponential.
    pub async fn execute(&mut self, max_attempts: u32) -> Result<T, RetryError<E>> {
        if max_attempts < 1 {
            return Err(RetryError::invalid_argument(max_attempts));
        }

        let mut countdown = max_attempts;
        loop {
            let attempt = max_attempts - countdown + 1;
            let interval = self.current_interval;

            match (self.operation)(self.args.clone()).await {
                Ok(value) => {
                    tracing::debug!(attempt, max_attempts, "attempt succeeded");
                    return Ok(value);
                }
                Err(error) => {
                    self.listeners.emit(&RetryEvent::Failure {
                        error: &error,
                        countdown,
                        interval,
                    });

                    if countdown <= 1 {
                        tracing::debug!(attempt, max_attempts, "attempts exhausted");
                        return Err(RetryError::Operation(error));
                    }
                }
            }

            self.listeners
                .emit(&RetryEvent::Retry { countdown, interval });

            tracing::debug!(
                attempt,
                max_attempts,
                delay_ms = interval.as_millis() as u64,
                "attempt failed, retrying"
            );

            if !interval.is_zero() {
                tokio::time::sleep(interval).await;
                self.current_interval = self.backoff.next_interval(interval);
            }

            countdown -= 1;
        }
    }

    /// Run `handler` every time `kind` fires
    pub fn on<H>(&mut self, kind: EventKind, handler: H) -> &mut Self
    where
        H: FnMut(&RetryEvent<'_, E>) + Send + 'static,
    {
        self.listeners.add(kind, Box::new(handler), false);
        self
    }

    /// Run `handler` the first time `kind` fires, then forget it
    pub fn once<H>(&mut self, kind: EventKind, handler: H) -> &mut Self
    where
        H: FnMut(&RetryEvent<'_, E>) + Send + 'static,
    {
        self.listeners.add(kind, Box::new(handler), true);
        self
    }

    /// Subscribe to every failure with `(error, countdown, interval)`
    pub fn on_failure<H>(&mut self, handler: H) -> &mut Self
    where
        H: FnMut(&E, u32, Duration) + Send + 'static,
    {
        self.on(EventKind::Failure, failure_handler(handler))
    }

    /// Subscribe to the next failure only
    pub fn once_failure<H>(&mut self, handler: H) -> &mut Self
    where
        H: FnMut(&E, u32, Duration) + Send + 'static,
    {
        self.once(EventKind::Failure, failure_handler(handler))
    }

    /// Subscribe to every retry decision with `(countdown, interval)`
    pub fn on_retry<H>(&mut self, handler: H) -> &mut Self
    where
        H: FnMut(u32, Duration) + Send + 'static,
    {
        self.on(EventKind::Retry, retry_handler(handler))
    }

    /// Subscribe to the next retry decision only
    pub fn once_retry<H>(&mut self, handler: H) -> &mut Self
    where
        H: FnMut(u32, Duration) + Send + 'static,
    {
        self.once(EventKind::Retry, retry_handler(handler))
    }

    /// Attach an observer to both events for the lifetime of the session
    pub fn observe<O>(&mut self, observer: O) -> &mut Self
    where
        O: RetryObserver<E> + 'static,
    {
        let observer = Arc::new(observer);
        let retry_observer = Arc::clone(&observer);
        self.on_failure(move |error, countdown, interval| {
            observer.on_failure(error, countdown, interval)
        })
        .on_retry(move |countdown, interval| retry_observer.on_retry(countdown, interval))
    }

    /// Number of subscribers currently registered for `kind`
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.count(kind)
    }

    /// Drop every subscriber registered for `kind`
    pub fn remove_all_listeners(&mut self, kind: EventKind) -> &mut Self {
        self.listeners.clear(kind);
        self
    }

    /// Interval the next retry will wait
    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Restore the configured starting interval
    ///
    /// Growth from exponential backoff otherwise carries over into the next
    /// `execute` call.
    pub fn reset_interval(&mut self) {
        self.current_interval = self.backoff.interval;
    }

    /// Backoff the session was created with
    pub fn backoff(&self) -> &BackoffConfig {
        &self.backoff
    }

    /// Arguments cloned into every attempt
    pub fn args(&self) -> &A {
        &self.args
    }
}

fn failure_handler<E, H>(mut handler: H) -> impl FnMut(&RetryEvent<'_, E>) + Send + 'static
where
    H: FnMut(&E, u32, Duration) + Send + 'static,
    E: 'static,
{
    move |event| {
        if let RetryEvent::Failure {
            error,
            countdown,
            interval,
        } = event
        {
            handler(*error, *countdown, *interval);
        }
    }
}

fn retry_handler<E, H>(mut handler: H) -> impl FnMut(&RetryEvent<'_, E>) + Send + 'static
where
    H: FnMut(u32, Duration) + Send + 'static,
    E: 'static,
{
    move |event| {
        if let RetryEvent::Retry {
            countdown,
            interval,
        } = event
        {
            handler(*countdown, *interval);
        }
    }
}

impl<Op, A: fmt::Debug, E> fmt::Debug for RetrySession<Op, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySession")
            .field("args", &self.args)
            .field("backoff", &self.backoff)
            .field("current_interval", &self.current_interval)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::observer::StatsObserver;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Operation that fails `failures` times, then succeeds with "OK"
    fn flaky(
        failures: u32,
        calls: Arc<AtomicU32>,
    ) -> impl Fn(()) -> std::future::Ready<Result<&'static str, &'static str>> {
        move |()| {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= failures {
                std::future::ready(Err("NOPE"))
            } else {
                std::future::ready(Ok("OK"))
            }
        }
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let stats = Arc::new(StatsObserver::new());

        let mut session = RetrySession::new(flaky(0, calls.clone()), ());
        session.observe(stats.clone());

        assert_eq!(session.execute(5).await, Ok("OK"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stats.failures(), 0);
        assert_eq!(stats.retries(), 0);
    }

    #[tokio::test]
    async fn test_success_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let stats = Arc::new(StatsObserver::new());

        let mut session = RetrySession::new(flaky(3, calls.clone()), ());
        session.observe(stats.clone());

        assert_eq!(session.execute(5).await, Ok("OK"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(stats.failures(), 3);
        assert_eq!(stats.retries(), 3);
        assert_eq!(stats.terminal_failures(), 0);
    }

    #[tokio::test]
    async fn test_all_attempts_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let stats = Arc::new(StatsObserver::new());

        let mut session = RetrySession::new(flaky(u32::MAX, calls.clone()), ());
        session.observe(stats.clone());

        assert_eq!(session.execute(5).await, Err(RetryError::Operation("NOPE")));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(stats.failures(), 5);
        assert_eq!(stats.retries(), 4);
        assert_eq!(stats.terminal_failures(), 1);
    }

    #[tokio::test]
    async fn test_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let stats = Arc::new(StatsObserver::new());

        let mut session = RetrySession::new(flaky(1, calls.clone()), ());
        session.observe(stats.clone());

        assert!(session.execute(1).await.unwrap_err().is_operation());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stats.failures(), 1);
        assert_eq!(stats.retries(), 0);
    }

    #[tokio::test]
    async fn test_zero_max_attempts_is_invalid() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut session = RetrySession::new(flaky(0, calls.clone()), ());

        let err = session.execute(0).await.unwrap_err();

        assert_eq!(err, RetryError::InvalidArgument { max_attempts: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_event_payloads_and_order() {
        let calls = Arc::new(AtomicU32::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut session = RetrySession::new(flaky(u32::MAX, calls), ());
        let failure_log = Arc::clone(&log);
        let retry_log = Arc::clone(&log);
        session
            .on_failure(move |error, countdown, _| {
                failure_log
                    .lock()
                    .unwrap()
                    .push(format!("failure {} {}", error, countdown))
            })
            .on_retry(move |countdown, _| {
                retry_log
                    .lock()
                    .unwrap()
                    .push(format!("retry {}", countdown))
            });

        let _ = session.execute(3).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "failure NOPE 3",
                "retry 3",
                "failure NOPE 2",
                "retry 2",
                "failure NOPE 1",
            ]
        );
    }

    #[tokio::test]
    async fn test_args_cloned_for_every_attempt() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let result: Result<(), RetryError<String>> = retry(
            3,
            move |(host, port): (String, u16)| {
                sink.lock().unwrap().push(format!("{}:{}", host, port));
                async { Err("refused".to_string()) }
            },
            ("localhost".to_string(), 8080),
            None,
        )
        .await;

        assert_eq!(result, Err(RetryError::Operation("refused".to_string())));
        assert_eq!(*seen.lock().unwrap(), vec!["localhost:8080"; 3]);
    }

    #[tokio::test]
    async fn test_retry_with_policy() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(2, BackoffConfig::default());

        let result = retry_with_policy(&policy, flaky(2, calls.clone()), ()).await;

        assert_eq!(result, Err(RetryError::Operation("NOPE")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_grows_only_on_retries_taken() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut session = RetrySession::with_backoff(
            flaky(u32::MAX, calls),
            (),
            BackoffConfig::exponential(Duration::from_millis(100), 2.0),
        );

        let _ = session.execute(3).await;

        // two delays taken (100ms, 200ms), no delay after the terminal failure
        assert_eq!(session.current_interval(), Duration::from_millis(400));

        session.reset_interval();
        assert_eq!(session.current_interval(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_listener_management() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut session = RetrySession::new(flaky(0, calls), ());

        session
            .on(EventKind::Failure, |_| {})
            .once(EventKind::Failure, |_| {})
            .on_retry(|_, _| {});

        assert_eq!(session.listener_count(EventKind::Failure), 2);
        assert_eq!(session.listener_count(EventKind::Retry), 1);

        session.remove_all_listeners(EventKind::Failure);
        assert_eq!(session.listener_count(EventKind::Failure), 0);
        assert_eq!(session.listener_count(EventKind::Retry), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cap_below_interval_never_shrinks_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let intervals = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&intervals);

        let mut session = RetrySession::with_backoff(
            flaky(u32::MAX, calls),
            (),
            BackoffConfig::exponential(Duration::from_millis(300), 2.0)
                .with_max_interval(Duration::from_millis(100)),
        );
        session.on_retry(move |_, interval| sink.lock().unwrap().push(interval.as_millis()));

        let _ = session.execute(4).await;

        assert_eq!(*intervals.lock().unwrap(), vec![300, 300, 300]);
    }

    #[test]
    fn test_accessors() {
        let calls = Arc::new(AtomicU32::new(0));
        let backoff = BackoffConfig::fixed(Duration::from_millis(25));
        let session = RetrySession::with_backoff(flaky(0, calls), (), backoff.clone());

        assert_eq!(session.backoff(), &backoff);
        assert_eq!(session.args(), &());
        assert_eq!(session.current_interval(), Duration::from_millis(25));
    }
}
