//! Bounded, delay-scheduled retry for transient failures.
//!
//! Delays are explicit values rather than computed backoff, so retry
//! timing is deterministic under test. No jitter.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::error::{NodeError, NodeResult};
use crate::graph::node::Work;

/// Retry configuration attached to an action node.
///
/// The retry budget defaults to the length of the delay sequence; an
/// explicit cap may lower it but never exceeds the sequence length.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    max_retries: usize,
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        let max_retries = delays.len();
        RetryPolicy {
            delays,
            max_retries,
        }
    }

    /// Lower the retry budget below the delay sequence length.
    pub fn with_max_retries(mut self, cap: usize) -> Self {
        self.max_retries = cap.min(self.delays.len());
        self
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Invoke the unit of work, retrying transient failures per the
    /// delay schedule.
    ///
    /// Non-transient failures propagate immediately. Each wait races the
    /// cancellation signal and aborts as [`NodeError::Interrupted`] when
    /// signaled. Once the budget is exhausted, the most recent failure
    /// is returned.
    pub async fn execute(
        &self,
        work: &Work,
        ctx: &mut Context,
        cancel: &CancellationToken,
    ) -> NodeResult<()> {
        self.execute_observed(work, ctx, cancel, |_, _, _| {}).await
    }

    /// Same as [`execute`](Self::execute), reporting each retry to the
    /// observer as `(attempt, delay, error)` before the wait begins.
    /// Attempts are numbered from 1.
    pub async fn execute_observed<F>(
        &self,
        work: &Work,
        ctx: &mut Context,
        cancel: &CancellationToken,
        mut on_retry: F,
    ) -> NodeResult<()>
    where
        F: FnMut(usize, Duration, &NodeError),
    {
        let mut attempt = 0usize;
        loop {
            match work.invoke(ctx, cancel).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if !err.is_transient() || attempt >= self.max_retries {
                        return Err(err);
                    }
                    let delay = self.delays[attempt];
                    attempt += 1;
                    on_retry(attempt, delay, &err);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => return Err(NodeError::Interrupted),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn failing_n_times(n: usize) -> (Work, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let work = Work::sync(move |_ctx| {
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            if seen < n {
                Err(NodeError::transient("not yet"))
            } else {
                Ok(())
            }
        });
        (work, attempts)
    }

    #[tokio::test]
    async fn test_success_needs_no_delay() {
        let (work, attempts) = failing_n_times(0);
        let policy = RetryPolicy::new(vec![Duration::from_millis(10)]);
        let mut ctx = Context::new();
        policy
            .execute(&work, &mut ctx, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let (work, attempts) = failing_n_times(2);
        let policy = RetryPolicy::new(vec![Duration::from_millis(10), Duration::from_millis(20)]);
        let mut ctx = Context::new();

        let started = Instant::now();
        policy
            .execute(&work, &mut ctx, &CancellationToken::new())
            .await
            .unwrap();

        // Two retries: one invocation plus two more, with both delays served.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_failure() {
        let (work, attempts) = failing_n_times(usize::MAX);
        let policy = RetryPolicy::new(vec![Duration::from_millis(10)]);
        let mut ctx = Context::new();

        let err = policy
            .execute(&work, &mut ctx, &CancellationToken::new())
            .await
            .unwrap_err();

        // Exactly one retry: the original attempt plus one more.
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(matches!(err, NodeError::Transient(_)));
    }

    #[tokio::test]
    async fn test_terminal_failure_skips_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let work = Work::sync(move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(NodeError::execution("broken"))
        });
        let policy = RetryPolicy::new(vec![Duration::from_millis(10)]);
        let mut ctx = Context::new();

        let err = policy
            .execute(&work, &mut ctx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(err, NodeError::Execution(_)));
    }

    #[tokio::test]
    async fn test_cap_below_sequence_length() {
        let (work, attempts) = failing_n_times(usize::MAX);
        let policy = RetryPolicy::new(vec![
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(1),
        ])
        .with_max_retries(1);
        let mut ctx = Context::new();

        policy
            .execute(&work, &mut ctx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cap_never_exceeds_sequence_length() {
        let policy = RetryPolicy::new(vec![Duration::from_millis(1)]).with_max_retries(10);
        assert_eq!(policy.max_retries(), 1);
    }

    #[tokio::test]
    async fn test_wait_interrupted_by_cancellation() {
        let (work, _attempts) = failing_n_times(usize::MAX);
        let policy = RetryPolicy::new(vec![Duration::from_secs(30)]);
        let mut ctx = Context::new();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = policy.execute(&work, &mut ctx, &cancel).await.unwrap_err();
        assert!(matches!(err, NodeError::Interrupted));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_observer_sees_each_retry() {
        let (work, _attempts) = failing_n_times(2);
        let policy = RetryPolicy::new(vec![Duration::from_millis(5), Duration::from_millis(5)]);
        let mut ctx = Context::new();

        let mut observed = Vec::new();
        policy
            .execute_observed(&work, &mut ctx, &CancellationToken::new(), |attempt, delay, err| {
                observed.push((attempt, delay, err.to_string()));
            })
            .await
            .unwrap();

        assert_eq!(observed.len(), 2);
        assert_eq!(observed[0].0, 1);
        assert_eq!(observed[1].0, 2);
        assert!(observed[0].2.contains("not yet"));
    }
}
