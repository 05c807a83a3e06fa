pub mod doctor;
pub mod sim;
pub mod state;

use std::sync::mpsc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Deserialize;
use skylark_proto::{CommandId, RecvFrame};
use thiserror::Error;

/// Slack added on top of the retry budget when a caller waits for a
/// completion that the link is responsible for firing.
pub const WAIT_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("{cmd}: no reply after {attempts} attempt(s)")]
    Timeout { cmd: CommandId, attempts: u8 },

    #[error("link closed")]
    Closed,

    #[error("link runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// How long to wait for each attempt and how many attempts to make.
/// Retries are uniform; there is no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub per_attempt: Duration,
    pub retries: u8,
}

impl RetryPolicy {
    pub const fn new(per_attempt_ms: u64, retries: u8) -> Self {
        Self { per_attempt: Duration::from_millis(per_attempt_ms), retries }
    }

    /// Spreads a total budget evenly over `retries` attempts.
    pub fn spread(total: Duration, retries: u8) -> Self {
        let retries = retries.max(1);
        Self { per_attempt: total / retries as u32, retries }
    }

    pub fn attempts(&self) -> u8 {
        self.retries.max(1)
    }

    pub fn total(&self) -> Duration {
        self.per_attempt * self.attempts() as u32
    }
}

/// Fired exactly once per `send_async`, on the link's processing context.
pub type Completion = Box<dyn FnOnce(Result<RecvFrame, LinkError>) + Send + 'static>;

/// Point-to-point command channel to the remote controller.
///
/// Framing, checksums and retransmission live behind this trait.
pub trait CommandLink: Send + Sync {
    /// Fire-and-forget: no acknowledgement is awaited.
    fn send(&self, cmd: CommandId, payload: Bytes) -> Result<(), LinkError>;

    /// Returns immediately; `done` fires once a reply arrives or the
    /// retries are exhausted.
    fn send_async(&self, cmd: CommandId, payload: Bytes, policy: RetryPolicy, done: Completion);

    /// Blocks the calling thread until the first reply or until the retry
    /// budget runs out. Must not be called from the link's own context.
    fn send_sync(&self, cmd: CommandId, payload: Bytes, policy: RetryPolicy) -> Result<RecvFrame, LinkError> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.send_async(
            cmd,
            payload,
            policy,
            Box::new(move |res| {
                let _ = tx.send(res);
            }),
        );
        wait_reply(&rx, policy).unwrap_or(Err(LinkError::Timeout { cmd, attempts: policy.attempts() }))
    }
}

/// Waits for the single value a completion delivers on `rx`.
///
/// Gives up after the policy's total budget plus [`WAIT_GRACE`]. A sender
/// dropped without sending (reply discarded upstream) counts as no reply,
/// and the wait still runs to the end of the retry budget.
pub fn wait_reply<T>(rx: &mpsc::Receiver<T>, policy: RetryPolicy) -> Option<T> {
    let deadline = Instant::now() + policy.total();
    match rx.recv_timeout(policy.total() + WAIT_GRACE) {
        Ok(v) => Some(v),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
            None
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkConfig {
    /// Simulated reply latency. Default 20ms.
    pub latency_ms: Option<u64>,

    /// Probability that a simulated reply is lost, 0.0..1.0. Default 0.
    pub drop_rate: Option<f64>,

    /// Total budget for synchronous mission calls. Default 2s.
    pub timeout_s: Option<u64>,
}

impl LinkConfig {
    pub fn sim_config(&self) -> sim::SimConfig {
        sim::SimConfig {
            latency: Duration::from_millis(self.latency_ms.unwrap_or(20)),
            drop_rate: self.drop_rate.unwrap_or(0.0),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s.unwrap_or(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_divides_total() {
        let p = RetryPolicy::spread(Duration::from_secs(1), 2);
        assert_eq!(p.per_attempt, Duration::from_millis(500));
        assert_eq!(p.total(), Duration::from_secs(1));

        let p = RetryPolicy::spread(Duration::from_secs(2), 4);
        assert_eq!(p.per_attempt, Duration::from_millis(500));
    }

    #[test]
    fn test_wait_reply_runs_out_budget_on_dropped_sender() {
        let (tx, rx) = mpsc::sync_channel::<u8>(1);
        drop(tx);
        let started = Instant::now();
        assert!(wait_reply(&rx, RetryPolicy::new(100, 2)).is_none());
        assert!(started.elapsed() >= Duration::from_millis(190), "{:?}", started.elapsed());
    }

    #[test]
    fn test_wait_reply_returns_value() {
        let (tx, rx) = mpsc::sync_channel(1);
        tx.send(7u8).unwrap();
        assert_eq!(wait_reply(&rx, RetryPolicy::new(100, 2)), Some(7));
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        let p = RetryPolicy::spread(Duration::from_millis(300), 0);
        assert_eq!(p.attempts(), 1);
        assert_eq!(p.per_attempt, Duration::from_millis(300));
    }
}
