//! In-process stand-in for the serial link and the remote controller.
//!
//! Requests run as tasks on a private tokio runtime, which plays the part of
//! the link's processing thread: completions fire there, concurrently with
//! the caller.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::Rng;
use skylark_proto::{CommandId, RecvFrame};
use time::OffsetDateTime;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use crate::state::LinkStatus;
use crate::{CommandLink, Completion, LinkError, RetryPolicy};

/// The remote end of the link. Returns the ACK body for a command, or
/// `None` to stay silent.
pub trait Responder: Send + 'static {
    fn respond(&mut self, cmd: CommandId, payload: &[u8]) -> Option<Bytes>;
}

impl<F> Responder for F
where
    F: FnMut(CommandId, &[u8]) -> Option<Bytes> + Send + 'static,
{
    fn respond(&mut self, cmd: CommandId, payload: &[u8]) -> Option<Bytes> {
        self(cmd, payload)
    }
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub latency: Duration,
    pub drop_rate: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { latency: Duration::from_millis(5), drop_rate: 0.0 }
    }
}

/// One transmitted frame, recorded at send time.
#[derive(Debug, Clone)]
pub struct SentFrame {
    pub ts: OffsetDateTime,
    pub seq: u16,
    pub cmd: CommandId,
    pub payload: Bytes,
    pub expects_ack: bool,
}

struct Shared {
    responder: Mutex<Box<dyn Responder>>,
    cfg: SimConfig,
    sent: Mutex<Vec<SentFrame>>,
    status: Mutex<LinkStatus>,
    seq: AtomicU16,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn record(&self, cmd: CommandId, payload: &Bytes, expects_ack: bool) -> u16 {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        debug!("sim link: tx seq={} {} [{}]", seq, cmd, hex::encode(payload));
        lock(&self.sent).push(SentFrame {
            ts: OffsetDateTime::now_utc(),
            seq,
            cmd,
            payload: payload.clone(),
            expects_ack,
        });
        let mut st = lock(&self.status);
        st.sent += 1;
        st.last_seq = seq;
        if !expects_ack {
            st.fire_and_forget += 1;
        }
        seq
    }

    fn respond(&self, cmd: CommandId, payload: &[u8]) -> Option<Bytes> {
        let reply = lock(&self.responder).respond(cmd, payload)?;
        let p = self.cfg.drop_rate.clamp(0.0, 1.0);
        if p > 0.0 && rand::thread_rng().gen_bool(p) {
            lock(&self.status).lost += 1;
            return None;
        }
        Some(reply)
    }
}

pub struct SimLink {
    rt: Option<Runtime>,
    shared: Arc<Shared>,
}

impl SimLink {
    pub fn new(cfg: SimConfig, responder: impl Responder) -> Result<Self, LinkError> {
        let rt = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("sim-link")
            .enable_time()
            .build()?;
        Ok(Self {
            rt: Some(rt),
            shared: Arc::new(Shared {
                responder: Mutex::new(Box::new(responder)),
                cfg,
                sent: Mutex::new(Vec::new()),
                status: Mutex::new(LinkStatus::default()),
                seq: AtomicU16::new(0),
            }),
        })
    }

    /// A link whose remote end never answers.
    pub fn silent(cfg: SimConfig) -> Result<Self, LinkError> {
        Self::new(cfg, |_: CommandId, _: &[u8]| -> Option<Bytes> { None })
    }

    pub fn sent(&self) -> Vec<SentFrame> {
        lock(&self.shared.sent).clone()
    }

    pub fn sent_count(&self) -> usize {
        lock(&self.shared.sent).len()
    }

    pub fn status(&self) -> LinkStatus {
        lock(&self.shared.status).clone()
    }

    fn spawn<F>(&self, fut: F) -> Result<(), LinkError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let rt = self.rt.as_ref().ok_or(LinkError::Closed)?;
        rt.spawn(fut);
        Ok(())
    }
}

impl Drop for SimLink {
    fn drop(&mut self) {
        if let Some(rt) = self.rt.take() {
            rt.shutdown_background();
        }
    }
}

async fn exchange(shared: Arc<Shared>, seq: u16, cmd: CommandId, payload: Bytes, policy: RetryPolicy, done: Completion) {
    let attempts = policy.attempts();
    for attempt in 1..=attempts {
        match shared.respond(cmd, &payload) {
            Some(body) if shared.cfg.latency < policy.per_attempt => {
                tokio::time::sleep(shared.cfg.latency).await;
                {
                    let mut st = lock(&shared.status);
                    st.replies += 1;
                    st.last_reply = Some(Instant::now());
                }
                debug!("sim link: rx seq={} {} [{}]", seq, cmd, hex::encode(&body));
                done(Ok(RecvFrame::ack(seq, body)));
                return;
            }
            _ => {
                debug!("sim link: {} attempt {}/{} unanswered", cmd, attempt, attempts);
                tokio::time::sleep(policy.per_attempt).await;
            }
        }
    }
    lock(&shared.status).timeouts += 1;
    warn!("sim link: {} timed out after {} attempt(s)", cmd, attempts);
    done(Err(LinkError::Timeout { cmd, attempts }));
}

impl CommandLink for SimLink {
    fn send(&self, cmd: CommandId, payload: Bytes) -> Result<(), LinkError> {
        self.shared.record(cmd, &payload, false);
        let shared = Arc::clone(&self.shared);
        self.spawn(async move {
            let _ = shared.respond(cmd, &payload);
        })
    }

    fn send_async(&self, cmd: CommandId, payload: Bytes, policy: RetryPolicy, done: Completion) {
        let seq = self.shared.record(cmd, &payload, true);
        let rt = match self.rt.as_ref() {
            Some(rt) => rt,
            None => {
                done(Err(LinkError::Closed));
                return;
            }
        };
        rt.spawn(exchange(Arc::clone(&self.shared), seq, cmd, payload, policy, done));
    }
}
