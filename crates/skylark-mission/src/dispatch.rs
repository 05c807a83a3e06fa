use std::sync::{mpsc, Arc};
use std::time::Duration;

use bytes::Bytes;
use skylark_link::{wait_reply, CommandLink, RetryPolicy};
use skylark_proto::ack::AckRecord;
use skylark_proto::{CommandId, RecvFrame};
use tracing::{debug, warn};

use crate::ack;
use crate::error::MissionError;

/// Decoded reply (or transport failure) for one async action. Frames that
/// fail validation never reach it.
pub type AckCallback<T> = Box<dyn FnOnce(Result<T, MissionError>) + Send + 'static>;

/// Receives unsolicited frames the host's link demultiplexer routes to a
/// mission (status and event pushes). Runs without any mission lock held,
/// so it may re-register callbacks.
pub type PushCallback = Arc<dyn Fn(&RecvFrame) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// start/stop/pause/resume/reset/init/velocity: 500ms x 2.
    Control,
    /// Downloads and point upload: 1000ms x 4.
    Data,
}

impl RetryClass {
    pub fn policy(self) -> RetryPolicy {
        match self {
            RetryClass::Control => RetryPolicy::new(500, 2),
            RetryClass::Data => RetryPolicy::new(1000, 4),
        }
    }

    /// Per-attempt budget for a blocking call: `total / retries`.
    pub fn spread(self, total: Duration) -> RetryPolicy {
        RetryPolicy::spread(total, self.policy().retries)
    }
}

/// One transmit+decode pipeline shared by every mission action.
#[derive(Clone)]
pub struct Dispatcher {
    link: Arc<dyn CommandLink>,
}

impl Dispatcher {
    pub fn new(link: Arc<dyn CommandLink>) -> Self {
        Self { link }
    }

    pub fn link(&self) -> &Arc<dyn CommandLink> {
        &self.link
    }

    /// Sends `payload` and registers `then` as the continuation for the
    /// decoded reply.
    pub fn issue<T: AckRecord>(&self, cmd: CommandId, payload: Bytes, policy: RetryPolicy, then: AckCallback<T>) {
        self.link.send_async(
            cmd,
            payload,
            policy,
            Box::new(move |res| match res {
                Ok(frame) => {
                    if let Some(ack) = ack::decode_logged::<T>(cmd, &frame) {
                        then(Ok(ack));
                    }
                }
                Err(e) => then(Err(e.into())),
            }),
        );
    }

    /// Blocking form: waits at most `timeout` (spread over the class's
    /// retries) for a valid reply.
    pub fn call<T: AckRecord>(&self, cmd: CommandId, payload: Bytes, class: RetryClass, timeout: Duration) -> Result<T, MissionError> {
        let policy = class.spread(timeout);
        let (tx, rx) = mpsc::sync_channel(1);
        self.issue::<T>(
            cmd,
            payload,
            policy,
            Box::new(move |res| {
                let _ = tx.send(res);
            }),
        );
        // A malformed reply drops the sender; the wait still runs out the budget.
        wait_reply(&rx, policy).unwrap_or(Err(MissionError::Timeout { cmd, after: timeout }))
    }

    /// Non-blocking form with the class's default budget.
    pub fn post<T: AckRecord>(&self, cmd: CommandId, payload: Bytes, class: RetryClass, callback: AckCallback<T>) {
        self.issue(cmd, payload, class.policy(), callback)
    }

    /// Fire-and-forget; nothing is awaited.
    pub fn fire(&self, cmd: CommandId, payload: Bytes) -> Result<(), MissionError> {
        Ok(self.link.send(cmd, payload)?)
    }
}

/// Default continuation for actions that only report an error code.
pub fn mission_callback<T: AckRecord>(cmd: CommandId) -> AckCallback<T> {
    Box::new(move |res: Result<T, MissionError>| match res {
        Ok(ack) if ack.code().is_success() => debug!("{}: ack ok", cmd),
        Ok(_) => {}
        Err(e) => warn!("{}: {}", cmd, e),
    })
}

pub(crate) fn flag(value: u8) -> Bytes {
    Bytes::copy_from_slice(&[value])
}
