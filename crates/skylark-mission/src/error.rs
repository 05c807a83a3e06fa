use std::time::Duration;

use skylark_link::LinkError;
use skylark_proto::CommandId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error(transparent)]
    Link(#[from] LinkError),

    /// No acceptable reply arrived. Covers replies that were dropped as
    /// malformed.
    #[error("{cmd}: no valid reply within {after:?}")]
    Timeout { cmd: CommandId, after: Duration },

    #[error("waypoint index {index} out of range (index number {count})")]
    IndexOutOfRange { index: u8, count: u8 },
}

impl MissionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, MissionError::Timeout { .. } | MissionError::Link(LinkError::Timeout { .. }))
    }
}
