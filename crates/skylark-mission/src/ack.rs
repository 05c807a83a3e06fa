//! ACK validation and decoding.
//!
//! A reply is accepted only if `frame length - PACKAGE_MIN` does not exceed
//! the size of the record expected for the command. Anything else is logged
//! and dropped: no state is touched and no caller success path runs.

use skylark_proto::ack::{AckRecord, MissionAck};
use skylark_proto::{CommandId, DecodeError, RecvFrame};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AckError {
    #[error("reply body {body:?} bytes exceeds expected {expected}")]
    Length { body: Option<usize>, expected: usize },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// The frame-length rule, on its own.
pub fn accepts(frame: &RecvFrame, expected: usize) -> bool {
    matches!(frame.body_len(), Some(n) if n <= expected)
}

pub fn decode<T: AckRecord>(frame: &RecvFrame) -> Result<T, AckError> {
    if !accepts(frame, T::SIZE) {
        return Err(AckError::Length { body: frame.body_len(), expected: T::SIZE });
    }
    Ok(T::decode(&frame.payload)?)
}

/// Decodes a reply to `cmd`, logging remote error codes. Returns `None`
/// when the frame was dropped.
pub fn decode_logged<T: AckRecord>(cmd: CommandId, frame: &RecvFrame) -> Option<T> {
    match decode::<T>(frame) {
        Ok(ack) => {
            report(cmd, ack.code());
            Some(ack)
        }
        Err(e) => {
            error!("ACK is exception, sequence {} ({}): {}", frame.info.seq_number, cmd, e);
            None
        }
    }
}

pub fn report(cmd: CommandId, code: MissionAck) {
    if !code.is_success() {
        error!("{}: ack error {}: {}", cmd, code, code.message(cmd.kind()));
    }
}
