use bytes::Bytes;

/// Envelope bytes carried by every frame around the reply body:
/// 12-byte header plus 4-byte CRC32 trailer.
pub const PACKAGE_MIN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub seq_number: u16,
    /// Full frame length as reported by the header, envelope included.
    pub len: u16,
}

/// A reply frame handed up by the link, already stripped of its envelope.
#[derive(Debug, Clone)]
pub struct RecvFrame {
    pub info: FrameInfo,
    pub payload: Bytes,
}

impl RecvFrame {
    /// Builds an ACK frame whose header length matches the body it carries.
    pub fn ack(seq_number: u16, payload: Bytes) -> Self {
        let len = (PACKAGE_MIN + payload.len()).min(u16::MAX as usize) as u16;
        Self { info: FrameInfo { seq_number, len }, payload }
    }

    /// Reply body length implied by the header, `None` when the header
    /// reports less than the envelope itself.
    pub fn body_len(&self) -> Option<usize> {
        (self.info.len as usize).checked_sub(PACKAGE_MIN)
    }
}
