use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{record}: need {need} bytes, got {got}")]
    Short {
        record: &'static str,
        need: usize,
        got: usize,
    },

    #[error("{field}: invalid discriminant {value}")]
    InvalidEnum { field: &'static str, value: u8 },
}

/// Fixed-size binary record.
pub trait Wire: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;
    const NAME: &'static str;

    fn put(&self, buf: &mut BytesMut);

    /// Reads one record. Fails with [`DecodeError::Short`] if fewer than
    /// `SIZE` bytes remain.
    fn read<B: Buf>(buf: &mut B) -> Result<Self, DecodeError>;

    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.put(&mut buf);
        buf.freeze()
    }

    fn decode(mut data: &[u8]) -> Result<Self, DecodeError> {
        Self::read(&mut data)
    }
}

pub(crate) fn need<B: Buf>(buf: &B, record: &'static str, size: usize) -> Result<(), DecodeError> {
    if buf.remaining() < size {
        return Err(DecodeError::Short { record, need: size, got: buf.remaining() });
    }
    Ok(())
}

pub(crate) fn get_array<B: Buf, const N: usize>(buf: &mut B) -> [u8; N] {
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    out
}

impl Wire for u8 {
    const SIZE: usize = 1;
    const NAME: &'static str = "u8";

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u8(*self);
    }

    fn read<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        need(buf, Self::NAME, Self::SIZE)?;
        Ok(buf.get_u8())
    }
}

impl Wire for f32 {
    const SIZE: usize = 4;
    const NAME: &'static str = "f32";

    fn put(&self, buf: &mut BytesMut) {
        buf.put_f32_le(*self);
    }

    fn read<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        need(buf, Self::NAME, Self::SIZE)?;
        Ok(buf.get_f32_le())
    }
}
