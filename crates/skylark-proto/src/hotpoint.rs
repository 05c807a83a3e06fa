use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::wire::{get_array, need, DecodeError, Wire};

/// Where the orbit begins relative to the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    North = 0,
    South = 1,
    West = 2,
    East = 3,
    Nearby = 4,
}

impl TryFrom<u8> for View {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => View::North,
            1 => View::South,
            2 => View::West,
            3 => View::East,
            4 => View::Nearby,
            value => return Err(DecodeError::InvalidEnum { field: "start_point", value }),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YawMode {
    Auto = 0,
    /// Nose points at the center.
    Inside = 1,
    Outside = 2,
    /// Controlled by the RC stick.
    Custom = 3,
    Static = 4,
}

impl TryFrom<u8> for YawMode {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => YawMode::Auto,
            1 => YawMode::Inside,
            2 => YawMode::Outside,
            3 => YawMode::Custom,
            4 => YawMode::Static,
            value => return Err(DecodeError::InvalidEnum { field: "yaw_mode", value }),
        })
    }
}

/// Orbit configuration sent with hotpoint start and returned by download.
///
/// Latitude and longitude are radians, height is meters above takeoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotpointSettings {
    #[serde(skip)]
    pub version: u8,
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
    pub radius: f64,
    /// Degrees per second.
    pub yaw_rate: f32,
    pub clockwise: bool,
    pub start_point: View,
    pub yaw_mode: YawMode,
    #[serde(skip)]
    pub reserved: [u8; 11],
}

impl Default for HotpointSettings {
    fn default() -> Self {
        Self {
            version: 0,
            latitude: 0.0,
            longitude: 0.0,
            height: 0.0,
            radius: 10.0,
            yaw_rate: 15.0,
            clockwise: true,
            start_point: View::Nearby,
            yaw_mode: YawMode::Inside,
            reserved: [0; 11],
        }
    }
}

impl HotpointSettings {
    /// Forces the protocol-reserved fields back to zero.
    pub fn normalize(&mut self) {
        self.version = 0;
        self.reserved = [0; 11];
    }
}

impl Wire for HotpointSettings {
    const SIZE: usize = 51;
    const NAME: &'static str = "HotpointSettings";

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u8(self.version);
        buf.put_f64_le(self.latitude);
        buf.put_f64_le(self.longitude);
        buf.put_f64_le(self.height);
        buf.put_f64_le(self.radius);
        buf.put_f32_le(self.yaw_rate);
        buf.put_u8(self.clockwise as u8);
        buf.put_u8(self.start_point as u8);
        buf.put_u8(self.yaw_mode as u8);
        buf.put_slice(&self.reserved);
    }

    fn read<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        need(buf, Self::NAME, Self::SIZE)?;
        Ok(Self {
            version: buf.get_u8(),
            latitude: buf.get_f64_le(),
            longitude: buf.get_f64_le(),
            height: buf.get_f64_le(),
            radius: buf.get_f64_le(),
            yaw_rate: buf.get_f32_le(),
            clockwise: buf.get_u8() != 0,
            start_point: View::try_from(buf.get_u8())?,
            yaw_mode: YawMode::try_from(buf.get_u8())?,
            reserved: get_array(buf),
        })
    }
}

/// Payload of the fire-and-forget yaw rate update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawRate {
    pub yaw_rate: f32,
    pub clockwise: bool,
}

impl Wire for YawRate {
    const SIZE: usize = 5;
    const NAME: &'static str = "YawRate";

    fn put(&self, buf: &mut BytesMut) {
        buf.put_f32_le(self.yaw_rate);
        buf.put_u8(self.clockwise as u8);
    }

    fn read<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        need(buf, Self::NAME, Self::SIZE)?;
        Ok(Self { yaw_rate: buf.get_f32_le(), clockwise: buf.get_u8() != 0 })
    }
}
