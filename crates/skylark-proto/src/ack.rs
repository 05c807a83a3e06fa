//! ACK records returned by the remote mission controller.
//!
//! Each record starts with a one-byte [`MissionAck`] code; some carry a
//! command-specific body after it.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;

use crate::cmd::MissionKind;
use crate::hotpoint::HotpointSettings;
use crate::waypoint::{WaypointInitSettings, WaypointSettings};
use crate::wire::{need, DecodeError, Wire};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MissionAck(pub u8);

impl MissionAck {
    pub const SUCCESS: MissionAck = MissionAck(0x00);
    pub const WRONG_WAYPOINT_INDEX: MissionAck = MissionAck(0x01);

    pub const TOO_HIGH: MissionAck = MissionAck(0xC0);
    pub const TOO_LOW: MissionAck = MissionAck(0xC1);
    pub const TOO_FAR_FROM_HOME: MissionAck = MissionAck(0xC7);
    pub const NOT_SUPPORTED: MissionAck = MissionAck(0xC8);
    pub const NOT_INITIALIZED: MissionAck = MissionAck(0xD3);
    pub const NOT_RUNNING: MissionAck = MissionAck(0xD4);
    pub const IN_PROGRESS: MissionAck = MissionAck(0xD5);
    pub const BAD_GPS: MissionAck = MissionAck(0xD8);
    pub const LOW_BATTERY: MissionAck = MissionAck(0xDA);
    pub const INVALID_PARAMETER: MissionAck = MissionAck(0xDC);
    pub const INVALID_COMMAND: MissionAck = MissionAck(0xF4);
    pub const UNKNOWN_ERROR: MissionAck = MissionAck(0xFF);

    pub const HOTPOINT_INVALID_RADIUS: MissionAck = MissionAck(0xC2);
    pub const HOTPOINT_YAW_RATE_OVERFLOW: MissionAck = MissionAck(0xC3);
    pub const HOTPOINT_IN_PAUSED_MODE: MissionAck = MissionAck(0xA9);

    pub const WAYPOINT_INVALID_DATA: MissionAck = MissionAck(0xE0);
    pub const WAYPOINT_POINT_OVERFLOW: MissionAck = MissionAck(0xE4);
    pub const WAYPOINT_NOT_IN_PROGRESS: MissionAck = MissionAck(0xED);
    pub const WAYPOINT_INVALID_VELOCITY: MissionAck = MissionAck(0xEE);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Human-readable description. Hotpoint and waypoint commands share most
    /// codes but a few values are reused with a mission-specific meaning.
    pub fn message(self, kind: Option<MissionKind>) -> &'static str {
        let specific = match kind {
            Some(MissionKind::Hotpoint) => hotpoint_message(self.0),
            Some(MissionKind::Waypoint) => waypoint_message(self.0),
            None => None,
        };
        specific.unwrap_or_else(|| common_message(self.0))
    }
}

impl fmt::Display for MissionAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

fn common_message(code: u8) -> &'static str {
    match code {
        0x00 => "success",
        0x01 => "wrong waypoint index",
        0xC0 => "mission altitude too high",
        0xC1 => "mission altitude too low",
        0xC7 => "too far from home point",
        0xC8 => "mission not supported",
        0xC9 => "too far from current position",
        0xCA => "beginner mode not supported",
        0xD0 => "RC not in F mode",
        0xD1 => "obtain control authority first",
        0xD2 => "close IOC mode first",
        0xD3 => "mission not initialized",
        0xD4 => "mission not running",
        0xD5 => "mission already in progress",
        0xD6 => "mission estimated time too long",
        0xD7 => "another mission is running",
        0xD8 => "GPS signal too weak",
        0xD9 => "return-to-home in progress",
        0xDA => "battery level too low",
        0xDB => "vehicle has not taken off",
        0xDC => "invalid parameter",
        0xDD => "conditions not satisfied",
        0xDE => "mission crosses a no-fly zone",
        0xDF => "home point not recorded",
        0xE0 => "vehicle is inside a no-fly zone",
        0xF0 => "takeoff in progress",
        0xF1 => "landing in progress",
        0xF2 => "return-to-home in progress",
        0xF3 => "motors starting",
        0xF4 => "invalid command",
        _ => "unknown error",
    }
}

fn hotpoint_message(code: u8) -> Option<&'static str> {
    Some(match code {
        0xA2 => "invalid hotpoint parameter",
        0xA3 => "invalid latitude or longitude",
        0xA6 => "invalid rotation direction",
        0xA9 => "hotpoint already paused",
        0xAA => "failed to pause hotpoint",
        0xC2 => "invalid radius",
        0xC3 => "yaw rate out of range",
        0xC4 => "invalid start point",
        0xC5 => "invalid yaw mode",
        0xC6 => "too far from hotpoint",
        _ => return None,
    })
}

fn waypoint_message(code: u8) -> Option<&'static str> {
    Some(match code {
        0xE0 => "invalid waypoint mission data",
        0xE1 => "invalid waypoint data",
        0xE2 => "waypoint distance overflow",
        0xE3 => "waypoint mission timed out",
        0xE4 => "too many waypoints",
        0xE5 => "waypoints too close",
        0xE6 => "waypoints too far apart",
        0xE7 => "waypoint check failed",
        0xE8 => "invalid waypoint action",
        0xE9 => "waypoint data not enough",
        0xEA => "mission data not enough",
        0xEB => "waypoints not enough",
        0xEC => "waypoint mission in progress",
        0xED => "waypoint mission not in progress",
        0xEE => "invalid idle velocity",
        _ => return None,
    })
}

impl Wire for MissionAck {
    const SIZE: usize = 1;
    const NAME: &'static str = "MissionAck";

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u8(self.0);
    }

    fn read<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        need(buf, Self::NAME, Self::SIZE)?;
        Ok(MissionAck(buf.get_u8()))
    }
}

/// A reply record whose first byte is the mission ACK code.
pub trait AckRecord: Wire + Send + 'static {
    fn code(&self) -> MissionAck;
}

impl AckRecord for MissionAck {
    fn code(&self) -> MissionAck {
        *self
    }
}

macro_rules! ack_record {
    ($(#[$m:meta])* $name:ident { $field:ident : $ty:ty }, $size:expr) => {
        $(#[$m])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        pub struct $name {
            pub code: MissionAck,
            pub $field: $ty,
        }

        impl Wire for $name {
            const SIZE: usize = $size;
            const NAME: &'static str = stringify!($name);

            fn put(&self, buf: &mut BytesMut) {
                self.code.put(buf);
                self.$field.put(buf);
            }

            fn read<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
                need(buf, Self::NAME, Self::SIZE)?;
                Ok(Self { code: MissionAck::read(buf)?, $field: <$ty>::read(buf)? })
            }
        }

        impl AckRecord for $name {
            fn code(&self) -> MissionAck {
                self.code
            }
        }
    };
}

ack_record!(
    /// Reply to hotpoint start; reports the largest radius the vehicle accepts.
    HotpointStartAck { max_radius: f32 },
    1 + 4
);
ack_record!(HotpointReadAck { settings: HotpointSettings }, 1 + HotpointSettings::SIZE);
ack_record!(WaypointInitAck { settings: WaypointInitSettings }, 1 + WaypointInitSettings::SIZE);
ack_record!(WaypointIndexAck { settings: WaypointSettings }, 1 + WaypointSettings::SIZE);
ack_record!(
    /// Reply to add-point; echoes the index the vehicle stored.
    AddPointAck { index: u8 },
    2
);
ack_record!(VelocityAck { idle_velocity: f32 }, 1 + 4);
