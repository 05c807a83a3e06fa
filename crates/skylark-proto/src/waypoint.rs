use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::wire::{get_array, need, DecodeError, Wire};

/// Mission-wide parameters uploaded by waypoint init.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointInitSettings {
    /// Declared number of waypoints; fixes the size of the waypoint table.
    pub index_number: u8,
    pub max_velocity: f32,
    /// Cruise velocity in m/s.
    pub idle_velocity: f32,
    #[serde(default)]
    pub finish_action: u8,
    #[serde(default = "one")]
    pub executive_times: u8,
    #[serde(default)]
    pub yaw_mode: u8,
    #[serde(default)]
    pub trace_mode: u8,
    #[serde(default = "one")]
    pub rc_lost_action: u8,
    #[serde(default)]
    pub gimbal_pitch: u8,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f32,
    #[serde(skip)]
    pub reserved: [u8; 16],
}

fn one() -> u8 {
    1
}

impl Default for WaypointInitSettings {
    fn default() -> Self {
        Self {
            index_number: 0,
            max_velocity: 10.0,
            idle_velocity: 5.0,
            finish_action: 0,
            executive_times: 1,
            yaw_mode: 0,
            trace_mode: 0,
            rc_lost_action: 1,
            gimbal_pitch: 0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            reserved: [0; 16],
        }
    }
}

impl WaypointInitSettings {
    pub fn normalize(&mut self) {
        self.reserved = [0; 16];
    }
}

impl Wire for WaypointInitSettings {
    const SIZE: usize = 51;
    const NAME: &'static str = "WaypointInitSettings";

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u8(self.index_number);
        buf.put_f32_le(self.max_velocity);
        buf.put_f32_le(self.idle_velocity);
        buf.put_u8(self.finish_action);
        buf.put_u8(self.executive_times);
        buf.put_u8(self.yaw_mode);
        buf.put_u8(self.trace_mode);
        buf.put_u8(self.rc_lost_action);
        buf.put_u8(self.gimbal_pitch);
        buf.put_f64_le(self.latitude);
        buf.put_f64_le(self.longitude);
        buf.put_f32_le(self.altitude);
        buf.put_slice(&self.reserved);
    }

    fn read<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        need(buf, Self::NAME, Self::SIZE)?;
        Ok(Self {
            index_number: buf.get_u8(),
            max_velocity: buf.get_f32_le(),
            idle_velocity: buf.get_f32_le(),
            finish_action: buf.get_u8(),
            executive_times: buf.get_u8(),
            yaw_mode: buf.get_u8(),
            trace_mode: buf.get_u8(),
            rc_lost_action: buf.get_u8(),
            gimbal_pitch: buf.get_u8(),
            latitude: buf.get_f64_le(),
            longitude: buf.get_f64_le(),
            altitude: buf.get_f32_le(),
            reserved: get_array(buf),
        })
    }
}

/// One entry of the waypoint table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointSettings {
    pub index: u8,
    /// Radians.
    pub latitude: f64,
    /// Radians.
    pub longitude: f64,
    pub altitude: f32,
    #[serde(default)]
    pub damping: i16,
    #[serde(default)]
    pub yaw: i16,
    #[serde(default)]
    pub gimbal_pitch: i16,
    #[serde(default)]
    pub turn_mode: u8,
    #[serde(skip)]
    pub reserved: [u8; 8],
    #[serde(default)]
    pub has_action: u8,
    #[serde(default)]
    pub action_time_limit: u16,
    /// Low nibble on the wire.
    #[serde(default)]
    pub action_number: u8,
    /// High nibble on the wire.
    #[serde(default)]
    pub action_repeat: u8,
    #[serde(default)]
    pub command_list: [u8; 16],
    #[serde(default)]
    pub command_parameter: [u16; 16],
}

impl Default for WaypointSettings {
    fn default() -> Self {
        Self {
            index: 0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 10.0,
            damping: 0,
            yaw: 0,
            gimbal_pitch: 0,
            turn_mode: 0,
            reserved: [0; 8],
            has_action: 0,
            action_time_limit: 100,
            action_number: 0,
            action_repeat: 0,
            command_list: [0; 16],
            command_parameter: [0; 16],
        }
    }
}

impl WaypointSettings {
    pub fn normalize(&mut self) {
        self.reserved = [0; 8];
    }
}

impl Wire for WaypointSettings {
    const SIZE: usize = 88;
    const NAME: &'static str = "WaypointSettings";

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u8(self.index);
        buf.put_f64_le(self.latitude);
        buf.put_f64_le(self.longitude);
        buf.put_f32_le(self.altitude);
        buf.put_i16_le(self.damping);
        buf.put_i16_le(self.yaw);
        buf.put_i16_le(self.gimbal_pitch);
        buf.put_u8(self.turn_mode);
        buf.put_slice(&self.reserved);
        buf.put_u8(self.has_action);
        buf.put_u16_le(self.action_time_limit);
        buf.put_u8((self.action_number & 0x0F) | (self.action_repeat << 4));
        buf.put_slice(&self.command_list);
        for p in &self.command_parameter {
            buf.put_u16_le(*p);
        }
    }

    fn read<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        need(buf, Self::NAME, Self::SIZE)?;
        let index = buf.get_u8();
        let latitude = buf.get_f64_le();
        let longitude = buf.get_f64_le();
        let altitude = buf.get_f32_le();
        let damping = buf.get_i16_le();
        let yaw = buf.get_i16_le();
        let gimbal_pitch = buf.get_i16_le();
        let turn_mode = buf.get_u8();
        let reserved = get_array(buf);
        let has_action = buf.get_u8();
        let action_time_limit = buf.get_u16_le();
        let nibbles = buf.get_u8();
        let command_list = get_array(buf);
        let mut command_parameter = [0u16; 16];
        for p in command_parameter.iter_mut() {
            *p = buf.get_u16_le();
        }
        Ok(Self {
            index,
            latitude,
            longitude,
            altitude,
            damping,
            yaw,
            gimbal_pitch,
            turn_mode,
            reserved,
            has_action,
            action_time_limit,
            action_number: nibbles & 0x0F,
            action_repeat: nibbles >> 4,
            command_list,
            command_parameter,
        })
    }
}
