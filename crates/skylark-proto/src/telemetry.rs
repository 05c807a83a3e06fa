use serde::{Deserialize, Serialize};

/// Fused position as broadcast by the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalPosition {
    /// Radians.
    pub latitude: f64,
    /// Radians.
    pub longitude: f64,
    /// Meters above mean sea level.
    pub altitude: f32,
    /// Meters above takeoff point.
    pub height: f32,
    /// GPS health, 0 (none) to 5 (best).
    pub health: u8,
}

impl GlobalPosition {
    pub fn from_degrees(lat_deg: f64, lon_deg: f64, altitude: f32) -> Self {
        Self {
            latitude: lat_deg.to_radians(),
            longitude: lon_deg.to_radians(),
            altitude,
            height: altitude,
            health: 5,
        }
    }
}
