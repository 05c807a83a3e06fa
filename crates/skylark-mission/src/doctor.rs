use anyhow::Result;
use skylark_proto::hotpoint::HotpointSettings;
use skylark_proto::waypoint::{WaypointInitSettings, WaypointSettings};
use std::f64::consts::{FRAC_PI_2, PI};

pub fn check_hotpoint(s: &HotpointSettings) -> Result<()> {
    anyhow::ensure!(s.radius >= 5.0 && s.radius <= 500.0, "hotpoint.radius should be 5..500 m");
    anyhow::ensure!(s.yaw_rate.abs() <= 30.0, "hotpoint.yaw_rate should be within +-30 deg/s");
    anyhow::ensure!(coords_ok(s.latitude, s.longitude), "hotpoint center invalid");
    Ok(())
}

pub fn check_waypoints(init: &WaypointInitSettings, points: &[WaypointSettings]) -> Result<()> {
    anyhow::ensure!((2..=100).contains(&init.index_number), "waypoint.index_number should be 2..100");
    anyhow::ensure!(init.max_velocity > 0.0 && init.max_velocity <= 15.0, "waypoint.max_velocity should be 0..15 m/s");
    anyhow::ensure!(init.idle_velocity.abs() <= init.max_velocity, "waypoint.idle_velocity exceeds max_velocity");
    anyhow::ensure!(
        points.len() == init.index_number as usize,
        "waypoint.points has {} entries, index_number is {}",
        points.len(),
        init.index_number
    );
    for (i, p) in points.iter().enumerate() {
        anyhow::ensure!(p.index as usize == i, "waypoint.points[{}] has index {}", i, p.index);
        anyhow::ensure!(coords_ok(p.latitude, p.longitude), "waypoint.points[{}] coordinates invalid", i);
        anyhow::ensure!(p.action_number <= 15 && p.action_repeat <= 15, "waypoint.points[{}] action nibble overflow", i);
    }
    Ok(())
}

// radians
fn coords_ok(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && lat.abs() <= FRAC_PI_2 && lon.abs() <= PI
}
