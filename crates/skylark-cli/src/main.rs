use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use skylark_link::doctor as link_doctor;
use skylark_link::sim::SimLink;
use skylark_link::{CommandLink, LinkConfig};
use skylark_mission::doctor as mission_doctor;
use skylark_mission::mock::MockController;
use skylark_mission::MissionManager;
use skylark_proto::hotpoint::{HotpointSettings, View, YawMode};
use skylark_proto::waypoint::{WaypointInitSettings, WaypointSettings};

use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "skylark", version, about = "Skylark - hotpoint and waypoint mission runner")]
struct Cli {
    #[arg(long)]
    config: String,

    /// Print results as JSON instead of log lines.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Doctor,
    Hotpoint { #[command(subcommand)] cmd: MissionCmd },
    Waypoint { #[command(subcommand)] cmd: MissionCmd },
}

#[derive(Debug, Subcommand)]
enum MissionCmd {
    /// Upload, start, pause/resume and stop the configured mission.
    Run,
    /// Upload the configured mission and read it back.
    Download,
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    #[serde(default)]
    link: LinkConfig,
    hotpoint: Option<HotpointCfg>,
    waypoint: Option<WaypointCfg>,
}

/// Degrees in the file, radians on the wire.
#[derive(Debug, serde::Deserialize)]
struct HotpointCfg {
    lat_deg: f64,
    lon_deg: f64,
    height_m: f64,
    radius_m: Option<f64>,
    yaw_rate_dps: Option<f32>,
    clockwise: Option<bool>,
    start_point: Option<View>,
    yaw_mode: Option<YawMode>,
}

impl HotpointCfg {
    fn settings(&self) -> HotpointSettings {
        let d = HotpointSettings::default();
        HotpointSettings {
            latitude: self.lat_deg.to_radians(),
            longitude: self.lon_deg.to_radians(),
            height: self.height_m,
            radius: self.radius_m.unwrap_or(d.radius),
            yaw_rate: self.yaw_rate_dps.unwrap_or(d.yaw_rate),
            clockwise: self.clockwise.unwrap_or(d.clockwise),
            start_point: self.start_point.unwrap_or(d.start_point),
            yaw_mode: self.yaw_mode.unwrap_or(d.yaw_mode),
            ..d
        }
    }
}

/// Point coordinates are degrees in the file.
#[derive(Debug, serde::Deserialize)]
struct WaypointCfg {
    init: WaypointInitSettings,
    #[serde(default)]
    points: Vec<WaypointSettings>,
}

impl WaypointCfg {
    fn mission(&self) -> (WaypointInitSettings, Vec<WaypointSettings>) {
        let mut init = self.init.clone();
        init.latitude = init.latitude.to_radians();
        init.longitude = init.longitude.to_radians();
        let points = self
            .points
            .iter()
            .cloned()
            .map(|mut p| {
                p.latitude = p.latitude.to_radians();
                p.longitude = p.longitude.to_radians();
                p
            })
            .collect();
        (init, points)
    }
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Hotpoint { cmd } => hotpoint_cmd(&cfg, cmd, cli.json)?,
        Command::Waypoint { cmd } => waypoint_cmd(&cfg, cmd, cli.json)?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    link_doctor::check_link(&cfg.link)?;

    match &cfg.hotpoint {
        Some(hp) => mission_doctor::check_hotpoint(&hp.settings())?,
        None => warn!("doctor: no [hotpoint] section"),
    }
    match &cfg.waypoint {
        Some(wp) => {
            let (init, points) = wp.mission();
            mission_doctor::check_waypoints(&init, &points)?;
        }
        None => warn!("doctor: no [waypoint] section"),
    }

    info!("doctor: OK");
    Ok(())
}

/// Simulated vehicle behind a simulated link. Keeps the typed link around
/// for the traffic summary.
fn connect(cfg: &Config) -> Result<(Arc<SimLink>, MissionManager)> {
    let link = Arc::new(SimLink::new(cfg.link.sim_config(), MockController::new()).context("start sim link")?);
    let dyn_link: Arc<dyn CommandLink> = link.clone();
    Ok((link, MissionManager::new(dyn_link)))
}

fn hotpoint_cmd(cfg: &Config, cmd: MissionCmd, json: bool) -> Result<()> {
    let hp_cfg = cfg.hotpoint.as_ref().context("no [hotpoint] config section")?;
    let timeout = cfg.link.timeout();
    let (link, manager) = connect(cfg)?;
    let hp = manager.hotpoint();
    hp.set_settings(hp_cfg.settings());

    let start = hp.start(timeout)?;
    anyhow::ensure!(
        start.code.is_success(),
        "hotpoint start rejected: {} ({})",
        start.code,
        start.code.message(Some(skylark_proto::MissionKind::Hotpoint))
    );
    info!("hotpoint: orbiting, vehicle max radius {:.1}m", start.max_radius);

    match cmd {
        MissionCmd::Run => {
            let pause = hp.pause(timeout)?;
            let resume = hp.resume(timeout)?;
            hp.update_yaw_rate(hp.settings().yaw_rate, hp.settings().clockwise)?;
            let stop = hp.stop(timeout)?;
            emit(json, &serde_json::json!({
                "start": start,
                "pause": pause,
                "resume": resume,
                "stop": stop,
            }))?;
        }
        MissionCmd::Download => {
            let read = hp.download(timeout)?;
            emit(json, &read)?;
        }
    }
    summary(&link);
    Ok(())
}

fn waypoint_cmd(cfg: &Config, cmd: MissionCmd, json: bool) -> Result<()> {
    let wp_cfg = cfg.waypoint.as_ref().context("no [waypoint] config section")?;
    let (init, points) = wp_cfg.mission();
    let timeout = cfg.link.timeout();
    let (link, manager) = connect(cfg)?;

    let code = manager.upload_waypoints(init, &points, timeout)?;
    anyhow::ensure!(
        code.is_success(),
        "waypoint upload rejected: {} ({})",
        code,
        code.message(Some(skylark_proto::MissionKind::Waypoint))
    );
    let wp = manager.waypoint();

    match cmd {
        MissionCmd::Run => {
            let start = wp.start(timeout)?;
            let pause = wp.pause(timeout)?;
            let resume = wp.resume(timeout)?;
            let velocity = wp.read_idle_velocity(timeout)?;
            let stop = wp.stop(timeout)?;
            emit(json, &serde_json::json!({
                "start": start,
                "pause": pause,
                "resume": resume,
                "idle_velocity": velocity,
                "stop": stop,
            }))?;
        }
        MissionCmd::Download => {
            let init = wp.download(timeout)?;
            let mut entries = Vec::with_capacity(points.len());
            for p in &points {
                entries.push(wp.download_index(p.index, timeout)?);
            }
            emit(json, &serde_json::json!({ "init": init, "points": entries }))?;
        }
    }
    summary(&link);
    Ok(())
}

fn emit<T: Serialize + std::fmt::Debug>(json: bool, value: &T) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        info!("{:?}", value);
    }
    Ok(())
}

fn summary(link: &SimLink) {
    let st = link.status();
    info!(
        "link: sent={} fire_and_forget={} replies={} timeouts={} lost={} last_reply_age={:?}",
        st.sent,
        st.fire_and_forget,
        st.replies,
        st.timeouts,
        st.lost,
        st.reply_age().map(|d| d.as_millis())
    );
}
