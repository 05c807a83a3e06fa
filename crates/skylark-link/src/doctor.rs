use anyhow::Result;
use crate::LinkConfig;

pub fn check_link(cfg: &LinkConfig) -> Result<()> {
    let drop_rate = cfg.drop_rate.unwrap_or(0.0);
    anyhow::ensure!((0.0..1.0).contains(&drop_rate), "link.drop_rate should be 0.0..1.0");
    anyhow::ensure!(cfg.latency_ms.unwrap_or(0) < 1000, "link.latency_ms too high (>= 1s never answers a control command)");
    anyhow::ensure!(cfg.timeout_s.unwrap_or(2) >= 1, "link.timeout_s must be >= 1");
    Ok(())
}
