//! Fixed delays between bulk mutations.

use std::time::Duration;

use keystone_common::config::PacingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub role_settle: Duration,
    pub role_step: Duration,
    pub category_settle: Duration,
    pub channel_settle: Duration,
    pub channel_step: Duration,
    pub creation_settle: Duration,
    pub reposition_settle: Duration,
}

impl Pacing {
    /// No delays at all. Used by tests and dry tooling.
    pub const fn none() -> Self {
        Self {
            role_settle: Duration::ZERO,
            role_step: Duration::ZERO,
            category_settle: Duration::ZERO,
            channel_settle: Duration::ZERO,
            channel_step: Duration::ZERO,
            creation_settle: Duration::ZERO,
            reposition_settle: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            role_settle: Duration::from_millis(2000),
            role_step: Duration::from_millis(300),
            category_settle: Duration::from_millis(1000),
            channel_settle: Duration::from_millis(1000),
            channel_step: Duration::from_millis(200),
            creation_settle: Duration::from_millis(2000),
            reposition_settle: Duration::from_millis(1000),
        }
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(cfg: &PacingConfig) -> Self {
        Self {
            role_settle: Duration::from_millis(cfg.role_settle_ms),
            role_step: Duration::from_millis(cfg.role_step_ms),
            category_settle: Duration::from_millis(cfg.category_settle_ms),
            channel_settle: Duration::from_millis(cfg.channel_settle_ms),
            channel_step: Duration::from_millis(cfg.channel_step_ms),
            creation_settle: Duration::from_millis(cfg.creation_settle_ms),
            reposition_settle: Duration::from_millis(cfg.reposition_settle_ms),
        }
    }
}

pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
