//! Conversions from `scale_config` TOML types to runtime config.

use crate::config::{EngineCfg, SerialCfg, TimingCfg};

impl From<&scale_config::Serial> for SerialCfg {
    fn from(s: &scale_config::Serial) -> Self {
        Self {
            ports: s.ports.clone(),
            baud_rates: s.baud_rates.clone(),
        }
    }
}

impl From<&scale_config::Timing> for TimingCfg {
    fn from(t: &scale_config::Timing) -> Self {
        Self {
            settle_ms: t.settle_ms,
            read_timeout_ms: t.read_timeout_ms,
            session_budget_ms: t.session_budget_ms,
        }
    }
}

impl From<&scale_config::Config> for EngineCfg {
    fn from(c: &scale_config::Config) -> Self {
        Self {
            serial: (&c.serial).into(),
            timing: (&c.timing).into(),
        }
    }
}
