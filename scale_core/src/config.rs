//! Runtime configuration for the discovery and polling engine.
//!
//! These are the structs consumed by `Discoverer`, `Poller` and
//! `ScaleController`. They are separate from the TOML-deserialized config in
//! `scale_config`; see `conversions` for the mapping.
use std::time::Duration;

/// Candidate addresses, probed port-major in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialCfg {
    pub ports: Vec<String>,
    pub baud_rates: Vec<u32>,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            ports: scale_config::default_ports(),
            baud_rates: vec![2400, 9600],
        }
    }
}

impl SerialCfg {
    /// Number of (port, baud) combinations a full discovery run tries.
    pub fn combinations(&self) -> usize {
        self.ports.len() * self.baud_rates.len()
    }
}

/// Protocol timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingCfg {
    /// Wait between the request and the read. A property of the scale
    /// hardware, not a tuning knob.
    pub settle_ms: u64,
    /// Per-read and per-open timeout.
    pub read_timeout_ms: u64,
    /// Budget of one continuous session.
    pub session_budget_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            read_timeout_ms: 1000,
            session_budget_ms: 30_000,
        }
    }
}

impl TimingCfg {
    #[inline]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    #[inline]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[inline]
    pub fn session_budget(&self) -> Duration {
        Duration::from_millis(self.session_budget_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineCfg {
    pub serial: SerialCfg,
    pub timing: TimingCfg,
}
