#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the scale reader.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every key is optional; defaults reproduce the reference scale setup
//!   (bauds 2400/9600, 500 ms settle, 1 s read timeout, 30 s sessions).
//! - `apply_env` layers `SCALE_*` environment overrides on top of the file.
use serde::Deserialize;
use serde::de::Deserializer;

/// Ports probed when nothing else is configured.
#[must_use]
pub fn default_ports() -> Vec<String> {
    if cfg!(windows) {
        (1..=10).map(|i| format!("COM{i}")).collect()
    } else {
        (0..5)
            .map(|i| format!("/dev/ttyUSB{i}"))
            .chain((0..5).map(|i| format!("/dev/ttyS{i}")))
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Serial {
    /// Candidate ports, probed in this order.
    #[serde(deserialize_with = "de_ports")]
    pub ports: Vec<String>,
    /// Candidate baud rates, probed in this order for every port.
    pub baud_rates: Vec<u32>,
    /// Append the ports the OS reports (hardware builds) after `ports`.
    pub use_available_ports: bool,
}

impl Default for Serial {
    fn default() -> Self {
        Self {
            ports: default_ports(),
            baud_rates: vec![2400, 9600],
            use_available_ports: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Timing {
    /// Wait between sending the request and reading the reply (ms).
    /// Also accepts alias "settle_delay_ms".
    #[serde(alias = "settle_delay_ms")]
    pub settle_ms: u64,
    /// Per-read timeout, also used when opening ports (ms).
    pub read_timeout_ms: u64,
    /// Wall-clock budget of one continuous polling session (ms).
    pub session_budget_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            read_timeout_ms: 1000,
            session_budget_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub serial: Serial,
    pub timing: Timing,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

/// Accepts either an array of names or a single comma separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortsToml {
    List(Vec<String>),
    Joined(String),
}

fn de_ports<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PortsToml::deserialize(deserializer)? {
        PortsToml::List(v) => v,
        PortsToml::Joined(s) => split_list(&s),
    })
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_u64(key: &str, raw: &str) -> eyre::Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| eyre::eyre!("{key}={raw:?} is not a non-negative integer: {e}"))
}

pub const ENV_PORTS: &str = "SCALE_PORTS";
pub const ENV_BAUD_RATES: &str = "SCALE_BAUD_RATES";
pub const ENV_SETTLE_MS: &str = "SCALE_SETTLE_MS";
pub const ENV_READ_TIMEOUT_MS: &str = "SCALE_READ_TIMEOUT_MS";
pub const ENV_SESSION_BUDGET_MS: &str = "SCALE_SESSION_BUDGET_MS";

impl Config {
    /// Apply `SCALE_*` overrides looked up through `var` (normally `std::env::var`).
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> eyre::Result<()> {
        if let Some(v) = var(ENV_PORTS) {
            self.serial.ports = split_list(&v);
        }
        if let Some(v) = var(ENV_BAUD_RATES) {
            self.serial.baud_rates = split_list(&v)
                .iter()
                .map(|b| {
                    b.parse::<u32>()
                        .map_err(|e| eyre::eyre!("{ENV_BAUD_RATES} entry {b:?}: {e}"))
                })
                .collect::<eyre::Result<Vec<u32>>>()?;
        }
        if let Some(v) = var(ENV_SETTLE_MS) {
            self.timing.settle_ms = parse_u64(ENV_SETTLE_MS, &v)?;
        }
        if let Some(v) = var(ENV_READ_TIMEOUT_MS) {
            self.timing.read_timeout_ms = parse_u64(ENV_READ_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = var(ENV_SESSION_BUDGET_MS) {
            self.timing.session_budget_ms = parse_u64(ENV_SESSION_BUDGET_MS, &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.ports.is_empty() && !self.serial.use_available_ports {
            eyre::bail!("serial.ports must list at least one port");
        }
        if self.serial.ports.iter().any(|p| p.trim().is_empty()) {
            eyre::bail!("serial.ports must not contain blank names");
        }
        for (i, p) in self.serial.ports.iter().enumerate() {
            if self.serial.ports[..i].contains(p) {
                eyre::bail!("serial.ports lists {p:?} more than once");
            }
        }
        if self.serial.baud_rates.is_empty() {
            eyre::bail!("serial.baud_rates must list at least one rate");
        }
        if self.serial.baud_rates.contains(&0) {
            eyre::bail!("serial.baud_rates must be > 0");
        }
        for (i, b) in self.serial.baud_rates.iter().enumerate() {
            if self.serial.baud_rates[..i].contains(b) {
                eyre::bail!("serial.baud_rates lists {b} more than once");
            }
        }

        // Timing
        if self.timing.read_timeout_ms == 0 {
            eyre::bail!("timing.read_timeout_ms must be >= 1");
        }
        if self.timing.session_budget_ms == 0 {
            eyre::bail!("timing.session_budget_ms must be >= 1");
        }
        if self.timing.settle_ms > 60_000 {
            eyre::bail!("timing.settle_ms is unreasonably large (>60s)");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {r:?}");
        }

        Ok(())
    }
}
