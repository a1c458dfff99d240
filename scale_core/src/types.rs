//! Plain data exchanged between the discoverer, the poller, and callers.

use crate::frame::{WeightText, parse_weight};
use std::fmt;
use std::time::Instant;

/// A confirmed live scale: where it is and how fast it talks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceLocation {
    pub port: String,
    pub baud_rate: u32,
}

impl DeviceLocation {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }
}

impl fmt::Display for DeviceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bps)", self.port, self.baud_rate)
    }
}

/// Outcome of probing one (port, baud) combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Found(DeviceLocation),
    NoResponse,
    TransportError(String),
}

/// One parsed weight observation. The weight is always derived from the raw
/// payload, so neither can be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    raw_payload: Vec<u8>,
    weight: WeightText,
    timestamp: Instant,
}

impl Reading {
    pub fn from_payload(raw_payload: Vec<u8>, timestamp: Instant) -> Self {
        let weight = parse_weight(&raw_payload);
        Self {
            raw_payload,
            weight,
            timestamp,
        }
    }

    pub fn raw_payload(&self) -> &[u8] {
        &self.raw_payload
    }

    pub fn weight(&self) -> &WeightText {
        &self.weight
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}
