//! Sequential (port × baud) scan for a live scale.
//!
//! Ports form the outer loop and baud rates the inner loop, both in declared
//! order. The order decides which device wins when several could answer, so
//! probes are never reordered or run in parallel. The first well-formed reply
//! ends the scan.
use crate::config::TimingCfg;
use crate::events::{EventSink, ScaleEvent, Severity};
use crate::frame;
use crate::hw_error::{map_hw_error, map_open_error};
use crate::link::{LinkGuard, exchange};
use crate::types::{DeviceLocation, ProbeResult};
use crate::util::hex;
use scale_traits::{Clock, SerialOpener};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    Found(DeviceLocation),
    NotFound,
}

impl DiscoveryOutcome {
    pub fn location(&self) -> Option<&DeviceLocation> {
        match self {
            DiscoveryOutcome::Found(loc) => Some(loc),
            DiscoveryOutcome::NotFound => None,
        }
    }
}

pub struct Discoverer<O, C> {
    opener: Arc<O>,
    timing: TimingCfg,
    clock: C,
    sink: Arc<dyn EventSink>,
}

impl<O: SerialOpener, C: Clock> Discoverer<O, C> {
    pub fn new(opener: Arc<O>, timing: TimingCfg, clock: C, sink: Arc<dyn EventSink>) -> Self {
        Self {
            opener,
            timing,
            clock,
            sink,
        }
    }

    /// Probe a single combination. The connection is released before returning.
    pub fn probe(&self, port: &str, baud_rate: u32) -> ProbeResult {
        let link = match self
            .opener
            .open(port, baud_rate, self.timing.read_timeout())
        {
            Ok(link) => link,
            Err(e) => return ProbeResult::TransportError(map_open_error(port, &*e).to_string()),
        };
        let mut guard = LinkGuard::new(link, port);
        self.sink
            .log(Severity::Info, format!("Trying {port} at {baud_rate} bps..."));
        match exchange(guard.link_mut(), &self.timing, &self.clock) {
            Ok(reply) if frame::is_confirmation(&reply) => {
                ProbeResult::Found(DeviceLocation::new(port, baud_rate))
            }
            Ok(reply) => {
                debug!(port, baud = baud_rate, bytes = %hex(&reply), "no usable reply");
                ProbeResult::NoResponse
            }
            Err(e) => ProbeResult::TransportError(map_hw_error(&*e).to_string()),
        }
    }

    /// Scan `ports` × `baud_rates` and return the first confirmed location.
    pub fn discover(&self, ports: &[String], baud_rates: &[u32]) -> DiscoveryOutcome {
        self.sink
            .log(Severity::Info, "Searching for scale...".to_string());
        for port in ports {
            for &baud in baud_rates {
                debug!(port = %port, baud, "probing");
                match self.probe(port, baud) {
                    ProbeResult::Found(location) => {
                        info!(port = %location.port, baud = location.baud_rate, "scale found");
                        self.sink.log(
                            Severity::Success,
                            format!("Scale found on {port} at {baud} bps!"),
                        );
                        self.sink.emit(ScaleEvent::DeviceFound(location.clone()));
                        return DiscoveryOutcome::Found(location);
                    }
                    ProbeResult::NoResponse => {}
                    ProbeResult::TransportError(detail) => {
                        warn!(port = %port, baud, error = %detail, "probe skipped");
                        self.sink.log(
                            Severity::Warning,
                            format!("Error accessing {port} ({detail}). Continuing..."),
                        );
                    }
                }
            }
        }
        info!(
            tried = ports.len() * baud_rates.len(),
            "no scale answered"
        );
        self.sink.log(Severity::Error, "No scale found.".to_string());
        self.sink.emit(ScaleEvent::DeviceNotFound);
        DiscoveryOutcome::NotFound
    }
}
