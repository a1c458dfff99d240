//! Serial transport backends for the scale engine.
//!
//! - `SimulatedOpener`: an in-process virtual scale, used by default builds and tests.
//! - `serial::SerialPortOpener`: real RS-232/USB ports via the `serialport` crate
//!   (feature `hardware`).
pub mod error;
pub mod util;

#[cfg(feature = "hardware")]
pub mod serial;

use scale_traits::{SerialLink, SerialOpener, TransportError};
use std::time::Duration;
use tracing::trace;

use crate::error::HwError;

/// Start-of-text byte the simulated scale puts before the weight digits.
pub const SIM_LEAD: u8 = 0x02;
/// End-of-text byte the simulated scale puts after the weight digits.
pub const SIM_TRAIL: u8 = 0x03;

/// Where and how the virtual scale answers.
#[derive(Debug, Clone)]
pub struct VirtualScale {
    /// Port the scale is attached to.
    pub port: String,
    /// The only baud rate at which the scale answers intelligibly.
    pub baud_rate: u32,
    /// Ports that exist on the simulated host. Opening anything else fails.
    /// Empty means every port opens (and stays silent unless it is `port`).
    pub present_ports: Vec<String>,
    /// Weight texts replied in turn, cycling.
    pub weights: Vec<String>,
    /// Number of replies after which each connection reports a disconnect.
    pub fail_after: Option<usize>,
}

impl Default for VirtualScale {
    fn default() -> Self {
        Self {
            port: "COM3".to_string(),
            baud_rate: 9600,
            present_ports: Vec::new(),
            weights: vec!["01250".to_string()],
            fail_after: None,
        }
    }
}

/// Opens links to a `VirtualScale`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedOpener {
    scale: VirtualScale,
}

impl SimulatedOpener {
    pub fn new(scale: VirtualScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> &VirtualScale {
        &self.scale
    }
}

impl SerialOpener for SimulatedOpener {
    type Link = SimulatedLink;

    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        _timeout: Duration,
    ) -> Result<Self::Link, TransportError> {
        let present = self.scale.present_ports.is_empty()
            || self.scale.present_ports.iter().any(|p| p == port)
            || self.scale.port == port;
        if !present {
            return Err(Box::new(HwError::PortUnavailable {
                port: port.to_string(),
                detail: "no such device".to_string(),
            }));
        }
        let live = self.scale.port == port && self.scale.baud_rate == baud_rate;
        Ok(SimulatedLink {
            live,
            baud_rate,
            weights: self.scale.weights.clone(),
            fail_after: self.scale.fail_after,
            replies: 0,
            pending: false,
            flushed: false,
            open: true,
        })
    }
}

/// One connection to the virtual scale.
#[derive(Debug)]
pub struct SimulatedLink {
    live: bool,
    baud_rate: u32,
    weights: Vec<String>,
    fail_after: Option<usize>,
    replies: usize,
    pending: bool,
    flushed: bool,
    open: bool,
}

impl SimulatedLink {
    fn frame(&self) -> Vec<u8> {
        let weight = if self.weights.is_empty() {
            ""
        } else {
            self.weights[self.replies % self.weights.len()].as_str()
        };
        let mut out = Vec::with_capacity(weight.len() + 2);
        out.push(SIM_LEAD);
        out.extend_from_slice(weight.as_bytes());
        out.push(SIM_TRAIL);
        out
    }

    /// Bytes a mismatched baud rate turns the reply into: a single garbage byte.
    fn garbled(&self) -> Vec<u8> {
        vec![(self.baud_rate % 251) as u8 | 0x80]
    }
}

impl SerialLink for SimulatedLink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(Box::new(HwError::Closed));
        }
        if bytes.contains(&0x05) {
            self.pending = true;
            self.flushed = false;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        if !self.open {
            return Err(Box::new(HwError::Closed));
        }
        self.flushed = self.pending;
        Ok(())
    }

    fn read_up_to(&mut self, max: usize, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(Box::new(HwError::Closed));
        }
        if !(self.pending && self.flushed) {
            return Ok(Vec::new());
        }
        self.pending = false;
        self.flushed = false;
        if let Some(limit) = self.fail_after
            && self.replies >= limit
        {
            return Err(Box::new(HwError::Disconnected(
                "virtual scale unplugged".to_string(),
            )));
        }
        let mut reply = if self.live { self.frame() } else { self.garbled() };
        self.replies += 1;
        reply.truncate(max);
        trace!(bytes = ?reply, "simulated reply");
        Ok(reply)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }
}

/// List the serial ports the OS reports, sorted by name.
#[cfg(feature = "hardware")]
pub fn available_ports() -> error::Result<Vec<String>> {
    serial::available_ports()
}

/// Without the `hardware` feature there is no OS enumeration.
#[cfg(not(feature = "hardware"))]
pub fn available_ports() -> error::Result<Vec<String>> {
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(10);

    fn request(link: &mut SimulatedLink) -> Vec<u8> {
        link.write(&[0x05]).unwrap();
        link.flush().unwrap();
        link.read_up_to(7, T).unwrap()
    }

    #[test]
    fn live_combination_replies_with_framed_weight() {
        let opener = SimulatedOpener::default();
        let mut link = opener.open("COM3", 9600, T).unwrap();
        assert_eq!(request(&mut link), b"\x0201250\x03".to_vec());
    }

    #[test]
    fn wrong_baud_returns_single_garbage_byte() {
        let opener = SimulatedOpener::default();
        let mut link = opener.open("COM3", 2400, T).unwrap();
        assert_eq!(request(&mut link).len(), 1);
    }

    #[test]
    fn silent_without_flushed_request() {
        let opener = SimulatedOpener::default();
        let mut link = opener.open("COM3", 9600, T).unwrap();
        assert!(link.read_up_to(7, T).unwrap().is_empty());
        link.write(&[0x05]).unwrap();
        assert!(link.read_up_to(7, T).unwrap().is_empty());
    }

    #[test]
    fn absent_port_fails_to_open() {
        let opener = SimulatedOpener::new(VirtualScale {
            present_ports: vec!["COM3".to_string()],
            ..VirtualScale::default()
        });
        let err = opener.open("COM1", 9600, T).unwrap_err();
        assert!(err.to_string().contains("COM1"));
        assert!(err.downcast_ref::<HwError>().is_some());
    }

    #[test]
    fn weights_cycle_and_disconnect_after_limit() {
        let opener = SimulatedOpener::new(VirtualScale {
            weights: vec!["00100".to_string(), "00200".to_string()],
            fail_after: Some(2),
            ..VirtualScale::default()
        });
        let mut link = opener.open("COM3", 9600, T).unwrap();
        assert_eq!(request(&mut link), b"\x0200100\x03".to_vec());
        assert_eq!(request(&mut link), b"\x0200200\x03".to_vec());
        link.write(&[0x05]).unwrap();
        link.flush().unwrap();
        let err = link.read_up_to(7, T).unwrap_err();
        assert!(err.to_string().contains("disconnected"));
    }

    #[test]
    fn closed_link_rejects_io_and_close_is_idempotent() {
        let opener = SimulatedOpener::default();
        let mut link = opener.open("COM3", 9600, T).unwrap();
        link.close().unwrap();
        link.close().unwrap();
        assert!(link.write(&[0x05]).is_err());
    }
}
