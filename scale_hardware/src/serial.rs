use scale_traits::{SerialLink, SerialOpener, TransportError};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::read_up_to_with_deadline;

/// Opens real serial ports with 8N1 framing and no flow control.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortOpener;

impl SerialPortOpener {
    pub fn new() -> Self {
        Self
    }
}

impl SerialOpener for SerialPortOpener {
    type Link = SerialPortLink;

    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> std::result::Result<Self::Link, TransportError> {
        let handle = serialport::new(port, baud_rate)
            .timeout(timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|e| HwError::PortUnavailable {
                port: port.to_string(),
                detail: e.to_string(),
            })?;
        // Drop anything a previous owner left in the buffers.
        let _ = handle.clear(ClearBuffer::All);
        debug!(port, baud = baud_rate, "serial port opened");
        Ok(SerialPortLink {
            name: port.to_string(),
            port: Some(handle),
        })
    }
}

pub struct SerialPortLink {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortLink {
    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(HwError::Closed)
    }
}

impl SerialLink for SerialPortLink {
    fn write(&mut self, bytes: &[u8]) -> std::result::Result<(), TransportError> {
        self.port_mut()?.write_all(bytes).map_err(HwError::Io)?;
        Ok(())
    }

    fn flush(&mut self) -> std::result::Result<(), TransportError> {
        self.port_mut()?.flush().map_err(HwError::Io)?;
        Ok(())
    }

    fn read_up_to(
        &mut self,
        max: usize,
        timeout: Duration,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let port = self.port_mut()?;
        let bytes = read_up_to_with_deadline(
            |buf, remaining| {
                port.set_timeout(remaining)?;
                port.read(buf)
            },
            max,
            timeout,
        )?;
        trace!(port = %self.name, bytes = ?bytes, "serial read");
        Ok(bytes)
    }

    fn close(&mut self) -> std::result::Result<(), TransportError> {
        if self.port.take().is_some() {
            debug!(port = %self.name, "serial port closed");
        }
        Ok(())
    }
}

impl Drop for SerialPortLink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

pub fn available_ports() -> Result<Vec<String>> {
    let mut names: Vec<String> = serialport::available_ports()
        .map_err(|e| HwError::Io(e.into()))?
        .into_iter()
        .map(|p| p.port_name)
        .collect();
    names.sort();
    Ok(names)
}
