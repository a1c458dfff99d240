pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// Boxed error used at the transport trait boundary.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// An open, exclusively owned serial connection.
pub trait SerialLink: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
    fn flush(&mut self) -> Result<(), TransportError>;
    /// Read at most `max` bytes, returning early (possibly empty) when `timeout` expires.
    fn read_up_to(&mut self, max: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;
    /// Release the connection. Must be idempotent and safe on error paths.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Factory for serial connections addressed by port name and baud rate.
pub trait SerialOpener: Send + Sync {
    type Link: SerialLink + 'static;

    fn open(&self, port: &str, baud_rate: u32, timeout: Duration)
    -> Result<Self::Link, TransportError>;
}
