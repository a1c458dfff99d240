use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScaleError {
    /// Port busy or missing. Skipped during discovery, fatal elsewhere.
    #[error("port {port} unavailable: {detail}")]
    TransportUnavailable { port: String, detail: String },
    /// An open connection failed mid-exchange (e.g. device unplugged).
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no scale detected; run discovery first")]
    NoDeviceKnown,
    #[error("no scale answered on any of {tried} port/baud combinations")]
    DeviceNotFound { tried: usize },
    #[error("invalid state: {0}")]
    State(String),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
