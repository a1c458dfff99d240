use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("port {port} unavailable: {detail}")]
    PortUnavailable { port: String, detail: String },
    #[error("device disconnected: {0}")]
    Disconnected(String),
    #[error("connection already closed")]
    Closed,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
