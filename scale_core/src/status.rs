//! Why a continuous polling session ended.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The session outlived its configured budget.
    TimeBudgetExpired,
    /// `stop` was requested by the owner of the session.
    StoppedByCaller,
    /// The connection failed; the detail is the transport's message.
    TransportError(String),
}

impl TerminationReason {
    /// Stable name for logs and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            TerminationReason::TimeBudgetExpired => "TimeBudgetExpired",
            TerminationReason::StoppedByCaller => "StoppedByCaller",
            TerminationReason::TransportError(_) => "TransportError",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::TimeBudgetExpired => f.write_str("time budget expired"),
            TerminationReason::StoppedByCaller => f.write_str("stopped by caller"),
            TerminationReason::TransportError(detail) => write!(f, "transport error: {detail}"),
        }
    }
}
