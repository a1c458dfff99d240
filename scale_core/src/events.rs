//! Observational events delivered to the presentation layer as they happen.
use crate::status::TerminationReason;
use crate::types::{DeviceLocation, Reading};
use crossbeam_channel as xch;

/// Severity of a log line; doubles as a colour hint for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Whether a reading came from the continuous loop or a manual request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingSource {
    Continuous,
    Manual,
}

#[derive(Debug, Clone)]
pub enum ScaleEvent {
    Log { severity: Severity, message: String },
    WeightChanged { reading: Reading, source: ReadingSource },
    DeviceFound(DeviceLocation),
    DeviceNotFound,
    SessionTerminated(TerminationReason),
}

/// Receiver of engine events. Implementations must not block for long; they
/// are called from the discovery and polling threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ScaleEvent);

    fn log(&self, severity: Severity, message: String) {
        self.emit(ScaleEvent::Log { severity, message });
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ScaleEvent) {}
}

impl EventSink for xch::Sender<ScaleEvent> {
    fn emit(&self, event: ScaleEvent) {
        // A gone receiver just means nobody is watching any more.
        let _ = self.send(event);
    }
}
