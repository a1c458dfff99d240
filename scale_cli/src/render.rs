//! Prints engine events on stdout: the user-facing log panel and weight display.

use crossbeam_channel as xch;
use scale_core::util::hex;
use scale_core::{ReadingSource, ScaleEvent, Severity};
use serde_json::json;
use std::io::Write;
use std::thread::JoinHandle;

fn severity_name(s: Severity) -> &'static str {
    match s {
        Severity::Info => "info",
        Severity::Success => "success",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

fn source_name(s: ReadingSource) -> &'static str {
    match s {
        ReadingSource::Continuous => "continuous",
        ReadingSource::Manual => "manual",
    }
}

/// One JSON object per event.
pub fn event_json(event: &ScaleEvent) -> serde_json::Value {
    match event {
        ScaleEvent::Log { severity, message } => json!({
            "event": "log",
            "severity": severity_name(*severity),
            "message": message,
        }),
        ScaleEvent::WeightChanged { reading, source } => json!({
            "event": "weight",
            "weight": reading.weight().as_str(),
            "available": reading.weight().is_available(),
            "source": source_name(*source),
            "raw": hex(reading.raw_payload()),
        }),
        ScaleEvent::DeviceFound(location) => json!({
            "event": "device_found",
            "port": location.port,
            "baud": location.baud_rate,
        }),
        ScaleEvent::DeviceNotFound => json!({ "event": "device_not_found" }),
        ScaleEvent::SessionTerminated(reason) => json!({
            "event": "session_terminated",
            "reason": reason.name(),
            "message": reason.to_string(),
        }),
    }
}

/// Text line for an event, `None` when the log panel already shows it.
pub fn event_text(event: &ScaleEvent) -> Option<String> {
    match event {
        ScaleEvent::Log { severity, message } => Some(match severity {
            Severity::Info => message.clone(),
            Severity::Success => format!("OK    {message}"),
            Severity::Warning => format!("WARN  {message}"),
            Severity::Error => format!("ERROR {message}"),
        }),
        ScaleEvent::SessionTerminated(reason) => Some(format!("Session ended: {reason}")),
        ScaleEvent::WeightChanged { .. } | ScaleEvent::DeviceFound(_) | ScaleEvent::DeviceNotFound => {
            None
        }
    }
}

/// Print events until every sender is gone.
pub fn spawn_printer(rx: xch::Receiver<ScaleEvent>, json: bool) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let stdout = std::io::stdout();
        for event in rx.iter() {
            let line = if json {
                Some(event_json(&event).to_string())
            } else {
                event_text(&event)
            };
            if let Some(line) = line {
                let mut out = stdout.lock();
                // A closed stdout (e.g. `| head`) must not take the engine down.
                let _ = writeln!(out, "{line}");
                let _ = out.flush();
            }
        }
    })
}
