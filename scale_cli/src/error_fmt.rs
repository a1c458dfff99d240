//! Human-readable error descriptions and structured JSON error formatting.

use scale_core::ScaleError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(se) = err.downcast_ref::<ScaleError>() {
        return match se {
            ScaleError::DeviceNotFound { tried } => format!(
                "What happened: No scale answered on any of the {tried} port/baud combinations tried.\nLikely causes: Scale switched off or unplugged, wrong candidate ports, or a baud rate missing from the list.\nHow to fix: Check the cable and power, then list the ports with `scale_cli list-ports` and set [serial] ports/baud_rates (or --ports/--bauds)."
            ),
            ScaleError::NoDeviceKnown => {
                "What happened: No scale has been detected yet.\nLikely causes: A manual read was requested before discovery found a scale.\nHow to fix: Run discovery first (`scale_cli read --discover`) or pass --port and --baud.".to_string()
            }
            ScaleError::TransportUnavailable { port, detail } => format!(
                "What happened: Serial port {port} could not be opened ({detail}).\nLikely causes: Port in use by another program, missing device, or insufficient permissions.\nHow to fix: Close other programs using the port, check the device name, and make sure your user may access serial devices."
            ),
            ScaleError::Transport(detail) => format!(
                "What happened: Communication with the scale failed ({detail}).\nLikely causes: Cable unplugged or the scale was switched off during the exchange.\nHow to fix: Reconnect the scale and run discovery again."
            ),
            ScaleError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML or SCALE_* environment.\nHow to fix: Edit the config file, then rerun."
            ),
            ScaleError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: The requested action conflicts with a discovery or session already in progress.\nHow to fix: Wait for the running operation to finish or stop it first."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration")
        || lower.contains("parse config")
        || lower.contains("read config")
    {
        return format!(
            "What happened: Configuration is invalid or unreadable ({msg}).\nLikely causes: Typo in the TOML, wrong value type, or an out-of-range value.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("environment override") {
        return format!(
            "What happened: An environment override could not be parsed ({msg}).\nLikely causes: A SCALE_* variable holds text where a number is expected.\nHow to fix: Fix or unset the variable."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {err}"
    )
}

/// Stable exit codes per error kind; anything untyped is 1 (clap usage errors exit 2).
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::DeviceNotFound { .. }) => 3,
        Some(ScaleError::NoDeviceKnown) => 4,
        Some(ScaleError::Transport(_) | ScaleError::TransportUnavailable { .. }) => 5,
        _ => 1,
    }
}

/// Stable name of the error kind for JSON output.
pub fn error_reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::DeviceNotFound { .. }) => "DeviceNotFound",
        Some(ScaleError::NoDeviceKnown) => "NoDeviceKnown",
        Some(ScaleError::TransportUnavailable { .. }) => "TransportUnavailable",
        Some(ScaleError::Transport(_)) => "Transport",
        Some(ScaleError::State(_)) => "State",
        Some(ScaleError::Config(_)) => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = error_reason_name(err);
    let msg = humanize(err);
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::DeviceNotFound { tried }) => {
            json!({ "reason": reason, "details": { "tried": tried }, "message": msg })
        }
        Some(ScaleError::TransportUnavailable { port, detail }) => json!({
            "reason": reason,
            "details": { "port": port, "detail": detail },
            "message": msg
        }),
        _ => json!({ "reason": reason, "message": msg }),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        let cases = [
            (ScaleError::DeviceNotFound { tried: 4 }, 3),
            (ScaleError::NoDeviceKnown, 4),
            (ScaleError::Transport("x".into()), 5),
            (
                ScaleError::TransportUnavailable {
                    port: "COM1".into(),
                    detail: "busy".into(),
                },
                5,
            ),
            (ScaleError::State("x".into()), 1),
        ];
        for (e, code) in cases {
            assert_eq!(exit_code_for_error(&eyre::Report::new(e)), code);
        }
        assert_eq!(exit_code_for_error(&eyre::eyre!("plain")), 1);
    }

    #[test]
    fn humanize_explains_typed_errors() {
        let msg = humanize(&eyre::Report::new(ScaleError::NoDeviceKnown));
        assert!(msg.starts_with("What happened: No scale has been detected yet."));
        assert!(msg.contains("How to fix"));
    }

    #[test]
    fn fix_hints_name_the_installed_binary() {
        let not_found = humanize(&eyre::Report::new(ScaleError::DeviceNotFound { tried: 2 }));
        assert!(not_found.contains("`scale_cli list-ports`"));
        let unknown = humanize(&eyre::Report::new(ScaleError::NoDeviceKnown));
        assert!(unknown.contains("`scale_cli read --discover`"));
        assert_eq!(env!("CARGO_PKG_NAME"), "scale_cli");
    }

    #[test]
    fn humanize_recognises_config_errors() {
        let err = eyre::eyre!("serial.baud_rates must be > 0").wrap_err("invalid configuration");
        let msg = humanize(&err);
        assert!(msg.contains("Configuration is invalid"));
        assert!(msg.contains("baud_rates"));
    }

    #[test]
    fn json_error_carries_reason_and_details() {
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&eyre::Report::new(
            ScaleError::DeviceNotFound { tried: 6 },
        )))
        .unwrap();
        assert_eq!(v["reason"], "DeviceNotFound");
        assert_eq!(v["details"]["tried"], 6);
        assert!(v["message"].as_str().unwrap().contains("6 port/baud"));
    }
}
