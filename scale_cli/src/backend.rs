//! Transport selection: the `serialport` backend with feature `hardware`,
//! otherwise the in-process virtual scale configured from `SCALE_SIM_*`.

/// Port the virtual scale is attached to.
pub const ENV_SIM_PORT: &str = "SCALE_SIM_PORT";
/// Baud rate the virtual scale answers at.
pub const ENV_SIM_BAUD: &str = "SCALE_SIM_BAUD";
/// Comma separated weight texts the virtual scale replies in turn.
pub const ENV_SIM_WEIGHT: &str = "SCALE_SIM_WEIGHT";
/// Replies per connection before the virtual scale "unplugs".
pub const ENV_SIM_FAIL_AFTER: &str = "SCALE_SIM_FAIL_AFTER";

#[cfg(feature = "hardware")]
pub type Opener = scale_hardware::serial::SerialPortOpener;

#[cfg(not(feature = "hardware"))]
pub type Opener = scale_hardware::SimulatedOpener;

#[cfg(feature = "hardware")]
pub fn opener() -> eyre::Result<Opener> {
    Ok(scale_hardware::serial::SerialPortOpener::new())
}

#[cfg(not(feature = "hardware"))]
pub fn opener() -> eyre::Result<Opener> {
    let scale = virtual_scale(|k| std::env::var(k).ok())?;
    tracing::debug!(port = %scale.port, baud = scale.baud_rate, "using simulated scale");
    Ok(scale_hardware::SimulatedOpener::new(scale))
}

/// Build the virtual scale from `SCALE_SIM_*` values looked up through `var`.
#[cfg_attr(feature = "hardware", allow(dead_code))]
pub fn virtual_scale(
    var: impl Fn(&str) -> Option<String>,
) -> eyre::Result<scale_hardware::VirtualScale> {
    let mut scale = scale_hardware::VirtualScale::default();
    if let Some(port) = var(ENV_SIM_PORT) {
        scale.port = port.trim().to_string();
    }
    if let Some(baud) = var(ENV_SIM_BAUD) {
        scale.baud_rate = baud
            .trim()
            .parse()
            .map_err(|e| eyre::eyre!("{ENV_SIM_BAUD}={baud:?}: {e}"))?;
    }
    if let Some(weights) = var(ENV_SIM_WEIGHT) {
        scale.weights = weights.split(',').map(|w| w.trim().to_string()).collect();
    }
    if let Some(n) = var(ENV_SIM_FAIL_AFTER) {
        scale.fail_after = Some(
            n.trim()
                .parse()
                .map_err(|e| eyre::eyre!("{ENV_SIM_FAIL_AFTER}={n:?}: {e}"))?,
        );
    }
    Ok(scale)
}
