//! Scoped ownership of a serial connection and the shared request cycle.

use crate::config::TimingCfg;
use crate::frame::{REPLY_WINDOW, REQUEST_WEIGHT};
use crate::util::hex;
use scale_traits::{Clock, SerialLink, TransportError};

/// Owns an open link and closes it when dropped, on every exit path.
pub struct LinkGuard<L: SerialLink> {
    link: L,
    port: String,
}

impl<L: SerialLink> LinkGuard<L> {
    pub fn new(link: L, port: &str) -> Self {
        Self {
            link,
            port: port.to_string(),
        }
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

impl<L: SerialLink> Drop for LinkGuard<L> {
    fn drop(&mut self) {
        match self.link.close() {
            Ok(()) => tracing::trace!(port = %self.port, "link released"),
            Err(e) => tracing::warn!(port = %self.port, error = %e, "closing link failed"),
        }
    }
}

/// One request/settle/read cycle: send the weight request, flush, wait the
/// settle delay (not interruptible), then read up to `REPLY_WINDOW` bytes.
pub fn exchange<L: SerialLink + ?Sized, C: Clock>(
    link: &mut L,
    timing: &TimingCfg,
    clock: &C,
) -> Result<Vec<u8>, TransportError> {
    link.write(&[REQUEST_WEIGHT])?;
    link.flush()?;
    clock.sleep(timing.settle());
    let reply = link.read_up_to(REPLY_WINDOW, timing.read_timeout())?;
    tracing::trace!(bytes = %hex(&reply), "reply");
    Ok(reply)
}
