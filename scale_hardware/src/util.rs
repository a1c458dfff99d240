use std::io::ErrorKind;
use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Accumulate up to `max` bytes from `read_chunk` until the buffer is full or
/// `timeout` expires. The closure receives the remaining budget so backends can
/// bound each blocking call. A timeout is not an error: whatever arrived is
/// returned, possibly empty.
pub fn read_up_to_with_deadline(
    mut read_chunk: impl FnMut(&mut [u8], Duration) -> std::io::Result<usize>,
    max: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::with_capacity(max);
    let mut chunk = vec![0u8; max];
    while out.len() < max {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let want = max - out.len();
        match read_chunk(&mut chunk[..want], remaining) {
            // Nothing pending; the backend returned without blocking.
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&chunk[..n.min(want)]),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                break;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof
                ) =>
            {
                return Err(HwError::Disconnected(e.to_string()));
            }
            Err(e) => return Err(HwError::Io(e)),
        }
    }
    Ok(out)
}
