//! Continuous and manual weight polling.
//!
//! A continuous session runs on its own thread and owns one connection for its
//! whole life. Each iteration checks the stop flag, then the time budget, then
//! performs one request/settle/read cycle and emits a `Reading`. Stop requests
//! are therefore observed at iteration boundaries, never mid-write.
//!
//! Manual reads open their own short-lived connection and never touch the
//! session's.
//!
//! Dropping a `SessionHandle` requests stop and joins the thread, so sessions
//! cannot leak.
use crate::config::TimingCfg;
use crate::error::{Result, ScaleError};
use crate::events::{EventSink, ReadingSource, ScaleEvent, Severity};
use crate::hw_error::{map_hw_error, map_open_error};
use crate::link::{LinkGuard, exchange};
use crate::status::TerminationReason;
use crate::types::{DeviceLocation, Reading};
use scale_traits::{Clock, SerialOpener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// State of one continuous run. The cancel flag is shared with its stoppers.
#[derive(Debug)]
pub struct PollingSession {
    location: DeviceLocation,
    started_at: Instant,
    cancelled: Arc<AtomicBool>,
}

impl PollingSession {
    pub fn new(location: DeviceLocation, started_at: Instant) -> Self {
        Self {
            location,
            started_at,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn location(&self) -> &DeviceLocation {
        &self.location
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn stopper(&self) -> SessionStopper {
        SessionStopper {
            cancelled: self.cancelled.clone(),
        }
    }
}

/// Cloneable stop capability for a session, e.g. for a signal handler.
#[derive(Debug, Clone)]
pub struct SessionStopper {
    cancelled: Arc<AtomicBool>,
}

impl SessionStopper {
    /// Request termination. Returns `true` only for the call that set the flag.
    pub fn stop(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Owner's handle on a running session.
pub struct SessionHandle {
    location: DeviceLocation,
    stopper: SessionStopper,
    join_handle: Option<JoinHandle<TerminationReason>>,
}

impl SessionHandle {
    pub fn location(&self) -> &DeviceLocation {
        &self.location
    }

    /// Ask the loop to finish its current iteration and exit. Idempotent.
    pub fn stop(&self) {
        if self.stopper.stop() {
            debug!(port = %self.location.port, "session stop requested");
        }
    }

    pub fn stopper(&self) -> SessionStopper {
        self.stopper.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }

    /// Wait for the session thread and return why it ended.
    pub fn join(mut self) -> Result<TerminationReason> {
        let handle = self
            .join_handle
            .take()
            .ok_or_else(|| ScaleError::State("session already joined".to_string()))?;
        handle.join().map_err(|_| {
            eyre::Report::new(ScaleError::State("polling thread panicked".to_string()))
        })
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stopper.stop();
        // The thread exits after its current cycle: settle delay plus read timeout at worst.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(reason) => tracing::trace!(%reason, "poller thread joined"),
                Err(e) => tracing::warn!(?e, "poller thread panicked during shutdown"),
            }
        }
    }
}

pub struct Poller<O, C> {
    opener: Arc<O>,
    timing: TimingCfg,
    clock: C,
    sink: Arc<dyn EventSink>,
}

impl<O, C: Clone> Clone for Poller<O, C> {
    fn clone(&self) -> Self {
        Self {
            opener: self.opener.clone(),
            timing: self.timing,
            clock: self.clock.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<O, C> Poller<O, C>
where
    O: SerialOpener + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    pub fn new(opener: Arc<O>, timing: TimingCfg, clock: C, sink: Arc<dyn EventSink>) -> Self {
        Self {
            opener,
            timing,
            clock,
            sink,
        }
    }

    pub fn timing(&self) -> &TimingCfg {
        &self.timing
    }

    /// Spawn a continuous session. `on_reading` sees every reading in request
    /// order; `on_terminate` runs exactly once, after the connection is released.
    pub fn start<R, T>(
        &self,
        location: DeviceLocation,
        budget: Duration,
        mut on_reading: R,
        on_terminate: T,
    ) -> SessionHandle
    where
        R: FnMut(Reading) + Send + 'static,
        T: FnOnce(TerminationReason) + Send + 'static,
    {
        let session = PollingSession::new(location.clone(), self.clock.now());
        let stopper = session.stopper();
        let worker = self.clone();
        let join_handle = std::thread::spawn(move || {
            let reason = worker.run_session(&session, budget, &mut on_reading);
            on_terminate(reason.clone());
            reason
        });
        SessionHandle {
            location,
            stopper,
            join_handle: Some(join_handle),
        }
    }

    /// Drive `session` on the calling thread until it terminates.
    pub fn run_session(
        &self,
        session: &PollingSession,
        budget: Duration,
        on_reading: &mut dyn FnMut(Reading),
    ) -> TerminationReason {
        let location = session.location();
        info!(
            port = %location.port,
            baud = location.baud_rate,
            budget_ms = budget.as_millis() as u64,
            "polling session started"
        );
        let reason = match self
            .opener
            .open(&location.port, location.baud_rate, self.timing.read_timeout())
        {
            Ok(link) => {
                let mut guard = LinkGuard::new(link, &location.port);
                loop {
                    if session.is_cancelled() {
                        break TerminationReason::StoppedByCaller;
                    }
                    if self.clock.now().saturating_duration_since(session.started_at()) > budget {
                        break TerminationReason::TimeBudgetExpired;
                    }
                    match exchange(guard.link_mut(), &self.timing, &self.clock) {
                        Ok(reply) => {
                            let reading = Reading::from_payload(reply, self.clock.now());
                            self.report(&reading, ReadingSource::Continuous);
                            on_reading(reading);
                        }
                        Err(e) => {
                            let err = map_hw_error(&*e);
                            break self.transport_failure(&err);
                        }
                    }
                }
                // guard dropped here: the connection is released before anyone hears about it
            }
            Err(e) => {
                let err = map_open_error(&location.port, &*e);
                self.transport_failure(&err)
            }
        };
        info!(reason = reason.name(), "polling session terminated");
        self.sink.emit(ScaleEvent::SessionTerminated(reason.clone()));
        reason
    }

    /// One request/settle/read/parse cycle on a fresh connection.
    ///
    /// Fails with `NoDeviceKnown` and performs no I/O when `location` is `None`.
    pub fn read_once(&self, location: Option<&DeviceLocation>) -> Result<Reading> {
        let Some(location) = location else {
            self.sink
                .log(Severity::Warning, "No scale detected.".to_string());
            return Err(ScaleError::NoDeviceKnown.into());
        };
        let link = self
            .opener
            .open(&location.port, location.baud_rate, self.timing.read_timeout())
            .map_err(|e| self.manual_failure(map_open_error(&location.port, &*e)))?;
        let reply = {
            let mut guard = LinkGuard::new(link, &location.port);
            exchange(guard.link_mut(), &self.timing, &self.clock)
                .map_err(|e| self.manual_failure(map_hw_error(&*e)))?
        };
        let reading = Reading::from_payload(reply, self.clock.now());
        self.report(&reading, ReadingSource::Manual);
        Ok(reading)
    }

    fn report(&self, reading: &Reading, source: ReadingSource) {
        let weight = reading.weight();
        debug!(weight = %weight, ?source, "reading");
        let message = match source {
            ReadingSource::Continuous => format!("Weight: {weight} g"),
            ReadingSource::Manual => format!("Manual weight: {weight} g"),
        };
        self.sink.log(Severity::Info, message);
        self.sink.emit(ScaleEvent::WeightChanged {
            reading: reading.clone(),
            source,
        });
    }

    fn transport_failure(&self, err: &ScaleError) -> TerminationReason {
        error!(error = %err, "polling session transport failure");
        self.sink
            .log(Severity::Error, format!("Communication error: {err}"));
        TerminationReason::TransportError(err.to_string())
    }

    fn manual_failure(&self, err: ScaleError) -> eyre::Report {
        error!(error = %err, "manual read failed");
        self.sink
            .log(Severity::Error, format!("Communication error: {err}"));
        err.into()
    }
}
