//! Foreground owner of discovery, the polling session and the known location.
//!
//! Holds what would otherwise be process-wide state: the discovered
//! `DeviceLocation` and the single active `SessionHandle`. Discovery and
//! polling run on background threads; every method here returns promptly.
use crate::config::EngineCfg;
use crate::discovery::{Discoverer, DiscoveryOutcome};
use crate::error::{Result, ScaleError};
use crate::events::EventSink;
use crate::poller::{Poller, SessionHandle, SessionStopper};
use crate::status::TerminationReason;
use crate::types::{DeviceLocation, Reading};
use scale_traits::{Clock, SerialOpener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, warn};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner<O, C> {
    cfg: EngineCfg,
    discoverer: Discoverer<O, C>,
    poller: Poller<O, C>,
    location: Mutex<Option<DeviceLocation>>,
    discovering: AtomicBool,
    session: Mutex<Option<SessionHandle>>,
    stopper: Mutex<Option<SessionStopper>>,
}

/// Clears the discovery flag however the discovery thread exits.
struct DiscoveringFlag<'a>(&'a AtomicBool);

impl Drop for DiscoveringFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ScaleController<O, C> {
    inner: Arc<Inner<O, C>>,
}

impl<O, C> Clone for ScaleController<O, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Handle on a background discovery run.
pub struct DiscoveryTask {
    handle: JoinHandle<DiscoveryOutcome>,
}

impl DiscoveryTask {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<DiscoveryOutcome> {
        self.handle.join().map_err(|_| {
            eyre::Report::new(ScaleError::State("discovery thread panicked".to_string()))
        })
    }
}

impl<O, C> ScaleController<O, C>
where
    O: SerialOpener + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    pub fn new(opener: O, cfg: EngineCfg, clock: C, sink: Arc<dyn EventSink>) -> Result<Self> {
        if cfg.serial.ports.is_empty() {
            return Err(ScaleError::Config("no candidate ports".to_string()).into());
        }
        if cfg.serial.baud_rates.is_empty() {
            return Err(ScaleError::Config("no candidate baud rates".to_string()).into());
        }
        let opener = Arc::new(opener);
        let discoverer = Discoverer::new(opener.clone(), cfg.timing, clock.clone(), sink.clone());
        let poller = Poller::new(opener, cfg.timing, clock, sink);
        Ok(Self {
            inner: Arc::new(Inner {
                cfg,
                discoverer,
                poller,
                location: Mutex::new(None),
                discovering: AtomicBool::new(false),
                session: Mutex::new(None),
                stopper: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &EngineCfg {
        &self.inner.cfg
    }

    pub fn location(&self) -> Option<DeviceLocation> {
        lock(&self.inner.location).clone()
    }

    pub fn is_discovering(&self) -> bool {
        self.inner.discovering.load(Ordering::Acquire)
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.inner.session)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Use a location known by other means (e.g. given on the command line).
    /// Refused while a session is polling, whose location must not change.
    pub fn set_location(&self, location: DeviceLocation) -> Result<()> {
        if self.is_polling() {
            return Err(ScaleError::State(
                "cannot change the scale location while polling".to_string(),
            )
            .into());
        }
        *lock(&self.inner.location) = Some(location);
        Ok(())
    }

    /// Forget the previous location and scan for a scale in the background.
    /// When one is found a continuous session starts right away.
    pub fn start(&self) -> Result<DiscoveryTask> {
        if self.is_polling() {
            return Err(ScaleError::State("a polling session is already running".to_string()).into());
        }
        if self.inner.discovering.swap(true, Ordering::AcqRel) {
            return Err(ScaleError::State("discovery is already running".to_string()).into());
        }
        *lock(&self.inner.location) = None;

        let this = self.clone();
        let handle = std::thread::spawn(move || {
            let _flag = DiscoveringFlag(&this.inner.discovering);
            let serial = &this.inner.cfg.serial;
            let outcome = this
                .inner
                .discoverer
                .discover(&serial.ports, &serial.baud_rates);
            if let DiscoveryOutcome::Found(location) = &outcome {
                *lock(&this.inner.location) = Some(location.clone());
                if let Err(e) = this.start_polling() {
                    warn!(error = %e, "could not start polling after discovery");
                }
            }
            outcome
        });
        Ok(DiscoveryTask { handle })
    }

    /// Start a continuous session at the known location with the configured budget.
    pub fn start_polling(&self) -> Result<()> {
        let location = self.location().ok_or(ScaleError::NoDeviceKnown)?;
        let mut slot = lock(&self.inner.session);
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(ScaleError::State("a polling session is already running".to_string()).into());
        }
        let handle = self.inner.poller.start(
            location,
            self.inner.cfg.timing.session_budget(),
            |_reading| {},
            |reason| debug!(%reason, "session callback: terminated"),
        );
        *lock(&self.inner.stopper) = Some(handle.stopper());
        // Replacing a finished handle joins its (already exited) thread.
        *slot = Some(handle);
        Ok(())
    }

    /// Request the active session to stop. No-op when nothing is polling.
    pub fn stop(&self) {
        if let Some(stopper) = lock(&self.inner.stopper).as_ref()
            && stopper.stop()
        {
            debug!("stop requested");
        }
    }

    /// Manual single read at the known location, on its own connection.
    pub fn read_once(&self) -> Result<Reading> {
        let location = self.location();
        self.inner.poller.read_once(location.as_ref())
    }

    /// Block until the current session ends. `None` when no session was started.
    pub fn wait_session(&self) -> Option<TerminationReason> {
        let handle = lock(&self.inner.session).take()?;
        match handle.join() {
            Ok(reason) => Some(reason),
            Err(e) => {
                warn!(error = %e, "polling session did not finish cleanly");
                None
            }
        }
    }
}
