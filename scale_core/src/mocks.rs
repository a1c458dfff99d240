//! Test and helper mocks for scale_core.
//!
//! `ScriptedOpener` plays back a fixed behaviour per (port, baud) combination
//! and records every transport call, so tests can assert on probe order,
//! request bytes and connection release.
use scale_traits::{SerialLink, SerialOpener, TransportError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Behaviour of every link opened for one combination.
#[derive(Debug, Clone)]
pub enum Script {
    /// Opening fails (port busy or missing).
    Unavailable,
    /// Reads return these payloads in order, then nothing.
    Replies(Vec<Vec<u8>>),
    /// Every read returns the same payload.
    Repeat(Vec<u8>),
    /// `ok_reads` reads return `reply`, the next one fails as if unplugged.
    FailAfter { reply: Vec<u8>, ok_reads: usize },
    /// Writing the request fails.
    WriteFails,
}

impl Script {
    /// Port opens but the device never answers.
    pub fn silent() -> Self {
        Script::Replies(Vec::new())
    }
}

/// Everything the transport was asked to do, in order.
#[derive(Debug, Default, Clone)]
pub struct TransportLog {
    /// Every open attempt, successful or not.
    pub opens: Vec<(String, u32)>,
    pub successful_opens: usize,
    pub writes: Vec<Vec<u8>>,
    pub flushes: usize,
    pub reads: usize,
    pub closes: usize,
}

impl TransportLog {
    /// Links opened and not yet closed.
    pub fn live_links(&self) -> usize {
        self.successful_opens.saturating_sub(self.closes)
    }
}

fn lock(log: &Mutex<TransportLog>) -> MutexGuard<'_, TransportLog> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct ScriptedOpener {
    scripts: HashMap<(String, u32), Script>,
    fallback: Script,
    log: Arc<Mutex<TransportLog>>,
}

impl Default for ScriptedOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedOpener {
    /// Every combination opens and stays silent unless scripted otherwise.
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            fallback: Script::silent(),
            log: Arc::new(Mutex::new(TransportLog::default())),
        }
    }

    pub fn with(mut self, port: &str, baud_rate: u32, script: Script) -> Self {
        self.scripts.insert((port.to_string(), baud_rate), script);
        self
    }

    pub fn with_fallback(mut self, script: Script) -> Self {
        self.fallback = script;
        self
    }

    /// Snapshot of the calls so far. Clones share the same log.
    pub fn log(&self) -> TransportLog {
        lock(&self.log).clone()
    }

    pub fn opens(&self) -> Vec<(String, u32)> {
        lock(&self.log).opens.clone()
    }
}

impl SerialOpener for ScriptedOpener {
    type Link = ScriptedLink;

    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        _timeout: Duration,
    ) -> Result<Self::Link, TransportError> {
        let script = self
            .scripts
            .get(&(port.to_string(), baud_rate))
            .unwrap_or(&self.fallback)
            .clone();
        let mut log = lock(&self.log);
        log.opens.push((port.to_string(), baud_rate));
        if matches!(script, Script::Unavailable) {
            return Err(format!("{port} is busy").into());
        }
        log.successful_opens += 1;
        Ok(ScriptedLink {
            script,
            reads: 0,
            closed: false,
            log: self.log.clone(),
        })
    }
}

#[derive(Debug)]
pub struct ScriptedLink {
    script: Script,
    reads: usize,
    closed: bool,
    log: Arc<Mutex<TransportLog>>,
}

impl SerialLink for ScriptedLink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err("write on closed link".into());
        }
        if matches!(self.script, Script::WriteFails) {
            return Err("write failed: device disconnected".into());
        }
        lock(&self.log).writes.push(bytes.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        lock(&self.log).flushes += 1;
        Ok(())
    }

    fn read_up_to(&mut self, max: usize, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if self.closed {
            return Err("read on closed link".into());
        }
        lock(&self.log).reads += 1;
        let n = self.reads;
        self.reads += 1;
        let mut reply = match &self.script {
            Script::Replies(replies) => replies.get(n).cloned().unwrap_or_default(),
            Script::Repeat(reply) => reply.clone(),
            Script::FailAfter { reply, ok_reads } => {
                if n >= *ok_reads {
                    return Err("read failed: device disconnected".into());
                }
                reply.clone()
            }
            Script::Unavailable | Script::WriteFails => Vec::new(),
        };
        reply.truncate(max);
        Ok(reply)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed {
            self.closed = true;
            lock(&self.log).closes += 1;
        }
        Ok(())
    }
}
