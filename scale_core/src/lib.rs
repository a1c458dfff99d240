#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Scale discovery and polling engine (transport-agnostic).
//!
//! All serial I/O goes through `scale_traits::SerialOpener` / `SerialLink`,
//! and all waiting through `scale_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Frame**: request byte, reply window and the weight parsing rule (`frame`)
//! - **Discovery**: sequential port × baud probing (`discovery`)
//! - **Polling**: continuous sessions and manual reads (`poller`)
//! - **Controller**: owns the known location and the active session (`controller`)
//! - **Events**: log lines, weights and lifecycle notifications (`events`)
//! - **Configuration**: runtime config structs (`config`)

pub mod config;
pub mod controller;
pub mod conversions;
pub mod discovery;
pub mod error;
pub mod events;
pub mod frame;
pub mod hw_error;
pub mod link;
pub mod mocks;
pub mod poller;
pub mod status;
pub mod types;
pub mod util;

pub use config::{EngineCfg, SerialCfg, TimingCfg};
pub use controller::{DiscoveryTask, ScaleController};
pub use discovery::{Discoverer, DiscoveryOutcome};
pub use error::{Result, ScaleError};
pub use events::{EventSink, NullSink, ReadingSource, ScaleEvent, Severity};
pub use frame::{WeightText, parse_weight};
pub use poller::{Poller, PollingSession, SessionHandle, SessionStopper};
pub use status::TerminationReason;
pub use types::{DeviceLocation, ProbeResult, Reading};
