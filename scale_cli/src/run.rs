//! Command execution: config mapping, engine assembly and the four commands.

use crate::backend::{self, Opener};
use crate::cli::{Commands, LocationArgs};
use crate::render::spawn_printer;
use crossbeam_channel as xch;
use eyre::WrapErr;
use scale_core::error::Result as CoreResult;
use scale_core::{
    Discoverer, DiscoveryOutcome, EngineCfg, EventSink, ScaleController, ScaleError,
    TerminationReason,
};
use scale_traits::MonotonicClock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How often the foreground checks for Ctrl-C while a session runs.
const STOP_POLL: Duration = Duration::from_millis(50);
/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

/// Ctrl-C handling for `watch`: the first press asks the session to stop,
/// a second one exits at once (e.g. while discovery is still probing).
/// Other commands keep the default handler and die on SIGINT.
fn install_stop_handler() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::Relaxed) {
            std::process::exit(EXIT_INTERRUPTED);
        }
    }) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    shutdown
}

/// Candidate list used by this run: config ports, then enumerated ports when asked.
fn with_available_ports(mut cfg: scale_config::Config) -> CoreResult<scale_config::Config> {
    if cfg.serial.use_available_ports {
        let found = scale_hardware::available_ports()
            .map_err(|e| ScaleError::Transport(format!("enumerate ports: {e}")))?;
        for port in found {
            if !cfg.serial.ports.contains(&port) {
                cfg.serial.ports.push(port);
            }
        }
    }
    Ok(cfg)
}

pub fn run_command(
    cmd: &Commands,
    cfg: scale_config::Config,
    json: bool,
) -> eyre::Result<()> {
    match cmd {
        Commands::Discover { ports, bauds } => {
            let mut cfg = cfg;
            if let Some(p) = ports {
                cfg.serial.ports = p.clone();
            }
            if let Some(b) = bauds {
                cfg.serial.baud_rates = b.clone();
            }
            let cfg = with_available_ports(cfg)?;
            cfg.validate().wrap_err("invalid configuration")?;
            run_discover(&(&cfg).into(), json)
        }
        Commands::Watch {
            location,
            budget_ms,
        } => {
            let mut cfg = cfg;
            if let Some(ms) = budget_ms {
                cfg.timing.session_budget_ms = *ms;
            }
            let cfg = with_available_ports(cfg)?;
            cfg.validate().wrap_err("invalid configuration")?;
            run_watch(&(&cfg).into(), location, json, install_stop_handler())
        }
        Commands::Read { location, discover } => {
            let cfg = with_available_ports(cfg)?;
            cfg.validate().wrap_err("invalid configuration")?;
            run_read(&(&cfg).into(), location, *discover, json)
        }
        Commands::ListPorts => {
            cfg.validate().wrap_err("invalid configuration")?;
            list_ports(&cfg, json)
        }
    }
}

fn not_found(engine: &EngineCfg) -> eyre::Report {
    ScaleError::DeviceNotFound {
        tried: engine.serial.combinations(),
    }
    .into()
}

/// Probe every candidate once; no session is started.
fn run_discover(engine: &EngineCfg, json: bool) -> eyre::Result<()> {
    let (tx, rx) = xch::unbounded();
    let printer = spawn_printer(rx, json);
    let outcome = {
        let sink: Arc<dyn EventSink> = Arc::new(tx);
        let discoverer = Discoverer::new(
            Arc::new(backend::opener()?),
            engine.timing,
            MonotonicClock::new(),
            sink,
        );
        discoverer.discover(&engine.serial.ports, &engine.serial.baud_rates)
    };
    let _ = printer.join();
    match outcome {
        DiscoveryOutcome::Found(location) => {
            tracing::info!(%location, "discovery finished");
            Ok(())
        }
        DiscoveryOutcome::NotFound => Err(not_found(engine)),
    }
}

fn controller(
    engine: &EngineCfg,
    tx: xch::Sender<scale_core::ScaleEvent>,
) -> eyre::Result<ScaleController<Opener, MonotonicClock>> {
    ScaleController::new(
        backend::opener()?,
        engine.clone(),
        MonotonicClock::new(),
        Arc::new(tx),
    )
}

/// Discover (unless a location is given), then poll until the session ends.
fn run_watch(
    engine: &EngineCfg,
    location: &LocationArgs,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let (tx, rx) = xch::unbounded();
    let printer = spawn_printer(rx, json);
    let result = watch_session(engine, location, tx, &shutdown);
    // Every sender is gone once the controller is dropped.
    let _ = printer.join();
    match result? {
        Some(TerminationReason::TransportError(detail)) => {
            Err(ScaleError::Transport(detail).into())
        }
        Some(reason) => {
            tracing::info!(%reason, "watch finished");
            Ok(())
        }
        None => Err(not_found(engine)),
    }
}

fn watch_session(
    engine: &EngineCfg,
    location: &LocationArgs,
    tx: xch::Sender<scale_core::ScaleEvent>,
    shutdown: &AtomicBool,
) -> eyre::Result<Option<TerminationReason>> {
    let ctl = controller(engine, tx)?;
    match location.location() {
        Some(loc) => {
            ctl.set_location(loc)?;
            ctl.start_polling()?;
        }
        None => {
            // Discovery is not interruptible by the first Ctrl-C; that one stops
            // the session discovery starts, a second one exits.
            if let DiscoveryOutcome::NotFound = ctl.start()?.join()? {
                return Ok(None);
            }
        }
    }
    while ctl.is_polling() {
        if shutdown.load(Ordering::Relaxed) {
            ctl.stop();
        }
        std::thread::sleep(STOP_POLL);
    }
    Ok(ctl.wait_session())
}

/// One manual reading at the given, discovered, or unknown location.
fn run_read(
    engine: &EngineCfg,
    location: &LocationArgs,
    discover: bool,
    json: bool,
) -> eyre::Result<()> {
    let (tx, rx) = xch::unbounded();
    let printer = spawn_printer(rx, json);
    let result = read_with(engine, location, discover, tx);
    let _ = printer.join();
    let reading = result?;
    tracing::info!(weight = %reading.weight(), "manual read finished");
    Ok(())
}

fn read_with(
    engine: &EngineCfg,
    location: &LocationArgs,
    discover: bool,
    tx: xch::Sender<scale_core::ScaleEvent>,
) -> eyre::Result<scale_core::Reading> {
    let opener = backend::opener()?;
    let sink: Arc<dyn EventSink> = Arc::new(tx);
    let ctl = ScaleController::new(opener.clone(), engine.clone(), MonotonicClock::new(), sink.clone())?;
    if let Some(loc) = location.location() {
        ctl.set_location(loc)?;
    } else if discover {
        let discoverer =
            Discoverer::new(Arc::new(opener), engine.timing, MonotonicClock::new(), sink);
        match discoverer.discover(&engine.serial.ports, &engine.serial.baud_rates) {
            DiscoveryOutcome::Found(loc) => ctl.set_location(loc)?,
            DiscoveryOutcome::NotFound => return Err(not_found(engine)),
        }
    }
    ctl.read_once()
}

fn list_ports(cfg: &scale_config::Config, json: bool) -> eyre::Result<()> {
    let available = scale_hardware::available_ports()
        .map_err(|e| ScaleError::Transport(format!("enumerate ports: {e}")))?;
    if json {
        println!(
            "{}",
            serde_json::json!({
                "candidates": cfg.serial.ports,
                "baud_rates": cfg.serial.baud_rates,
                "available": available,
            })
        );
    } else {
        println!("Candidate ports: {}", cfg.serial.ports.join(", "));
        let bauds: Vec<String> = cfg.serial.baud_rates.iter().map(u32::to_string).collect();
        println!("Baud rates: {}", bauds.join(", "));
        if available.is_empty() {
            println!("Ports reported by the OS: (none)");
        } else {
            println!("Ports reported by the OS: {}", available.join(", "));
        }
    }
    Ok(())
}
