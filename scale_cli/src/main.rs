mod backend;
mod cli;
mod error_fmt;
mod render;
mod run;

use clap::Parser;
use cli::{Cli, DEFAULT_CONFIG, FILE_GUARD, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use eyre::WrapErr;
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let _ = color_eyre::install();
    // clap prints usage and exits with 2 on bad arguments.
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(?cfg, "configuration loaded");

    run::run_command(&cli.cmd, cfg, cli.json)
}

/// File (explicit, or the default when present), then `SCALE_*` overrides.
/// Command flags are applied by the commands, followed by validation.
fn load_config(explicit: Option<&Path>) -> eyre::Result<scale_config::Config> {
    let path: Option<PathBuf> = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG);
            p.exists().then_some(p)
        }
    };
    let mut cfg = match path {
        Some(p) => scale_config::load_file(&p)?,
        None => scale_config::Config::default(),
    };
    cfg.apply_env(|k| std::env::var(k).ok())
        .wrap_err("invalid SCALE_* environment override")?;
    Ok(cfg)
}

fn init_tracing(cli: &Cli, logging: &scale_config::Logging) -> eyre::Result<()> {
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .map_err(|e| eyre::eyre!("invalid log level {level:?}: {e}"))?;

    let console = if cli.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}
