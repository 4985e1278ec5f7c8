// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements the `run` command (i.e., running the server).

use std::fmt::Write;
use std::fs::OpenOptions;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::{error, info, warn};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::sync::mpsc;

use udns::server::Server;
use udns::zone::Zone;

use crate::args::RunArgs;
use crate::config::{self, Config, LogConfig};

/// Runs the server.
pub fn run(args: RunArgs) {
    let config = match args.config {
        Some(ref config_path) => config::load_from_path(config_path).with_context(|| {
            format!(
                "failed to load the configuration from {}",
                config_path.display()
            )
        }),
        None => Ok(config::load_from_args(args)),
    };
    let log_config = config
        .as_ref()
        .map(|config| config.log.clone())
        .unwrap_or_default();
    init_logging(&log_config);

    if let Err(e) = config.and_then(try_running) {
        log_error_chain("Failed to run:", &e);
        error!("Exiting with failure.");
        process::exit(1);
    }
    info!("Exiting with success.");
}

/// Sets up `env_logger`. `RUST_LOG` takes precedence over the
/// configured level.
fn init_logging(config: &LogConfig) {
    let mut builder = Builder::from_env(Env::new().default_filter_or(config.level.0.to_string()));
    let mut file_error = None;
    if let Some(ref path) = config.file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => file_error = Some((path, e)),
        }
    }
    builder.init();

    if let Some((path, e)) = file_error {
        warn!(
            "Cannot open log file {}, logging to stderr instead: {e}",
            path.display()
        );
    }
}

/// Logs an error and its causes, one per line.
pub fn log_error_chain(heading: &str, e: &anyhow::Error) {
    let mut message = String::from(heading);
    for (i, cause) in e.chain().enumerate() {
        write!(message, "\n[{}] {}", i + 1, cause).unwrap();
    }
    error!("{}", message);
}

fn try_running(config: Config) -> Result<()> {
    info!("udns daemon v{} starting.", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let zone_files = config
        .zone_files()
        .context("failed to find the zone files")?;
    info!("Found {} zone files to load.", zone_files.len());

    let mut server = Server::new(config.bind());
    for spec in &config.dns.forwarders {
        if let Err(e) = add_forwarder(&mut server, spec) {
            warn!("Skipping forwarder {spec:?}: {e:#}");
        }
    }

    let signals = set_up_signal_handling().context("failed to set up signal handling")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the Tokio runtime")?;

    runtime.block_on(async move {
        let mut running = server
            .start(zone_files)
            .await
            .context("failed to start the server")?;
        let zones: Arc<[Arc<Zone>]> = server.zones().cloned().collect();
        let mut signals = forward_signals(signals);
        info!("Set-up is complete; serving.");

        loop {
            let signal = tokio::select! {
                res = running.wait() => return res.context("a listener failed"),
                signal = signals.recv() => signal,
            };
            match signal {
                Some(SIGHUP) => {
                    info!("Received SIGHUP; reloading zones.");
                    let zones = zones.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || reload_zones(&zones)).await {
                        error!("Reloading zones failed: {e}");
                    }
                }
                Some(SIGINT) => {
                    info!("Received SIGINT; shutting down.");
                    break;
                }
                Some(SIGTERM) => {
                    info!("Received SIGTERM; shutting down.");
                    break;
                }
                _ => break,
            }
        }

        running.shut_down().await;
        info!("Shutdown complete.");
        Ok(())
    })
}

fn add_forwarder(server: &mut Server, spec: &str) -> Result<()> {
    let spec = config::parse_forwarder(spec)?;
    server.add_forward_server(spec.host, spec.transport, spec.port)?;
    Ok(())
}

/// Reloads every zone from its file. Only zones whose serial has
/// increased change.
fn reload_zones(zones: &[Arc<Zone>]) {
    for zone in zones {
        match zone.reload() {
            Ok(outcome) => info!("Zone {}: {outcome}.", zone.origin()),
            Err(e) => warn!(
                "Zone {}: reload failed, keeping current data: {e}",
                zone.origin()
            ),
        }
    }
}

fn set_up_signal_handling() -> Result<Signals> {
    let all_signals = &[SIGHUP, SIGINT, SIGTERM];
    let term_signals = &[SIGINT, SIGTERM];
    let already_terminating = Arc::new(AtomicBool::new(false));

    // This sets up signal handlers to exit immediately if a second
    // termination signal arrives before the process finishes shutting
    // down gracefully.
    for sig in term_signals {
        signal_hook::flag::register_conditional_shutdown(*sig, 1, already_terminating.clone())?;
        signal_hook::flag::register(*sig, already_terminating.clone())?;
    }

    Signals::new(all_signals).map_err(Into::into)
}

/// Passes received signals from a dedicated thread to the runtime.
fn forward_signals(mut signals: Signals) -> mpsc::UnboundedReceiver<i32> {
    let (sender, receiver) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for signal in signals.forever() {
            if sender.send(signal).is_err() {
                break;
            }
        }
    });
    receiver
}
