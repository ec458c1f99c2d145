//! `cortex-cli` – the `cortexd` binary.
//!
//! The ignition switch for the Cortex stack:
//!
//! 1. Initialises structured logging (JSON behind `CORTEX_LOG_FORMAT=json`,
//!    OTLP export behind `OTEL_EXPORTER_OTLP_ENDPOINT`).
//! 2. Loads `~/.cortex/config.toml` (or the `CORTEX_CONFIG` path), writing
//!    a default file on first run.
//! 3. Builds the agent from the registries and starts the polling tasks
//!    and the scheduler on a Tokio runtime.
//! 4. Intercepts **Ctrl-C** to publish a halt alert and shut down cleanly.
//! 5. Drops the operator into the interactive REPL (`/status`, `/pause`,
//!    `/resume`, `/say`, `/quit`).

mod bootstrap;
mod config;
mod repl;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use colored::Colorize;
use cortex_bus::Topic;
use cortex_types::{Event, EventPayload};
use tracing::{info, warn};

fn main() {
    // Hold the guard for the entire process lifetime.
    let _tracing_guard = cortex_runtime::init_tracing("cortex");

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let config_path = std::env::var("CORTEX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config::config_path());
    let cfg = match config::load_from(&config_path) {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config_path.display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save_to(&cfg, &config_path) {
                Ok(()) => println!(
                    "  No config found; wrote defaults to {}",
                    config_path.display().to_string().bold()
                ),
                Err(e) => println!("{}: {e}", "Could not write default config".yellow()),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {e}", "Config error".red());
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Build the agent ───────────────────────────────────────────────────
    let app = match bootstrap::build(&cfg) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{}: {e}", "Failed to assemble the agent".red().bold());
            std::process::exit(1);
        }
    };

    println!(
        "  {} sources, tick rate {} Hz, model {} @ {}",
        app.inputs.sources().len(),
        cfg.rate,
        cfg.model.model.bold(),
        cfg.model.base_url.dimmed()
    );
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown_for_ctrlc = app.shutdown.clone();
    let bus_for_ctrlc = app.bus.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – halting …".yellow().bold());
        let _ = bus_for_ctrlc.publish_to(
            Topic::Alerts,
            Event::new(
                "cortex-cli",
                EventPayload::Alert {
                    component: "cli".to_string(),
                    message: "operator halt (Ctrl-C)".to_string(),
                },
            ),
        );
        shutdown_for_ctrlc.store(true, Ordering::Release);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use /quit to exit");
    }

    // ── Runtime ───────────────────────────────────────────────────────────
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {e}", "Failed to start the async runtime".red().bold());
            std::process::exit(1);
        }
    };

    let repl_ctx = repl::ReplContext {
        blackboard: app.blackboard.clone(),
        paused: app.paused.clone(),
        shutdown: app.shutdown.clone(),
        voice_feed: app.voice_feed.clone(),
    };

    let poll_handles = {
        let _enter = runtime.enter();
        app.inputs.listen()
    };
    let scheduler = runtime.spawn(app.cortex.run());
    info!("agent running");

    // ── Operator REPL (blocks until /quit or Ctrl-C) ──────────────────────
    repl::run(repl_ctx);

    // ── Shutdown ──────────────────────────────────────────────────────────
    app.shutdown.store(true, Ordering::Release);
    // Let the scheduler notice the flag at its next wait boundary.
    let _ = runtime.block_on(async {
        tokio::time::timeout(Duration::from_secs(5), scheduler).await
    });
    for handle in poll_handles {
        handle.abort();
    }
    runtime.shutdown_timeout(Duration::from_secs(2));
    println!("{}", "  ✓ Cortex stopped.".green());
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        cortexd – agent runtime       ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
}
