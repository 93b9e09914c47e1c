//! `microrat` – headless maze run against the simulated robot.
//!
//! 1. Loads `~/.microrat/config.toml` (or `--config`), writing the calibrated
//!    defaults on first run, then applies `MICRORAT_*` overrides.
//! 2. Builds a simulated robot in the built-in 7×4 maze or a `--maze` layout.
//! 3. Runs explore → report → shortest path, pressing start whenever the
//!    navigator waits for the operator, and prints every operator signal.
//! 4. Intercepts **Ctrl-C** to stop the wheels and end the run.

mod args;
mod config;

use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use microrat_hal::OperatorPanel;
use microrat_hal::sim::SimHardware;
use microrat_hal::sim_maze::SimMaze;
use microrat_maze::render_ascii;
use microrat_motion::{ControlLoop, Movement, WheelController};
use microrat_nav::Navigator;
use microrat_types::{DiagnosticReport, RatError, UserEvent};

use args::Args;

fn main() -> ExitCode {
    let args = Args::parse();

    microrat_nav::telemetry::init_tracing("microrat");

    match run(&args) {
        Ok(summary) => {
            if args.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("{}: {e}", "Failed to encode summary".red()),
                }
            }
            if summary.completed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run
// ─────────────────────────────────────────────────────────────────────────────

/// What `--json` prints.
#[derive(Debug, Serialize)]
struct RunSummary {
    completed: bool,
    error: Option<RatError>,
    simulated_ms: u64,
    events: Vec<UserEvent>,
}

fn run(args: &Args) -> Result<RunSummary, RatError> {
    let path = args.config.clone().unwrap_or_else(config::config_path);
    let (mut cfg, created) = config::load_or_init(&path)?;
    if !args.json {
        print_banner();
        if created {
            println!(
                "  {} Default calibration written to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
        } else {
            println!("  Config loaded from {}", path.display().to_string().bold());
        }
    }
    if let Some(hand) = args.hand {
        cfg.navigation.hand = hand;
    }

    let maze = match &args.maze {
        Some(p) => {
            let raw = fs::read_to_string(p).map_err(|e| {
                RatError::Config(format!("failed to read maze layout {}: {e}", p.display()))
            })?;
            SimMaze::parse(&raw)?
        }
        None => SimMaze::default_layout()?,
    };
    if (maze.width(), maze.height()) != (cfg.maze.width, cfg.maze.height) {
        warn!(
            layout = %format!("{}x{}", maze.width(), maze.height()),
            configured = %format!("{}x{}", cfg.maze.width, cfg.maze.height),
            "maze layout and configured grid differ"
        );
    }

    let sim = SimHardware::builder(maze).with_robot_config(&cfg).build();
    let control = ControlLoop::new(
        WheelController::new(cfg.controller.clone()),
        Box::new(sim.wheels()),
    );
    let movement = Movement::new(control, Box::new(sim.timer()), &cfg);
    let panel = ConsolePanel {
        inner: sim.panel(),
        quiet: args.json,
    };
    let mut nav = Navigator::new(&cfg, movement, Box::new(sim.wall_sensors()), Box::new(panel))?
        .with_diagnostics(Box::new(
            sim.diagnostics(DiagnosticReport::passed("simulated sensors and drive nominal")),
        ));

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the robot …".yellow().bold());
        shutdown_clone.store(true, Ordering::Release);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run cannot be interrupted");
    }

    info!(
        hand = %cfg.navigation.hand,
        target = %cfg.maze.target,
        "starting simulated run"
    );
    let max_steps = 8 * cfg.maze.width * cfg.maze.height + 16;
    let result = nav.run_until_cancelled(max_steps, &shutdown);
    let simulated_ms = u64::try_from(sim.world().elapsed().as_millis()).unwrap_or(u64::MAX);

    if !args.json {
        println!();
        match &result {
            Ok(()) => println!(
                "  {} Run complete in {:.1} s of robot time.",
                "✓".green().bold(),
                simulated_ms as f64 / 1000.0
            ),
            Err(e) => println!("  {} Run ended: {e}", "✗".red().bold()),
        }
    }

    Ok(RunSummary {
        completed: result.is_ok(),
        error: result.err(),
        simulated_ms,
        events: sim.events(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Operator console
// ─────────────────────────────────────────────────────────────────────────────

/// Prints each signal before handing it to the wrapped panel.
struct ConsolePanel<P> {
    inner: P,
    quiet: bool,
}

impl<P: OperatorPanel> OperatorPanel for ConsolePanel<P> {
    fn start_pressed(&mut self) -> bool {
        self.inner.start_pressed()
    }

    fn signal(&mut self, event: UserEvent) {
        if !self.quiet {
            print_event(&event);
        }
        self.inner.signal(event);
    }
}

fn print_event(event: &UserEvent) {
    match event {
        UserEvent::DiagnosticsResult { passed: true, report } => {
            println!("  {} Self test passed: {}", "✓".green().bold(), report.dimmed());
        }
        UserEvent::DiagnosticsResult { passed: false, report } => {
            println!("  {} Self test failed: {}", "✗".red().bold(), report);
        }
        UserEvent::TargetReached => {
            println!("  {} Target reached.", "✓".green().bold());
        }
        UserEvent::MapReport(report) => {
            println!("\n{}", report.to_string().dimmed());
            println!("{}", render_ascii(report).cyan());
        }
        UserEvent::OptimisationComplete => {
            println!("  {} Shortest path ready; back at the start.", "»".cyan().bold());
        }
        UserEvent::OutOfBounds => {
            println!("  {} Lost contact with the maze walls.", "⚠".yellow().bold());
        }
        UserEvent::RunComplete => {
            println!("  {} Shortest-path run complete.", "✓".green().bold());
        }
        UserEvent::RunFailed { reason } => {
            println!("  {} Run failed: {}", "✗".red().bold(), reason);
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║   MicroRat – simulated maze run      ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
}
