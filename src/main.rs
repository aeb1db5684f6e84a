//! Binary entrypoint for the dgmud CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `check [world.json]` - load a world seed and report content problems
//! - `run` - load config and world, then drive the pulse loop
//!
//! See the library crate docs for module-level details: `dgmud::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{debug, error, info, trace, warn};

use dgmud::config::Config;
use dgmud::logutil::escape_log;
use dgmud::mud::dispatch::combined::{reboot_triggers, run_random_triggers};
use dgmud::mud::seed::{load_world_from_json, SeedReport};
use dgmud::mud::{process_events, LineDriver, MudError, World};

/// Pulses between two rounds of RANDOM triggers.
const RANDOM_TRIGGER_PULSES: u64 = 130;

#[derive(Parser)]
#[command(name = "dgmud")]
#[command(about = "Trigger dispatch and timed-effect engine for a text MUD")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Load a world seed and report trigger content problems
    Check {
        /// World seed; defaults to `engine.world_file` from the config
        world: Option<String>,
    },
    /// Run the engine
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    if !matches!(cli.command, Commands::Init) {
        init_logging(&config, cli.verbose);
    }

    match cli.command {
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Wrote default configuration to {}", cli.config);
        }
        Commands::Check { world } => {
            let config = config.unwrap_or_default();
            let path = world.unwrap_or_else(|| config.engine.world_file.clone());
            let (_, report) = build_world(&config, &path)?;
            println!(
                "{}: {} triggers, {} rooms, {} characters, {} objects, {} vehicles, {} quests",
                path,
                report.triggers,
                report.rooms,
                report.chars,
                report.objs,
                report.vehicles,
                report.quests.len()
            );
            for problem in &report.problems {
                println!("  {}", problem);
            }
            if !report.problems.is_empty() {
                return Err(anyhow!("{} content problem(s) in {}", report.problems.len(), path));
            }
        }
        Commands::Run => {
            let config = config.ok_or_else(|| anyhow!("Cannot run without a readable {}", cli.config))?;
            info!("Starting dgmud v{}", env!("CARGO_PKG_VERSION"));
            let path = config.engine.world_file.clone();
            let (mut world, report) = build_world(&config, &path)?;
            for problem in &report.problems {
                warn!("{}", problem);
            }
            run(&config, &mut world).await?;
        }
    }

    Ok(())
}

fn build_world(config: &Config, path: &str) -> Result<(World, SeedReport)> {
    let mut world = World::new(config.engine.seed());
    world.reset_interval = config.engine.reset_interval;
    world.set_tunables(Box::new(config.clone()));
    let report = load_world_from_json(path, &mut world).map_err(|e| anyhow!("Failed to load world {}: {}", path, e))?;
    Ok((world, report))
}

async fn run(config: &Config, world: &mut World) -> Result<()> {
    let mut driver = LineDriver::new();
    let booted = reboot_triggers(world, &mut driver);
    debug!("{} entities finished their reboot triggers", booted);

    let mut ticker = tokio::time::interval(config.engine.pulse());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = pulse(world, &mut driver) {
                    error!("SYSERR: {}", e);
                    return Err(e.into());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down at pulse {}", world.pulse());
                break;
            }
        }
    }
    Ok(())
}

/// One game pulse: clock, due events, periodic random triggers, then the
/// extraction sweep.
fn pulse(world: &mut World, driver: &mut LineDriver) -> Result<(), MudError> {
    let now = world.advance_pulse();
    let fired = process_events(world, driver);
    if fired > 0 {
        trace!("pulse {}: {} events", now, fired);
    }
    if now % RANDOM_TRIGGER_PULSES == 0 {
        run_random_triggers(world, driver);
    }
    for line in world.drain_messages() {
        debug!("[{:?}] {}", line.audience, escape_log(&line.text));
    }
    let swept = world.extract_pending()?;
    if swept.total() > 0 {
        debug!(
            "pulse {}: freed {} characters, {} objects, {} vehicles",
            now, swept.chars, swept.objs, swept.vehicles
        );
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let file = config.as_ref().and_then(|c| c.logging.file.clone());
    let opened = file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    if let Some(f) = opened {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when someone is watching it
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
