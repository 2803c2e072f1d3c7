//==============================================================================
// delayed_locker: run the delayed-lock scenarios from the command line
//==============================================================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use delayed_locker::{DelayedLocker, LockerConfig, LockerError, TaskRecord, logging};

#[derive(Parser)]
#[command(name = "delayed_locker")]
#[command(
    about = "Spawn workers that wait, lock a shared mutex, wait, and unlock",
    long_about = None
)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One worker on an uncontended mutex
    Single {
        /// Milliseconds to wait before locking (defaults to the config value)
        #[arg(long)]
        obtain: Option<u64>,

        /// Milliseconds to hold the lock (defaults to the config value)
        #[arg(long)]
        release: Option<u64>,
    },

    /// Two workers sharing one mutex: (0, hold) and (delay, 0)
    Contend {
        #[arg(long, default_value_t = 200)]
        hold: u64,

        #[arg(long, default_value_t = 50)]
        delay: u64,
    },

    /// One worker against a mutex poisoned by a panicking thread
    Poisoned,
}

fn report(task: &TaskRecord<u64>, started: Instant) {
    println!(
        "  {}: status = {}, elapsed = {:?}",
        task.name(),
        task.status(),
        started.elapsed()
    );
    if let Some(window) = task.hold_window() {
        println!(
            "    held for {:?} (locked at +{:?})",
            window.held_for(),
            window.locked_at.saturating_duration_since(started)
        );
    }
}

fn run(cli: Cli) -> Result<(), LockerError> {
    let config = match &cli.config {
        Some(path) => LockerConfig::load(path)?,
        None => LockerConfig::default(),
    };
    logging::init(&config.log_filter);
    let locker = DelayedLocker::from_config(&config)?;
    let mutex = Arc::new(Mutex::new(0u64));

    match cli.command {
        Command::Single { obtain, release } => {
            let obtain = obtain.unwrap_or(config.wait_to_obtain_ms);
            let release = release.unwrap_or(config.wait_to_release_ms);
            println!("=== Single worker: wait {obtain}ms, hold {release}ms ===");

            let started = Instant::now();
            let handle = locker.start(&mutex, obtain, release)?;
            let task = locker.join(handle)?;
            report(&task, started);
        }
        Command::Contend { hold, delay } => {
            println!("=== Two workers: (0, {hold}) and ({delay}, 0) ===");

            let started = Instant::now();
            let first = locker.start(&mutex, 0, hold)?;
            let second = locker.start(&mutex, delay, 0)?;
            let first = locker.join(first)?;
            let second = locker.join(second)?;
            report(&first, started);
            report(&second, started);

            if let (Some(a), Some(b)) = (first.hold_window(), second.hold_window()) {
                info!(overlap = a.overlaps(&b), "hold windows compared");
                println!("  hold windows overlap: {}", a.overlaps(&b));
            }
        }
        Command::Poisoned => {
            println!("=== Worker against a poisoned mutex ===");

            let poisoner = Arc::clone(&mutex);
            let _ = thread::spawn(move || {
                let _guard = poisoner.lock();
                panic!("poisoning the shared mutex");
            })
            .join();

            let started = Instant::now();
            let handle = locker.start(&mutex, 0, 0)?;
            let task = locker.join(handle)?;
            report(&task, started);
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
