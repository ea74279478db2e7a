//! cdev host binary.
//!
//! # Usage
//!
//! ```bash
//! # Write a line from stdin, then read it back
//! cdev-host roundtrip
//!
//! # Same, with the message on the command line and positional writes
//! cdev-host --positional roundtrip --message "hello"
//!
//! # Eight threads race to open the device, 1000 times
//! cdev-host race --callers 8 --rounds 1000
//! ```

use std::{
    io::{self, Write},
    path::PathBuf,
};

use cdev_core::{DeviceConfig, WriteMode};
use cdev_host::{Host, load_config, read_message};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Exclusive-access byte-buffer device host
#[derive(Parser, Debug)]
#[command(name = "cdev-host")]
#[command(about = "Host and exercise an exclusive-access byte-buffer device")]
#[command(version)]
struct Args {
    /// Device name
    #[arg(short, long)]
    name: Option<String>,

    /// Write at the session offset instead of at byte 0
    #[arg(long)]
    positional: bool,

    /// JSON device configuration (flags override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a message, release, reopen and read it back
    Roundtrip {
        /// Message to write (defaults to one line from stdin, at most 255 bytes)
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Race threads to open the device
    Race {
        /// Concurrent callers per round
        #[arg(long, default_value = "2")]
        callers: usize,

        /// Number of rounds
        #[arg(long, default_value = "100")]
        rounds: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => DeviceConfig::default(),
    };
    if let Some(name) = args.name {
        config.name = name;
    }
    if args.positional {
        config.write_mode = WriteMode::Positional;
    }

    let host = Host::start(config);
    let mut out = io::stdout().lock();

    let result = match args.command {
        Command::Roundtrip { message } => {
            let message = match message {
                Some(message) => message.into_bytes(),
                None => {
                    write!(out, "Enter text to write to /dev/{}: ", host.device().name())?;
                    out.flush()?;
                    read_message(io::stdin().lock())?
                },
            };

            host.roundtrip(&message).and_then(|data| {
                writeln!(out, "Output from /dev/{}:", host.device().name())?;
                writeln!(out, "\t{}", String::from_utf8_lossy(&data).trim_end())?;
                Ok(())
            })
        },
        Command::Race { callers, rounds } => host.race(callers, rounds).and_then(|outcome| {
            writeln!(
                out,
                "{} rounds, {} callers: {} opens won, {} busy, exclusive: {}",
                outcome.rounds,
                callers,
                outcome.winners,
                outcome.busy,
                outcome.is_exclusive()
            )?;
            Ok(())
        }),
    };

    host.shutdown();

    if let Err(e) = &result {
        tracing::error!("{}", e);
    }
    result?;

    Ok(())
}
