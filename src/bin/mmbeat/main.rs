#![deny(clippy::all)]
#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mmbeat::aggregate;
use mmbeat::beat::Beat;
use mmbeat::config::Config;
use mmbeat::exec::{Exec, Runner};
use mmbeat::parse::{self, Command, Decoded};
use mmbeat::publish::Publisher;

mod cli;

fn main() -> Result<()> {
    let args = cli::args();

    match args.subcommand() {
        Some(("run", args)) => run(args),
        Some(("decode", args)) => run_decode(args),
        Some(("list", args)) => dispatch_list(args),

        _ => Err(anyhow!("subcommand is required")),
    }
}

// ----------------------------------------------------------------------------
// subcommand dispatcher
// ----------------------------------------------------------------------------

fn dispatch_list(args: &ArgMatches) -> Result<()> {
    match args.subcommand() {
        Some(("devices", args)) => run_list_devices(args),

        _ => Err(anyhow!("subcommand is required")),
    }
}

// ----------------------------------------------------------------------------
// runner
// ----------------------------------------------------------------------------

fn run(args: &ArgMatches) -> Result<()> {
    init_logging(args)?;

    let config = config(args)?;
    let runner = Exec::new(config.timeout());
    let publisher = Publisher::new(output_to_bufwriter(args)?);

    let mut beat = Beat::new(config, runner, publisher);

    if args.get_flag("once") {
        beat.poll()?;
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);

    if let Err(error) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!(%error, "failed to set Ctrl-C handler");
    }

    beat.run(&running);

    Ok(())
}

fn run_decode(args: &ArgMatches) -> Result<()> {
    init_logging(args)?;

    let command: Command = args
        .get_one::<String>("command")
        .context("no command argument")?
        .parse()?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_to_string(&mut input)
        .context("reading stdin")?;

    let decoded = match (command, args.get_one::<String>("device")) {
        (Command::LsFs, _) => aggregate::decode_devices(&input),
        (command, Some(device)) => {
            aggregate::decode_for_device(command, device, &input)
        }
        (command, None) => parse::decode(command, &input),
    };

    let mut publisher = Publisher::new(output_to_bufwriter(args)?);
    publisher.publish(&decoded.records, 1)?;

    let failures = report(&decoded);

    if failures > 0 {
        bail!("{failures} rows failed to decode");
    }

    Ok(())
}

fn run_list_devices(args: &ArgMatches) -> Result<()> {
    init_logging(args)?;

    let config = config(args)?;
    let program = config.commands.program(Command::LsFs);

    let output = Exec::new(config.timeout()).run(program, &mmbeat::fs::ARGS)?;
    let decoded = aggregate::decode_devices(&output);
    report(&decoded);

    let mut stdout = io::stdout().lock();

    for name in aggregate::device_names(&decoded.records) {
        writeln!(stdout, "{name}")?;
    }

    Ok(())
}

// ----------------------------------------------------------------------------
// helper
// ----------------------------------------------------------------------------

fn config(args: &ArgMatches) -> Result<Config> {
    args.get_one::<PathBuf>("config")
        .map_or_else(|| Ok(Config::default()), Config::load)
}

fn init_logging(args: &ArgMatches) -> Result<()> {
    let level = if args.get_flag("quiet") {
        LevelFilter::ERROR
    } else {
        match args.get_count("verbose") {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("parsing RUST_LOG")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow!(error))
}

fn output_to_bufwriter(
    args: &ArgMatches,
) -> Result<BufWriter<Box<dyn Write>>> {
    let output = args.get_one::<PathBuf>("output");

    let output: Box<dyn Write> = if let Some(output) = output {
        Box::new(File::create(output).with_context(|| {
            format!("creating output file: {}", output.display())
        })?)
    } else {
        Box::new(io::stdout())
    };

    Ok(BufWriter::new(output))
}

fn report(decoded: &Decoded) -> usize {
    for failure in &decoded.failures {
        warn!(%failure, "skipping malformed row");
    }

    decoded.failures.len()
}
