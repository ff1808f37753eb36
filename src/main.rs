use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fern::Dispatch;
use log::LevelFilter;

use etwtrace::config::Config;
use etwtrace::trace_reader::open_trace;
use etwtrace::wire::{c_switch, etw_events};

#[derive(Debug, Parser)]
#[command(name = "etwtrace")]
#[command(about = "Consume a real-time ETW session into a Perfetto trace")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Consume an already running real-time session until it is closed
    Consume {
        /// Increase verbosity (-v info, -vv debug, -vvv trace)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
        /// Name of the real-time logger session
        #[arg(short, long, default_value = "NT Kernel Logger")]
        session: String,
        /// Perfetto trace file to write
        #[arg(short, long, default_value = "etw.pftrace")]
        output: PathBuf,
        /// Override the performance-counter frequency (ticks per second)
        #[arg(long)]
        tick_frequency: Option<i64>,
        /// trusted_packet_sequence_id stamped on every packet
        #[arg(long, default_value = "1")]
        sequence_id: u32,
        /// Stop after this many seconds (0 = until the session is closed)
        #[arg(short, long, default_value = "0")]
        duration: u64,
    },
    /// Print the ETW events of a trace file written by `consume`
    Dump {
        /// Trace file to read
        file: PathBuf,
        /// Increase verbosity
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
    /// Print the version
    Version,
}

fn setup_logging(level: LevelFilter) -> Result<(), fern::InitError> {
    Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{:5}][{}][pid={}][tid={:?}] {}",
                record.level(),
                record.target(),
                process::id(),
                thread::current().id(),
                msg
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn run_dump(path: &Path) -> Result<()> {
    let mut packets = 0u64;
    let mut events = 0u64;
    for (index, packet) in open_trace(path)?.enumerate() {
        let packet = packet.with_context(|| format!("Failed to read packet {index}"))?;
        packets += 1;
        let etw = etw_events(&packet);
        println!(
            "packet {index}: ts={} seq={} events={}",
            packet.timestamp(),
            packet.trusted_packet_sequence_id(),
            etw.len()
        );
        for event in etw {
            events += 1;
            let (ts, cpu) = (event.timestamp(), event.cpu());
            match c_switch(event) {
                Some(cs) => println!(
                    "  ts={ts} cpu={cpu} cswitch {} -> {} prio {} -> {} cstate={} \
                     reason={:?} mode={:?} state={:?} ideal={} wait={}",
                    cs.old_thread_id(),
                    cs.new_thread_id(),
                    cs.old_thread_priority(),
                    cs.new_thread_priority(),
                    cs.previous_c_state(),
                    cs.old_thread_wait_reason(),
                    cs.old_thread_wait_mode(),
                    cs.old_thread_state(),
                    cs.old_thread_wait_ideal_processor(),
                    cs.new_thread_wait_time()
                ),
                None => println!("  ts={ts} cpu={cpu} (no payload)"),
            }
        }
    }
    println!("{packets} packets, {events} events");
    Ok(())
}

fn verbosity_level(verbose: u8) -> LevelFilter {
    Config {
        verbosity: verbose,
        ..Config::default()
    }
    .log_level()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Consume {
            verbose,
            session,
            output,
            tick_frequency,
            sequence_id,
            duration,
        } => {
            if let Some(frequency) = tick_frequency {
                anyhow::ensure!(
                    frequency > 0,
                    "tick frequency must be positive, got {frequency}"
                );
            }
            let config = Config {
                verbosity: verbose,
                session_name: session,
                output,
                tick_frequency,
                sequence_id,
                duration,
            };
            setup_logging(config.log_level())?;

            let stats = etwtrace::consume(&config)?;
            println!(
                "Consumed {} events into {} packets ({} rejected, {} lost)",
                stats.events_seen, stats.packets_finished, stats.events_rejected, stats.events_lost
            );
        }
        Commands::Dump { file, verbose } => {
            setup_logging(verbosity_level(verbose))?;
            run_dump(&file)?;
        }
        Commands::Version => {
            println!("etwtrace {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
