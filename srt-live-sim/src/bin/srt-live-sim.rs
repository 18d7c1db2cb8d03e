//! SRT Live Simulator - LiveCC sender and receiver over a lossy link
//!
//! Runs entirely in simulated time and prints the statistics of both
//! controllers.

use clap::Parser;
use srt_live_sim::{
    compact_stats, display_receiver_stats, display_sender_stats, format_bytes, SimConfig,
    Simulation,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "srt-live-sim")]
#[command(about = "Simulate SRT live congestion control over a lossy link", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write an example configuration to this path and exit
    #[arg(long)]
    write_example: Option<PathBuf>,

    /// Number of packets to send
    #[arg(short = 'n', long)]
    packets: Option<u64>,

    /// Data packet loss probability (0.0 to 1.0)
    #[arg(short, long)]
    loss: Option<f64>,

    /// One-way link latency in milliseconds
    #[arg(long)]
    link_latency: Option<u64>,

    /// TSBPD latency in milliseconds
    #[arg(long)]
    latency: Option<u64>,

    /// Random seed for the link
    #[arg(short, long)]
    seed: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    if let Some(path) = &args.write_example {
        SimConfig::example().to_file(path)?;
        tracing::info!("Example configuration written to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            SimConfig::from_file(path)?
        }
        None => SimConfig::default(),
    };

    if let Some(packets) = args.packets {
        config.run.packets = packets;
    }
    if let Some(loss) = args.loss {
        config.link.loss_rate = loss;
    }
    if let Some(ms) = args.link_latency {
        config.link.latency_us = ms * 1_000;
    }
    if let Some(ms) = args.latency {
        config.run.latency_us = ms * 1_000;
    }
    if let Some(seed) = args.seed {
        config.link.seed = seed;
    }

    let simulation = Simulation::new(config)?;
    let report = simulation.run_with(|elapsed, send, recv| {
        println!("{}", compact_stats(elapsed, send, recv));
    });

    display_sender_stats(&report.sender);
    display_receiver_stats(&report.receiver);

    println!(
        "\nDelivered {} of {} packets ({:.2}%), {} in {:.3}s simulated",
        report.delivered,
        report.pushed,
        report.delivery_ratio() * 100.0,
        format_bytes(report.delivered_bytes),
        report.duration.as_secs_f64()
    );
    println!(
        "Link: {} dropped, {} duplicated",
        report.link_dropped, report.link_duplicated
    );

    if report.out_of_order > 0 || report.early > 0 {
        anyhow::bail!(
            "delivery violated ordering or deadlines: {} out of order, {} early",
            report.out_of_order,
            report.early
        );
    }

    Ok(())
}
