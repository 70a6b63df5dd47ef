use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::ingest::IntakeMode;

/// Every option is optional so that values from the config file survive
/// unless overridden here.
#[derive(Parser, Debug, Default)]
#[command(name = "bandalert", about = "EEG dominant-band classifier and WebSocket alert broadcaster")]
pub struct Cli {
    /// Config file (TOML). Defaults to ./bandalert.toml or the user config dir
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Intake mode
    #[arg(short, long, value_enum)]
    pub mode: Option<IntakeMode>,

    /// UDP port for averageBandPower datagrams
    #[arg(long)]
    pub avg_port: Option<u16>,

    /// UDP port for timeSeriesRaw datagrams
    #[arg(long)]
    pub raw_port: Option<u16>,

    /// WebSocket port for subscribers
    #[arg(long)]
    pub ws_port: Option<u16>,

    /// Address to bind both the UDP listener and the WebSocket server on
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Raw stream sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Analysis window length in seconds (rounded up to a power of two in samples)
    #[arg(long)]
    pub window_seconds: Option<f64>,

    /// Window overlap fraction (0.0-1.0, exclusive)
    #[arg(long)]
    pub overlap: Option<f64>,

    /// Minimum band fraction that counts toward a stable streak
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Consecutive stable frames required before an alert
    #[arg(long)]
    pub stable_frames: Option<u32>,

    /// Frames queued per subscriber before it starts missing frames
    #[arg(long)]
    pub subscriber_buffer: Option<usize>,
}
