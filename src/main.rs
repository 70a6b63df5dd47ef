mod bands;
mod broadcast;
mod classify;
mod cli;
mod config;
mod dsp;
mod error;
mod ingest;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;

use broadcast::SubscriberRegistry;
use classify::FramePipeline;
use cli::Cli;
use config::Config;
use ingest::{AggregatedIntake, IntakeMode, IntakeStrategy, RawIntake};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("{:#}; using defaults", e);
                Config::default()
            }
        },
        None => Config::default(),
    };
    cfg.apply_cli(&cli);
    cfg.validate().context("Invalid configuration")?;

    let udp_port = cfg.ingest.port();
    log::info!("bandalert - EEG dominant band alerts");
    log::info!(
        "Mode: {}",
        match cfg.ingest.mode {
            IntakeMode::Aggregated => format!("averageBandPower (UDP {})", udp_port),
            IntakeMode::Raw => format!("timeSeriesRaw (UDP {})", udp_port),
        }
    );
    log::info!(
        "Classifier: threshold={:.2}, stable_frames={}",
        cfg.classifier.dominance_threshold,
        cfg.classifier.stable_frames
    );

    // Subscriber IO lives on its own runtime; ingestion stays on this thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("bandalert-ws")
        .build()
        .context("Failed to start async runtime")?;

    let registry = SubscriberRegistry::new(cfg.broadcast.subscriber_buffer);
    let ws_addr = SocketAddr::new(cfg.broadcast.bind, cfg.broadcast.ws_port);
    let listener = runtime.block_on(broadcast::server::bind(ws_addr))?;
    runtime.spawn(broadcast::server::serve(listener, registry.clone()));
    log::info!("WebSocket server: ws://{}", ws_addr);

    let mut intake: Box<dyn IntakeStrategy> = match cfg.ingest.mode {
        IntakeMode::Aggregated => Box::new(AggregatedIntake),
        IntakeMode::Raw => {
            let raw = RawIntake::new(cfg.dsp.sample_rate, cfg.dsp.window_seconds, cfg.dsp.overlap)?;
            log::info!(
                "DSP: {} Hz, window {} samples, hop {} samples",
                cfg.dsp.sample_rate,
                raw.window_len(),
                raw.hop()
            );
            Box::new(raw)
        }
    };

    let socket = ingest::bind(cfg.ingest.bind, udp_port)?;
    log::info!("Listening for datagrams on {}", socket.local_addr()?);

    let mut pipeline = FramePipeline::new(cfg.classifier_config());
    ingest::run(&socket, intake.as_mut(), &mut pipeline, &registry)
}
