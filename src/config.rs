use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use crate::classify::ClassifierConfig;
use crate::cli::Cli;
use crate::dsp::ring::MAX_WINDOW_SAMPLES;
use crate::ingest::IntakeMode;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub dsp: DspConfig,
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_mode")]
    pub mode: IntakeMode,
    #[serde(default = "default_avg_port")]
    pub avg_port: u16,
    #[serde(default = "default_raw_port")]
    pub raw_port: u16,
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
}

#[derive(Debug, Deserialize)]
pub struct DspConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,
    #[serde(default = "default_overlap")]
    pub overlap: f64,
}

#[derive(Debug, Deserialize)]
pub struct ClassifierSection {
    #[serde(default = "default_threshold")]
    pub dominance_threshold: f64,
    #[serde(default = "default_stable_frames")]
    pub stable_frames: u32,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            avg_port: default_avg_port(),
            raw_port: default_raw_port(),
            bind: default_bind(),
        }
    }
}

impl Default for DspConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            window_seconds: default_window_seconds(),
            overlap: default_overlap(),
        }
    }
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            dominance_threshold: default_threshold(),
            stable_frames: default_stable_frames(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            ws_port: default_ws_port(),
            bind: default_bind(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

fn default_mode() -> IntakeMode { IntakeMode::Aggregated }
fn default_avg_port() -> u16 { 15000 }
fn default_raw_port() -> u16 { 15001 }
fn default_ws_port() -> u16 { 8080 }
fn default_bind() -> IpAddr { IpAddr::V4(Ipv4Addr::UNSPECIFIED) }
fn default_sample_rate() -> u32 { 125 }
fn default_window_seconds() -> f64 { 2.0 }
fn default_overlap() -> f64 { 0.5 }
fn default_threshold() -> f64 { 0.45 }
fn default_stable_frames() -> u32 { 4 }
fn default_subscriber_buffer() -> usize { 64 }

impl IngestConfig {
    /// UDP port for the active mode.
    pub fn port(&self) -> u16 {
        match self.mode {
            IntakeMode::Aggregated => self.avg_port,
            IntakeMode::Raw => self.raw_port,
        }
    }
}

impl Config {
    /// Explicit command-line values win over the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(mode) = cli.mode { self.ingest.mode = mode; }
        if let Some(port) = cli.avg_port { self.ingest.avg_port = port; }
        if let Some(port) = cli.raw_port { self.ingest.raw_port = port; }
        if let Some(port) = cli.ws_port { self.broadcast.ws_port = port; }
        if let Some(bind) = cli.bind {
            self.ingest.bind = bind;
            self.broadcast.bind = bind;
        }
        if let Some(rate) = cli.sample_rate { self.dsp.sample_rate = rate; }
        if let Some(secs) = cli.window_seconds { self.dsp.window_seconds = secs; }
        if let Some(overlap) = cli.overlap { self.dsp.overlap = overlap; }
        if let Some(t) = cli.threshold { self.classifier.dominance_threshold = t; }
        if let Some(n) = cli.stable_frames { self.classifier.stable_frames = n; }
        if let Some(n) = cli.subscriber_buffer { self.broadcast.subscriber_buffer = n; }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dsp.sample_rate == 0 {
            bail!("sample_rate must be positive");
        }
        if !(self.dsp.window_seconds > 0.0 && self.dsp.window_seconds.is_finite()) {
            bail!("window_seconds must be positive, got {}", self.dsp.window_seconds);
        }
        let window_samples = f64::from(self.dsp.sample_rate) * self.dsp.window_seconds;
        if window_samples > MAX_WINDOW_SAMPLES as f64 {
            bail!(
                "sample_rate * window_seconds is {} samples, limit is {}",
                window_samples,
                MAX_WINDOW_SAMPLES
            );
        }
        if !(0.0..1.0).contains(&self.dsp.overlap) {
            bail!("overlap must be in [0, 1), got {}", self.dsp.overlap);
        }
        if !(0.0..=1.0).contains(&self.classifier.dominance_threshold) {
            bail!(
                "dominance_threshold must be in [0, 1], got {}",
                self.classifier.dominance_threshold
            );
        }
        if self.classifier.stable_frames == 0 {
            bail!("stable_frames must be at least 1");
        }
        Ok(())
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            dominance_threshold: self.classifier.dominance_threshold,
            stable_frames: self.classifier.stable_frames,
        }
    }
}

/// Explicit path, else `./bandalert.toml`, else the per-user config file.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("bandalert.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("bandalert").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("bandalert").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))
}
