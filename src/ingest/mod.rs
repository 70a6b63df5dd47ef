pub mod packet;
pub mod raw;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr, UdpSocket};

use crate::bands::{BandPowers, BAND_COUNT};
use crate::broadcast::FrameSink;
use crate::classify::FramePipeline;
use crate::error::{IngestError, PacketError};

pub use packet::Packet;
pub use raw::RawIntake;

const MAX_DATAGRAM: usize = 65_536;

/// Which kind of datagram the process consumes. Fixed at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IntakeMode {
    /// Pre-aggregated band power vectors
    Aggregated,
    /// Raw multi-channel time series
    Raw,
}

/// Turns parsed packets into band power vectors. One implementation per
/// intake mode; the rest of the pipeline does not know which is active.
pub trait IntakeStrategy {
    fn mode(&self) -> IntakeMode;

    /// `Ok(None)` means the packet was consumed but no frame is due yet.
    fn accept(&mut self, packet: Packet) -> Result<Option<BandPowers>, IngestError>;
}

/// Band power vectors pass straight through, unnormalized.
#[derive(Debug, Default)]
pub struct AggregatedIntake;

impl IntakeStrategy for AggregatedIntake {
    fn mode(&self) -> IntakeMode {
        IntakeMode::Aggregated
    }

    fn accept(&mut self, packet: Packet) -> Result<Option<BandPowers>, IngestError> {
        let values = match packet {
            Packet::AverageBandPower(values) => values,
            other => {
                return Err(PacketError::WrongMode {
                    expected: "averageBandPower",
                    got: other.kind(),
                }
                .into())
            }
        };
        if values.len() < BAND_COUNT {
            return Err(PacketError::TooFewBands(values.len()).into());
        }
        let mut powers = [0.0; BAND_COUNT];
        powers.copy_from_slice(&values[..BAND_COUNT]);
        Ok(Some(BandPowers(powers)))
    }
}

pub fn bind(ip: IpAddr, port: u16) -> Result<UdpSocket> {
    let addr = SocketAddr::new(ip, port);
    UdpSocket::bind(addr).with_context(|| format!("Failed to bind UDP listener on {}", addr))
}

/// Receive datagrams forever. Bad input is dropped; nothing here returns.
pub fn run(
    socket: &UdpSocket,
    intake: &mut dyn IntakeStrategy,
    pipeline: &mut FramePipeline,
    sink: &dyn FrameSink,
) -> Result<()> {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let len = match socket.recv_from(&mut buf) {
            Ok((len, _)) => len,
            Err(e) => {
                log::warn!("UDP receive error: {}", e);
                continue;
            }
        };
        handle_datagram(&buf[..len], intake, pipeline, sink);
    }
}

/// Parse one datagram and, if a frame results, classify and publish it.
/// Returns whether a frame was published.
pub fn handle_datagram(
    bytes: &[u8],
    intake: &mut dyn IntakeStrategy,
    pipeline: &mut FramePipeline,
    sink: &dyn FrameSink,
) -> bool {
    let powers = match Packet::parse(bytes).map_err(IngestError::from).and_then(|p| intake.accept(p)) {
        Ok(Some(powers)) => powers,
        Ok(None) => return false,
        Err(e) => {
            match &e {
                IngestError::Packet(PacketError::Parse(_) | PacketError::WrongMode { .. }) => {
                    log::trace!("Dropped datagram: {}", e)
                }
                IngestError::Packet(_) => log::debug!("Dropped datagram: {}", e),
                IngestError::Spectral(_) => log::warn!("Spectral estimate failed: {}", e),
            }
            return false;
        }
    };

    let frame = pipeline.process(&powers);
    let p = &powers.0;
    log::info!(
        "{}Δ:{:.3} θ:{:.3} α:{:.3} β:{:.3} γ:{:.3}  => dominant={} ({:.0}%) time={:.1}s",
        if intake.mode() == IntakeMode::Raw { "RAW => " } else { "" },
        p[0],
        p[1],
        p[2],
        p[3],
        p[4],
        frame.dominant_band,
        powers.get(frame.dominant_band) * 100.0,
        frame.time_in_band
    );
    sink.publish(&frame);
    true
}
