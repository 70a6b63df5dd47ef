use crate::bands::BandPowers;
use crate::dsp::{hop_size, window_capacity, SampleRing, SpectralEstimator};
use crate::error::{IngestError, PacketError, SpectralError};

use super::{IntakeMode, IntakeStrategy, Packet};

/// Raw multi-channel samples: ring buffers feed the spectral estimator on
/// every hop.
pub struct RawIntake {
    capacity: usize,
    overlap: f64,
    ring: Option<SampleRing>,
    estimator: SpectralEstimator,
}

impl RawIntake {
    pub fn new(sample_rate: u32, window_seconds: f64, overlap: f64) -> Result<Self, SpectralError> {
        let capacity = window_capacity(sample_rate, window_seconds)?;
        let estimator = SpectralEstimator::new(sample_rate, capacity, hop_size(capacity, overlap))?;
        Ok(Self {
            capacity,
            overlap,
            ring: None,
            estimator,
        })
    }

    pub fn window_len(&self) -> usize {
        self.capacity
    }

    pub fn hop(&self) -> usize {
        hop_size(self.capacity, self.overlap)
    }

    fn validate(&self, chunk: &[Vec<f64>]) -> Result<(), PacketError> {
        let first = chunk.first().ok_or(PacketError::NoChannels)?;
        if let Some((channel, samples)) = chunk.iter().enumerate().find(|(_, c)| c.len() != first.len()) {
            return Err(PacketError::RaggedChannels {
                channel,
                len: samples.len(),
                expected: first.len(),
            });
        }
        if let Some(ring) = &self.ring {
            if ring.channel_count() != chunk.len() {
                return Err(PacketError::ChannelCountChanged {
                    expected: ring.channel_count(),
                    got: chunk.len(),
                });
            }
        }
        Ok(())
    }
}

impl IntakeStrategy for RawIntake {
    fn mode(&self) -> IntakeMode {
        IntakeMode::Raw
    }

    fn accept(&mut self, packet: Packet) -> Result<Option<BandPowers>, IngestError> {
        let chunk = match packet {
            Packet::TimeSeriesRaw(chunk) => chunk,
            other => {
                return Err(PacketError::WrongMode {
                    expected: "timeSeriesRaw",
                    got: other.kind(),
                }
                .into())
            }
        };
        self.validate(&chunk)?;
        if chunk[0].is_empty() {
            return Ok(None);
        }

        let (capacity, overlap) = (self.capacity, self.overlap);
        let ring = self.ring.get_or_insert_with(|| {
            log::info!("Raw stream: {} channels, window {} samples", chunk.len(), capacity);
            SampleRing::new(chunk.len(), capacity, overlap)
        });
        if !ring.append(&chunk) {
            return Ok(None);
        }

        let windows = ring.windows();
        Ok(Some(self.estimator.estimate(&windows)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::Band;

    fn sine_chunk(channels: usize, start: usize, len: usize, freq: f64) -> Vec<Vec<f64>> {
        (0..channels)
            .map(|ch| {
                (start..start + len)
                    .map(|i| {
                        (ch as f64 + 1.0) * (2.0 * std::f64::consts::PI * freq * i as f64 / 125.0).sin()
                    })
                    .collect()
            })
            .collect()
    }

    fn intake() -> RawIntake {
        RawIntake::new(125, 2.0, 0.5).unwrap()
    }

    #[test]
    fn default_geometry() {
        let raw = intake();
        assert_eq!(raw.window_len(), 256);
        assert_eq!(raw.hop(), 128);
    }

    #[test]
    fn emits_once_per_hop() {
        let mut raw = intake();
        let mut emitted = Vec::new();
        for i in 0..32 {
            let chunk = sine_chunk(4, i * 16, 16, 10.0);
            if let Some(p) = raw.accept(Packet::TimeSeriesRaw(chunk)).unwrap() {
                emitted.push(((i + 1) * 16, p));
            }
        }
        let at: Vec<_> = emitted.iter().map(|(n, _)| *n).collect();
        assert_eq!(at, vec![128, 256, 384, 512]);
        for (_, p) in &emitted {
            assert_eq!(p.dominant().0, Band::Alpha);
            assert!((p.0.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn oversized_window_fails_construction() {
        assert!(matches!(
            RawIntake::new(125, 1e20, 0.5),
            Err(SpectralError::WindowTooLarge { .. })
        ));
    }

    #[test]
    fn empty_chunk_is_ignored() {
        let mut raw = intake();
        assert!(raw.accept(Packet::TimeSeriesRaw(vec![vec![], vec![]])).unwrap().is_none());
    }

    #[test]
    fn rejects_shape_problems() {
        let mut raw = intake();
        assert!(matches!(
            raw.accept(Packet::TimeSeriesRaw(vec![])),
            Err(IngestError::Packet(PacketError::NoChannels))
        ));
        assert!(matches!(
            raw.accept(Packet::TimeSeriesRaw(vec![vec![1.0, 2.0], vec![1.0]])),
            Err(IngestError::Packet(PacketError::RaggedChannels { channel: 1, .. }))
        ));

        raw.accept(Packet::TimeSeriesRaw(sine_chunk(2, 0, 4, 10.0))).unwrap();
        assert!(matches!(
            raw.accept(Packet::TimeSeriesRaw(sine_chunk(3, 4, 4, 10.0))),
            Err(IngestError::Packet(PacketError::ChannelCountChanged { expected: 2, got: 3 }))
        ));
    }

    #[test]
    fn rejects_band_power_packets() {
        let mut raw = intake();
        assert!(matches!(
            raw.accept(Packet::AverageBandPower(vec![0.2; 5])),
            Err(IngestError::Packet(PacketError::WrongMode { .. }))
        ));
    }

    #[test]
    fn non_finite_samples_fail_that_cycle_only() {
        let mut raw = intake();
        let mut bad = sine_chunk(1, 0, 128, 10.0);
        bad[0][5] = f64::INFINITY;
        assert!(matches!(
            raw.accept(Packet::TimeSeriesRaw(bad)),
            Err(IngestError::Spectral(SpectralError::NonFinite))
        ));

        // The infinity is evicted after a full window of clean samples.
        let clean = sine_chunk(1, 128, 128, 10.0);
        assert!(raw.accept(Packet::TimeSeriesRaw(clean)).is_err());
        let clean = sine_chunk(1, 256, 128, 10.0);
        let p = raw.accept(Packet::TimeSeriesRaw(clean)).unwrap().unwrap();
        assert_eq!(p.dominant().0, Band::Alpha);
    }
}
