use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::bands::{Band, BandPowers, BAND_COUNT};
use crate::error::SpectralError;

/// Welch-style band power estimator: DC removal, Hann taper, forward FFT,
/// squared magnitude, averaged over channels then over overlapping segments.
pub struct SpectralEstimator {
    sample_rate: f64,
    segment_len: usize,
    hop: usize,
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
}

impl SpectralEstimator {
    pub fn new(sample_rate: u32, segment_len: usize, hop: usize) -> Result<Self, SpectralError> {
        if segment_len < 2 {
            return Err(SpectralError::SegmentTooShort(segment_len));
        }
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(segment_len);
        Ok(Self {
            sample_rate: sample_rate as f64,
            segment_len,
            hop: hop.max(1),
            window: hann_window(segment_len),
            fft,
        })
    }

    /// Hz per FFT bin.
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate / self.segment_len as f64
    }

    /// Number of bins in the one-sided spectrum (`N/2 + 1`).
    pub fn bin_count(&self) -> usize {
        self.segment_len / 2 + 1
    }

    /// Overlapping segments that fit in a buffer of `buffer_len` samples.
    pub fn segments(&self, buffer_len: usize) -> usize {
        if buffer_len < self.segment_len {
            return 1;
        }
        (buffer_len - self.segment_len) / self.hop + 1
    }

    /// Inclusive bin range integrated for `band`. Bin 0 (DC) is never
    /// included; both edges are clamped to `[1, K-1]`.
    pub fn band_bins(&self, band: Band) -> (usize, usize) {
        let df = self.frequency_resolution();
        let last = (self.bin_count() - 1) as f64;
        let (lo_hz, hi_hz) = band.range_hz();
        let lo = (lo_hz / df).round_ties_even().clamp(1.0, last) as usize;
        let hi = (hi_hz / df).round_ties_even().clamp(1.0, last) as usize;
        (lo, hi)
    }

    /// Averaged power spectrum for a set of equal-length channel buffers.
    pub fn psd(&self, channels: &[Vec<f64>]) -> Result<Vec<f64>, SpectralError> {
        let buffer_len = channels.first().map_or(0, Vec::len);
        if buffer_len == 0 {
            return Err(SpectralError::Empty);
        }
        for (channel, samples) in channels.iter().enumerate() {
            if samples.len() < self.segment_len {
                return Err(SpectralError::ShortChannel {
                    channel,
                    len: samples.len(),
                    needed: self.segment_len,
                });
            }
        }

        let n = self.segment_len;
        let bins = self.bin_count();
        let segments = self.segments(buffer_len);
        let mut averaged = vec![0.0f64; bins];
        let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); n];
        let mut slice = vec![0.0f64; n];

        for seg in 0..segments {
            let start = seg * self.hop;
            let mut seg_psd = vec![0.0f64; bins];

            for samples in channels {
                slice.copy_from_slice(&samples[start..start + n]);
                remove_dc(&mut slice);
                for (dst, (&s, &w)) in buffer.iter_mut().zip(slice.iter().zip(&self.window)) {
                    *dst = Complex::new(s * w, 0.0);
                }
                self.fft.process(&mut buffer);
                for (acc, c) in seg_psd.iter_mut().zip(&buffer[..bins]) {
                    *acc += c.norm_sqr();
                }
            }

            let channel_count = channels.len() as f64;
            for (acc, p) in averaged.iter_mut().zip(&seg_psd) {
                *acc += p / channel_count;
            }
        }

        for p in averaged.iter_mut() {
            *p /= segments as f64;
        }
        if averaged.iter().any(|p| !p.is_finite()) {
            return Err(SpectralError::NonFinite);
        }
        Ok(averaged)
    }

    /// Integrate a spectrum into normalized band fractions.
    pub fn band_powers(&self, psd: &[f64]) -> BandPowers {
        let mut sums = [0.0f64; BAND_COUNT];
        for band in Band::ALL {
            let (lo, hi) = self.band_bins(band);
            let hi = hi.min(psd.len().saturating_sub(1));
            if lo <= hi {
                sums[band.index()] = psd[lo..=hi].iter().sum();
            }
        }
        BandPowers::normalized(sums)
    }

    pub fn estimate(&self, channels: &[Vec<f64>]) -> Result<BandPowers, SpectralError> {
        let psd = self.psd(channels)?;
        Ok(self.band_powers(&psd))
    }
}

fn remove_dc(samples: &mut [f64]) {
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    for s in samples.iter_mut() {
        *s -= mean;
    }
}

pub fn hann_window(size: usize) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: f64, len: usize, amplitude: f64, offset: f64) -> Vec<f64> {
        (0..len)
            .map(|i| offset + amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    fn default_estimator() -> SpectralEstimator {
        SpectralEstimator::new(125, 256, 128).unwrap()
    }

    #[test]
    fn bin_edges_at_default_rate() {
        let est = default_estimator();
        assert_eq!(est.bin_count(), 129);
        assert_eq!(est.band_bins(Band::Delta), (2, 8));
        assert_eq!(est.band_bins(Band::Theta), (8, 16));
        assert_eq!(est.band_bins(Band::Alpha), (16, 25));
        assert_eq!(est.band_bins(Band::Beta), (27, 61));
        assert_eq!(est.band_bins(Band::Gamma), (61, 92));
    }

    #[test]
    fn band_edges_clamp_to_nyquist() {
        // 64 Hz sampling: gamma's 45 Hz edge sits above Nyquist.
        let est = SpectralEstimator::new(64, 64, 32).unwrap();
        assert_eq!(est.band_bins(Band::Gamma), (30, 32));
    }

    #[test]
    fn hann_endpoints_are_zero() {
        let w = hann_window(256);
        assert!(w[0].abs() < 1e-12);
        assert!(w[255].abs() < 1e-12);
        assert!(w.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn alpha_sine_lands_in_alpha() {
        let est = default_estimator();
        let ch = sine(10.0, 125.0, 256, 20.0, 0.0);
        let powers = est.estimate(&[ch]).unwrap();
        assert_eq!(powers.dominant().0, Band::Alpha);
        assert!(powers.get(Band::Alpha) > 0.9);
        assert!((powers.0.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn channels_are_averaged() {
        let est = default_estimator();
        let a = sine(10.0, 125.0, 256, 10.0, 0.0);
        let b = sine(20.0, 125.0, 256, 30.0, 0.0);
        let powers = est.estimate(&[a, b]).unwrap();
        assert_eq!(powers.dominant().0, Band::Beta);
        assert!(powers.get(Band::Alpha) > 0.05);
    }

    #[test]
    fn dc_offset_is_ignored() {
        let est = default_estimator();
        let ch = sine(6.0, 125.0, 256, 1.0, 5000.0);
        let powers = est.estimate(&[ch]).unwrap();
        assert_eq!(powers.dominant().0, Band::Theta);
    }

    #[test]
    fn dc_bin_never_integrated() {
        let est = default_estimator();
        let mut psd = vec![0.0; est.bin_count()];
        psd[0] = 1.0e9;
        psd[20] = 1.0;
        let powers = est.band_powers(&psd);
        assert_eq!(powers.get(Band::Alpha), 1.0);
        assert_eq!(powers.get(Band::Delta), 0.0);
    }

    #[test]
    fn flat_input_yields_zero_fractions() {
        let est = default_estimator();
        let powers = est.estimate(&[vec![3.0; 256], vec![0.0; 256]]).unwrap();
        assert!(powers.0.iter().all(|v| *v == 0.0));
        assert_eq!(powers.dominant().0, Band::Delta);
    }

    #[test]
    fn welch_segments_from_longer_buffer() {
        let est = default_estimator();
        assert_eq!(est.segments(256), 1);
        assert_eq!(est.segments(512), 3);
        let ch = sine(10.0, 125.0, 512, 5.0, 0.0);
        assert_eq!(est.estimate(&[ch]).unwrap().dominant().0, Band::Alpha);
    }

    #[test]
    fn rejects_bad_input() {
        let est = default_estimator();
        assert!(matches!(est.estimate(&[]), Err(SpectralError::Empty)));
        assert!(matches!(
            est.estimate(&[vec![0.0; 10]]),
            Err(SpectralError::ShortChannel { len: 10, .. })
        ));
        let mut ch = vec![0.0; 256];
        ch[3] = f64::NAN;
        assert!(matches!(est.estimate(&[ch]), Err(SpectralError::NonFinite)));
        assert!(SpectralEstimator::new(125, 1, 1).is_err());
    }
}
