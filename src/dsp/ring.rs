use crate::error::SpectralError;

/// Largest analysis window accepted, in samples per channel.
pub const MAX_WINDOW_SAMPLES: usize = 1 << 20;

/// Smallest power of two holding `sample_rate * window_seconds` samples.
pub fn window_capacity(sample_rate: u32, window_seconds: f64) -> Result<usize, SpectralError> {
    let wanted = (f64::from(sample_rate) * window_seconds).ceil().max(1.0);
    let too_large = SpectralError::WindowTooLarge {
        wanted,
        max: MAX_WINDOW_SAMPLES,
    };
    if wanted.is_nan() || wanted > MAX_WINDOW_SAMPLES as f64 {
        return Err(too_large);
    }
    (wanted as usize).checked_next_power_of_two().ok_or(too_large)
}

/// New samples between spectral computations for a given overlap fraction.
pub fn hop_size(capacity: usize, overlap: f64) -> usize {
    let capacity = capacity.max(1);
    ((capacity as f64 * (1.0 - overlap)).floor() as usize).clamp(1, capacity)
}

/// Fixed-capacity circular store for one channel. The oldest sample is
/// overwritten once the buffer is full.
#[derive(Clone, Debug)]
pub struct ChannelRing {
    data: Vec<f64>,
    cursor: usize,
}

impl ChannelRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn push(&mut self, sample: f64) {
        self.data[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % self.data.len();
    }

    /// The most recent `capacity` samples, oldest first.
    pub fn window(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.data.len());
        out.extend_from_slice(&self.data[self.cursor..]);
        out.extend_from_slice(&self.data[..self.cursor]);
        out
    }
}

/// One ring per channel plus the hop counter that schedules spectral
/// computations.
#[derive(Clone, Debug)]
pub struct SampleRing {
    channels: Vec<ChannelRing>,
    hop: usize,
    pending: usize,
}

impl SampleRing {
    pub fn new(channel_count: usize, capacity: usize, overlap: f64) -> Self {
        let capacity = capacity.max(1);
        let hop = hop_size(capacity, overlap);
        Self {
            channels: (0..channel_count).map(|_| ChannelRing::new(capacity)).collect(),
            hop,
            pending: 0,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Append a rectangular chunk (`chunk[channel][sample]`). Returns true
    /// when at least `hop` samples have arrived since the last computation.
    /// The remainder below one hop carries over, so one chunk fires at most
    /// once but the long-run rate stays one computation per hop.
    pub fn append(&mut self, chunk: &[Vec<f64>]) -> bool {
        debug_assert_eq!(chunk.len(), self.channels.len());
        let samples = chunk.first().map_or(0, Vec::len);
        for (ring, samples) in self.channels.iter_mut().zip(chunk) {
            for &s in samples {
                ring.push(s);
            }
        }

        self.pending += samples;
        if self.pending >= self.hop {
            self.pending %= self.hop;
            true
        } else {
            false
        }
    }

    /// Chronological copy of every channel's window.
    pub fn windows(&self) -> Vec<Vec<f64>> {
        self.channels.iter().map(ChannelRing::window).collect()
    }
}
