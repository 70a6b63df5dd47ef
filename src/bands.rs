use serde::Serialize;
use std::fmt;

/// Canonical EEG frequency bands, in wire and array order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

pub const BAND_COUNT: usize = 5;

impl Band {
    pub const ALL: [Band; BAND_COUNT] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// `[low, high)` edges in Hz.
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Band::Delta => (1.0, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 12.0),
            Band::Beta => (13.0, 30.0),
            Band::Gamma => (30.0, 45.0),
        }
    }

    pub fn width_hz(self) -> f64 {
        let (lo, hi) = self.range_hz();
        hi - lo
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
            Band::Gamma => "gamma",
        }
    }

    /// Coarse frequency estimate for a band holding `fraction` of the power.
    ///
    /// Only band fractions are available, so this places the estimate inside
    /// the band proportionally to its share. It is not a measured peak.
    pub fn estimate_frequency(self, fraction: f64) -> f64 {
        let (lo, _) = self.range_hz();
        lo + self.width_hz() * fraction
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-band power fractions for one frame, in `Band::ALL` order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandPowers(pub [f64; BAND_COUNT]);

impl BandPowers {
    pub fn get(&self, band: Band) -> f64 {
        self.0[band.index()]
    }

    /// Band with the largest fraction. The lowest index wins exact ties.
    pub fn dominant(&self) -> (Band, f64) {
        let mut best = 0;
        for i in 1..BAND_COUNT {
            if self.0[i] > self.0[best] {
                best = i;
            }
        }
        (Band::ALL[best], self.0[best])
    }

    /// Scale raw band sums into fractions of their total.
    ///
    /// A non-positive total divides by 1 instead, so silent input yields
    /// (near-)zero fractions rather than NaN.
    pub fn normalized(sums: [f64; BAND_COUNT]) -> Self {
        let mut total: f64 = sums.iter().sum();
        if total <= 0.0 {
            total = 1.0;
        }
        BandPowers(sums.map(|s| s / total))
    }
}
