use crate::bands::{Band, BandPowers};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassifierConfig {
    /// Minimum fraction for a band to count toward stability.
    pub dominance_threshold: f64,
    /// Consecutive qualifying frames before an alert edge is evaluated.
    pub stable_frames: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            dominance_threshold: 0.45,
            stable_frames: 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    /// Instantaneous argmax. This is what subscribers see, never the
    /// debounced candidate.
    pub dominant: Band,
    pub fraction: f64,
    pub is_alert: bool,
}

/// Hysteresis state machine that gates alert emission.
///
/// The debounced candidate only decides when an alert fires; the reported
/// dominant band is always the raw per-frame winner.
#[derive(Debug)]
pub struct BandClassifier {
    config: ClassifierConfig,
    candidate: Option<Band>,
    stable_count: u32,
    last_alerted: Option<Band>,
}

impl BandClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            candidate: None,
            stable_count: 0,
            last_alerted: None,
        }
    }

    pub fn last_alerted(&self) -> Option<Band> {
        self.last_alerted
    }

    pub fn classify(&mut self, powers: &BandPowers) -> Classification {
        let (dominant, fraction) = powers.dominant();
        let qualifies = fraction >= self.config.dominance_threshold;

        if self.candidate == Some(dominant) && qualifies {
            self.stable_count += 1;
        } else {
            self.candidate = Some(dominant);
            self.stable_count = u32::from(qualifies);
        }

        let mut is_alert = false;
        if self.stable_count >= self.config.stable_frames {
            if self.candidate != self.last_alerted {
                is_alert = true;
                self.last_alerted = self.candidate;
            }
            self.stable_count = 0;
        }

        Classification {
            dominant,
            fraction,
            is_alert,
        }
    }
}
