pub mod classifier;
pub mod dwell;

use chrono::{DateTime, Utc};
use std::time::Instant;

use crate::bands::{Band, BandPowers};
use crate::broadcast::frame::OutboundFrame;

pub use classifier::{BandClassifier, Classification, ClassifierConfig};
pub use dwell::DwellTracker;

/// Per-process classification state, advanced once per band power vector
/// regardless of which intake produced it.
pub struct FramePipeline {
    classifier: BandClassifier,
    dwell: DwellTracker,
}

impl FramePipeline {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            classifier: BandClassifier::new(config),
            dwell: DwellTracker::new(Instant::now()),
        }
    }

    pub fn process(&mut self, powers: &BandPowers) -> OutboundFrame {
        self.process_at(powers, Instant::now(), Utc::now())
    }

    pub fn process_at(&mut self, powers: &BandPowers, now: Instant, wall: DateTime<Utc>) -> OutboundFrame {
        let previous = self.classifier.last_alerted();
        let Classification {
            dominant,
            fraction,
            is_alert,
        } = self.classifier.classify(powers);
        let time_in_band = self.dwell.observe(dominant, now).as_secs_f64();

        if is_alert {
            log::warn!(
                "ALERT: dominant band changed to {} ({:.0}%), previously {}",
                dominant.label().to_uppercase(),
                fraction * 100.0,
                previous.map_or("none", Band::label)
            );
        }

        OutboundFrame::new(
            wall,
            dominant,
            dominant.estimate_frequency(fraction),
            time_in_band,
            powers,
            is_alert,
        )
    }
}
