use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::bands::{Band, BandPowers};

/// One computed state frame as sent to every subscriber.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundFrame {
    pub timestamp: String,
    pub dominant_band: Band,
    pub dominant_frequency: f64,
    pub time_in_band: f64,
    pub band_powers: BandPowerMap,
    pub is_alert: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BandPowerMap {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl From<&BandPowers> for BandPowerMap {
    fn from(p: &BandPowers) -> Self {
        let [delta, theta, alpha, beta, gamma] = p.0;
        Self {
            delta,
            theta,
            alpha,
            beta,
            gamma,
        }
    }
}

impl OutboundFrame {
    pub fn new(
        at: DateTime<Utc>,
        dominant_band: Band,
        dominant_frequency: f64,
        time_in_band: f64,
        powers: &BandPowers,
        is_alert: bool,
    ) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
            dominant_band,
            dominant_frequency: round_to(dominant_frequency, 1),
            time_in_band: round_to(time_in_band, 2),
            band_powers: powers.into(),
            is_alert,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Round half-to-even at `decimals` places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}
