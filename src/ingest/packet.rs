use serde::Deserialize;

use crate::error::PacketError;

/// Datagram payloads understood by the listener, keyed by their `type` tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Packet {
    /// delta, theta, alpha, beta, gamma fractions.
    #[serde(rename = "averageBandPower")]
    AverageBandPower(Vec<f64>),
    /// `data[channel][sample]`.
    #[serde(rename = "timeSeriesRaw")]
    TimeSeriesRaw(Vec<Vec<f64>>),
}

impl Packet {
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Packet::AverageBandPower(_) => "averageBandPower",
            Packet::TimeSeriesRaw(_) => "timeSeriesRaw",
        }
    }
}
