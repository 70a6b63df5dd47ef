use thiserror::Error;

/// Reasons a datagram is dropped before it reaches the classifier.
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("invalid JSON datagram: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("expected {expected} payload, got {got}")]
    WrongMode {
        expected: &'static str,
        got: &'static str,
    },

    #[error("band power vector has {0} entries, need 5")]
    TooFewBands(usize),

    #[error("raw chunk carries no channels")]
    NoChannels,

    #[error("raw chunk has ragged channels: channel {channel} has {len} samples, expected {expected}")]
    RaggedChannels {
        channel: usize,
        len: usize,
        expected: usize,
    },

    #[error("channel count changed from {expected} to {got}")]
    ChannelCountChanged { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum SpectralError {
    #[error("no channel data to analyse")]
    Empty,

    #[error("segment length {0} is too short for a spectrum")]
    SegmentTooShort(usize),

    #[error("channel {channel} holds {len} samples, segment needs {needed}")]
    ShortChannel {
        channel: usize,
        len: usize,
        needed: usize,
    },

    #[error("spectrum contains non-finite values")]
    NonFinite,

    #[error("window of {wanted} samples exceeds the {max}-sample limit")]
    WindowTooLarge { wanted: f64, max: usize },
}

/// Anything that stops a datagram from producing a frame.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error(transparent)]
    Spectral(#[from] SpectralError),
}
