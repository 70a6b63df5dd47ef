pub mod ring;
pub mod spectral;

pub use ring::{hop_size, window_capacity, SampleRing};
pub use spectral::SpectralEstimator;
