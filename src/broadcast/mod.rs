pub mod frame;
pub mod registry;
pub mod server;

use frame::OutboundFrame;

pub use registry::SubscriberRegistry;

/// Destination for computed frames. The ingestion loop only knows this.
pub trait FrameSink {
    fn publish(&self, frame: &OutboundFrame);
}
