//! Contracts between the demuxer and the hosting media pipeline.

mod bus;
mod caps;
mod clock;
pub mod memory;
mod pool;
mod port;

pub use bus::{ChannelBus, HostBus, HostMessage};
pub use caps::{PixelLayout, Range, VideoCaps, VideoFormat};
pub use clock::{Clock, ManualClock, SystemClock};
pub use pool::{BufferPool, BufferPoolOpts, BufferPoolStats, VideoBuffer};
pub use port::{
    ChunkSink, DownstreamEvent, DynamicPort, FlowError, MediaChunk, NavigationEvent, PortHost,
    QosEvent, SeekRequest, UpstreamEvent, VideoOutput,
};
