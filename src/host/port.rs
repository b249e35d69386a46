use std::sync::{Arc, Mutex};

use crate::foundation::core::ClockTime;
use crate::host::caps::{VideoCaps, VideoFormat};
use crate::host::pool::{BufferPool, VideoBuffer};
use crate::scheduler::segment::Segment;

/// Result of pushing data downstream.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowError {
    /// No peer is linked.
    #[error("not linked")]
    NotLinked,
    /// The peer is flushing and drops data.
    #[error("flushing")]
    Flushing,
    /// The peer accepts no more data.
    #[error("end of stream")]
    Eos,
    /// Data was pushed before a format was agreed.
    #[error("not negotiated")]
    NotNegotiated,
    /// The peer failed.
    #[error("downstream error")]
    Error,
}

/// Serialized events travelling with the video stream.
#[derive(Clone, Debug, PartialEq)]
pub enum DownstreamEvent {
    /// First event of a stream.
    StreamStart {
        /// Stream identifier, stable for one element and document.
        stream_id: String,
    },
    /// Format of the buffers that follow.
    Caps(VideoFormat),
    /// Timeline of the buffers that follow.
    Segment(Segment),
    /// No more buffers follow.
    Eos,
}

/// Quality-of-service report from downstream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QosEvent {
    /// Ratio of processing time to real time reported downstream. Above 1 means too slow.
    pub proportion: f64,
    /// Lateness of the last frame in nanoseconds, negative when early.
    pub diff: i64,
    /// Timestamp of the frame the report is about.
    pub timestamp: ClockTime,
}

/// Pointer and keyboard input in output coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum NavigationEvent {
    /// Pointer moved.
    MouseMove {
        /// Horizontal position.
        x: f64,
        /// Vertical position.
        y: f64,
    },
    /// Pointer button pressed.
    MouseButtonPress {
        /// Button number, 1 is primary.
        button: u32,
        /// Horizontal position.
        x: f64,
        /// Vertical position.
        y: f64,
    },
    /// Pointer button released.
    MouseButtonRelease {
        /// Button number, 1 is primary.
        button: u32,
        /// Horizontal position.
        x: f64,
        /// Vertical position.
        y: f64,
    },
    /// Key pressed.
    KeyPress {
        /// Key name.
        key: String,
    },
    /// Key released.
    KeyRelease {
        /// Key name.
        key: String,
    },
}

/// Timeline seek. `None` bounds keep the current segment's values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeekRequest {
    /// Playback rate. Must be positive.
    pub rate: f64,
    /// New start position.
    pub start: Option<ClockTime>,
    /// New stop position.
    pub stop: Option<ClockTime>,
    /// Restart production right away instead of at the next cycle.
    pub flush: bool,
}

impl SeekRequest {
    /// Flushing seek to `start`.
    pub fn to(start: ClockTime) -> Self {
        Self {
            rate: 1.0,
            start: Some(start),
            stop: None,
            flush: true,
        }
    }
}

/// Events sent upstream by the consumer of the video port.
#[derive(Clone, Debug, PartialEq)]
pub enum UpstreamEvent {
    /// Quality-of-service report.
    Qos(QosEvent),
    /// User input.
    Navigation(NavigationEvent),
    /// Timeline seek.
    Seek(SeekRequest),
    /// Downstream wants the format renegotiated before the next frame.
    Reconfigure,
}

/// The peer linked to the demuxer's video output port.
pub trait VideoOutput: Send + Sync {
    /// Formats the peer accepts. `None` means unconstrained.
    fn peer_caps(&self) -> Option<VideoCaps> {
        None
    }

    /// Final acceptance check for a fixed format.
    fn accept_format(&self, _format: &VideoFormat) -> bool {
        true
    }

    /// Pool proposed by downstream for `format`. `None` lets the demuxer allocate its own.
    fn propose_pool(&self, _format: &VideoFormat) -> Option<Arc<BufferPool>> {
        None
    }

    /// Deliver one rendered frame.
    fn push(&self, buffer: VideoBuffer) -> Result<(), FlowError>;

    /// Returns whether the event was accepted.
    fn push_event(&self, event: DownstreamEvent) -> bool;
}

/// Opaque chunk of non-video data forwarded through a dynamic port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaChunk {
    /// Payload bytes.
    pub data: Vec<u8>,
    /// Presentation timestamp.
    pub pts: Option<ClockTime>,
    /// Length of the chunk in time.
    pub duration: Option<ClockTime>,
}

/// Receiver linked to a dynamic port.
pub trait ChunkSink: Send + Sync {
    /// Accept one chunk.
    fn push(&self, chunk: MediaChunk) -> Result<(), FlowError>;
}

/// A port exposed at runtime for a non-video stream of a media provider.
pub struct DynamicPort {
    name: String,
    media_type: String,
    peer: Mutex<Option<Arc<dyn ChunkSink>>>,
}

impl DynamicPort {
    /// An unlinked port.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            peer: Mutex::new(None),
        }
    }

    /// Unique port name, `<provider>_<stream>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Media type of the stream.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Link `sink`, replacing any earlier peer.
    pub fn link(&self, sink: Arc<dyn ChunkSink>) {
        *self.peer.lock().unwrap_or_else(|e| e.into_inner()) = Some(sink);
    }

    /// Drop the peer. Later pushes fail with [`FlowError::NotLinked`].
    pub fn unlink(&self) {
        *self.peer.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Whether a peer is linked.
    pub fn is_linked(&self) -> bool {
        self.peer.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Forward `chunk` to the peer.
    pub fn push(&self, chunk: MediaChunk) -> Result<(), FlowError> {
        let peer = self.peer.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match peer {
            Some(sink) => sink.push(chunk),
            None => Err(FlowError::NotLinked),
        }
    }
}

impl std::fmt::Debug for DynamicPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicPort")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("linked", &self.is_linked())
            .finish()
    }
}

/// Host side of the demuxer's dynamic ports.
pub trait PortHost: Send + Sync {
    /// A port appeared. The host may link it.
    fn port_added(&self, port: Arc<DynamicPort>);
    /// The port called `name` is gone.
    fn port_removed(&self, name: &str);
    /// A provider finished announcing its streams.
    fn no_more_ports(&self, _provider: &str) {}
}

#[cfg(test)]
#[path = "../../tests/unit/host/port.rs"]
mod tests;
