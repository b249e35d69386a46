//! Decode chain contract: the nested sub-pipeline behind each embedded video.

use std::sync::Arc;

use crate::foundation::core::{ClockTime, State};
use crate::foundation::error::DemuxResult;
use crate::host::{FlowError, MediaChunk};
use crate::media::target::VideoFrame;

/// A stream announced by a decode chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PadInfo {
    /// Stream name, unique within the chain.
    pub name: String,
    /// Media type such as `video/x-raw` or `audio/x-raw`.
    pub media_type: String,
}

impl PadInfo {
    /// Describe a stream.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
        }
    }

    /// Whether the stream carries pictures.
    pub fn is_video(&self) -> bool {
        self.media_type.starts_with("video/")
    }
}

/// A unit of decoded output on one pad.
pub enum PadData {
    /// Decoded picture, routed to the provider's blend target.
    Video(VideoFrame),
    /// Any other stream, forwarded through a dynamic port.
    Raw(MediaChunk),
}

/// Bus messages a decode chain posts while running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainMessage {
    /// The chain failed. Isolated to its provider.
    Error(String),
    /// The chain started an asynchronous state change.
    AsyncStart,
    /// The chain finished an asynchronous state change.
    AsyncDone,
}

/// How a decode chain took a state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateChangeOutcome {
    /// Applied before returning.
    Success,
    /// The chain finishes the change later and posts [`ChainMessage::AsyncDone`].
    Async,
}

type PadFn = Box<dyn Fn(&PadInfo) + Send + Sync>;

/// Callbacks handed to a decode chain on creation.
///
/// The chain may call these from any of its threads, at any time until it is dropped.
pub struct PadEvents {
    /// A stream appeared.
    pub pad_added: PadFn,
    /// A stream went away.
    pub pad_removed: PadFn,
    /// Every stream has been announced.
    pub no_more_pads: Box<dyn Fn() + Send + Sync>,
    /// Decoded output on a stream.
    pub data: Box<dyn Fn(&PadInfo, PadData) -> Result<(), FlowError> + Send + Sync>,
    /// Bus message, delivered on the chain's own thread.
    pub message: Box<dyn Fn(ChainMessage) + Send + Sync>,
}

impl PadEvents {
    /// Callbacks that drop everything. Useful for driving a chain in isolation.
    pub fn discard() -> Self {
        Self {
            pad_added: Box::new(|_| {}),
            pad_removed: Box::new(|_| {}),
            no_more_pads: Box::new(|| {}),
            data: Box::new(|_, _| Ok(())),
            message: Box::new(|_| {}),
        }
    }
}

/// A self-contained decoding sub-pipeline: source, demux, decode.
pub trait DecodeChain: Send {
    /// Media location. Takes effect at the next transition out of `Null`.
    fn set_uri(&mut self, uri: &str) -> DemuxResult<()>;
    /// Move towards `state`.
    fn set_state(&mut self, state: State) -> DemuxResult<StateChangeOutcome>;
    /// Last state reached.
    fn state(&self) -> State;
    /// Clock time that corresponds to stream time zero.
    fn set_base_time(&mut self, base_time: ClockTime);
    /// Current base time.
    fn base_time(&self) -> ClockTime;
}

/// Builds decode chains for embedded videos.
pub trait DecodeChainFactory: Send + Sync {
    /// A new chain in `Null`, reporting through `events`.
    fn create(&self, name: &str, events: PadEvents) -> DemuxResult<Box<dyn DecodeChain>>;
}

/// Factory for hosts without a decoder. Every embedded video fails to instantiate.
pub struct NoDecoders;

impl DecodeChainFactory for NoDecoders {
    fn create(&self, name: &str, _events: PadEvents) -> DemuxResult<Box<dyn DecodeChain>> {
        Err(crate::foundation::error::DemuxError::provider(format!(
            "{name}: no decoder available"
        )))
    }
}

pub(crate) type SharedChain = Arc<std::sync::Mutex<Box<dyn DecodeChain>>>;
