//! Embedded-video playback for documents with a multimedia feature.

pub mod decode;
#[cfg(feature = "media-ffmpeg")]
pub mod ffmpeg;
mod manager;
mod provider;
mod target;

pub use decode::{
    ChainMessage, DecodeChain, DecodeChainFactory, NoDecoders, PadData, PadEvents, PadInfo,
    StateChangeOutcome,
};
pub use manager::MediaProviderManager;
pub use provider::{ProviderHandle, ProviderId, ProviderSnapshot};
pub use target::{BlendTarget, VideoFrame};
