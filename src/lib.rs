//! Live SVG document demuxer.
//!
//! A [`SvgDemux`] buffers document bytes until end of input, parses them through a scene
//! [`Engine`](engine::Engine) and then renders the document into a paced stream of BGRx video
//! frames on its output port:
//!
//! - Construct the element with an [`ElementContext`] holding the host collaborators
//! - Feed bytes with [`SvgDemux::push_chunk`] and finish with [`SvgDemux::end_of_input`]
//! - Drive it through [`State`]s with [`SvgDemux::set_state`]
//!
//! Embedded videos requested by documents with a multimedia feature run as nested decode chains
//! managed by [`MediaProviderManager`]. The `media-ffmpeg` feature provides an ffmpeg-backed
//! chain.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod demux;
pub mod dispatch;
pub mod document;
pub mod engine;
pub mod host;
pub mod media;
pub mod navigation;
pub mod negotiate;
pub mod scheduler;
pub mod settings;

#[cfg(test)]
#[path = "../tests/unit/fixtures.rs"]
pub(crate) mod fixtures;

pub use crate::foundation::core::{ClockTime, Fraction, SECOND, State, StateChange};
pub use crate::foundation::error::{DemuxError, DemuxResult};

pub use crate::demux::{ElementContext, SvgDemux};
pub use crate::document::DocumentSession;
pub use crate::engine::svg::SvgEngine;
pub use crate::media::{MediaProviderManager, ProviderSnapshot};
pub use crate::scheduler::LoopState;
pub use crate::scheduler::segment::Segment;
pub use crate::settings::DemuxSettings;
