//! Scene-engine abstraction consumed by the demuxer.
//!
//! An [`Engine`] turns document bytes into a [`Document`]. The document's [`Topmost`] element
//! exposes optional feature interfaces. Render and window are mandatory for playback, the rest
//! are wired when present. Implementations use interior mutability: every method takes `&self`
//! and all calls arrive under the demuxer's document lock.

use std::sync::Arc;

use crate::foundation::core::ClockTime;
use crate::foundation::error::DemuxResult;
use crate::media::BlendTarget;

mod surface;
pub mod svg;

pub use surface::{DamageList, DamageRect, DrawMode, Surface};
pub(crate) use surface::premultiply_rgba8_in_place;

/// Preferred output geometry reported by the window feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeHint {
    /// The document has no size of its own.
    Unknown,
    /// Only this size is acceptable.
    Fixed {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Any size within the inclusive bounds.
    Range {
        /// Smallest acceptable width.
        min_width: u32,
        /// Smallest acceptable height.
        min_height: u32,
        /// Largest acceptable width.
        max_width: u32,
        /// Largest acceptable height.
        max_height: u32,
    },
    /// Any size, this one preferred.
    Preferred {
        /// Preferred width in pixels.
        width: u32,
        /// Preferred height in pixels.
        height: u32,
    },
}

/// A scene engine able to parse documents.
pub trait Engine: Send + Sync {
    /// Short engine name used in logs.
    fn name(&self) -> &str;
    /// Parse a complete document. Errors map to a parse failure of the element.
    fn parse(&self, bytes: &[u8]) -> DemuxResult<Arc<dyn Document>>;
}

/// A parsed document.
pub trait Document: Send + Sync {
    /// The root element, `None` for an empty document.
    fn topmost(&self) -> Option<Arc<dyn Topmost>>;
    /// Run pending document updates (style, layout, script timers) before painting.
    fn process(&self);
    /// Set the base location used to resolve relative references.
    fn set_uri(&self, uri: &str);
    /// The current base location.
    fn uri(&self) -> Option<String>;
}

/// Root element of a document, the entry point to its features.
pub trait Topmost: Send + Sync {
    /// Painting. Required for playback.
    fn render(&self) -> Option<Arc<dyn RenderFeature>>;
    /// Geometry. Required for playback.
    fn window(&self) -> Option<Arc<dyn WindowFeature>>;
    /// Timeline control for animated documents.
    fn animation(&self) -> Option<Arc<dyn AnimationFeature>> {
        None
    }
    /// Pointer and keyboard input.
    fn input(&self) -> Option<Arc<dyn InputFeature>> {
        None
    }
    /// Embedded video support.
    fn multimedia(&self) -> Option<Arc<dyn MultimediaFeature>> {
        None
    }
    /// Script execution.
    fn scripting(&self) -> Option<Arc<dyn ScriptingFeature>> {
        None
    }
    /// External resource loading.
    fn io(&self) -> Option<Arc<dyn IoFeature>> {
        None
    }
}

/// Paints the document.
pub trait RenderFeature: Send + Sync {
    /// Append the regions of `surface` that need repainting.
    fn damages(&self, surface: &Surface, out: &mut DamageList);
    /// Paint `damages` of `surface`. With [`DrawMode::Blend`] the document composites over
    /// the current pixels.
    fn draw(&self, surface: &mut Surface, mode: DrawMode, damages: &[DamageRect]);
}

/// Document geometry.
pub trait WindowFeature: Send + Sync {
    /// The size the document would like to be rendered at.
    fn size_hint(&self) -> SizeHint;
    /// Current content size in pixels.
    fn content_size(&self) -> (u32, u32);
    /// Lay the document out for a new content size.
    fn set_content_size(&self, width: u32, height: u32);
}

/// Animation timeline of the document.
pub trait AnimationFeature: Send + Sync {
    /// Whether any animation is still running.
    fn has_animations(&self) -> bool;
    /// Total length of the animation timeline, `None` when unbounded.
    fn duration(&self) -> Option<ClockTime>;
    /// Advance the timeline by one frame at the current rate.
    fn tick(&self);
    /// Frame rate that [`tick`](Self::tick) advances at.
    fn set_fps(&self, fps: u32);
    /// Move the timeline to `position`.
    fn seek(&self, _position: ClockTime) {}
}

/// Receives input events in document coordinates.
pub trait InputFeature: Send + Sync {
    /// Pointer moved to `(x, y)`.
    fn feed_mouse_move(&self, x: f64, y: f64);
    /// Pointer button pressed.
    fn feed_mouse_down(&self, button: u32);
    /// Pointer button released.
    fn feed_mouse_up(&self, button: u32);
    /// Key pressed.
    fn feed_key_down(&self, _key: &str) {}
    /// Key released.
    fn feed_key_up(&self, _key: &str) {}
}

/// Embedded video support of the document.
pub trait MultimediaFeature: Send + Sync {
    /// Install or remove the factory the document uses for embedded video elements.
    fn set_video_provider_factory(&self, factory: Option<Arc<dyn VideoProviderFactory>>);
}

/// Creates playback providers for embedded video elements.
pub trait VideoProviderFactory: Send + Sync {
    /// `owner` names the document element the provider plays for.
    fn create(&self, target: Arc<BlendTarget>, owner: &str) -> DemuxResult<Box<dyn VideoProvider>>;
}

/// Playback control for one embedded video. Dropping it destroys the provider.
pub trait VideoProvider: Send {
    /// Load `uri` and preroll it. Clears an earlier error.
    fn open(&mut self, uri: &str) -> DemuxResult<()>;
    /// Stop playback and release the media.
    fn close(&mut self);
    /// Start playback, capped at the demuxer's own state.
    fn play(&mut self);
    /// Pause playback.
    fn pause(&mut self);
}

/// Script support of the document.
pub trait ScriptingFeature: Send + Sync {
    /// Script language name, for logs.
    fn language(&self) -> &str;
}

/// Lets the host take over resource loading for the document.
pub trait IoFeature: Send + Sync {
    /// Install or remove the handler used for external references.
    fn set_handler(&self, handler: Option<Arc<dyn IoHandler>>);
}

/// Resource loading on behalf of a document.
pub trait IoHandler: Send + Sync {
    /// Raw bytes of `uri`.
    fn load_data(&self, uri: &str) -> DemuxResult<Vec<u8>>;
    /// Decoded, premultiplied image at `uri`.
    fn load_image(&self, uri: &str) -> DemuxResult<Surface>;
}
