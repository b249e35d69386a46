//! Element properties and their validation.

use crate::foundation::error::{DemuxError, DemuxResult};

/// Fallback output width.
pub const DEFAULT_WIDTH: u32 = 256;
/// Fallback output height.
pub const DEFAULT_HEIGHT: u32 = 256;
/// Opaque white.
pub const DEFAULT_BACKGROUND: u32 = 0xffff_ffff;

/// User-settable properties of the demuxer.
///
/// Width and height are fallbacks used when the document's window gives no size hint.
/// `background_color` is `0xAARRGGBB`; zero disables the background fill and the document is
/// painted with replace semantics.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemuxSettings {
    /// Output width when the document has no size.
    pub width: u32,
    /// Output height when the document has no size.
    pub height: u32,
    /// Fill painted under the document.
    pub background_color: u32,
    /// Overrides the document location used for relative resources.
    pub uri: Option<String>,
}

impl Default for DemuxSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            background_color: DEFAULT_BACKGROUND,
            uri: None,
        }
    }
}

impl DemuxSettings {
    /// Parse and validate settings from JSON. Missing keys take defaults.
    pub fn from_json(s: &str) -> DemuxResult<Self> {
        let settings: Self = serde_json::from_str(s)
            .map_err(|e| DemuxError::validation(format!("settings json: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check sizes are positive and fit in `i32`.
    pub fn validate(&self) -> DemuxResult<()> {
        let max = i32::MAX as u32;
        if self.width == 0 || self.width > max {
            return Err(DemuxError::validation(format!(
                "width must be in [1, {max}], got {}",
                self.width
            )));
        }
        if self.height == 0 || self.height > max {
            return Err(DemuxError::validation(format!(
                "height must be in [1, {max}], got {}",
                self.height
            )));
        }
        if let Some(uri) = &self.uri
            && uri.trim().is_empty()
        {
            return Err(DemuxError::validation("uri must not be empty"));
        }
        Ok(())
    }

    /// Background color, `None` when disabled.
    pub fn background(&self) -> Option<u32> {
        (self.background_color != 0).then_some(self.background_color)
    }
}

#[cfg(test)]
#[path = "../tests/unit/settings.rs"]
mod tests;
