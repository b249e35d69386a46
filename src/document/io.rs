//! Resource loading for documents: location normalization and the default IO handler.

use std::path::Path;

use anyhow::Context;
use url::Url;

use crate::engine::{IoHandler, Surface, premultiply_rgba8_in_place};
use crate::foundation::error::{DemuxError, DemuxResult};

/// Turn an upstream location into a URI.
///
/// Strings with a scheme pass through. Anything else is a filesystem path: absolute paths become
/// `file://` URIs, relative ones are joined to the current directory first.
pub fn normalize_location(location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(location)
        && url.scheme().len() > 1
    {
        return Some(url.into());
    }
    let path = Path::new(location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    Url::from_file_path(&absolute).ok().map(Into::into)
}

/// Loads document resources relative to the document URI.
pub struct DocumentIo {
    base: Option<Url>,
}

impl DocumentIo {
    /// Handler resolving against `base`. An unparsable base is ignored.
    pub fn new(base: Option<&str>) -> Self {
        let base = base.and_then(|b| match Url::parse(b) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(base = b, error = %err, "ignoring unparsable document uri");
                None
            }
        });
        Self { base }
    }

    /// Absolute URL of `uri`. Relative references need a base.
    pub fn resolve(&self, uri: &str) -> DemuxResult<Url> {
        match Url::parse(uri) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base.as_ref().ok_or_else(|| {
                    DemuxError::io(format!("relative uri '{uri}' without document uri"))
                })?;
                base.join(uri)
                    .map_err(|e| DemuxError::io(format!("cannot resolve '{uri}': {e}")))
            }
            Err(e) => Err(DemuxError::io(format!("invalid uri '{uri}': {e}"))),
        }
    }
}

impl IoHandler for DocumentIo {
    fn load_data(&self, uri: &str) -> DemuxResult<Vec<u8>> {
        let url = self.resolve(uri)?;
        if url.scheme() != "file" {
            return Err(DemuxError::io(format!(
                "unsupported scheme '{}' for '{url}'",
                url.scheme()
            )));
        }
        let path = url
            .to_file_path()
            .map_err(|_| DemuxError::io(format!("not a local path: '{url}'")))?;
        tracing::debug!(path = %path.display(), "loading document resource");
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read resource '{}'", path.display()))?;
        Ok(bytes)
    }

    fn load_image(&self, uri: &str) -> DemuxResult<Surface> {
        let bytes = self.load_data(uri)?;
        let img = image::load_from_memory(&bytes)
            .with_context(|| format!("decode image '{uri}'"))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut data = rgba.into_raw();
        premultiply_rgba8_in_place(&mut data);
        Surface::from_premul_rgba8(width, height, data)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/io.rs"]
mod tests;
