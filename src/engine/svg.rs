//! Static SVG engine backed by `usvg` and `resvg`.
//!
//! Documents have no timeline, so the demuxer produces a single frame and ends the stream.
//! Image references go through the installed [`IoHandler`] when there is one, otherwise they are
//! resolved against the directory of the document URI.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use resvg::tiny_skia;

use crate::engine::{
    DamageList, DamageRect, Document, DrawMode, Engine, IoFeature, IoHandler, RenderFeature,
    SizeHint, Surface, Topmost, WindowFeature,
};
use crate::foundation::error::{DemuxError, DemuxResult};

/// Static SVG engine built on usvg and resvg.
pub struct SvgEngine {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl Default for SvgEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgEngine {
    /// Engine with the system font set loaded.
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "svg engine font database loaded");
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Engine without fonts. Text nodes render as nothing.
    pub fn without_fonts() -> Self {
        Self {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        }
    }
}

impl Engine for SvgEngine {
    fn name(&self) -> &str {
        "svg"
    }

    fn parse(&self, bytes: &[u8]) -> DemuxResult<Arc<dyn Document>> {
        let tree = parse_tree(bytes, None, None, &self.fontdb)?;
        Ok(Arc::new(SvgDocument {
            shared: Arc::new(SvgShared {
                source: bytes.to_vec(),
                fontdb: self.fontdb.clone(),
                state: Mutex::new(SvgState {
                    tree: Arc::new(tree),
                    uri: None,
                    io: None,
                    reparse: false,
                    content: (0, 0),
                    painted: None,
                }),
            }),
        }))
    }
}

fn parse_tree(
    bytes: &[u8],
    resources_dir: Option<PathBuf>,
    io: Option<Arc<dyn IoHandler>>,
    fontdb: &Arc<usvg::fontdb::Database>,
) -> DemuxResult<usvg::Tree> {
    let mut opts = usvg::Options {
        resources_dir,
        fontdb: fontdb.clone(),
        ..usvg::Options::default()
    };
    if let Some(io) = io {
        opts.image_href_resolver = io_resolver(io);
    }
    usvg::Tree::from_data(bytes, &opts).map_err(|e| DemuxError::parse(format!("svg: {e}")))
}

/// Image `href` strings are loaded through `io`, falling back to usvg's file lookup.
fn io_resolver(io: Arc<dyn IoHandler>) -> usvg::ImageHrefResolver<'static> {
    let fallback = usvg::ImageHrefResolver::default_string_resolver();
    usvg::ImageHrefResolver {
        resolve_data: usvg::ImageHrefResolver::default_data_resolver(),
        resolve_string: Box::new(move |href: &str, opts: &usvg::Options| {
            match io.load_data(href) {
                Ok(bytes) => image_kind(bytes),
                Err(err) => {
                    tracing::debug!(href, error = %err, "image not loadable through io handler");
                    fallback(href, opts)
                }
            }
        }),
    }
}

fn image_kind(bytes: Vec<u8>) -> Option<usvg::ImageKind> {
    let format = image::guess_format(&bytes).ok()?;
    let data = Arc::new(bytes);
    match format {
        image::ImageFormat::Png => Some(usvg::ImageKind::PNG(data)),
        image::ImageFormat::Jpeg => Some(usvg::ImageKind::JPEG(data)),
        image::ImageFormat::Gif => Some(usvg::ImageKind::GIF(data)),
        image::ImageFormat::WebP => Some(usvg::ImageKind::WEBP(data)),
        other => {
            tracing::debug!(format = ?other, "unsupported image format in svg");
            None
        }
    }
}

fn resources_dir_for(uri: &str) -> Option<PathBuf> {
    let url = url::Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    let path = url.to_file_path().ok()?;
    path.parent().map(|p| p.to_path_buf())
}

struct SvgState {
    tree: Arc<usvg::Tree>,
    uri: Option<String>,
    io: Option<Arc<dyn IoHandler>>,
    /// Resource context changed since the last parse.
    reparse: bool,
    content: (u32, u32),
    painted: Option<(u32, u32)>,
}

struct SvgShared {
    source: Vec<u8>,
    fontdb: Arc<usvg::fontdb::Database>,
    state: Mutex<SvgState>,
}

impl SvgShared {
    fn lock(&self) -> MutexGuard<'_, SvgState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct SvgDocument {
    shared: Arc<SvgShared>,
}

impl Document for SvgDocument {
    fn topmost(&self) -> Option<Arc<dyn Topmost>> {
        Some(Arc::new(SvgFeatures {
            shared: self.shared.clone(),
        }))
    }

    fn process(&self) {
        let mut st = self.shared.lock();
        if !st.reparse {
            return;
        }
        st.reparse = false;
        let dir = st.uri.as_deref().and_then(resources_dir_for);
        if dir.is_none() && st.io.is_none() {
            return;
        }
        match parse_tree(&self.shared.source, dir, st.io.clone(), &self.shared.fontdb) {
            Ok(tree) => {
                st.tree = Arc::new(tree);
                st.painted = None;
            }
            Err(err) => tracing::warn!(error = %err, "svg reparse with resources failed"),
        }
    }

    fn set_uri(&self, uri: &str) {
        let mut st = self.shared.lock();
        if st.uri.as_deref() != Some(uri) {
            st.uri = Some(uri.to_owned());
            st.reparse = true;
        }
    }

    fn uri(&self) -> Option<String> {
        self.shared.lock().uri.clone()
    }
}

#[derive(Clone)]
struct SvgFeatures {
    shared: Arc<SvgShared>,
}

impl Topmost for SvgFeatures {
    fn render(&self) -> Option<Arc<dyn RenderFeature>> {
        Some(Arc::new(self.clone()))
    }

    fn window(&self) -> Option<Arc<dyn WindowFeature>> {
        Some(Arc::new(self.clone()))
    }

    fn io(&self) -> Option<Arc<dyn IoFeature>> {
        Some(Arc::new(self.clone()))
    }
}

impl IoFeature for SvgFeatures {
    fn set_handler(&self, handler: Option<Arc<dyn IoHandler>>) {
        let mut st = self.shared.lock();
        st.reparse |= handler.is_some();
        st.io = handler;
    }
}

impl RenderFeature for SvgFeatures {
    fn damages(&self, surface: &Surface, out: &mut DamageList) {
        let st = self.shared.lock();
        if st.painted != Some((surface.width(), surface.height())) {
            out.push(surface.full_rect());
        }
    }

    fn draw(&self, surface: &mut Surface, mode: DrawMode, damages: &[DamageRect]) {
        let tree = {
            let mut st = self.shared.lock();
            st.painted = Some((surface.width(), surface.height()));
            st.tree.clone()
        };
        let scratch = match rasterize(&tree, surface.width(), surface.height()) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(error = %err, "svg rasterization failed");
                return;
            }
        };
        surface.draw_from(&scratch, mode, damages);
    }
}

impl WindowFeature for SvgFeatures {
    fn size_hint(&self) -> SizeHint {
        let st = self.shared.lock();
        let size = st.tree.size();
        SizeHint::Preferred {
            width: (size.width().ceil() as u32).max(1),
            height: (size.height().ceil() as u32).max(1),
        }
    }

    fn content_size(&self) -> (u32, u32) {
        self.shared.lock().content
    }

    fn set_content_size(&self, width: u32, height: u32) {
        let mut st = self.shared.lock();
        if st.content != (width, height) {
            st.content = (width, height);
            st.painted = None;
        }
    }
}

fn rasterize(tree: &usvg::Tree, width: u32, height: u32) -> DemuxResult<Surface> {
    let mut scratch = Surface::new(width, height)?;
    let size = tree.size();
    let sx = width as f32 / size.width();
    let sy = height as f32 / size.height();
    if !sx.is_finite() || !sy.is_finite() {
        return Err(DemuxError::validation("svg has invalid width/height"));
    }
    let xform = tiny_skia::Transform::from_scale(sx, sy);
    resvg::render(tree, xform, &mut scratch.pixmap_mut().as_mut());
    Ok(scratch)
}

#[cfg(test)]
#[path = "../../tests/unit/engine/svg.rs"]
mod tests;
