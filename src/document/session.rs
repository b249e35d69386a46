use std::sync::Arc;

use crate::engine::{
    AnimationFeature, Document, Engine, InputFeature, IoFeature, IoHandler, MultimediaFeature,
    RenderFeature, ScriptingFeature, Topmost, VideoProviderFactory, WindowFeature,
};
use crate::foundation::error::{DemuxError, DemuxResult};

/// A parsed document with its features resolved.
///
/// Field order is release order: features first, then the topmost element, then the document.
pub struct DocumentSession {
    render: Arc<dyn RenderFeature>,
    window: Arc<dyn WindowFeature>,
    animation: Option<Arc<dyn AnimationFeature>>,
    input: Option<Arc<dyn InputFeature>>,
    multimedia: Option<Arc<dyn MultimediaFeature>>,
    scripting: Option<Arc<dyn ScriptingFeature>>,
    io: Option<Arc<dyn IoFeature>>,
    topmost: Arc<dyn Topmost>,
    document: Arc<dyn Document>,
    uri: Option<String>,
}

impl DocumentSession {
    /// Parse `bytes` and resolve the document's features.
    ///
    /// Anything acquired before a failure is released on return.
    #[tracing::instrument(
        level = "debug",
        skip(engine, bytes),
        fields(engine = engine.name(), len = bytes.len())
    )]
    pub fn bootstrap(engine: &dyn Engine, bytes: &[u8], uri: Option<String>) -> DemuxResult<Self> {
        let document = engine.parse(bytes).inspect_err(|err| {
            tracing::error!(error = %err, "document parse failed");
        })?;
        if let Some(uri) = &uri {
            document.set_uri(uri);
        }

        let topmost = document.topmost().ok_or_else(|| {
            tracing::error!("document has no topmost element");
            DemuxError::missing_feature("topmost element")
        })?;
        let render = topmost.render().ok_or_else(|| {
            tracing::error!("topmost element has no render feature");
            DemuxError::missing_feature("render")
        })?;
        let window = topmost.window().ok_or_else(|| {
            tracing::error!("topmost element has no window feature");
            DemuxError::missing_feature("window")
        })?;

        let session = Self {
            render,
            window,
            animation: topmost.animation(),
            input: topmost.input(),
            multimedia: topmost.multimedia(),
            scripting: topmost.scripting(),
            io: topmost.io(),
            topmost,
            document,
            uri,
        };
        tracing::debug!(
            animation = session.animation.is_some(),
            input = session.input.is_some(),
            multimedia = session.multimedia.is_some(),
            scripting = ?session.scripting.as_ref().map(|s| s.language()),
            io = session.io.is_some(),
            "document bootstrapped"
        );
        Ok(session)
    }

    /// The parsed document.
    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    /// Its root element.
    pub fn topmost(&self) -> &Arc<dyn Topmost> {
        &self.topmost
    }

    /// Base location given to the document.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Render feature. Always present.
    pub fn render(&self) -> &dyn RenderFeature {
        self.render.as_ref()
    }

    /// Window feature. Always present.
    pub fn window(&self) -> &dyn WindowFeature {
        self.window.as_ref()
    }

    /// Animation feature, if the document has one.
    pub fn animation(&self) -> Option<&dyn AnimationFeature> {
        self.animation.as_deref()
    }

    /// Input feature, if the document has one.
    pub fn input(&self) -> Option<&dyn InputFeature> {
        self.input.as_deref()
    }

    /// Whether the provider factory was installed.
    pub fn has_multimedia(&self) -> bool {
        self.multimedia.is_some()
    }

    /// Whether the IO handler was installed.
    pub fn has_io(&self) -> bool {
        self.io.is_some()
    }

    /// Run pending document updates.
    pub fn process(&self) {
        self.document.process();
    }

    /// Returns false when the document has no IO feature.
    pub fn attach_io(&self, handler: Arc<dyn IoHandler>) -> bool {
        match &self.io {
            Some(io) => {
                io.set_handler(Some(handler));
                true
            }
            None => false,
        }
    }

    /// Returns false when the document has no multimedia feature.
    pub fn attach_video_providers(&self, factory: Arc<dyn VideoProviderFactory>) -> bool {
        match &self.multimedia {
            Some(mm) => {
                mm.set_video_provider_factory(Some(factory));
                true
            }
            None => false,
        }
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        if let Some(mm) = &self.multimedia {
            mm.set_video_provider_factory(None);
        }
        if let Some(io) = &self.io {
            io.set_handler(None);
        }
        tracing::debug!("document session released");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/session.rs"]
mod tests;
