//! The demuxer element: document bytes in, video frames and media ports out.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::dispatch::Dispatcher;
use crate::document::{DocumentIo, DocumentSession, normalize_location};
use crate::engine::Engine;
use crate::foundation::core::{ClockTime, State, StateChange};
use crate::foundation::error::DemuxResult;
use crate::host::memory::MemoryPortHost;
use crate::host::{
    Clock, HostBus, HostMessage, PortHost, SeekRequest, SystemClock, UpstreamEvent, VideoCaps,
    VideoFormat, VideoOutput,
};
use crate::media::{DecodeChainFactory, MediaProviderManager, NoDecoders, ProviderSnapshot};
use crate::navigation;
use crate::negotiate;
use crate::scheduler::segment::Segment;
use crate::scheduler::{FrameScheduler, LoopState, StreamShared};
use crate::settings::DemuxSettings;

/// Host collaborators handed to a demuxer at construction.
pub struct ElementContext {
    /// Peer of the video output port.
    pub output: Arc<dyn VideoOutput>,
    /// Where errors, warnings and state changes are posted.
    pub bus: Arc<dyn HostBus>,
    /// Pipeline clock used for pacing and provider base times.
    pub clock: Arc<dyn Clock>,
    /// Receives dynamic ports of embedded videos.
    pub ports: Arc<dyn PortHost>,
    /// Builds decode chains for embedded videos.
    pub decoders: Arc<dyn DecodeChainFactory>,
    /// Location reported by the upstream byte source, if it knows one.
    pub upstream_location: Option<String>,
}

impl ElementContext {
    /// Context with a system clock, no embedded-video decoders and an in-memory port host.
    pub fn new(output: Arc<dyn VideoOutput>, bus: Arc<dyn HostBus>) -> Self {
        Self {
            output,
            bus,
            clock: Arc::new(SystemClock::default()),
            ports: MemoryPortHost::new(),
            decoders: Arc::new(NoDecoders),
            upstream_location: None,
        }
    }

    /// Use `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use `ports` instead of the in-memory port host.
    pub fn with_ports(mut self, ports: Arc<dyn PortHost>) -> Self {
        self.ports = ports;
        self
    }

    /// Enable embedded video through `decoders`.
    pub fn with_decoders(mut self, decoders: Arc<dyn DecodeChainFactory>) -> Self {
        self.decoders = decoders;
        self
    }

    /// Location used as the document base when no `uri` setting is given.
    pub fn with_upstream_location(mut self, location: impl Into<String>) -> Self {
        self.upstream_location = Some(location.into());
        self
    }
}

struct ElementState {
    state: State,
    adapter: Vec<u8>,
    /// Idle scheduler between runs.
    scheduler: Option<FrameScheduler>,
    worker: Option<JoinHandle<FrameScheduler>>,
    dispatcher: Dispatcher,
}

/// Live SVG demuxer.
///
/// Bytes pushed with [`SvgDemux::push_chunk`] are buffered until [`SvgDemux::end_of_input`]
/// parses them. From then on, while the element is paused or playing, a streaming thread renders
/// the document into the [`VideoOutput`]. Embedded videos requested by the document are played
/// through the [`MediaProviderManager`], their non-video streams appear as dynamic ports.
pub struct SvgDemux {
    name: String,
    engine: Arc<dyn Engine>,
    shared: Arc<StreamShared>,
    manager: MediaProviderManager,
    upstream_location: Option<String>,
    element: Mutex<ElementState>,
}

impl SvgDemux {
    /// Create an idle element with default settings.
    pub fn new(name: impl Into<String>, engine: Arc<dyn Engine>, ctx: ElementContext) -> Self {
        Self::with_settings(name, engine, ctx, DemuxSettings::default())
    }

    /// Create an idle element with `settings`. They are validated at the first state change.
    pub fn with_settings(
        name: impl Into<String>,
        engine: Arc<dyn Engine>,
        ctx: ElementContext,
        settings: DemuxSettings,
    ) -> Self {
        let name = name.into();
        let dispatcher = Dispatcher::new();
        let manager = MediaProviderManager::new(
            name.clone(),
            ctx.decoders,
            ctx.ports,
            ctx.bus.clone(),
            ctx.clock,
            dispatcher.sender(),
        );
        let shared = Arc::new(StreamShared::new(
            name.clone(),
            settings,
            ctx.output,
            ctx.bus,
        ));
        Self {
            name,
            engine,
            shared,
            manager,
            upstream_location: ctx.upstream_location,
            element: Mutex::new(ElementState {
                state: State::Null,
                adapter: Vec::new(),
                scheduler: None,
                worker: None,
                dispatcher,
            }),
        }
    }

    /// Element name used as message source.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn element(&self) -> MutexGuard<'_, ElementState> {
        self.element.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current properties.
    pub fn settings(&self) -> DemuxSettings {
        self.shared.settings().clone()
    }

    /// Replace all properties. Size changes apply at the next negotiation.
    pub fn set_settings(&self, settings: DemuxSettings) -> DemuxResult<()> {
        settings.validate()?;
        *self.shared.settings() = settings;
        self.shared
            .reconfigure
            .store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    /// Requested output width, zero for the document's own.
    pub fn set_width(&self, width: u32) -> DemuxResult<()> {
        self.update_settings(|s| s.width = width)
    }

    /// Requested output height, zero for the document's own.
    pub fn set_height(&self, height: u32) -> DemuxResult<()> {
        self.update_settings(|s| s.height = height)
    }

    /// `0xAARRGGBB`, zero disables the background fill.
    pub fn set_background_color(&self, argb: u32) -> DemuxResult<()> {
        self.update_settings(|s| s.background_color = argb)
    }

    /// Base location of the document. Overrides the upstream location.
    pub fn set_uri(&self, uri: Option<String>) -> DemuxResult<()> {
        self.update_settings(|s| s.uri = uri)
    }

    fn update_settings(&self, f: impl FnOnce(&mut DemuxSettings)) -> DemuxResult<()> {
        let mut next = self.settings();
        f(&mut next);
        self.set_settings(next)
    }

    /// Current element state.
    pub fn state(&self) -> State {
        self.element().state
    }

    /// Current state of the streaming loop.
    pub fn loop_state(&self) -> LoopState {
        self.shared.loop_state()
    }

    /// Whether a document has been parsed.
    pub fn has_document(&self) -> bool {
        self.shared.doc().session.is_some()
    }

    /// Snapshot of every live embedded-video provider.
    pub fn providers(&self) -> Vec<ProviderSnapshot> {
        self.manager.snapshot()
    }

    /// Buffer a chunk of the document. Ignored once a document is loaded.
    pub fn push_chunk(&self, bytes: &[u8]) {
        if self.has_document() {
            tracing::debug!(len = bytes.len(), "document already loaded, dropping chunk");
            return;
        }
        self.element().adapter.extend_from_slice(bytes);
    }

    /// The buffered bytes form the complete document: parse it and start producing.
    ///
    /// Setup failures are posted on the bus once and returned.
    #[tracing::instrument(level = "debug", skip(self), fields(element = %self.name))]
    pub fn end_of_input(&self) -> DemuxResult<()> {
        let mut el = self.element();
        if self.has_document() {
            tracing::debug!("end of input after document load, ignoring");
            return Ok(());
        }
        let bytes = std::mem::take(&mut el.adapter);
        let uri = self.document_uri();
        let session = match DocumentSession::bootstrap(self.engine.as_ref(), &bytes, uri.clone()) {
            Ok(session) => session,
            Err(err) => {
                self.shared.bus.post(HostMessage::Error {
                    source: self.name.clone(),
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };
        if session.attach_io(Arc::new(DocumentIo::new(uri.as_deref()))) {
            tracing::debug!(uri = ?uri, "document io attached");
        }
        if session.attach_video_providers(Arc::new(self.manager.clone())) {
            tracing::debug!("video providers attached");
        }

        {
            let mut doc = self.shared.doc();
            doc.session = Some(session);
            doc.segment = Segment::default();
            doc.pending_segment = None;
        }
        el.dispatcher.start(self.manager.control_handler())?;
        if el.state >= State::Paused {
            self.start_loop(&mut el)?;
        }
        tracing::info!("document loaded");
        Ok(())
    }

    fn document_uri(&self) -> Option<String> {
        let settings = self.shared.settings();
        settings
            .uri
            .as_deref()
            .or(self.upstream_location.as_deref())
            .and_then(normalize_location)
    }

    /// Walk the element to `target` one step at a time.
    #[tracing::instrument(level = "debug", skip(self), fields(element = %self.name))]
    pub fn set_state(&self, target: State) -> DemuxResult<()> {
        let mut el = self.element();
        for change in StateChange::steps(el.state, target) {
            self.manager.parent_state_changing(change);
            self.change_state(&mut el, change)?;
            el.state = change.next;
            self.manager.parent_state_changed(change);
            tracing::debug!(%change, "state changed");
            self.shared.bus.post(HostMessage::StateChanged {
                source: self.name.clone(),
                old: change.current,
                new: change.next,
            });
        }
        Ok(())
    }

    fn change_state(&self, el: &mut ElementState, change: StateChange) -> DemuxResult<()> {
        match (change.current, change.next) {
            (State::Null, State::Ready) => self.shared.settings().validate(),
            (State::Ready, State::Paused) => {
                self.shared.set_playing(false);
                if self.has_document() {
                    self.start_loop(el)?;
                }
                Ok(())
            }
            (State::Paused, State::Playing) => {
                self.shared.set_playing(true);
                Ok(())
            }
            (State::Playing, State::Paused) => {
                self.shared.set_playing(false);
                Ok(())
            }
            (State::Paused, State::Ready) | (State::Ready, State::Null) => {
                self.release_document(el);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Stop streaming, destroy providers and drop the document session.
    fn release_document(&self, el: &mut ElementState) {
        self.stop_loop(el);
        if let Some(scheduler) = el.scheduler.as_mut() {
            scheduler.reset();
        }
        self.manager.destroy_all();
        el.dispatcher.stop();
        el.adapter.clear();
        let session = {
            let mut doc = self.shared.doc();
            doc.segment = Segment::default();
            doc.pending_segment = None;
            doc.session.take()
        };
        if session.is_some() {
            drop(session);
            tracing::debug!("document released");
        }
    }

    fn start_loop(&self, el: &mut ElementState) -> DemuxResult<()> {
        if let Some(worker) = &el.worker
            && !worker.is_finished()
            && !self.shared.control().done
        {
            return Ok(());
        }
        self.stop_loop(el);
        let scheduler = el
            .scheduler
            .take()
            .unwrap_or_else(|| FrameScheduler::new(self.shared.clone()));
        self.shared.control().done = false;
        el.worker = Some(scheduler.spawn()?);
        Ok(())
    }

    fn stop_loop(&self, el: &mut ElementState) {
        let Some(worker) = el.worker.take() else {
            return;
        };
        self.shared.request_stop();
        match worker.join() {
            Ok(scheduler) => el.scheduler = Some(scheduler),
            Err(_) => tracing::error!("streaming thread panicked"),
        }
    }

    /// Handle an event sent upstream on the video port. Returns whether it was consumed.
    pub fn handle_upstream_event(&self, event: UpstreamEvent) -> bool {
        match event {
            UpstreamEvent::Qos(qos) => {
                tracing::trace!(proportion = qos.proportion, "qos");
                self.shared.store_qos(qos);
                true
            }
            UpstreamEvent::Navigation(nav) => {
                let doc = self.shared.doc();
                doc.session
                    .as_ref()
                    .is_some_and(|session| navigation::relay(session, &nav))
            }
            UpstreamEvent::Seek(seek) => self.seek(seek),
            UpstreamEvent::Reconfigure => {
                self.shared
                    .reconfigure
                    .store(true, std::sync::atomic::Ordering::Release);
                true
            }
        }
    }

    fn seek(&self, seek: SeekRequest) -> bool {
        let mut el = self.element();
        {
            let mut doc = self.shared.doc();
            if doc.session.is_none() {
                return false;
            }
            let next = doc.segment.from_seek(&seek);
            doc.pending_segment = Some(next);
        }
        tracing::debug!(?seek, "seek");
        if seek.flush && el.state >= State::Paused {
            self.stop_loop(&mut el);
            if let Err(err) = self.start_loop(&mut el) {
                tracing::error!(error = %err, "restart after seek failed");
                return false;
            }
        }
        true
    }

    /// Document duration, `None` when unknown or unbounded.
    pub fn query_duration(&self) -> Option<ClockTime> {
        self.shared.doc().segment.duration
    }

    /// Timeline position of the next frame. `None` before a document is loaded.
    pub fn query_position(&self) -> Option<ClockTime> {
        let doc = self.shared.doc();
        doc.session.as_ref().map(|_| doc.segment.position)
    }

    /// Current playback segment.
    pub fn query_segment(&self) -> Segment {
        self.shared.doc().segment
    }

    /// Formats this element can currently produce.
    pub fn query_caps(&self) -> VideoCaps {
        let doc = self.shared.doc();
        negotiate::query_caps(doc.session.as_ref().map(|s| s.window())).0
    }

    /// Format of the running stream, once negotiated.
    pub fn negotiated_format(&self) -> Option<VideoFormat> {
        self.shared.format()
    }
}

impl Drop for SvgDemux {
    fn drop(&mut self) {
        if let Err(err) = self.set_state(State::Null) {
            tracing::warn!(error = %err, "teardown failed");
        }
    }
}

impl std::fmt::Debug for SvgDemux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgDemux")
            .field("name", &self.name)
            .field("engine", &self.engine.name())
            .field("state", &self.state())
            .field("loop_state", &self.loop_state())
            .finish()
    }
}
