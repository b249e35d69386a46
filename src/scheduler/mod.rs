//! Frame production loop.
//!
//! One [`FrameScheduler`] runs on the streaming thread while the demuxer is at least paused. Each
//! cycle it checks the document timeline, applies pending seeks, paints the damaged regions into
//! a persistent surface, converts it into a pooled BGRx buffer and pushes it downstream. The
//! thread hands the scheduler back on exit so a later seek can restart production with the same
//! surface and negotiated format.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::document::DocumentSession;
use crate::engine::{DamageList, DrawMode, Surface};
use crate::foundation::core::{ClockTime, SECOND};
use crate::foundation::error::{DemuxError, DemuxResult};
use crate::host::{
    DownstreamEvent, FlowError, HostBus, HostMessage, QosEvent, VideoFormat, VideoOutput,
};
use crate::negotiate::CapsNegotiator;
use crate::settings::DemuxSettings;

pub mod convert;
pub mod qos;
pub mod segment;

use segment::Segment;

/// Where the production loop currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// No loop thread.
    Idle,
    /// Agreeing on a format with downstream.
    Negotiating,
    /// Rendering and pushing frames.
    Producing,
    /// Preroll frame delivered, waiting for playing.
    PausedWait,
    /// End of stream decided, pushing EOS before exit.
    Draining,
}

/// Document and timeline, guarded by the document lock.
pub(crate) struct DocumentState {
    pub(crate) session: Option<DocumentSession>,
    pub(crate) segment: Segment,
    /// Seek waiting for the next cycle.
    pub(crate) pending_segment: Option<Segment>,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            session: None,
            segment: Segment::default(),
            pending_segment: None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct LoopControl {
    pub(crate) playing: bool,
    pub(crate) done: bool,
}

/// State shared between the demuxer facade and the streaming thread.
pub(crate) struct StreamShared {
    pub(crate) name: String,
    pub(crate) doc: Mutex<DocumentState>,
    pub(crate) settings: Mutex<DemuxSettings>,
    pub(crate) output: Arc<dyn VideoOutput>,
    pub(crate) bus: Arc<dyn HostBus>,
    pub(crate) reconfigure: AtomicBool,
    pub(crate) qos: Mutex<Option<QosEvent>>,
    pub(crate) control: Mutex<LoopControl>,
    pub(crate) wake: Condvar,
    pub(crate) loop_state: Mutex<LoopState>,
    format: Mutex<Option<VideoFormat>>,
}

impl StreamShared {
    pub(crate) fn new(
        name: String,
        settings: DemuxSettings,
        output: Arc<dyn VideoOutput>,
        bus: Arc<dyn HostBus>,
    ) -> Self {
        Self {
            name,
            doc: Mutex::new(DocumentState::default()),
            settings: Mutex::new(settings),
            output,
            bus,
            reconfigure: AtomicBool::new(false),
            qos: Mutex::new(None),
            control: Mutex::new(LoopControl::default()),
            wake: Condvar::new(),
            loop_state: Mutex::new(LoopState::Idle),
            format: Mutex::new(None),
        }
    }

    pub(crate) fn doc(&self) -> MutexGuard<'_, DocumentState> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn settings(&self) -> MutexGuard<'_, DemuxSettings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn control(&self) -> MutexGuard<'_, LoopControl> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn loop_state(&self) -> LoopState {
        *self.loop_state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Format of the running stream.
    pub(crate) fn format(&self) -> Option<VideoFormat> {
        *self.format.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_format(&self, format: Option<VideoFormat>) {
        *self.format.lock().unwrap_or_else(|e| e.into_inner()) = format;
    }

    fn set_loop_state(&self, state: LoopState) {
        *self.loop_state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Change the playing flag and wake a waiting loop.
    pub(crate) fn set_playing(&self, playing: bool) {
        self.control().playing = playing;
        self.wake.notify_all();
    }

    /// Ask the loop to exit at its next check.
    pub(crate) fn request_stop(&self) {
        self.control().done = true;
        self.wake.notify_all();
    }

    pub(crate) fn store_qos(&self, event: QosEvent) {
        *self.qos.lock().unwrap_or_else(|e| e.into_inner()) = Some(event);
    }

    fn take_qos(&self) -> Option<QosEvent> {
        self.qos.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn post_error(&self, err: &DemuxError) {
        self.bus.post(HostMessage::Error {
            source: self.name.clone(),
            reason: err.to_string(),
        });
    }
}

enum Cycle {
    Continue,
    Eos,
    Stop,
}

/// Per-stream production state owned by the streaming thread.
pub struct FrameScheduler {
    shared: Arc<StreamShared>,
    negotiator: CapsNegotiator,
    surface: Option<Surface>,
    damages: DamageList,
    fps: u32,
    frames_pushed: u64,
    prerolled: bool,
    stream_started: bool,
}

impl FrameScheduler {
    pub(crate) fn new(shared: Arc<StreamShared>) -> Self {
        Self {
            shared,
            negotiator: CapsNegotiator::new(),
            surface: None,
            damages: DamageList::new(),
            fps: 1,
            frames_pushed: 0,
            prerolled: false,
            stream_started: false,
        }
    }

    /// Current production rate.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Frames delivered since the last reset.
    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed
    }

    /// Drop the negotiated format and surface. The next run starts a fresh stream.
    pub(crate) fn reset(&mut self) {
        self.negotiator.reset();
        self.shared.set_format(None);
        self.surface = None;
        self.frames_pushed = 0;
        self.prerolled = false;
        self.stream_started = false;
    }

    /// Run on a new streaming thread. The handle yields the scheduler back when the loop ends.
    pub(crate) fn spawn(self) -> DemuxResult<JoinHandle<FrameScheduler>> {
        std::thread::Builder::new()
            .name("demux-stream".to_owned())
            .spawn(move || self.run())
            .map_err(|e| DemuxError::Other(anyhow::Error::new(e).context("spawn streaming thread")))
    }

    #[tracing::instrument(level = "debug", skip(self), fields(element = %self.shared.name))]
    pub(crate) fn run(mut self) -> FrameScheduler {
        self.shared.set_loop_state(LoopState::Negotiating);
        self.frames_pushed = 0;
        self.prerolled = false;
        if let Err(err) = self.start_stream() {
            tracing::error!(error = %err, "stream setup failed");
            self.shared.post_error(&err);
            self.shared.request_stop();
            self.shared.set_loop_state(LoopState::Idle);
            return self;
        }

        self.shared.set_loop_state(LoopState::Producing);
        loop {
            if !self.wait_turn() {
                break;
            }
            match self.cycle() {
                Ok(Cycle::Continue) => {}
                Ok(Cycle::Eos) => {
                    self.finish();
                    break;
                }
                Ok(Cycle::Stop) => break,
                Err(err @ DemuxError::Negotiation(_)) => {
                    tracing::error!(error = %err, "renegotiation failed");
                    self.shared.post_error(&DemuxError::Flow(FlowError::NotNegotiated));
                    self.shared.request_stop();
                    break;
                }
                Err(err) => {
                    tracing::error!(error = %err, "frame production failed");
                    self.shared.post_error(&err);
                    self.finish();
                    break;
                }
            }
        }
        tracing::debug!(frames = self.frames_pushed, "streaming loop exited");
        self.shared.set_loop_state(LoopState::Idle);
        self
    }

    fn start_stream(&mut self) -> DemuxResult<()> {
        if !self.stream_started {
            let stream_id = format!("{}/video", self.shared.name);
            self.shared
                .output
                .push_event(DownstreamEvent::StreamStart { stream_id });
            self.stream_started = true;
        }
        self.renegotiate(true)?;

        let segment = {
            let mut doc = self.shared.doc();
            let DocumentState {
                session,
                segment,
                pending_segment,
            } = &mut *doc;
            if let Some(pending) = pending_segment.take() {
                *segment = segment.clip(&pending);
                if let Some(anim) = session.as_ref().and_then(|s| s.animation()) {
                    anim.seek(segment.start);
                }
            }
            *segment
        };
        self.shared
            .output
            .push_event(DownstreamEvent::Segment(segment));
        Ok(())
    }

    /// Negotiate with downstream and refit the surface. Announces the format when it changed or
    /// when `announce` is set.
    fn renegotiate(&mut self, announce: bool) -> DemuxResult<()> {
        let settings = self.shared.settings().clone();
        let res = {
            let doc = self.shared.doc();
            let session = doc
                .session
                .as_ref()
                .ok_or_else(|| DemuxError::state("no document loaded"))?;
            let res = self.negotiator.negotiate(
                Some(session.window()),
                self.shared.output.as_ref(),
                &settings,
            )?;
            if res.changed || self.surface.is_none() {
                self.fps = res.format.framerate.to_integer().max(1);
                if let Some(anim) = session.animation() {
                    anim.set_fps(self.fps);
                }
            }
            res
        };
        if res.resized || self.surface.is_none() {
            self.surface = Some(Surface::new(res.format.width, res.format.height)?);
        }
        self.shared.set_format(Some(res.format));
        if res.changed || announce {
            self.shared
                .output
                .push_event(DownstreamEvent::Caps(res.format));
        }
        Ok(())
    }

    /// Block while paused after preroll. Returns false when the loop must exit.
    fn wait_turn(&mut self) -> bool {
        let mut ctl = self.shared.control();
        let mut waited = false;
        loop {
            if ctl.done {
                return false;
            }
            if ctl.playing || !self.prerolled {
                break;
            }
            if !waited {
                self.shared.set_loop_state(LoopState::PausedWait);
                waited = true;
            }
            ctl = self
                .shared
                .wake
                .wait(ctl)
                .unwrap_or_else(|e| e.into_inner());
        }
        drop(ctl);
        if waited {
            self.shared.set_loop_state(LoopState::Producing);
        }
        true
    }

    fn cycle(&mut self) -> DemuxResult<Cycle> {
        let mut duration_changed = None;
        let mut new_segment = None;
        {
            let mut doc = self.shared.doc();
            let DocumentState {
                session,
                segment,
                pending_segment,
            } = &mut *doc;
            let Some(session) = session.as_ref() else {
                return Ok(Cycle::Stop);
            };

            let eos_pending = match session.animation() {
                Some(anim) if anim.has_animations() => {
                    let duration = anim.duration();
                    if duration != segment.duration {
                        segment.duration = duration;
                        duration_changed = Some(duration);
                    }
                    false
                }
                _ => true,
            };

            if let Some(pending) = pending_segment.take() {
                let clipped = segment.clip(&pending);
                if let Some(anim) = session.animation() {
                    anim.seek(clipped.start);
                }
                if !clipped.same_bounds(segment) {
                    new_segment = Some(clipped);
                }
                *segment = clipped;
                self.frames_pushed = 0;
                self.prerolled = false;
            }
            if segment.is_finished() {
                tracing::debug!(position = %segment.position, "segment exhausted");
            }
            if segment.is_finished() || (eos_pending && self.frames_pushed > 0) {
                drop(doc);
                self.announce(duration_changed, new_segment);
                return Ok(Cycle::Eos);
            }
        }
        self.announce(duration_changed, new_segment);

        if self.shared.reconfigure.swap(false, Ordering::AcqRel) {
            self.renegotiate(false)?;
        }
        let stride = match self.negotiator.format() {
            Some(format) => format.stride(),
            None => return Err(DemuxError::Flow(FlowError::NotNegotiated)),
        };
        let Some(pool) = self.negotiator.pool().cloned() else {
            return Err(DemuxError::Flow(FlowError::NotNegotiated));
        };
        let mut buffer = match pool.acquire() {
            Ok(buffer) => buffer,
            Err(flow) => {
                tracing::debug!(reason = %flow, "no output buffer");
                return Ok(Cycle::Eos);
            }
        };

        let background = self.shared.settings().background();
        {
            let doc = self.shared.doc();
            let Some(session) = doc.session.as_ref() else {
                return Ok(Cycle::Stop);
            };
            let Some(surface) = self.surface.as_mut() else {
                return Err(DemuxError::state("no surface"));
            };
            session.process();
            self.damages.clear();
            session.render().damages(surface, &mut self.damages);
            if !self.damages.is_empty() {
                match background {
                    Some(argb) => {
                        surface.fill_rects(argb, &self.damages);
                        session.render().draw(surface, DrawMode::Blend, &self.damages);
                    }
                    None => session.render().draw(surface, DrawMode::Fill, &self.damages),
                }
            }
            tracing::trace!(rects = self.damages.len(), "painted");
            self.damages.clear();
        }

        if let Some(surface) = &self.surface {
            convert::surface_to_bgrx(surface, buffer.data_mut(), stride)?;
        }
        let frame_duration = ClockTime((SECOND / u64::from(self.fps.max(1))).max(1));
        let pts = {
            let mut doc = self.shared.doc();
            let pts = doc.segment.position;
            doc.segment.advance(frame_duration);
            pts
        };
        buffer.pts = Some(pts);
        buffer.duration = Some(frame_duration);

        match self.shared.output.push(buffer) {
            Ok(()) => {}
            Err(FlowError::NotLinked) => tracing::trace!(%pts, "output not linked"),
            Err(flow) => {
                tracing::debug!(reason = %flow, %pts, "push refused, ending stream");
                return Ok(Cycle::Eos);
            }
        }
        self.frames_pushed += 1;
        self.prerolled = true;

        let qos = self.shared.take_qos();
        let doc = self.shared.doc();
        let anim = doc.session.as_ref().and_then(|s| s.animation());
        if let Some(anim) = anim {
            anim.tick();
        }
        if let Some(event) = qos {
            let fps = qos::adapt_fps(self.fps, event.proportion);
            if fps != self.fps {
                tracing::debug!(
                    from = self.fps,
                    to = fps,
                    proportion = event.proportion,
                    "qos rate change"
                );
                self.fps = fps;
                if let Some(anim) = anim {
                    anim.set_fps(fps);
                }
            }
        }
        Ok(Cycle::Continue)
    }

    fn announce(&self, duration: Option<Option<ClockTime>>, segment: Option<Segment>) {
        if let Some(duration) = duration {
            self.shared.bus.post(HostMessage::DurationChanged { duration });
        }
        if let Some(segment) = segment {
            self.shared
                .output
                .push_event(DownstreamEvent::Segment(segment));
        }
    }

    fn finish(&mut self) {
        self.shared.set_loop_state(LoopState::Draining);
        self.shared.request_stop();
        self.shared.output.push_event(DownstreamEvent::Eos);
        tracing::debug!(frames = self.frames_pushed, "end of stream");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scheduler/mod.rs"]
mod tests;
