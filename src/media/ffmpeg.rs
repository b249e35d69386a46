//! Decode chains backed by `ffprobe` and `ffmpeg` subprocesses.
//!
//! Each announced stream gets one worker thread reading raw output from an `ffmpeg` child. Video
//! is decoded to RGBA, audio to interleaved `s16le` stereo at 48 kHz. Workers pace themselves
//! against the pipeline clock using the chain's base time.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::engine::premultiply_rgba8_in_place;
use crate::foundation::core::{ClockTime, SECOND, State, StateChange};
use crate::foundation::error::{DemuxError, DemuxResult};
use crate::host::{Clock, FlowError, MediaChunk};
use crate::media::decode::{
    ChainMessage, DecodeChain, DecodeChainFactory, PadData, PadEvents, PadInfo,
    StateChangeOutcome,
};
use crate::media::target::VideoFrame;

/// Sample rate of the raw PCM stream exposed for audio tracks.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
const AUDIO_CHUNK_BYTES: usize = 4096;
const PACING_SLICE: Duration = Duration::from_millis(20);

/// Facts about a media file gathered before decoding.
#[derive(Clone, Debug)]
pub struct StreamInfo {
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Frame rate numerator.
    pub fps_num: u32,
    /// Frame rate denominator.
    pub fps_den: u32,
    /// Container duration in seconds.
    pub duration_sec: f64,
    /// Whether an audio stream exists.
    pub has_audio: bool,
}

/// Read stream geometry and timing of `source_path` with ffprobe.
pub fn inspect(source_path: &Path) -> DemuxResult<StreamInfo> {
    #[derive(serde::Deserialize)]
    struct StreamEntry {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct FormatEntry {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct InspectOut {
        streams: Vec<StreamEntry>,
        format: Option<FormatEntry>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| DemuxError::provider(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(DemuxError::provider(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: InspectOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| DemuxError::provider(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| DemuxError::provider("no video stream found"))?;
    let width = video
        .width
        .ok_or_else(|| DemuxError::provider("missing video width from ffprobe"))?;
    let height = video
        .height
        .ok_or_else(|| DemuxError::provider("missing video height from ffprobe"))?;
    let (fps_num, fps_den) = parse_ff_ratio(video.r_frame_rate.as_deref().unwrap_or("0/1"))
        .filter(|(n, _)| *n > 0)
        .ok_or_else(|| DemuxError::provider("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(StreamInfo {
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
        has_audio,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

/// Accepts `file://` URIs and plain paths.
fn local_path(uri: &str) -> DemuxResult<PathBuf> {
    match url::Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| DemuxError::provider(format!("invalid file uri '{uri}'"))),
        Ok(url) => Err(DemuxError::provider(format!(
            "unsupported uri scheme '{}'",
            url.scheme()
        ))),
        Err(_) => Ok(PathBuf::from(uri)),
    }
}

/// Builds [`DecodeChain`]s that decode through ffmpeg subprocesses.
pub struct FfmpegChainFactory {
    clock: Arc<dyn Clock>,
}

impl FfmpegChainFactory {
    /// Factory whose chains pace output against `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl DecodeChainFactory for FfmpegChainFactory {
    fn create(&self, name: &str, events: PadEvents) -> DemuxResult<Box<dyn DecodeChain>> {
        Ok(Box::new(FfmpegChain {
            name: name.to_owned(),
            events: Arc::new(events),
            clock: self.clock.clone(),
            path: None,
            info: None,
            state: State::Null,
            base_time: ClockTime::ZERO,
            ctl: Arc::new(WorkerCtl::default()),
            workers: Vec::new(),
            pads: Vec::new(),
        }))
    }
}

#[derive(Default)]
struct CtlState {
    playing: bool,
    stop: bool,
    base_time: ClockTime,
}

#[derive(Default)]
struct WorkerCtl {
    state: Mutex<CtlState>,
    cond: Condvar,
}

impl WorkerCtl {
    fn lock(&self) -> MutexGuard<'_, CtlState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut CtlState)) {
        f(&mut self.lock());
        self.cond.notify_all();
    }

    /// Block until running time reaches `pts`. Returns false when the worker must stop.
    fn wait_for(&self, clock: &dyn Clock, pts: ClockTime) -> bool {
        let mut st = self.lock();
        loop {
            if st.stop {
                return false;
            }
            if !st.playing {
                st = self.cond.wait(st).unwrap_or_else(|e| e.into_inner());
                continue;
            }
            let running = clock.now() - st.base_time;
            if running >= pts {
                return true;
            }
            let left = Duration::from_nanos((pts - running).nseconds()).min(PACING_SLICE);
            st = match self.cond.wait_timeout(st, left) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

struct FfmpegChain {
    name: String,
    events: Arc<PadEvents>,
    clock: Arc<dyn Clock>,
    path: Option<PathBuf>,
    info: Option<StreamInfo>,
    state: State,
    base_time: ClockTime,
    ctl: Arc<WorkerCtl>,
    workers: Vec<JoinHandle<()>>,
    pads: Vec<PadInfo>,
}

impl FfmpegChain {
    fn step(&mut self, change: StateChange) -> DemuxResult<()> {
        match (change.current, change.next) {
            (State::Null, State::Ready) => {
                let path = self
                    .path
                    .clone()
                    .ok_or_else(|| DemuxError::provider(format!("{}: no uri set", self.name)))?;
                let info = inspect(&path)?;
                tracing::debug!(
                    chain = %self.name,
                    width = info.width,
                    height = info.height,
                    has_audio = info.has_audio,
                    "inspected media"
                );
                self.info = Some(info);
            }
            (State::Ready, State::Paused) => self.start_workers()?,
            (State::Paused, State::Playing) => {
                let base_time = self.base_time;
                self.ctl.update(|st| {
                    st.base_time = base_time;
                    st.playing = true;
                });
            }
            (State::Playing, State::Paused) => self.ctl.update(|st| st.playing = false),
            (State::Paused, State::Ready) => self.stop_workers(),
            (State::Ready, State::Null) => self.info = None,
            _ => {}
        }
        Ok(())
    }

    fn start_workers(&mut self) -> DemuxResult<()> {
        let (Some(path), Some(info)) = (self.path.clone(), self.info.clone()) else {
            return Err(DemuxError::provider(format!("{}: not inspected", self.name)));
        };
        self.ctl = Arc::new(WorkerCtl::default());

        let mut streams = vec![StreamPlan::video(&info)];
        if info.has_audio {
            streams.push(StreamPlan::audio());
        }
        for stream in &streams {
            (self.events.pad_added)(&stream.pad);
            self.pads.push(stream.pad.clone());
        }
        (self.events.no_more_pads)();

        for stream in streams {
            let ctx = WorkerCtx {
                path: path.clone(),
                events: self.events.clone(),
                ctl: self.ctl.clone(),
                clock: self.clock.clone(),
            };
            let handle = std::thread::Builder::new()
                .name(format!("{}-{}", self.name, stream.pad.name))
                .spawn(move || run_worker(ctx, stream))
                .map_err(|e| DemuxError::provider(format!("spawn decode worker: {e}")))?;
            self.workers.push(handle);
        }
        Ok(())
    }

    fn stop_workers(&mut self) {
        self.ctl.update(|st| {
            st.stop = true;
            st.playing = false;
        });
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!(chain = %self.name, "decode worker panicked");
            }
        }
        for pad in self.pads.drain(..) {
            (self.events.pad_removed)(&pad);
        }
    }
}

impl DecodeChain for FfmpegChain {
    fn set_uri(&mut self, uri: &str) -> DemuxResult<()> {
        if self.state > State::Ready {
            return Err(DemuxError::state(format!(
                "{}: uri change while {:?}",
                self.name, self.state
            )));
        }
        self.path = Some(local_path(uri)?);
        Ok(())
    }

    fn set_state(&mut self, state: State) -> DemuxResult<StateChangeOutcome> {
        for change in StateChange::steps(self.state, state) {
            self.step(change)?;
            self.state = change.next;
        }
        Ok(StateChangeOutcome::Success)
    }

    fn state(&self) -> State {
        self.state
    }

    fn set_base_time(&mut self, base_time: ClockTime) {
        self.base_time = base_time;
        self.ctl.update(|st| st.base_time = base_time);
    }

    fn base_time(&self) -> ClockTime {
        self.base_time
    }
}

impl Drop for FfmpegChain {
    fn drop(&mut self) {
        self.stop_workers();
    }
}

enum StreamKind {
    Video { width: u32, height: u32 },
    Audio,
}

struct StreamPlan {
    pad: PadInfo,
    kind: StreamKind,
    chunk_len: usize,
    chunk_duration: u64,
    args: Vec<String>,
}

impl StreamPlan {
    fn video(info: &StreamInfo) -> Self {
        Self {
            pad: PadInfo::new("video_0", "video/x-raw"),
            kind: StreamKind::Video {
                width: info.width,
                height: info.height,
            },
            chunk_len: info.width as usize * info.height as usize * 4,
            chunk_duration: SECOND * u64::from(info.fps_den) / u64::from(info.fps_num.max(1)),
            args: ["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"]
                .map(String::from)
                .to_vec(),
        }
    }

    fn audio() -> Self {
        let frames = (AUDIO_CHUNK_BYTES / 4) as u64;
        Self {
            pad: PadInfo::new("audio_0", "audio/x-raw"),
            kind: StreamKind::Audio,
            chunk_len: AUDIO_CHUNK_BYTES,
            chunk_duration: SECOND * frames / u64::from(AUDIO_SAMPLE_RATE),
            args: vec![
                "-vn".into(),
                "-f".into(),
                "s16le".into(),
                "-ac".into(),
                "2".into(),
                "-ar".into(),
                AUDIO_SAMPLE_RATE.to_string(),
                "pipe:1".into(),
            ],
        }
    }
}

struct WorkerCtx {
    path: PathBuf,
    events: Arc<PadEvents>,
    ctl: Arc<WorkerCtl>,
    clock: Arc<dyn Clock>,
}

fn spawn_ffmpeg(path: &Path, args: &[String]) -> std::io::Result<Child> {
    Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
}

fn run_worker(ctx: WorkerCtx, stream: StreamPlan) {
    let mut child = match spawn_ffmpeg(&ctx.path, &stream.args) {
        Ok(c) => c,
        Err(e) => {
            (ctx.events.message)(ChainMessage::Error(format!("failed to run ffmpeg: {e}")));
            return;
        }
    };
    let Some(mut stdout) = child.stdout.take() else {
        (ctx.events.message)(ChainMessage::Error("ffmpeg stdout unavailable".into()));
        let _ = child.kill();
        return;
    };

    let mut idx: u64 = 0;
    loop {
        let pts = ClockTime(idx.saturating_mul(stream.chunk_duration));
        let mut buf = vec![0u8; stream.chunk_len];
        match stdout.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::debug!(pad = %stream.pad.name, chunks = idx, "decode stream finished");
                break;
            }
            Err(e) => {
                (ctx.events.message)(ChainMessage::Error(format!("ffmpeg read failed: {e}")));
                break;
            }
        }
        // First video frame is delivered immediately so a paused document has something to show.
        let preroll = idx == 0 && matches!(stream.kind, StreamKind::Video { .. });
        if !preroll && !ctx.ctl.wait_for(ctx.clock.as_ref(), pts) {
            break;
        }
        if ctx.ctl.lock().stop {
            break;
        }

        let data = match stream.kind {
            StreamKind::Video { width, height } => {
                premultiply_rgba8_in_place(&mut buf);
                PadData::Video(VideoFrame {
                    width,
                    height,
                    data: buf,
                    pts: Some(pts),
                })
            }
            StreamKind::Audio => PadData::Raw(MediaChunk {
                data: buf,
                pts: Some(pts),
                duration: Some(ClockTime(stream.chunk_duration)),
            }),
        };
        match (ctx.events.data)(&stream.pad, data) {
            Ok(()) | Err(FlowError::NotLinked) => {}
            Err(FlowError::Flushing) => break,
            Err(err) => {
                (ctx.events.message)(ChainMessage::Error(format!("{}: {err}", stream.pad.name)));
                break;
            }
        }
        idx += 1;
    }
    let _ = child.kill();
    let _ = child.wait();
}
