use std::sync::Mutex;

use super::*;
use crate::engine::{DamageList, DamageRect, DrawMode, SizeHint, Surface};

type Log = Arc<Mutex<Vec<&'static str>>>;

struct Tracked {
    name: &'static str,
    log: Log,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.lock().unwrap().push(self.name);
    }
}

struct Render(Tracked);

impl RenderFeature for Render {
    fn damages(&self, _surface: &Surface, _out: &mut DamageList) {}
    fn draw(&self, _surface: &mut Surface, _mode: DrawMode, _damages: &[DamageRect]) {}
}

struct Window(Tracked);

impl WindowFeature for Window {
    fn size_hint(&self) -> SizeHint {
        SizeHint::Unknown
    }
    fn content_size(&self) -> (u32, u32) {
        (0, 0)
    }
    fn set_content_size(&self, _width: u32, _height: u32) {}
}

struct Top {
    with_render: bool,
    with_window: bool,
    log: Log,
    _t: Tracked,
}

impl Topmost for Top {
    fn render(&self) -> Option<Arc<dyn RenderFeature>> {
        self.with_render.then(|| {
            Arc::new(Render(Tracked {
                name: "render",
                log: self.log.clone(),
            })) as Arc<dyn RenderFeature>
        })
    }

    fn window(&self) -> Option<Arc<dyn WindowFeature>> {
        self.with_window.then(|| {
            Arc::new(Window(Tracked {
                name: "window",
                log: self.log.clone(),
            })) as Arc<dyn WindowFeature>
        })
    }
}

struct Doc {
    with_render: bool,
    with_window: bool,
    uri: Mutex<Option<String>>,
    log: Log,
    _t: Tracked,
}

impl Document for Doc {
    fn topmost(&self) -> Option<Arc<dyn Topmost>> {
        Some(Arc::new(Top {
            with_render: self.with_render,
            with_window: self.with_window,
            log: self.log.clone(),
            _t: Tracked {
                name: "topmost",
                log: self.log.clone(),
            },
        }))
    }
    fn process(&self) {}
    fn set_uri(&self, uri: &str) {
        *self.uri.lock().unwrap() = Some(uri.to_owned());
    }
    fn uri(&self) -> Option<String> {
        self.uri.lock().unwrap().clone()
    }
}

struct FakeEngine {
    with_render: bool,
    with_window: bool,
    log: Log,
}

impl Engine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn parse(&self, bytes: &[u8]) -> DemuxResult<Arc<dyn Document>> {
        if bytes.is_empty() {
            return Err(DemuxError::parse("empty"));
        }
        Ok(Arc::new(Doc {
            with_render: self.with_render,
            with_window: self.with_window,
            uri: Mutex::new(None),
            log: self.log.clone(),
            _t: Tracked {
                name: "document",
                log: self.log.clone(),
            },
        }))
    }
}

fn engine(with_render: bool, with_window: bool) -> (FakeEngine, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    (
        FakeEngine {
            with_render,
            with_window,
            log: log.clone(),
        },
        log,
    )
}

#[test]
fn release_order_is_features_topmost_document() {
    let (eng, log) = engine(true, true);
    let session =
        DocumentSession::bootstrap(&eng, b"<doc/>", Some("file:///a/b.svg".into())).unwrap();
    assert_eq!(session.uri(), Some("file:///a/b.svg"));
    assert_eq!(session.document().uri().as_deref(), Some("file:///a/b.svg"));
    assert!(session.animation().is_none());
    assert!(!session.has_multimedia());

    drop(session);
    assert_eq!(
        log.lock().unwrap().as_slice(),
        &["render", "window", "topmost", "document"]
    );
}

#[test]
fn parse_failure_is_fatal() {
    let (eng, log) = engine(true, true);
    let err = DocumentSession::bootstrap(&eng, b"", None).err().unwrap();
    assert!(err.is_fatal_setup());
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn missing_window_releases_partial_state() {
    let (eng, log) = engine(true, false);
    let err = DocumentSession::bootstrap(&eng, b"<doc/>", None).err().unwrap();
    assert!(matches!(err, DemuxError::MissingFeature(ref f) if f == "window"));
    let released = log.lock().unwrap().clone();
    assert!(released.contains(&"render"));
    assert!(released.contains(&"topmost"));
    assert!(released.contains(&"document"));
}

#[test]
fn missing_render_is_fatal() {
    let (eng, _log) = engine(false, true);
    let err = DocumentSession::bootstrap(&eng, b"<doc/>", None).err().unwrap();
    assert!(matches!(err, DemuxError::MissingFeature(ref f) if f == "render"));
}

#[derive(Default)]
struct RecordingIo {
    installs: Mutex<Vec<bool>>,
}

impl IoFeature for RecordingIo {
    fn set_handler(&self, handler: Option<Arc<dyn IoHandler>>) {
        self.installs.lock().unwrap().push(handler.is_some());
    }
}

struct IoTop {
    io: Arc<RecordingIo>,
    log: Log,
}

impl Topmost for IoTop {
    fn render(&self) -> Option<Arc<dyn RenderFeature>> {
        Some(Arc::new(Render(Tracked {
            name: "render",
            log: self.log.clone(),
        })) as Arc<dyn RenderFeature>)
    }

    fn window(&self) -> Option<Arc<dyn WindowFeature>> {
        Some(Arc::new(Window(Tracked {
            name: "window",
            log: self.log.clone(),
        })) as Arc<dyn WindowFeature>)
    }

    fn io(&self) -> Option<Arc<dyn IoFeature>> {
        Some(self.io.clone() as Arc<dyn IoFeature>)
    }
}

struct IoDoc {
    io: Arc<RecordingIo>,
    log: Log,
}

impl Document for IoDoc {
    fn topmost(&self) -> Option<Arc<dyn Topmost>> {
        Some(Arc::new(IoTop {
            io: self.io.clone(),
            log: self.log.clone(),
        }))
    }
    fn process(&self) {}
    fn set_uri(&self, _uri: &str) {}
    fn uri(&self) -> Option<String> {
        None
    }
}

struct IoEngine {
    io: Arc<RecordingIo>,
}

impl Engine for IoEngine {
    fn name(&self) -> &str {
        "io"
    }

    fn parse(&self, _bytes: &[u8]) -> DemuxResult<Arc<dyn Document>> {
        Ok(Arc::new(IoDoc {
            io: self.io.clone(),
            log: Arc::new(Mutex::new(Vec::new())),
        }))
    }
}

#[test]
fn io_handler_lives_as_long_as_the_session() {
    let io = Arc::new(RecordingIo::default());
    let eng = IoEngine { io: io.clone() };
    let session = DocumentSession::bootstrap(&eng, b"<doc/>", None).unwrap();
    assert!(session.has_io());
    assert!(session.attach_io(Arc::new(crate::document::DocumentIo::new(Some(
        "file:///a/b.svg"
    )))));
    assert_eq!(io.installs.lock().unwrap().as_slice(), &[true]);

    drop(session);
    assert_eq!(io.installs.lock().unwrap().as_slice(), &[true, false]);
}

#[test]
fn documents_without_io_skip_the_handler() {
    let (eng, _log) = engine(true, true);
    let session = DocumentSession::bootstrap(&eng, b"<doc/>", None).unwrap();
    assert!(!session.has_io());
    assert!(!session.attach_io(Arc::new(crate::document::DocumentIo::new(None))));
}
