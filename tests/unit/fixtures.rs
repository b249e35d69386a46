//! Scripted scene engine shared by unit tests.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::{
    AnimationFeature, DamageList, DamageRect, Document, DrawMode, Engine, InputFeature,
    RenderFeature, SizeHint, Surface, Topmost, WindowFeature,
};
use crate::foundation::core::ClockTime;
use crate::foundation::error::{DemuxError, DemuxResult};

#[derive(Debug, Default)]
pub(crate) struct SceneLog {
    pub ticks: u64,
    pub fps: Vec<u32>,
    pub seeks: Vec<ClockTime>,
    pub processed: usize,
    pub draws: Vec<DrawMode>,
    pub input: Vec<String>,
    pub content_size: (u32, u32),
}

/// Scene painting a solid color over its whole surface every frame.
#[derive(Clone)]
pub(crate) struct Scene {
    pub hint: SizeHint,
    pub color: u32,
    pub animated: bool,
    /// Animations stop after this many ticks. `None` runs forever.
    pub ticks_until_done: Option<u64>,
    pub duration: Option<ClockTime>,
    pub input: bool,
    pub window: bool,
    log: Arc<Mutex<SceneLog>>,
}

impl Scene {
    pub fn still(width: u32, height: u32) -> Self {
        Self {
            hint: SizeHint::Preferred { width, height },
            color: 0xff_00_80_ff,
            animated: false,
            ticks_until_done: None,
            duration: None,
            input: false,
            window: true,
            log: Arc::default(),
        }
    }

    pub fn animated(width: u32, height: u32) -> Self {
        Self {
            animated: true,
            ..Self::still(width, height)
        }
    }

    pub fn log(&self) -> MutexGuard<'_, SceneLog> {
        self.log.lock().unwrap()
    }

    pub fn engine(&self) -> SceneEngine {
        SceneEngine(self.clone())
    }
}

pub(crate) struct SceneEngine(Scene);

impl Engine for SceneEngine {
    fn name(&self) -> &str {
        "scene"
    }

    fn parse(&self, bytes: &[u8]) -> DemuxResult<Arc<dyn Document>> {
        if bytes.starts_with(b"bad") {
            return Err(DemuxError::parse("scripted parse failure"));
        }
        Ok(Arc::new(SceneDoc {
            scene: self.0.clone(),
            uri: Mutex::new(None),
        }))
    }
}

struct SceneDoc {
    scene: Scene,
    uri: Mutex<Option<String>>,
}

impl Document for SceneDoc {
    fn topmost(&self) -> Option<Arc<dyn Topmost>> {
        Some(Arc::new(SceneFeatures(self.scene.clone())))
    }

    fn process(&self) {
        self.scene.log().processed += 1;
    }

    fn set_uri(&self, uri: &str) {
        *self.uri.lock().unwrap() = Some(uri.to_owned());
    }

    fn uri(&self) -> Option<String> {
        self.uri.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct SceneFeatures(Scene);

impl Topmost for SceneFeatures {
    fn render(&self) -> Option<Arc<dyn RenderFeature>> {
        Some(Arc::new(self.clone()))
    }

    fn window(&self) -> Option<Arc<dyn WindowFeature>> {
        self.0
            .window
            .then(|| Arc::new(self.clone()) as Arc<dyn WindowFeature>)
    }

    fn animation(&self) -> Option<Arc<dyn AnimationFeature>> {
        self.0
            .animated
            .then(|| Arc::new(self.clone()) as Arc<dyn AnimationFeature>)
    }

    fn input(&self) -> Option<Arc<dyn InputFeature>> {
        self.0
            .input
            .then(|| Arc::new(self.clone()) as Arc<dyn InputFeature>)
    }
}

impl RenderFeature for SceneFeatures {
    fn damages(&self, surface: &Surface, out: &mut DamageList) {
        out.push(surface.full_rect());
    }

    fn draw(&self, surface: &mut Surface, mode: DrawMode, damages: &[DamageRect]) {
        self.0.log().draws.push(mode);
        match mode {
            DrawMode::Fill => surface.fill_rects(self.0.color, damages),
            DrawMode::Blend => {
                let Ok(mut layer) = Surface::new(surface.width(), surface.height()) else {
                    return;
                };
                layer.fill_rects(self.0.color, damages);
                surface.draw_from(&layer, DrawMode::Blend, damages);
            }
        }
    }
}

impl WindowFeature for SceneFeatures {
    fn size_hint(&self) -> SizeHint {
        self.0.hint
    }

    fn content_size(&self) -> (u32, u32) {
        self.0.log().content_size
    }

    fn set_content_size(&self, width: u32, height: u32) {
        self.0.log().content_size = (width, height);
    }
}

impl AnimationFeature for SceneFeatures {
    fn has_animations(&self) -> bool {
        self.0
            .ticks_until_done
            .is_none_or(|n| self.0.log().ticks < n)
    }

    fn duration(&self) -> Option<ClockTime> {
        self.0.duration
    }

    fn tick(&self) {
        self.0.log().ticks += 1;
    }

    fn set_fps(&self, fps: u32) {
        self.0.log().fps.push(fps);
    }

    fn seek(&self, position: ClockTime) {
        self.0.log().seeks.push(position);
    }
}

impl InputFeature for SceneFeatures {
    fn feed_mouse_move(&self, x: f64, y: f64) {
        self.0.log().input.push(format!("move {x} {y}"));
    }

    fn feed_mouse_down(&self, button: u32) {
        self.0.log().input.push(format!("down {button}"));
    }

    fn feed_mouse_up(&self, button: u32) {
        self.0.log().input.push(format!("up {button}"));
    }

    fn feed_key_down(&self, key: &str) {
        self.0.log().input.push(format!("key down {key}"));
    }

    fn feed_key_up(&self, key: &str) {
        self.0.log().input.push(format!("key up {key}"));
    }
}
