use super::*;

const RED_SQUARE: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="6">
<rect x="0" y="0" width="8" height="6" fill="#ff0000"/>
</svg>"##;

#[test]
fn malformed_document_is_a_parse_error() {
    let engine = SvgEngine::without_fonts();
    let err = engine.parse(b"<svg").err().unwrap();
    assert!(err.is_fatal_setup());
    assert!(err.to_string().starts_with("parse error:"));
}

#[test]
fn window_prefers_intrinsic_size() {
    let engine = SvgEngine::without_fonts();
    let doc = engine.parse(RED_SQUARE).unwrap();
    let top = doc.topmost().unwrap();
    let window = top.window().unwrap();
    assert_eq!(
        window.size_hint(),
        SizeHint::Preferred {
            width: 8,
            height: 6
        }
    );
    window.set_content_size(8, 6);
    assert_eq!(window.content_size(), (8, 6));
    assert!(top.animation().is_none());
}

#[test]
fn first_paint_damages_everything_then_nothing() {
    let engine = SvgEngine::without_fonts();
    let doc = engine.parse(RED_SQUARE).unwrap();
    let render = doc.topmost().unwrap().render().unwrap();

    let mut surface = Surface::new(8, 6).unwrap();
    let mut damages = DamageList::new();
    render.damages(&surface, &mut damages);
    assert_eq!(damages.as_slice(), &[surface.full_rect()]);

    render.draw(&mut surface, DrawMode::Fill, &damages);
    assert_eq!(surface.pixel(3, 3), Some([255, 0, 0, 255]));

    damages.clear();
    render.damages(&surface, &mut damages);
    assert!(damages.is_empty());
}

#[test]
fn resizing_content_forces_repaint() {
    let engine = SvgEngine::without_fonts();
    let doc = engine.parse(RED_SQUARE).unwrap();
    let top = doc.topmost().unwrap();
    let render = top.render().unwrap();

    let mut surface = Surface::new(8, 6).unwrap();
    let mut damages = DamageList::new();
    render.damages(&surface, &mut damages);
    render.draw(&mut surface, DrawMode::Fill, &damages);

    top.window().unwrap().set_content_size(16, 12);
    damages.clear();
    render.damages(&surface, &mut damages);
    assert_eq!(damages.len(), 1);
}

#[test]
fn uri_is_stored() {
    let engine = SvgEngine::without_fonts();
    let doc = engine.parse(RED_SQUARE).unwrap();
    assert_eq!(doc.uri(), None);
    doc.set_uri("file:///tmp/scene.svg");
    doc.process();
    assert_eq!(doc.uri().as_deref(), Some("file:///tmp/scene.svg"));
}

const DOT_IMAGE: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg"
  xmlns:xlink="http://www.w3.org/1999/xlink" width="4" height="4">
<image x="0" y="0" width="4" height="4" xlink:href="dot.png"/>
</svg>"##;

struct Files {
    png: Vec<u8>,
    requested: Mutex<Vec<String>>,
}

impl IoHandler for Files {
    fn load_data(&self, uri: &str) -> DemuxResult<Vec<u8>> {
        self.requested.lock().unwrap().push(uri.to_owned());
        if uri == "dot.png" {
            Ok(self.png.clone())
        } else {
            Err(DemuxError::io(format!("{uri}: not found")))
        }
    }

    fn load_image(&self, uri: &str) -> DemuxResult<Surface> {
        Err(DemuxError::io(format!("{uri}: not an image source")))
    }
}

fn green_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn paint(render: &dyn RenderFeature, surface: &mut Surface) {
    let mut damages = DamageList::new();
    render.damages(surface, &mut damages);
    render.draw(surface, DrawMode::Fill, &damages);
}

#[test]
fn images_load_through_the_io_handler() {
    let engine = SvgEngine::without_fonts();
    let doc = engine.parse(DOT_IMAGE).unwrap();
    let top = doc.topmost().unwrap();
    let render = top.render().unwrap();
    let mut surface = Surface::new(4, 4).unwrap();

    paint(render.as_ref(), &mut surface);
    assert_eq!(surface.pixel(2, 2), Some([0, 0, 0, 0]));

    let files = Arc::new(Files {
        png: green_png(),
        requested: Mutex::new(Vec::new()),
    });
    top.io().unwrap().set_handler(Some(files.clone() as Arc<dyn IoHandler>));
    doc.process();
    paint(render.as_ref(), &mut surface);

    assert_eq!(surface.pixel(2, 2), Some([0, 255, 0, 255]));
    assert!(files.requested.lock().unwrap().iter().any(|u| u == "dot.png"));
}

#[test]
fn removing_the_io_handler_does_not_reparse() {
    let engine = SvgEngine::without_fonts();
    let doc = engine.parse(RED_SQUARE).unwrap();
    let top = doc.topmost().unwrap();
    let render = top.render().unwrap();
    let mut surface = Surface::new(8, 6).unwrap();
    paint(render.as_ref(), &mut surface);

    top.io().unwrap().set_handler(None);
    doc.process();
    let mut damages = DamageList::new();
    render.damages(&surface, &mut damages);
    assert!(damages.is_empty());
}
