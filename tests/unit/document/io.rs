use std::io::Cursor;

use super::*;

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("wavyte-demux-io-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn locations_with_scheme_pass_through() {
    assert_eq!(
        normalize_location("http://example.com/a.svg").as_deref(),
        Some("http://example.com/a.svg")
    );
    assert_eq!(
        normalize_location("file:///tmp/a.svg").as_deref(),
        Some("file:///tmp/a.svg")
    );
    assert_eq!(normalize_location("   "), None);
}

#[test]
fn paths_become_file_uris() {
    assert_eq!(
        normalize_location("/tmp/scene.svg").as_deref(),
        Some("file:///tmp/scene.svg")
    );
    let rel = normalize_location("scene.svg").unwrap();
    let cwd = std::env::current_dir().unwrap().join("scene.svg");
    assert_eq!(rel, Url::from_file_path(cwd).unwrap().to_string());
}

#[test]
fn relative_resources_resolve_against_document() {
    let io = DocumentIo::new(Some("file:///srv/docs/scene.svg"));
    assert_eq!(
        io.resolve("img/logo.png").unwrap().as_str(),
        "file:///srv/docs/img/logo.png"
    );
    assert_eq!(
        io.resolve("http://cdn/x.png").unwrap().as_str(),
        "http://cdn/x.png"
    );

    let orphan = DocumentIo::new(None);
    assert!(orphan.resolve("img/logo.png").is_err());
}

#[test]
fn load_data_reads_local_files() {
    let dir = temp_dir("data");
    std::fs::write(dir.join("payload.bin"), b"hello").unwrap();
    let base = Url::from_file_path(dir.join("scene.svg")).unwrap();

    let io = DocumentIo::new(Some(base.as_str()));
    assert_eq!(io.load_data("payload.bin").unwrap(), b"hello");
    assert!(io.load_data("missing.bin").is_err());
    assert!(io.load_data("http://example.com/x").is_err());
}

#[test]
fn load_image_premultiplies() {
    let dir = temp_dir("image");
    let img = image::RgbaImage::from_raw(1, 1, vec![200, 100, 50, 128]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(dir.join("px.png"), &buf).unwrap();

    let base = Url::from_file_path(dir.join("scene.svg")).unwrap();
    let io = DocumentIo::new(Some(base.as_str()));
    let surface = io.load_image("px.png").unwrap();
    assert_eq!((surface.width(), surface.height()), (1, 1));
    assert_eq!(
        surface.pixel(0, 0),
        Some([
            ((200u16 * 128 + 127) / 255) as u8,
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            128
        ])
    );
}
