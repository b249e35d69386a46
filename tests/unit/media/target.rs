use super::*;

fn frame(width: u32, height: u32, fill: [u8; 4]) -> VideoFrame {
    VideoFrame {
        width,
        height,
        data: fill.repeat((width * height) as usize),
        pts: None,
    }
}

#[test]
fn empty_target_has_nothing_to_paint() {
    let target = BlendTarget::new();
    assert!(target.latest().is_none());
    assert!(target.to_surface().is_none());
    assert_eq!(target.generation(), 0);
}

#[test]
fn show_replaces_the_frame_and_bumps_generation() {
    let target = BlendTarget::new();
    target.show(frame(2, 2, [255, 0, 0, 255]));
    target.show(frame(2, 2, [0, 255, 0, 255]));
    assert_eq!(target.generation(), 2);
    assert_eq!(target.latest().unwrap().data[0..4], [0, 255, 0, 255]);

    let surface = target.to_surface().unwrap().unwrap();
    assert_eq!((surface.width(), surface.height()), (2, 2));
}

#[test]
fn clear_drops_the_frame_but_keeps_generation() {
    let target = BlendTarget::new();
    target.show(frame(1, 1, [0, 0, 0, 255]));
    target.clear();
    assert!(target.latest().is_none());
    assert_eq!(target.generation(), 1);
}

#[test]
fn short_frame_data_fails_surface_conversion() {
    let target = BlendTarget::new();
    target.show(VideoFrame {
        width: 4,
        height: 4,
        data: vec![0; 8],
        pts: None,
    });
    assert!(target.to_surface().unwrap().is_err());
}
