use super::*;

#[test]
fn clip_trims_to_surface() {
    let r = DamageRect::new(-5, -5, 10, 10).clip(20, 20).unwrap();
    assert_eq!((r.x(), r.y(), r.width(), r.height()), (0, 0, 5, 5));
    assert!(DamageRect::new(30, 0, 5, 5).clip(20, 20).is_none());
    assert!(DamageRect::new(0, 0, 0, 5).clip(20, 20).is_none());
}

#[test]
fn fill_rects_replaces_only_damage() {
    let mut s = Surface::new(4, 4).unwrap();
    s.fill_rects(0xffff0000, &[DamageRect::new(0, 0, 2, 2)]);
    assert_eq!(s.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(s.pixel(1, 1), Some([255, 0, 0, 255]));
    assert_eq!(s.pixel(3, 3), Some([0, 0, 0, 0]));
}

#[test]
fn fill_with_transparent_color_clears() {
    let mut s = Surface::new(2, 2).unwrap();
    let full = s.full_rect();
    s.fill_rects(0xff00ff00, &[full]);
    s.fill_rects(0x00000000, &[full]);
    assert_eq!(s.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn blend_keeps_background_under_transparent_source() {
    let mut dst = Surface::new(2, 2).unwrap();
    let full = dst.full_rect();
    dst.fill_rects(0xffffffff, &[full]);
    let src = Surface::new(2, 2).unwrap();

    dst.draw_from(&src, DrawMode::Blend, &[full]);
    assert_eq!(dst.pixel(0, 0), Some([255, 255, 255, 255]));

    dst.draw_from(&src, DrawMode::Fill, &[full]);
    assert_eq!(dst.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn from_premul_checks_length() {
    assert!(Surface::from_premul_rgba8(1, 1, vec![1, 2, 3, 4]).is_ok());
    assert!(Surface::from_premul_rgba8(2, 1, vec![1, 2, 3, 4]).is_err());
    assert!(Surface::from_premul_rgba8(0, 1, vec![]).is_err());
}

#[test]
fn premultiply_scales_color_by_alpha() {
    let mut px = vec![100u8, 50, 200, 128, 10, 20, 30, 0, 1, 2, 3, 255];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(
        &px[..4],
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128
        ]
    );
    assert_eq!(&px[4..8], &[0, 0, 0, 0]);
    assert_eq!(&px[8..], &[1, 2, 3, 255]);
}
