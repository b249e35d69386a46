use super::*;
use crate::engine::DamageRect;

#[test]
fn swaps_to_bgrx_with_padding() {
    let mut s = Surface::new(2, 2).unwrap();
    s.fill_rects(0xff_10_20_30, &[DamageRect::new(0, 0, 2, 2)]);
    let stride = 12;
    let mut out = vec![0u8; stride * 2];
    surface_to_bgrx(&s, &mut out, stride).unwrap();

    assert_eq!(&out[0..4], &[0x30, 0x20, 0x10, 0xff]);
    assert_eq!(&out[4..8], &[0x30, 0x20, 0x10, 0xff]);
    assert_eq!(&out[8..12], &[0, 0, 0, 0]);
    assert_eq!(&out[12..16], &[0x30, 0x20, 0x10, 0xff]);
}

#[test]
fn rejects_short_buffers() {
    let s = Surface::new(4, 4).unwrap();
    let mut out = vec![0u8; 10];
    assert!(surface_to_bgrx(&s, &mut out, 16).is_err());
    let mut out = vec![0u8; 64];
    assert!(surface_to_bgrx(&s, &mut out, 8).is_err());
}
