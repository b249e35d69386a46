use super::*;

#[test]
fn range_intersection_and_nearest() {
    let a = Range::new(10u32, 100);
    let b = Range::new(50u32, 200);
    assert_eq!(a.intersect(&b), Some(Range::new(50, 100)));
    assert_eq!(a.intersect(&Range::new(101, 300)), None);
    assert_eq!(a.nearest(5), 10);
    assert_eq!(a.nearest(500), 100);
    assert_eq!(a.nearest(42), 42);
    assert!(Range::fixed(7u32).is_fixed());
}

#[test]
fn range_new_orders_bounds() {
    let r = Range::new(9u32, 3);
    assert_eq!(r.min, 3);
    assert_eq!(r.max, 9);
}

#[test]
fn template_fixates_to_targets() {
    let fmt = VideoCaps::template().fixate(320, 240, Fraction::whole(30));
    assert_eq!(fmt.width, 320);
    assert_eq!(fmt.height, 240);
    assert_eq!(fmt.framerate, Fraction::whole(30));
    assert_eq!(fmt.pixel_aspect_ratio, Fraction::whole(1));
}

#[test]
fn downstream_fixed_fields_win_over_defaults() {
    let mut peer = VideoCaps::template();
    peer.framerate = Range::fixed(Fraction::whole(60));
    peer.width = Range::new(100, 200);

    let caps = VideoCaps::template().intersect(&peer).unwrap();
    let fmt = caps.fixate(640, 480, Fraction::whole(30));
    assert_eq!(fmt.framerate, Fraction::whole(60));
    assert_eq!(fmt.width, 200);
    assert_eq!(fmt.height, 480);
}

#[test]
fn disjoint_caps_do_not_intersect() {
    let mut a = VideoCaps::template();
    a.width = Range::fixed(10);
    let mut b = VideoCaps::template();
    b.width = Range::fixed(11);
    assert!(a.intersect(&b).is_none());
}

#[test]
fn buffer_size_is_rounded_to_four() {
    let fmt = VideoFormat {
        layout: PixelLayout::Bgrx,
        width: 3,
        height: 3,
        framerate: Fraction::whole(30),
        pixel_aspect_ratio: Fraction::whole(1),
    };
    assert_eq!(fmt.stride(), 12);
    assert_eq!(fmt.buffer_size(), 36);
    assert!(fmt.to_caps().is_fixed());
}
