use super::*;

#[test]
fn slow_downstream_lowers_rate() {
    assert_eq!(adapt_fps(30, 2.0), 15);
    assert_eq!(adapt_fps(30, 1.5), 20);
    assert_eq!(adapt_fps(1, 4.0), 1);
}

#[test]
fn headroom_raises_rate() {
    assert_eq!(adapt_fps(30, 0.5), 45);
    assert_eq!(adapt_fps(30, 1.0), 30);
}

#[test]
fn garbage_proportion_keeps_rate() {
    assert_eq!(adapt_fps(24, f64::NAN), 24);
    assert_eq!(adapt_fps(24, -1.0), 24);
    assert_eq!(adapt_fps(0, 2.0), 1);
}

#[test]
fn direction_follows_proportion() {
    for fps in [1u32, 7, 24, 30, 60, 240] {
        for p in [0.01, 0.3, 0.99, 1.0, 1.01, 1.7, 3.0, 100.0] {
            let next = adapt_fps(fps, p);
            assert!(next >= 1);
            if p > 1.0 {
                assert!(next <= fps, "fps {fps} p {p} -> {next}");
            } else {
                assert!(next >= fps, "fps {fps} p {p} -> {next}");
            }
        }
    }
}

#[test]
fn repeated_headroom_saturates_at_the_ceiling() {
    let mut fps = 30;
    for _ in 0..100 {
        fps = adapt_fps(fps, 0.01);
        assert!(crate::foundation::core::SECOND / u64::from(fps) > 0);
    }
    assert_eq!(fps, MAX_FPS);
    assert_eq!(adapt_fps(5000, 0.5), 5000);
    assert_eq!(adapt_fps(5000, 2.0), 2500);
}
