use super::*;
use crate::foundation::core::SECOND;

fn secs(n: u64) -> ClockTime {
    ClockTime(n * SECOND)
}

#[test]
fn effective_stop_prefers_earliest_bound() {
    let mut s = Segment::default();
    assert_eq!(s.effective_stop(), None);
    s.duration = Some(secs(10));
    assert_eq!(s.effective_stop(), Some(secs(10)));
    s.stop = Some(secs(4));
    assert_eq!(s.effective_stop(), Some(secs(4)));
}

#[test]
fn finished_once_position_reaches_stop() {
    let mut s = Segment {
        duration: Some(secs(1)),
        ..Segment::default()
    };
    assert!(!s.is_finished());
    s.advance(secs(1));
    assert!(s.is_finished());
}

#[test]
fn seek_keeps_unset_bounds() {
    let cur = Segment {
        stop: Some(secs(8)),
        duration: Some(secs(10)),
        ..Segment::default()
    };
    let next = cur.from_seek(&SeekRequest::to(secs(2)));
    assert_eq!(next.start, secs(2));
    assert_eq!(next.stop, Some(secs(8)));
    assert_eq!(next.position, secs(2));
}

#[test]
fn clip_bounds_to_duration() {
    let cur = Segment {
        duration: Some(secs(5)),
        ..Segment::default()
    };
    let pending = Segment {
        start: secs(7),
        stop: Some(secs(9)),
        ..Segment::default()
    };
    let clipped = cur.clip(&pending);
    assert_eq!(clipped.start, secs(5));
    assert_eq!(clipped.stop, Some(secs(5)));
    assert_eq!(clipped.position, secs(5));
    assert!(clipped.is_finished());
}

#[test]
fn clip_is_idempotent() {
    let cur = Segment {
        duration: Some(secs(5)),
        position: secs(3),
        ..Segment::default()
    };
    let pending = Segment {
        start: secs(2),
        stop: Some(secs(6)),
        rate: 0.0,
        ..Segment::default()
    };
    let once = cur.clip(&pending);
    let twice = once.clip(&pending);
    assert_eq!(once, twice);
    assert_eq!(once.rate, 1.0);
    assert!(once.same_bounds(&twice));
}

#[test]
fn advance_stops_at_the_effective_stop() {
    let frame = ClockTime(SECOND / 30);
    let mut s = Segment {
        stop: Some(ClockTime(SECOND / 20)),
        ..Segment::default()
    };
    s.advance(frame);
    assert_eq!(s.position, frame);
    assert!(!s.is_finished());
    s.advance(frame);
    assert_eq!(s.position, ClockTime(SECOND / 20));
    assert!(s.is_finished());
    s.advance(frame);
    assert_eq!(s.position, ClockTime(SECOND / 20));
}

#[test]
fn advance_is_unbounded_without_stop() {
    let mut s = Segment::default();
    s.advance(secs(3));
    s.advance(secs(3));
    assert_eq!(s.position, secs(6));
}
