use super::*;

#[test]
fn fraction_compares_by_value() {
    let a = Fraction::new(2, 2).unwrap();
    let b = Fraction::whole(1);
    assert_eq!(a, b);
    assert!(Fraction::new(30000, 1001).unwrap() < Fraction::whole(30));
    assert!(Fraction::MAX > Fraction::whole(1_000_000));
}

#[test]
fn fraction_rejects_zero_den() {
    assert!(Fraction::new(30, 0).is_err());
}

#[test]
fn fraction_integer_part_floors() {
    assert_eq!(Fraction::new(30000, 1001).unwrap().to_integer(), 29);
    assert_eq!(Fraction::whole(25).to_integer(), 25);
}

#[test]
fn clock_time_display_matches_hms() {
    let t = ClockTime(3_723 * SECOND + 5);
    assert_eq!(t.to_string(), "1:02:03.000000005");
}

#[test]
fn clock_time_saturates() {
    assert_eq!(ClockTime(5) - ClockTime(10), ClockTime::ZERO);
    assert_eq!(ClockTime(u64::MAX) + ClockTime(1), ClockTime(u64::MAX));
    assert_eq!(ClockTime::from_secs_f64(-1.0), ClockTime::ZERO);
    assert_eq!(ClockTime::from_secs_f64(0.5), ClockTime(SECOND / 2));
}

#[test]
fn state_steps_walk_adjacent_transitions() {
    let up = StateChange::steps(State::Null, State::Playing);
    assert_eq!(up.len(), 3);
    assert!(up.iter().all(|c| c.is_upward()));
    assert_eq!(up[0].current, State::Null);
    assert_eq!(up[2].next, State::Playing);

    let down = StateChange::steps(State::Playing, State::Ready);
    assert_eq!(
        down,
        vec![
            StateChange {
                current: State::Playing,
                next: State::Paused
            },
            StateChange {
                current: State::Paused,
                next: State::Ready
            },
        ]
    );
    assert!(StateChange::steps(State::Paused, State::Paused).is_empty());
}

#[test]
fn round_up_4_aligns() {
    assert_eq!(round_up_4(0), 0);
    assert_eq!(round_up_4(1), 4);
    assert_eq!(round_up_4(12), 12);
    assert_eq!(round_up_4(13), 16);
}
