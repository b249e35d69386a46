use std::cmp::Ordering;
use std::fmt;

use crate::foundation::error::{DemuxError, DemuxResult};

/// Nanoseconds per second.
pub const SECOND: u64 = 1_000_000_000;

/// Timeline or clock position in nanoseconds.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ClockTime(pub u64);

impl ClockTime {
    /// Time zero.
    pub const ZERO: Self = Self(0);
    /// One second.
    pub const SECOND: Self = Self(SECOND);

    /// Build from whole nanoseconds.
    pub const fn from_nseconds(ns: u64) -> Self {
        Self(ns)
    }

    /// Build from floating-point seconds, clamping negatives to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::ZERO;
        }
        Self((secs * SECOND as f64).round() as u64)
    }

    /// Raw nanoseconds.
    pub const fn nseconds(self) -> u64 {
        self.0
    }

    /// Seconds as `f64`.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / SECOND as f64
    }

    /// Saturating addition.
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Add for ClockTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl std::ops::AddAssign for ClockTime {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.saturating_add(rhs);
    }
}

impl std::ops::Sub for ClockTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.0;
        let secs = ns / SECOND;
        write!(
            f,
            "{}:{:02}:{:02}.{:09}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            ns % SECOND
        )
    }
}

/// Non-negative rational `num/den`, used for frame rates and pixel aspect ratios.
///
/// Equality and ordering compare the represented value, so `2/2 == 1/1`.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Fraction {
    /// Numerator.
    pub num: u32,
    /// Denominator, must be non-zero.
    pub den: u32,
}

impl Fraction {
    /// Largest representable value.
    pub const MAX: Self = Self {
        num: i32::MAX as u32,
        den: 1,
    };

    /// Create a validated fraction.
    pub fn new(num: u32, den: u32) -> DemuxResult<Self> {
        if den == 0 {
            return Err(DemuxError::validation("fraction den must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// `n/1`.
    pub const fn whole(n: u32) -> Self {
        Self { num: n, den: 1 }
    }

    /// Floating-point value.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Integer part (floor).
    pub fn to_integer(self) -> u32 {
        (u64::from(self.num) / u64::from(self.den)) as u32
    }

    fn cross(self, other: Self) -> (u64, u64) {
        (
            u64::from(self.num) * u64::from(other.den),
            u64::from(other.num) * u64::from(self.den),
        )
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = self.cross(*other);
        a == b
    }
}

impl Eq for Fraction {}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = self.cross(*other);
        a.cmp(&b)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Element run state. `Null` is the idle state.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum State {
    /// Idle: no resources held.
    #[default]
    Null,
    /// Resources allocated, no data flow.
    Ready,
    /// Prerolled, clock stopped.
    Paused,
    /// Clock running.
    Playing,
}

impl State {
    fn step_up(self) -> Option<Self> {
        match self {
            Self::Null => Some(Self::Ready),
            Self::Ready => Some(Self::Paused),
            Self::Paused => Some(Self::Playing),
            Self::Playing => None,
        }
    }

    fn step_down(self) -> Option<Self> {
        match self {
            Self::Null => None,
            Self::Ready => Some(Self::Null),
            Self::Paused => Some(Self::Ready),
            Self::Playing => Some(Self::Paused),
        }
    }
}

/// A single adjacent state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StateChange {
    /// State before the transition.
    pub current: State,
    /// State after the transition.
    pub next: State,
}

impl StateChange {
    /// Adjacent transitions walking from `from` to `to`, in order. Empty when equal.
    pub fn steps(from: State, to: State) -> Vec<StateChange> {
        let mut out = Vec::new();
        let mut cur = from;
        while cur != to {
            let next = if to > cur {
                cur.step_up()
            } else {
                cur.step_down()
            };
            let Some(next) = next else {
                break;
            };
            out.push(StateChange { current: cur, next });
            cur = next;
        }
        out
    }

    /// Whether this transition raises the state.
    pub fn is_upward(self) -> bool {
        self.next > self.current
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}->{:?}", self.current, self.next)
    }
}

/// Round up to the next multiple of four.
pub const fn round_up_4(v: usize) -> usize {
    (v + 3) & !3
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
