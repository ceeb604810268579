//! Directed-rounding primitives.
//!
//! All interval arithmetic in this workspace rounds toward +∞. Instead of
//! flipping the process-wide FPU control word, every primitive computes the
//! round-to-nearest result and corrects it with an exact error term
//! (TwoSum / FMA residual), stepping to [`f64::next_up`] only when the
//! nearest result fell below the true value. The result is the correctly
//! rounded upward value whenever the residual is representable and a
//! one-ulp over-approximation otherwise.
//!
//! Transcendental endpoint evaluations (`exp`, `ln`, `tanh`) cannot be made
//! exact this way. They read the thread-local [`Direction`] installed by a
//! [`RoundingGuard`] and widen the libm result outward by a few ulps.

use std::cell::Cell;
use std::marker::PhantomData;

/// Products and quotients below this magnitude may have an unrepresentable
/// residual, so they are stepped unconditionally.
const RESIDUAL_SAFE_MIN: f64 = 4.008_336_720_017_946e-292; // 2^-968

/// Outward widening applied to libm results, in ulps.
const LIBM_SLACK_ULPS: u32 = 4;

/// Rounding direction for transcendental endpoint evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Results are over-approximated (default).
    Upward,
    /// Results are under-approximated.
    Downward,
}

thread_local! {
    static DIRECTION: Cell<Direction> = const { Cell::new(Direction::Upward) };
}

/// Direction currently installed on this thread.
#[inline]
pub fn current_direction() -> Direction {
    DIRECTION.with(Cell::get)
}

/// Scoped rounding-direction override.
///
/// The guard installs a direction on the current thread and restores the
/// previous one when dropped, so nested guards unwind in LIFO order. Guards
/// are `!Send` and govern only the thread that created them.
#[derive(Debug)]
#[must_use = "the previous direction is restored as soon as the guard is dropped"]
pub struct RoundingGuard {
    previous: Direction,
    _thread_bound: PhantomData<*const ()>,
}

impl RoundingGuard {
    /// Round toward +∞ until the guard is dropped.
    pub fn upward() -> Self {
        Self::install(Direction::Upward)
    }

    /// Round toward -∞ until the guard is dropped.
    pub fn downward() -> Self {
        Self::install(Direction::Downward)
    }

    fn install(direction: Direction) -> Self {
        let previous = DIRECTION.with(|d| d.replace(direction));
        Self {
            previous,
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for RoundingGuard {
    fn drop(&mut self) {
        DIRECTION.with(|d| d.set(self.previous));
    }
}

/// `a + b` rounded toward +∞.
#[inline]
pub fn add_up(a: f64, b: f64) -> f64 {
    let s = a + b;
    if !s.is_finite() {
        return s;
    }
    // TwoSum: s + err == a + b exactly.
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    if err > 0.0 {
        s.next_up()
    } else {
        s
    }
}

/// `a - b` rounded toward +∞.
#[inline]
pub fn sub_up(a: f64, b: f64) -> f64 {
    add_up(a, -b)
}

/// `a * b` rounded toward +∞. A zero factor yields zero even against an
/// infinite one.
#[inline]
pub fn mul_up(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 {
        return 0.0;
    }
    let p = a * b;
    if !p.is_finite() {
        return p;
    }
    if p.abs() < RESIDUAL_SAFE_MIN {
        return p.next_up();
    }
    let err = a.mul_add(b, -p);
    if err > 0.0 {
        p.next_up()
    } else {
        p
    }
}

/// `a / b` rounded toward +∞.
#[inline]
pub fn div_up(a: f64, b: f64) -> f64 {
    let q = a / b;
    if !q.is_finite() || (q == 0.0 && a == 0.0) {
        return q;
    }
    if q.abs() < RESIDUAL_SAFE_MIN || b.abs() < RESIDUAL_SAFE_MIN {
        return q.next_up();
    }
    // a - q*b, exact; the true quotient exceeds q iff it has b's sign.
    let rem = (-q).mul_add(b, a);
    if (rem > 0.0 && b > 0.0) || (rem < 0.0 && b < 0.0) {
        q.next_up()
    } else {
        q
    }
}

fn widen(value: f64, direction: Direction) -> f64 {
    if value.is_nan() {
        return value;
    }
    let mut v = value;
    for _ in 0..LIBM_SLACK_ULPS {
        v = match direction {
            Direction::Upward => v.next_up(),
            Direction::Downward => v.next_down(),
        };
    }
    v
}

/// `e^x` rounded in the current [`Direction`].
pub fn exp(x: f64) -> f64 {
    let v = widen(x.exp(), current_direction());
    v.max(0.0)
}

/// `ln x` rounded in the current [`Direction`].
pub fn ln(x: f64) -> f64 {
    widen(x.ln(), current_direction())
}

/// `tanh x` rounded in the current [`Direction`], clamped to `[-1, 1]`.
pub fn tanh(x: f64) -> f64 {
    widen(x.tanh(), current_direction()).clamp(-1.0, 1.0)
}
