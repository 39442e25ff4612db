//! Random draws shared by blink, gaze, speech and reactions.
//!
//! All randomness flows through an injected [`Rng`] so hosts and tests can
//! seed it.

use rand::Rng;

/// Uniform value between `a` and `b`, in either order.
///
/// A degenerate or non-finite range returns its finite lower end (or 0).
pub fn between<R: Rng + ?Sized>(rng: &mut R, a: f32, b: f32) -> f32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if !lo.is_finite() || !hi.is_finite() {
        return if lo.is_finite() { lo } else { 0.0 };
    }
    if hi - lo <= f32::EPSILON {
        return lo;
    }
    rng.random_range(lo..hi)
}

/// Uniformly pick one element of `items`.
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.random_range(0..items.len()))
}

/// Uniform draw in `[0, 1)`.
pub fn unit<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.random::<f32>()
}
