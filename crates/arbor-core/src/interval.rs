// crates/arbor-core/src/interval.rs

//! Interval abstract domain over `f64`.
//!
//! An interval `⟨lo, hi⟩` denotes `{x ∈ ℝ | lo ≤ x ≤ hi}`; `lo > hi` encodes
//! bottom (the empty set). Transfer functions are **outward rounded**: every
//! result satisfies `r.lo ≤ f(…)` and `r.hi ≥ f(…)` over the reals.
//!
//! Rounding-mode control is emulated with [`f64::next_down`]/[`f64::next_up`]
//! around each elementary operation instead of touching the FPU state, so the
//! crate stays free of unsafe code and thread-local surprises. Every bound is
//! widened by one ulp; for [`Interval::exp`] the platform `exp` is assumed to
//! be accurate to strictly less than one ulp (true of common libms).
//!
//! Endpoints are ordinary `f64` values including `±∞`; `NaN` endpoints are
//! outside the contract of this module.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed real interval `[lo, hi]`, bottom iff `lo > hi`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Interval {
    /// Lower bound.
    pub lo: f64,
    /// Upper bound.
    pub hi: f64,
}

/// Round one step toward `−∞`: the downward half of the outward-rounding
/// pair. Exposed so derived quantities (sums of bounds, divisions by tree
/// counts) can stay sound without callers hand-rolling their own rounding.
#[inline]
#[must_use]
pub fn down(x: f64) -> f64 {
    x.next_down()
}

/// Round one step toward `+∞`: the upward half of the outward-rounding pair.
#[inline]
#[must_use]
pub fn up(x: f64) -> f64 {
    x.next_up()
}

impl Interval {
    /// The interval `[1, -1]`, a canonical bottom element.
    pub const BOTTOM: Self = Self { lo: 1.0, hi: -1.0 };

    /// The degenerate interval `[1, 1]`.
    pub const ONE: Self = Self { lo: 1.0, hi: 1.0 };

    /// The degenerate interval `[0, 0]`.
    pub const ZERO: Self = Self { lo: 0.0, hi: 0.0 };

    /// Interval from explicit bounds.
    #[inline]
    #[must_use]
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Degenerate interval `[x, x]`.
    #[inline]
    #[must_use]
    pub const fn point(x: f64) -> Self {
        Self { lo: x, hi: x }
    }

    /// Whether the interval is bottom (`lo > hi`).
    #[inline]
    #[must_use]
    pub fn is_bottom(&self) -> bool {
        self.lo > self.hi
    }

    /// Strict domination: every point of `self` is below every point of
    /// `other` (`self.hi < other.lo`).
    #[inline]
    #[must_use]
    pub fn is_lt(&self, other: &Self) -> bool {
        self.hi < other.lo
    }

    /// Non-strict domination (`self.hi ≤ other.lo`).
    #[inline]
    #[must_use]
    pub fn is_leq(&self, other: &Self) -> bool {
        self.hi <= other.lo
    }

    /// Center of the interval.
    #[inline]
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.lo + self.hi) * 0.5
    }

    /// Half-width of the interval.
    #[inline]
    #[must_use]
    pub fn radius(&self) -> f64 {
        (self.hi - self.lo) * 0.5
    }

    /// Uniformly sampled point of the interval.
    #[must_use]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.random::<f64>() * (self.hi - self.lo) + self.lo
    }

    /// Pairwise sum: `[x.lo + y.lo, x.hi + y.hi]`, outward rounded.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            lo: down(self.lo + other.lo),
            hi: up(self.hi + other.hi),
        }
    }

    /// Pairwise difference: `[x.lo − y.lo, x.hi − y.hi]`, outward rounded.
    ///
    /// Both bounds move together (endpoint-wise arithmetic, not the set
    /// difference `{a − b}`); the matching containment guarantee is on the
    /// corresponding endpoints.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        Self {
            lo: down(self.lo - other.lo),
            hi: up(self.hi - other.hi),
        }
    }

    /// Sound product, with case split on endpoint signs. Zero is absorbing.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        let (x, y) = (self, other);

        if (x.lo == 0.0 && x.hi == 0.0) || (y.lo == 0.0 && y.hi == 0.0) {
            return Self::ZERO;
        }

        if x.lo >= 0.0 {
            if y.lo >= 0.0 {
                Self::new(down(x.lo * y.lo), up(x.hi * y.hi))
            } else if y.hi <= 0.0 {
                Self::new(down(x.hi * y.lo), up(x.lo * y.hi))
            } else {
                Self::new(down(x.hi * y.lo), up(x.hi * y.hi))
            }
        } else if x.hi <= 0.0 {
            if y.lo >= 0.0 {
                Self::new(down(x.lo * y.hi), up(x.hi * y.lo))
            } else if y.hi <= 0.0 {
                Self::new(down(x.hi * y.hi), up(x.lo * y.lo))
            } else {
                Self::new(down(x.lo * y.hi), up(x.lo * y.lo))
            }
        } else if y.lo >= 0.0 {
            Self::new(down(x.lo * y.hi), up(x.hi * y.hi))
        } else if y.hi <= 0.0 {
            Self::new(down(x.hi * y.lo), up(x.lo * y.lo))
        } else {
            // Both straddle zero: extreme corner products.
            Self::new(
                down((x.lo * y.hi).min(x.hi * y.lo)),
                up((x.lo * y.lo).max(x.hi * y.hi)),
            )
        }
    }

    /// Natural power by repeated sound multiplication; `degree == 0` yields
    /// `[1, 1]`.
    #[must_use]
    pub fn pow(&self, degree: u32) -> Self {
        if degree == 0 {
            return Self::ONE;
        }
        let mut r = *self;
        for _ in 1..degree {
            r = r.mul(self);
        }
        r
    }

    /// `e^x`, outward rounded. The lower bound is clamped at 0 (the exact
    /// exponential is positive).
    #[must_use]
    pub fn exp(&self) -> Self {
        Self {
            lo: down(self.lo.exp()).max(0.0),
            hi: up(self.hi.exp()),
        }
    }

    /// Translation `x + t`, outward rounded.
    #[must_use]
    pub fn translate(&self, t: f64) -> Self {
        Self {
            lo: down(self.lo + t),
            hi: up(self.hi + t),
        }
    }

    /// Scaling `s · x`; the branch on the sign of `s` keeps the endpoints
    /// monotone.
    #[must_use]
    pub fn scale(&self, s: f64) -> Self {
        if s >= 0.0 {
            Self {
                lo: down(s * self.lo),
                hi: up(s * self.hi),
            }
        } else {
            Self {
                lo: down(s * self.hi),
                hi: up(s * self.lo),
            }
        }
    }

    /// Fused multiply-add `α · x + y`, outward rounded in both steps.
    #[must_use]
    pub fn fma(alpha: f64, x: &Self, y: &Self) -> Self {
        if alpha >= 0.0 {
            Self {
                lo: down(down(alpha * x.lo) + y.lo),
                hi: up(up(alpha * x.hi) + y.hi),
            }
        } else {
            Self {
                lo: down(down(alpha * x.hi) + y.lo),
                hi: up(up(alpha * x.lo) + y.hi),
            }
        }
    }

    /// Greatest lower bound (intersection). Exact, no rounding.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        Self {
            lo: self.lo.max(other.lo),
            hi: self.hi.min(other.hi),
        }
    }

    /// Least upper bound (interval hull). Exact, no rounding.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// Whether `x` lies in the interval.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        self.lo <= x && x <= self.hi
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "bottom")
        } else {
            write!(f, "[{};{}]", self.lo, self.hi)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_and_ordering() {
        assert!(Interval::BOTTOM.is_bottom());
        assert!(!Interval::new(0.0, 0.0).is_bottom());

        let a = Interval::new(0.0, 1.0);
        let b = Interval::new(2.0, 3.0);
        assert!(a.is_lt(&b));
        assert!(!b.is_lt(&a));
        // Touching intervals dominate weakly, not strictly.
        let c = Interval::new(1.0, 2.0);
        assert!(!a.is_lt(&c));
        assert!(a.is_leq(&c));
    }

    #[test]
    fn add_encloses_endpoint_sums() {
        let x = Interval::new(0.1, 0.3);
        let y = Interval::new(-0.2, 0.7);
        let r = x.add(&y);
        assert!(r.lo <= 0.1 + -0.2);
        assert!(r.hi >= 0.3 + 0.7);
    }

    #[test]
    fn mul_sign_cases() {
        let pos = Interval::new(2.0, 3.0);
        let neg = Interval::new(-3.0, -2.0);
        let mix = Interval::new(-2.0, 3.0);

        let pp = pos.mul(&pos);
        assert!(pp.lo <= 4.0 && pp.hi >= 9.0);

        let nn = neg.mul(&neg);
        assert!(nn.lo <= 4.0 && nn.hi >= 9.0);

        let pm = pos.mul(&mix);
        assert!(pm.lo <= -6.0 && pm.hi >= 9.0);

        let mm = mix.mul(&mix);
        assert!(mm.lo <= -6.0 && mm.hi >= 9.0);
    }

    #[test]
    fn mul_zero_absorbs_exactly() {
        let z = Interval::ZERO;
        let x = Interval::new(-1e300, 1e300);
        assert_eq!(z.mul(&x), Interval::ZERO);
        assert_eq!(x.mul(&z), Interval::ZERO);
    }

    #[test]
    fn pow_degree_zero_is_one() {
        let x = Interval::new(-2.0, 5.0);
        assert_eq!(x.pow(0), Interval::ONE);
        let sq = x.pow(2);
        assert!(sq.lo <= -10.0 && sq.hi >= 25.0);
    }

    #[test]
    fn exp_lower_bound_stays_nonnegative() {
        let x = Interval::new(f64::NEG_INFINITY, 0.0);
        let r = x.exp();
        assert!(r.lo >= 0.0);
        assert!(r.hi >= 1.0);
    }

    #[test]
    fn meet_join_are_exact() {
        let a = Interval::new(0.0, 2.0);
        let b = Interval::new(1.0, 3.0);
        assert_eq!(a.meet(&b), Interval::new(1.0, 2.0));
        assert_eq!(a.join(&b), Interval::new(0.0, 3.0));
        assert!(Interval::new(0.0, 1.0).meet(&Interval::new(2.0, 3.0)).is_bottom());
    }

    #[test]
    fn display_format() {
        assert_eq!(Interval::new(0.5, 0.6).to_string(), "[0.5;0.6]");
        assert_eq!(Interval::BOTTOM.to_string(), "bottom");
    }
}
