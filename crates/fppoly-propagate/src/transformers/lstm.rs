//! Gate-product relaxation for LSTM cells.
//!
//! The cell update multiplies a sigmoid gate by either a tanh candidate or
//! the previous cell state. Both products are `f(x, y) = σ(x)·g(y)` with
//! `g = tanh` or `g = id`, over the pre-activation box of the two factors.
//! Four candidate planes are built from corner values and partial
//! derivatives of `f`; for each side the plane closer to the surface at
//! the box midpoint is kept and composed with the factor expressions.

use super::{sigmoid_enclosure, tanh_enclosure};
use fppoly_core::{AffineExpr, Interval, RoundingConfig};

/// Factor ranges narrower than this are boxed.
pub const BOXIFY_WIDTH: f64 = 1e-2;

/// Outward widening of the box the planes are fitted on.
pub const PLANE_DELTA: f64 = 1e-5;

/// The function applied to the second factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondFactor {
    Tanh,
    Identity,
}

impl SecondFactor {
    fn eval(self, y: f64) -> f64 {
        match self {
            SecondFactor::Tanh => y.tanh(),
            SecondFactor::Identity => y,
        }
    }

    fn derivative(self, y: f64) -> f64 {
        match self {
            SecondFactor::Tanh => {
                let t = y.tanh();
                1.0 - t * t
            }
            SecondFactor::Identity => 1.0,
        }
    }

    /// Sound image of the pre-activation range `bounds`.
    fn image(self, bounds: Interval) -> Interval {
        match self {
            SecondFactor::Tanh => Interval::new(
                tanh_enclosure(-bounds.inf).inf,
                tanh_enclosure(bounds.sup).sup,
            ),
            SecondFactor::Identity => bounds,
        }
    }
}

/// `z = a·x + b·y + c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Plane {
    fn along_x(slope: f64, x0: f64, z0: f64) -> Self {
        Self {
            a: slope,
            b: 0.0,
            c: slope * (-x0) + z0,
        }
    }

    fn along_y(slope: f64, y0: f64, z0: f64) -> Self {
        Self {
            a: 0.0,
            b: slope,
            c: slope * (-y0) + z0,
        }
    }
}

/// Lower and upper plane for one product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Planes {
    pub lower: Plane,
    pub upper: Plane,
}

struct Surface(SecondFactor);

impl Surface {
    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    fn f(&self, x: f64, y: f64) -> f64 {
        Self::sigmoid(x) * self.0.eval(y)
    }

    fn dx(&self, x: f64, y: f64) -> f64 {
        let e = (-x).exp();
        e / ((1.0 + e) * (1.0 + e)) * self.0.eval(y)
    }

    fn dy(&self, x: f64, y: f64) -> f64 {
        Self::sigmoid(x) * self.0.derivative(y)
    }
}

/// Candidate planes for `σ(x)·g(y)` over `[lx, ux] × [ly, uy]`.
pub fn sigmoid_mul_planes(g: SecondFactor, lx: f64, ux: f64, ly: f64, uy: f64) -> Planes {
    let s = Surface(g);
    let (upper_x, upper_y, lower_x, lower_y);
    if ly >= 0.0 {
        upper_x = Plane::along_x(
            s.dx(ux, uy).min((s.f(ux, uy) - s.f(lx, uy)) / (ux - lx)),
            ux,
            s.f(ux, uy),
        );
        upper_y = Plane::along_y(
            s.dy(ux, uy).min((s.f(ux, uy) - s.f(ux, ly)) / (uy - ly)),
            uy,
            s.f(ux, uy),
        );
        lower_x = Plane::along_x(
            s.dx(lx, ly).min((s.f(lx, ly) - s.f(ux, ly)) / (lx - ux)),
            lx,
            s.f(lx, ly),
        );
        lower_y = Plane::along_y(
            s.dy(lx, ly).min((s.f(lx, ly) - s.f(lx, uy)) / (ly - uy)),
            ly,
            s.f(lx, ly),
        );
    } else if uy >= 0.0 {
        upper_x = Plane::along_x(
            s.dx(ux, uy).min((s.f(ux, uy) - s.f(lx, uy)) / (ux - lx)),
            ux,
            s.f(ux, uy),
        );
        upper_y = Plane::along_y(
            s.dy(ux, uy).min((s.f(ux, uy) - s.f(lx, ly)) / (uy - ly)),
            uy,
            s.f(ux, uy),
        );
        lower_x = Plane::along_x(
            s.dx(ux, ly).max((s.f(ux, ly) - s.f(lx, ly)) / (ux - lx)),
            ux,
            s.f(ux, ly),
        );
        lower_y = Plane::along_y(
            s.dy(ux, ly).min((s.f(ux, ly) - s.f(lx, uy)) / (ly - uy)),
            ly,
            s.f(ux, ly),
        );
    } else {
        upper_x = Plane::along_x(
            s.dx(lx, uy).max((s.f(lx, uy) - s.f(ux, uy)) / (lx - ux)),
            lx,
            s.f(lx, uy),
        );
        upper_y = Plane::along_y(
            s.dy(lx, uy).min((s.f(lx, uy) - s.f(lx, ly)) / (uy - ly)),
            uy,
            s.f(lx, uy),
        );
        lower_x = Plane::along_x(
            s.dx(ux, ly).max((s.f(ux, ly) - s.f(lx, ly)) / (ux - lx)),
            ux,
            s.f(ux, ly),
        );
        lower_y = Plane::along_y(
            s.dy(ux, ly).min((s.f(ux, ly) - s.f(ux, uy)) / (ly - uy)),
            ly,
            s.f(ux, ly),
        );
    }

    let mid_x = |p: &Plane| (ux + lx) * p.a / 2.0 + p.c;
    let mid_y = |p: &Plane| (uy + ly) * p.b / 2.0 + p.c;
    let upper = if mid_x(&upper_x) < mid_y(&upper_y) {
        upper_x
    } else {
        upper_y
    };
    let lower = if mid_x(&lower_x) > mid_y(&lower_y) {
        lower_x
    } else {
        lower_y
    };
    Planes { lower, upper }
}

/// One factor of a gate product: its pre-activation bounds and the lower
/// and upper expressions of its pre-activation value.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a> {
    pub bounds: Interval,
    pub lexpr: &'a AffineExpr,
    pub uexpr: &'a AffineExpr,
}

impl Operand<'_> {
    #[inline]
    fn width(&self) -> f64 {
        self.bounds.inf + self.bounds.sup
    }

    fn pick(&self, slope: f64, upper: bool) -> &AffineExpr {
        if (slope > 0.0) == upper {
            self.uexpr
        } else {
            self.lexpr
        }
    }
}

/// Lower and upper expressions of `σ(a)·g(b)`.
pub fn mul_sigmoid(
    cfg: &RoundingConfig,
    g: SecondFactor,
    a: Operand<'_>,
    b: Operand<'_>,
) -> (AffineExpr, AffineExpr) {
    if a.width() < BOXIFY_WIDTH || b.width() < BOXIFY_WIDTH {
        let sa = Interval::new(
            sigmoid_enclosure(-a.bounds.inf).inf,
            sigmoid_enclosure(a.bounds.sup).sup,
        );
        let product = sa * g.image(b.bounds);
        return (AffineExpr::constant(product), AffineExpr::constant(product));
    }

    let planes = sigmoid_mul_planes(
        g,
        -a.bounds.inf - PLANE_DELTA,
        a.bounds.sup + PLANE_DELTA,
        -b.bounds.inf - PLANE_DELTA,
        b.bounds.sup + PLANE_DELTA,
    );
    let lower = compose(cfg, planes.lower, &a, &b, false);
    let upper = compose(cfg, planes.upper, &a, &b, true);
    (lower, upper)
}

fn compose(cfg: &RoundingConfig, plane: Plane, a: &Operand<'_>, b: &Operand<'_>, upper: bool) -> AffineExpr {
    let mut res = a.pick(plane.a, upper).clone().multiply(cfg, Interval::point(plane.a));
    let tmp = b.pick(plane.b, upper).clone().multiply(cfg, Interval::point(plane.b));
    res.add_expr(cfg, &tmp);
    res.set_cst(cfg.add_cst(Interval::point(plane.c), res.cst()));
    res
}

/// Boxed product of two post-activation ranges, as a constant expression
/// for both sides.
pub fn mul_boxed(a: Interval, b: Interval) -> (AffineExpr, AffineExpr) {
    let product = a * b;
    (AffineExpr::constant(product), AffineExpr::constant(product))
}
