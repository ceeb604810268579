//! Affine expressions with interval coefficients.
//!
//! An [`AffineExpr`] represents `Σ cᵢ·x_dᵢ + c₀` where every `cᵢ` and `c₀` is
//! an [`Interval`]. Dense expressions index variables by position; sparse
//! ones carry an explicit dimension per coefficient. A zero-length
//! expression is a pure constant.
//!
//! Transforming operations take the expression by value and hand back the
//! result, so an expression has exactly one owner at any time.

use crate::config::RoundingConfig;
use crate::interval::Interval;
use crate::{FppolyError, Result};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Coefficient storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Terms {
    /// Coefficient `i` multiplies variable `i`.
    Dense(Vec<Interval>),
    /// Coefficient `i` multiplies variable `dims[i]`.
    Sparse {
        dims: Vec<usize>,
        coeffs: Vec<Interval>,
    },
}

/// A symbolic linear form over the neurons of some layer (or the input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineExpr {
    terms: Terms,
    cst: Interval,
}

impl AffineExpr {
    /// Dense expression over variables `0..coeffs.len()`.
    pub fn dense(coeffs: Vec<Interval>, cst: Interval) -> Self {
        Self {
            terms: Terms::Dense(coeffs),
            cst,
        }
    }

    /// Sparse expression. Dimensions must be distinct and match `coeffs` in
    /// length; they need not be sorted.
    pub fn sparse(dims: Vec<usize>, coeffs: Vec<Interval>, cst: Interval) -> Result<Self> {
        if dims.len() != coeffs.len() {
            return Err(FppolyError::DimensionMismatch {
                expected: dims.len(),
                actual: coeffs.len(),
                context: "sparse expression coefficients".to_string(),
            });
        }
        let mut seen = dims.clone();
        seen.sort_unstable();
        if let Some(w) = seen.windows(2).find(|w| w[0] == w[1]) {
            return Err(FppolyError::InvalidSpec(format!(
                "sparse expression repeats dimension {}",
                w[0]
            )));
        }
        Ok(Self {
            terms: Terms::Sparse { dims, coeffs },
            cst,
        })
    }

    /// Constant expression.
    pub fn constant(cst: Interval) -> Self {
        Self {
            terms: Terms::Dense(Vec::new()),
            cst,
        }
    }

    /// Dense expression `w·x + bias` with exact point coefficients.
    pub fn from_weights(weights: ArrayView1<'_, f64>, bias: f64) -> Self {
        Self::dense(
            weights.iter().map(|&w| Interval::point(w)).collect(),
            Interval::point(bias),
        )
    }

    /// One dense expression per row of `weights`.
    pub fn dense_rows(weights: ArrayView2<'_, f64>, bias: ArrayView1<'_, f64>) -> Result<Vec<Self>> {
        if weights.nrows() != bias.len() {
            return Err(FppolyError::DimensionMismatch {
                expected: weights.nrows(),
                actual: bias.len(),
                context: "bias length".to_string(),
            });
        }
        Ok(weights
            .rows()
            .into_iter()
            .zip(bias.iter())
            .map(|(row, &b)| Self::from_weights(row, b))
            .collect())
    }

    /// Number of stored coefficients.
    #[inline]
    pub fn len(&self) -> usize {
        match &self.terms {
            Terms::Dense(c) => c.len(),
            Terms::Sparse { coeffs, .. } => coeffs.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A zero-length expression carries only its constant.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.is_empty()
    }

    #[inline]
    pub fn is_dense(&self) -> bool {
        matches!(self.terms, Terms::Dense(_))
    }

    #[inline]
    pub fn terms(&self) -> &Terms {
        &self.terms
    }

    #[inline]
    pub fn cst(&self) -> Interval {
        self.cst
    }

    #[inline]
    pub fn set_cst(&mut self, cst: Interval) {
        self.cst = cst;
    }

    #[inline]
    pub fn coeffs(&self) -> &[Interval] {
        match &self.terms {
            Terms::Dense(c) => c,
            Terms::Sparse { coeffs, .. } => coeffs,
        }
    }

    #[inline]
    pub fn coeffs_mut(&mut self) -> &mut [Interval] {
        match &mut self.terms {
            Terms::Dense(c) => c,
            Terms::Sparse { coeffs, .. } => coeffs,
        }
    }

    /// Variable multiplied by coefficient `i`.
    #[inline]
    pub fn dim(&self, i: usize) -> usize {
        match &self.terms {
            Terms::Dense(_) => i,
            Terms::Sparse { dims, .. } => dims[i],
        }
    }

    /// `(variable, coefficient)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Interval)> + '_ {
        self.coeffs()
            .iter()
            .enumerate()
            .map(move |(i, &c)| (self.dim(i), c))
    }

    /// Scale every coefficient and the constant by `factor`.
    pub fn multiply(mut self, cfg: &RoundingConfig, factor: Interval) -> Self {
        for c in self.coeffs_mut() {
            *c = cfg.mul_coeff(factor, *c);
        }
        self.cst = cfg.mul_cst(factor, self.cst);
        self
    }

    /// Scale the constant of a constant expression by `factor`.
    pub fn multiply_cst(self, cfg: &RoundingConfig, factor: Interval) -> Self {
        debug_assert!(self.is_constant());
        Self::constant(cfg.mul_cst(factor, self.cst))
    }

    /// Add `cst` to the constant term.
    pub fn add_cst(&mut self, cfg: &RoundingConfig, cst: Interval) {
        self.cst = cfg.merge_cst(self.cst, cst);
    }

    /// `self += other`.
    ///
    /// Sparse operands must be sorted. A dense result absorbs a sparse
    /// operand into its positions; two sparse operands merge by dimension.
    ///
    /// # Panics
    ///
    /// Panics if two dense operands differ in length or a sparse dimension
    /// falls outside a dense operand.
    pub fn add_expr(&mut self, cfg: &RoundingConfig, other: &AffineExpr) {
        self.cst = cfg.merge_cst(self.cst, other.cst);
        if other.is_constant() {
            return;
        }
        if self.is_constant() {
            self.terms = other.terms.clone();
            return;
        }
        let merged = match (&mut self.terms, &other.terms) {
            (Terms::Dense(a), Terms::Dense(b)) => {
                assert_eq!(a.len(), b.len(), "dense expressions differ in length");
                for (x, y) in a.iter_mut().zip(b) {
                    *x = cfg.merge_coeff(*x, *y);
                }
                None
            }
            (Terms::Dense(a), Terms::Sparse { dims, coeffs }) => {
                for (&d, &c) in dims.iter().zip(coeffs) {
                    assert!(d < a.len(), "sparse dimension {d} outside dense expression");
                    a[d] = cfg.merge_coeff(a[d], c);
                }
                None
            }
            (Terms::Sparse { dims, coeffs }, Terms::Dense(b)) => {
                let mut dense = b.clone();
                for (&d, &c) in dims.iter().zip(coeffs.iter()) {
                    assert!(d < dense.len(), "sparse dimension {d} outside dense expression");
                    dense[d] = cfg.merge_coeff(c, dense[d]);
                }
                Some(Terms::Dense(dense))
            }
            (
                Terms::Sparse {
                    dims: da,
                    coeffs: ca,
                },
                Terms::Sparse {
                    dims: db,
                    coeffs: cb,
                },
            ) => Some(merge_sparse(cfg, da, ca, db, cb)),
        };
        if let Some(terms) = merged {
            self.terms = terms;
        }
    }

    /// Sort a sparse expression by ascending dimension. Dense expressions
    /// are already ordered.
    pub fn sort(&mut self) {
        if let Terms::Sparse { dims, coeffs } = &mut self.terms {
            if dims.windows(2).all(|w| w[0] < w[1]) {
                return;
            }
            let mut pairs: Vec<(usize, Interval)> =
                dims.iter().copied().zip(coeffs.iter().copied()).collect();
            // Stable merge sort.
            pairs.sort_by_key(|&(d, _)| d);
            for (i, (d, c)) in pairs.into_iter().enumerate() {
                dims[i] = d;
                coeffs[i] = c;
            }
        }
    }

    /// Keep the dense coefficients `[0, start)` and fold `[start, len)` into
    /// the constant using `bounds[i - start]` as the variable's range.
    pub fn concretize_dense_sub_expr(
        self,
        cfg: &RoundingConfig,
        bounds: &[Interval],
        start: usize,
    ) -> Self {
        let Terms::Dense(mut coeffs) = self.terms else {
            panic!("concretize_dense_sub_expr on a sparse expression");
        };
        assert!(start <= coeffs.len());
        assert_eq!(coeffs.len() - start, bounds.len());
        let mut cst = self.cst;
        for (c, &b) in coeffs[start..].iter().zip(bounds) {
            cst = cst + cfg.mul_coeff(b, *c);
        }
        coeffs.truncate(start);
        Self::dense(coeffs, cst)
    }

    /// Interval value of the expression at a concrete point.
    pub fn evaluate(&self, x: &[f64]) -> Interval {
        self.iter()
            .fold(self.cst, |acc, (d, c)| acc + c * Interval::point(x[d]))
    }
}

fn merge_sparse(
    cfg: &RoundingConfig,
    da: &[usize],
    ca: &[Interval],
    db: &[usize],
    cb: &[Interval],
) -> Terms {
    let mut dims = Vec::with_capacity(da.len() + db.len());
    let mut coeffs = Vec::with_capacity(da.len() + db.len());
    let (mut i, mut k) = (0, 0);
    while i < da.len() && k < db.len() {
        match da[i].cmp(&db[k]) {
            std::cmp::Ordering::Less => {
                dims.push(da[i]);
                coeffs.push(ca[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                dims.push(db[k]);
                coeffs.push(cb[k]);
                k += 1;
            }
            std::cmp::Ordering::Equal => {
                dims.push(da[i]);
                coeffs.push(cfg.merge_coeff(ca[i], cb[k]));
                i += 1;
                k += 1;
            }
        }
    }
    dims.extend_from_slice(&da[i..]);
    coeffs.extend_from_slice(&ca[i..]);
    dims.extend_from_slice(&db[k..]);
    coeffs.extend_from_slice(&cb[k..]);
    Terms::Sparse { dims, coeffs }
}
