//! Affine expression algebra tests

use crate::{AffineExpr, FppolyError, Interval, RoundingConfig, Terms};
use ndarray::{arr1, arr2};

fn pt(v: f64) -> Interval {
    Interval::point(v)
}

fn approx_point(i: Interval, v: f64) -> bool {
    (i.lower() - v).abs() < 1e-12 && (i.upper() - v).abs() < 1e-12
}

// ============================================================
// CONSTRUCTION
// ============================================================

#[test]
fn test_sparse_rejects_length_mismatch() {
    let err = AffineExpr::sparse(vec![0, 1], vec![pt(1.0)], Interval::ZERO).unwrap_err();
    assert!(matches!(err, FppolyError::DimensionMismatch { .. }));
}

#[test]
fn test_sparse_rejects_repeated_dimension() {
    let err = AffineExpr::sparse(vec![2, 2], vec![pt(1.0), pt(2.0)], Interval::ZERO).unwrap_err();
    assert!(matches!(err, FppolyError::InvalidSpec(_)));
    assert!(err.to_string().contains("repeats dimension 2"));
}

#[test]
fn test_dense_rows_from_weight_matrix() {
    let w = arr2(&[[1.0, -1.0], [0.5, 2.0]]);
    let b = arr1(&[0.0, 3.0]);
    let rows = AffineExpr::dense_rows(w.view(), b.view()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].coeffs()[1], pt(2.0));
    assert_eq!(rows[1].cst(), pt(3.0));

    let bad = arr1(&[0.0]);
    assert!(AffineExpr::dense_rows(w.view(), bad.view()).is_err());
}

// ============================================================
// ADDITION
// ============================================================

#[test]
fn test_add_constant_only_keeps_terms() {
    let cfg = RoundingConfig::default();
    let mut a = AffineExpr::dense(vec![pt(1.0), pt(2.0)], pt(1.0));
    a.add_expr(&cfg, &AffineExpr::constant(pt(2.0)));
    assert_eq!(a.len(), 2);
    assert!(approx_point(a.cst(), 3.0));
    assert!(a.cst().contains(3.0));
}

#[test]
fn test_add_into_constant_adopts_terms() {
    let cfg = RoundingConfig::default();
    let mut a = AffineExpr::constant(pt(1.0));
    let b = AffineExpr::sparse(vec![4, 7], vec![pt(1.0), pt(-1.0)], pt(0.5)).unwrap();
    a.add_expr(&cfg, &b);
    assert!(!a.is_dense());
    assert_eq!(a.iter().map(|(d, _)| d).collect::<Vec<_>>(), vec![4, 7]);
    assert!(a.cst().contains(1.5));
}

#[test]
fn test_add_dense_dense() {
    let cfg = RoundingConfig::default();
    let mut a = AffineExpr::dense(vec![pt(1.0), pt(2.0)], Interval::ZERO);
    let b = AffineExpr::dense(vec![pt(3.0), pt(-2.0)], Interval::ZERO);
    a.add_expr(&cfg, &b);
    assert!(a.coeffs()[0].contains(4.0));
    assert!(a.coeffs()[1].contains(0.0));
    assert!(approx_point(a.coeffs()[0], 4.0));
}

#[test]
#[should_panic(expected = "differ in length")]
fn test_add_dense_dense_size_mismatch_panics() {
    let cfg = RoundingConfig::default();
    let mut a = AffineExpr::dense(vec![pt(1.0)], Interval::ZERO);
    let b = AffineExpr::dense(vec![pt(1.0), pt(1.0)], Interval::ZERO);
    a.add_expr(&cfg, &b);
}

#[test]
fn test_add_sparse_into_dense() {
    let cfg = RoundingConfig::default();
    let mut a = AffineExpr::dense(vec![pt(1.0), pt(1.0), pt(1.0)], Interval::ZERO);
    let b = AffineExpr::sparse(vec![0, 2], vec![pt(5.0), pt(-1.0)], Interval::ZERO).unwrap();
    a.add_expr(&cfg, &b);
    assert!(a.is_dense());
    assert!(approx_point(a.coeffs()[0], 6.0));
    assert_eq!(a.coeffs()[1], pt(1.0));
    assert!(approx_point(a.coeffs()[2], 0.0));
}

#[test]
fn test_add_dense_into_sparse_becomes_dense() {
    let cfg = RoundingConfig::default();
    let mut a = AffineExpr::sparse(vec![1], vec![pt(2.0)], Interval::ZERO).unwrap();
    let b = AffineExpr::dense(vec![pt(1.0), pt(1.0), pt(1.0)], Interval::ZERO);
    a.add_expr(&cfg, &b);
    assert!(a.is_dense());
    assert_eq!(a.len(), 3);
    assert!(approx_point(a.coeffs()[1], 3.0));
    assert_eq!(a.coeffs()[2], pt(1.0));
}

#[test]
fn test_add_sparse_sparse_merges_by_dimension() {
    let cfg = RoundingConfig::default();
    let mut a = AffineExpr::sparse(vec![1, 3, 8], vec![pt(1.0), pt(1.0), pt(1.0)], Interval::ZERO)
        .unwrap();
    let b = AffineExpr::sparse(vec![0, 3, 9], vec![pt(2.0), pt(2.0), pt(2.0)], Interval::ZERO)
        .unwrap();
    a.add_expr(&cfg, &b);
    let pairs: Vec<_> = a.iter().collect();
    assert_eq!(
        pairs.iter().map(|(d, _)| *d).collect::<Vec<_>>(),
        vec![0, 1, 3, 8, 9]
    );
    assert!(approx_point(pairs[2].1, 3.0));
    assert_eq!(pairs[0].1, pt(2.0));
}

// ============================================================
// SCALING / SORT / CONCRETIZE
// ============================================================

#[test]
fn test_multiply_scales_constant_and_coefficients() {
    let cfg = RoundingConfig::default();
    let e = AffineExpr::dense(vec![pt(1.0), pt(-2.0)], pt(3.0)).multiply(&cfg, pt(0.5));
    assert!(approx_point(e.coeffs()[0], 0.5));
    assert!(approx_point(e.coeffs()[1], -1.0));
    assert!(e.cst().contains(1.5));
    // Compensation only ever widens.
    assert!(e.cst().inf >= -1.5 && e.cst().sup >= 1.5);
}

#[test]
fn test_sort_orders_sparse_dimensions() {
    let mut e = AffineExpr::sparse(
        vec![5, 1, 3],
        vec![pt(5.0), pt(1.0), pt(3.0)],
        Interval::ZERO,
    )
    .unwrap();
    e.sort();
    let pairs: Vec<_> = e.iter().collect();
    assert_eq!(pairs, vec![(1, pt(1.0)), (3, pt(3.0)), (5, pt(5.0))]);
    match e.terms() {
        Terms::Sparse { dims, .. } => assert!(dims.windows(2).all(|w| w[0] < w[1])),
        Terms::Dense(_) => panic!("sort changed representation"),
    }
}

#[test]
fn test_concretize_dense_sub_expr_folds_tail() {
    let cfg = RoundingConfig::default();
    let e = AffineExpr::dense(vec![pt(1.0), pt(2.0), pt(-1.0)], pt(0.0));
    let bounds = [Interval::from_bounds(0.0, 1.0), Interval::from_bounds(-1.0, 2.0)];
    let r = e.concretize_dense_sub_expr(&cfg, &bounds, 1);
    assert_eq!(r.len(), 1);
    assert_eq!(r.coeffs()[0], pt(1.0));
    // 2*[0,1] + (-1)*[-1,2] = [-2, 3]
    assert!(r.cst().lower() <= -2.0 && r.cst().upper() >= 3.0);
    assert!(r.cst().lower() > -2.0 - 1e-9 && r.cst().upper() < 3.0 + 1e-9);
}

#[test]
fn test_evaluate_at_point() {
    let e = AffineExpr::sparse(vec![0, 2], vec![pt(2.0), pt(-1.0)], pt(1.0)).unwrap();
    let v = e.evaluate(&[1.0, 100.0, 3.0]);
    assert!(approx_point(v, 0.0));
}
