//! LSTM step tests

use crate::*;
use ndarray::{Array1, Array2};

const HIDDEN: usize = 2;
const INPUT: usize = 2;

/// Gate weights keeping every pre-activation range positive for inputs in
/// `[-0.5, 0.5]²` and hidden states in `[0, 1]`.
fn gate_weights(with_hidden: bool) -> (Array2<f64>, Array1<f64>) {
    let cols = if with_hidden { INPUT + HIDDEN } else { INPUT };
    let w = Array2::from_shape_fn((4 * HIDDEN, cols), |(r, c)| match c {
        0 => 0.5,
        1 => -0.25 + 0.05 * r as f64,
        _ => 0.1,
    });
    // Input, candidate, forget, output.
    let b = Array1::from_shape_fn(4 * HIDDEN, |r| if r / HIDDEN == 1 { 1.0 } else { 2.0 });
    (w, b)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Concrete LSTM run on input `x` repeated at every step.
fn run_concrete(x: [f64; INPUT], steps: &[(Array2<f64>, Array1<f64>)]) -> Vec<f64> {
    let mut h = vec![0.0; HIDDEN];
    let mut c = vec![0.0; HIDDEN];
    for (w, b) in steps {
        let mut z = b.to_vec();
        for (r, zr) in z.iter_mut().enumerate() {
            *zr += w[[r, 0]] * x[0] + w[[r, 1]] * x[1];
            if w.ncols() > INPUT {
                for k in 0..HIDDEN {
                    *zr += w[[r, INPUT + k]] * h[k];
                }
            }
        }
        for k in 0..HIDDEN {
            let i = sigmoid(z[k]);
            let cand = z[HIDDEN + k].tanh();
            let f = sigmoid(z[2 * HIDDEN + k]);
            c[k] = i * cand + f * c[k];
        }
        for k in 0..HIDDEN {
            let o = sigmoid(z[3 * HIDDEN + k]);
            h[k] = o * c[k].tanh();
        }
    }
    h
}

fn lstm_analysis(force: bool, steps: &[(Array2<f64>, Array1<f64>)]) -> FpPoly {
    let config = AnalysisConfig {
        lstm_force_boxify: force,
        ..AnalysisConfig::default()
    };
    let mut fp = FpPoly::new(vec![-0.5; INPUT], vec![0.5; INPUT], config).unwrap();
    let layer = fp.create_lstm_layer(HIDDEN).unwrap();
    assert_eq!(layer, 0);
    for (w, b) in steps {
        fp.handle_lstm_step(w.view(), b.view()).unwrap();
    }
    fp
}

fn two_steps() -> Vec<(Array2<f64>, Array1<f64>)> {
    vec![gate_weights(false), gate_weights(true)]
}

fn assert_contains_samples(fp: &FpPoly, steps: &[(Array2<f64>, Array1<f64>)]) {
    let grid = [-0.5, -0.2, 0.0, 0.3, 0.5];
    for &x0 in &grid {
        for &x1 in &grid {
            let h = run_concrete([x0, x1], steps);
            for (k, &hk) in h.iter().enumerate() {
                let b = fp.box_for_lstm_neuron(0, k).unwrap();
                assert!(b.contains_approx(hk, 1e-9), "h[{k}] = {hk} not in {b:?}");
                assert_eq!(fp.box_for_neuron(0, k).unwrap(), b);
            }
        }
    }
}

// ============================================================
// SOUNDNESS
// ============================================================

#[test]
fn test_lstm_planes_contain_samples() {
    super::init_tracing();
    let steps = two_steps();
    let fp = lstm_analysis(false, &steps);
    assert_contains_samples(&fp, &steps);
    assert_eq!(fp.network().layers[0].lstm.as_ref().map(|s| s.steps), Some(2));
}

#[test]
fn test_lstm_forced_boxes_contain_samples() {
    let steps = two_steps();
    let fp = lstm_analysis(true, &steps);
    assert_contains_samples(&fp, &steps);
    let neuron = &fp.network().layers[0].neurons[0];
    assert!(neuron.lower_relax.as_ref().is_some_and(AffineExpr::is_constant));
}

#[test]
fn test_lstm_feeds_next_layer() {
    let steps = two_steps();
    let mut fp = lstm_analysis(false, &steps);
    fp.add_output_layer(
        LayerKind::Affine,
        Activation::None,
        AffineExpr::dense_rows(ndarray::arr2(&[[1.0, -1.0]]).view(), ndarray::arr1(&[0.0]).view())
            .unwrap(),
    )
    .unwrap();
    let out = fp.box_for_neuron(1, 0).unwrap();
    let grid = [-0.5, 0.0, 0.5];
    for &x0 in &grid {
        for &x1 in &grid {
            let h = run_concrete([x0, x1], &steps);
            assert!(out.contains_approx(h[0] - h[1], 1e-9));
        }
    }
}

#[test]
fn test_lstm_replay_on_new_input_box() {
    let steps = two_steps();
    let mut fp = lstm_analysis(false, &steps);
    fp.set_input_box(vec![-0.25; INPUT], vec![0.25; INPUT]).unwrap();

    let mut fresh = lstm_analysis(false, &[]);
    fresh.set_input_box(vec![-0.25; INPUT], vec![0.25; INPUT]).unwrap();
    for (w, b) in &steps {
        fresh.handle_lstm_step(w.view(), b.view()).unwrap();
    }
    for k in 0..HIDDEN {
        assert_eq!(
            fp.box_for_lstm_neuron(0, k).unwrap(),
            fresh.box_for_lstm_neuron(0, k).unwrap()
        );
    }
}

// ============================================================
// VALIDATION
// ============================================================

#[test]
fn test_lstm_step_dimension_checks() {
    let mut fp = lstm_analysis(false, &[]);
    let (w, b) = gate_weights(true);

    let short = Array1::from_elem(3, 0.0);
    assert!(matches!(
        fp.handle_lstm_step(w.view(), short.view()),
        Err(FppolyError::DimensionMismatch { expected: 8, actual: 3, .. })
    ));

    let wrong_rows = Array2::from_elem((5, INPUT + HIDDEN), 0.1);
    assert!(fp.handle_lstm_step(wrong_rows.view(), b.view()).is_err());

    let wrong_cols = Array2::from_elem((4 * HIDDEN, 3), 0.1);
    assert!(matches!(
        fp.handle_lstm_step(wrong_cols.view(), b.view()),
        Err(FppolyError::DimensionMismatch { expected: 4, actual: 3, .. })
    ));

    // Input-only weights are accepted on the first step only.
    let (w0, b0) = gate_weights(false);
    fp.handle_lstm_step(w0.view(), b0.view()).unwrap();
    assert!(fp.handle_lstm_step(w0.view(), b0.view()).is_err());
    fp.handle_lstm_step(w.view(), b.view()).unwrap();
}

#[test]
fn test_lstm_step_requires_lstm_layer() {
    let mut fp = FpPoly::new(vec![0.0], vec![1.0], AnalysisConfig::default()).unwrap();
    let (w, b) = gate_weights(false);
    assert!(matches!(
        fp.handle_lstm_step(w.view(), b.view()),
        Err(FppolyError::InvalidSpec(_))
    ));
    assert!(matches!(fp.create_lstm_layer(0), Err(FppolyError::InvalidSpec(_))));
}
