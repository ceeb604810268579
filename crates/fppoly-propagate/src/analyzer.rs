//! The analyzer handle: builds a network layer by layer and answers bound
//! queries.
//!
//! Bounds are computed eagerly: every added layer is fully bounded before
//! the call returns, so later layers can back-substitute through it.

use crate::backsub::{expr_from_previous_layer, BackSubstitution};
use crate::network::{InputPolytope, Layer, Network, Neuron, OutputRecord};
use crate::parallel::{update_state, SymbolicBounds};
use crate::transformers::lstm::{mul_boxed, mul_sigmoid, Operand, SecondFactor};
use crate::transformers::maxpool::pool_neuron;
use crate::transformers::relu::{apply_relu_lower, apply_relu_upper};
use crate::transformers::s_curve::{apply_s_curve_lower, apply_s_curve_upper, SCurve};
use crate::transformers::{ln_enclosure, replace_with_relaxations};
use crate::types::{Activation, AnalysisConfig, LayerKind, Side};
use fppoly_core::{AffineExpr, Bound, FppolyError, Interval, Result, RoundingGuard};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use tracing::{debug, info};

/// How a layer was built, kept so the whole network can be recomputed on a
/// new input box.
#[derive(Debug, Clone)]
enum Recipe {
    Affine { output: bool },
    MaxPool { windows: Vec<Vec<usize>> },
    Lstm { steps: Vec<(Array2<f64>, Array1<f64>)> },
}

/// Floating-point sound polyhedral analysis of a feed-forward network.
#[derive(Debug, Clone)]
pub struct FpPoly {
    config: AnalysisConfig,
    net: Network,
    recipes: Vec<Recipe>,
}

impl FpPoly {
    /// Analysis over the input box `[inf[i], sup[i]]`.
    pub fn new(inf: Vec<f64>, sup: Vec<f64>, config: AnalysisConfig) -> Result<Self> {
        let input = input_box(&inf, &sup)?;
        info!("Created analysis over {} input dimensions", input.len());
        Ok(Self {
            config,
            net: Network::new(input, None),
            recipes: Vec::new(),
        })
    }

    /// Analysis over a polytope input region.
    ///
    /// Input `i` lies in `[inf[i], sup[i]]` and between `lexprs[i]` and
    /// `uexprs[i]`, affine expressions over the primitive box
    /// `[prim_inf, prim_sup]`.
    pub fn from_input_poly(
        inf: Vec<f64>,
        sup: Vec<f64>,
        lexprs: Vec<AffineExpr>,
        uexprs: Vec<AffineExpr>,
        prim_inf: Vec<f64>,
        prim_sup: Vec<f64>,
        config: AnalysisConfig,
    ) -> Result<Self> {
        let input = input_box(&inf, &sup)?;
        let primitive = input_box(&prim_inf, &prim_sup)?;
        for (exprs, context) in [(&lexprs, "input lower expressions"), (&uexprs, "input upper expressions")] {
            if exprs.len() != input.len() {
                return Err(FppolyError::DimensionMismatch {
                    expected: input.len(),
                    actual: exprs.len(),
                    context: context.to_string(),
                });
            }
        }
        let lexprs = prepare_exprs(lexprs, primitive.len(), "input lower expression")?;
        let uexprs = prepare_exprs(uexprs, primitive.len(), "input upper expression")?;
        info!(
            "Created analysis over {} input dimensions bounded by a {}-dimensional primitive box",
            input.len(),
            primitive.len()
        );
        let polytope = InputPolytope {
            lexprs,
            uexprs,
            primitive,
        };
        Ok(Self {
            config,
            net: Network::new(input, Some(polytope)),
            recipes: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    #[inline]
    pub fn network(&self) -> &Network {
        &self.net
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.net.num_layers()
    }

    // ------------------------------------------------------------------
    // Layer construction
    // ------------------------------------------------------------------

    /// Add an affine or convolutional layer with one forward expression per
    /// neuron, over the previous layer's outputs. Returns the layer index.
    pub fn add_layer(&mut self, kind: LayerKind, activation: Activation, exprs: Vec<AffineExpr>) -> Result<usize> {
        self.push_affine(kind, activation, exprs, false)
    }

    /// [`add_layer`](Self::add_layer) for the last layer: its symbolic
    /// bounds are kept and its activation applied to them.
    pub fn add_output_layer(
        &mut self,
        kind: LayerKind,
        activation: Activation,
        exprs: Vec<AffineExpr>,
    ) -> Result<usize> {
        self.push_affine(kind, activation, exprs, true)
    }

    fn push_affine(
        &mut self,
        kind: LayerKind,
        activation: Activation,
        exprs: Vec<AffineExpr>,
        output: bool,
    ) -> Result<usize> {
        self.check_open()?;
        if !kind.is_affine() {
            return Err(FppolyError::InvalidSpec(format!(
                "{kind:?} layers are not built from forward expressions"
            )));
        }
        let exprs = prepare_exprs(exprs, self.net.next_input_dim(), "forward expression")?;
        let neurons = exprs.into_iter().map(Neuron::with_expr).collect();
        let layerno = self.net.num_layers();
        self.net.layers.push(Layer::new(kind, activation, neurons));
        self.recipes.push(Recipe::Affine { output });
        self.compute_affine(layerno, output)?;
        Ok(layerno)
    }

    fn compute_affine(&mut self, layerno: usize, output: bool) -> Result<()> {
        let exprs = update_state(
            &self.config.rounding,
            &self.config.parallel,
            &mut self.net,
            layerno,
            output,
        )?;
        if output {
            self.net.output = Some(self.finalize_output(layerno, exprs)?);
        }
        Ok(())
    }

    /// Apply the output layer's activation to its symbolic bounds.
    fn finalize_output(&self, layerno: usize, exprs: Vec<SymbolicBounds>) -> Result<OutputRecord> {
        let layer = self.net.layer(layerno)?;
        let cfg = &self.config.rounding;
        let _round_up = RoundingGuard::upward();
        let mut record = OutputRecord::default();
        for (neuron, SymbolicBounds { lexpr, uexpr }) in layer.neurons.iter().zip(exprs) {
            let pre = neuron.bounds();
            let ((lexpr, inf), (uexpr, sup)) = match layer.activation {
                Activation::None => ((lexpr, pre.inf), (uexpr, pre.sup)),
                Activation::Relu => (
                    apply_relu_lower(cfg, lexpr, pre),
                    apply_relu_upper(cfg, uexpr, pre),
                ),
                Activation::Sigmoid => (
                    apply_s_curve_lower(cfg, lexpr, pre, SCurve::Sigmoid, false),
                    apply_s_curve_upper(cfg, uexpr, pre, SCurve::Sigmoid, false),
                ),
                Activation::Tanh => (
                    apply_s_curve_lower(cfg, lexpr, pre, SCurve::Tanh, false),
                    apply_s_curve_upper(cfg, uexpr, pre, SCurve::Tanh, false),
                ),
                Activation::Parabola => boxed(pre.square()),
                Activation::Log => boxed(ln_enclosure(pre)),
            };
            record.lexprs.push(lexpr);
            record.uexprs.push(uexpr);
            record.bounds.push(Interval::new(inf, sup));
        }
        Ok(record)
    }

    /// Add a max-pooling layer with one output neuron per window of
    /// previous-layer neuron indices. Returns the layer index.
    pub fn add_maxpool_layer(&mut self, windows: &[Vec<usize>]) -> Result<usize> {
        self.check_open()?;
        let layerno = self.net.num_layers();
        if layerno == 0 {
            return Err(FppolyError::InvalidSpec(
                "max pooling needs a previous layer".to_string(),
            ));
        }
        let neurons = self.pool_neurons(layerno, windows)?;
        self.net
            .layers
            .push(Layer::new(LayerKind::MaxPool, Activation::None, neurons));
        self.recipes.push(Recipe::MaxPool {
            windows: windows.to_vec(),
        });
        Ok(layerno)
    }

    fn pool_neurons(&self, layerno: usize, windows: &[Vec<usize>]) -> Result<Vec<Neuron>> {
        let prev = self.net.layer(layerno - 1)?;
        let neurons = windows
            .iter()
            .map(|w| pool_neuron(prev, layerno - 1, w))
            .collect::<Result<Vec<_>>>()?;
        debug!("Max pooling layer {}: {} windows", layerno, neurons.len());
        Ok(neurons)
    }

    /// Add an LSTM layer with `hidden` neurons. Its bounds are produced by
    /// [`handle_lstm_step`](Self::handle_lstm_step).
    pub fn create_lstm_layer(&mut self, hidden: usize) -> Result<usize> {
        self.check_open()?;
        if hidden == 0 {
            return Err(FppolyError::InvalidSpec(
                "LSTM layer needs at least one hidden neuron".to_string(),
            ));
        }
        let layerno = self.net.num_layers();
        let neurons = vec![Neuron::default(); hidden];
        self.net
            .layers
            .push(Layer::new(LayerKind::LstmCell, Activation::None, neurons));
        self.recipes.push(Recipe::Lstm { steps: Vec::new() });
        Ok(layerno)
    }

    /// Process one time step of the last layer, which must be an LSTM layer.
    ///
    /// `weights` has `4h` rows in gate order input, candidate, forget,
    /// output, and `d + h` columns: the previous layer's `d` outputs
    /// followed by the hidden state. On the first step the `h` hidden
    /// columns may be omitted. `bias` has `4h` entries.
    pub fn handle_lstm_step(&mut self, weights: ArrayView2<'_, f64>, bias: ArrayView1<'_, f64>) -> Result<()> {
        let index = self
            .net
            .num_layers()
            .checked_sub(1)
            .ok_or_else(|| FppolyError::InvalidSpec("no LSTM layer to step".to_string()))?;
        let layer = self.net.layer(index)?;
        let Some(state) = layer.lstm.as_ref() else {
            return Err(FppolyError::InvalidSpec(format!(
                "layer {index} is not an LSTM layer"
            )));
        };
        let hidden = layer.len();
        let d = self.input_dim_of(index);
        if weights.nrows() != 4 * hidden {
            return Err(FppolyError::DimensionMismatch {
                expected: 4 * hidden,
                actual: weights.nrows(),
                context: "LSTM weight rows".to_string(),
            });
        }
        if bias.len() != 4 * hidden {
            return Err(FppolyError::DimensionMismatch {
                expected: 4 * hidden,
                actual: bias.len(),
                context: "LSTM bias".to_string(),
            });
        }
        let cols_ok = weights.ncols() == d + hidden || (state.steps == 0 && weights.ncols() == d);
        if !cols_ok {
            return Err(FppolyError::DimensionMismatch {
                expected: d + hidden,
                actual: weights.ncols(),
                context: "LSTM weight columns".to_string(),
            });
        }

        self.lstm_step(index, weights, bias)?;
        if let Some(Recipe::Lstm { steps }) = self.recipes.get_mut(index) {
            steps.push((weights.to_owned(), bias.to_owned()));
        }
        Ok(())
    }

    fn input_dim_of(&self, layerno: usize) -> usize {
        if layerno == 0 {
            self.net.input.len()
        } else {
            self.net.layers[layerno - 1].len()
        }
    }

    fn lstm_step(&mut self, index: usize, weights: ArrayView2<'_, f64>, bias: ArrayView1<'_, f64>) -> Result<()> {
        let d = self.input_dim_of(index);
        let cfg = &self.config.rounding;
        let force = self.config.lstm_force_boxify;
        let (prev, rest) = self.net.layers.split_at_mut(index);
        let layer = &mut rest[0];
        let ctx = BackSubstitution::new(cfg, prev, &self.net.input, self.net.polytope.as_ref());
        let hidden = layer.neurons.len();
        let Some(state) = layer.lstm.as_mut() else {
            return Err(FppolyError::InvalidSpec(format!(
                "layer {index} is not an LSTM layer"
            )));
        };
        let first = state.steps == 0;
        let _round_up = RoundingGuard::upward();

        let gate = |row: usize| {
            let expr = AffineExpr::from_weights(weights.row(row), bias[row]);
            if weights.ncols() > d {
                expr.concretize_dense_sub_expr(cfg, &state.h, d)
            } else {
                expr
            }
        };

        let mut new_h = Vec::with_capacity(hidden);
        let mut new_c = Vec::with_capacity(hidden);
        for (i, neuron) in layer.neurons.iter_mut().enumerate() {
            let i_pre = Gate::new(&ctx, gate(i), index);
            let c_pre = Gate::new(&ctx, gate(hidden + i), index);
            let f_pre = Gate::new(&ctx, gate(2 * hidden + i), index);
            let o_pre = Gate::new(&ctx, gate(3 * hidden + i), index);

            // c = i ⊙ tanh(c̃) + f ⊙ c_prev
            let (mut c_lexpr, mut c_uexpr) = if force {
                mul_boxed(c_pre.image(SCurve::Tanh), i_pre.image(SCurve::Sigmoid))
            } else {
                mul_sigmoid(cfg, SecondFactor::Tanh, i_pre.operand(), c_pre.operand())
            };
            if !first {
                let c_prev = state.c[i];
                let (fl, fu) = if force {
                    let product = AffineExpr::constant(cfg.mul_coeff(f_pre.image(SCurve::Sigmoid), c_prev));
                    (product.clone(), product)
                } else {
                    let prev_expr = AffineExpr::constant(c_prev);
                    let prev = Operand {
                        bounds: c_prev,
                        lexpr: &prev_expr,
                        uexpr: &prev_expr,
                    };
                    mul_sigmoid(cfg, SecondFactor::Identity, f_pre.operand(), prev)
                };
                c_lexpr.add_expr(cfg, &fl);
                c_uexpr.add_expr(cfg, &fu);
            }

            let c_bounds = Interval::new(
                ctx.bound(c_lexpr.clone(), Side::Lower, index),
                ctx.bound(c_uexpr.clone(), Side::Upper, index),
            );

            // h = o ⊙ tanh(c)
            let (h_lexpr, h_uexpr) = if force {
                mul_boxed(SCurve::Tanh.image(c_bounds), o_pre.image(SCurve::Sigmoid))
            } else {
                let c = Operand {
                    bounds: c_bounds,
                    lexpr: &c_lexpr,
                    uexpr: &c_uexpr,
                };
                mul_sigmoid(cfg, SecondFactor::Tanh, o_pre.operand(), c)
            };

            let h_bounds = Interval::new(
                ctx.bound(h_lexpr.clone(), Side::Lower, index),
                ctx.bound(h_uexpr.clone(), Side::Upper, index),
            );
            neuron.set_bounds(h_bounds);
            neuron.lower_relax = Some(h_lexpr);
            neuron.upper_relax = Some(h_uexpr);
            new_h.push(h_bounds);
            new_c.push(c_bounds);
        }

        state.h = new_h;
        state.c = new_c;
        state.steps += 1;
        debug!("LSTM layer {} step {} done", index, state.steps);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn num_neurons_in_layer(&self, layer: usize) -> Result<usize> {
        Ok(self.net.layer(layer)?.len())
    }

    /// Bound of neuron `i` of `layer`, post-activation for the output
    /// layer and pre-activation otherwise.
    pub fn box_for_neuron(&self, layer: usize, i: usize) -> Result<Bound> {
        let neuron = self.net.layer(layer)?.neuron(layer, i)?;
        match (&self.net.output, self.is_output_layer(layer)) {
            (Some(out), true) => Ok(out.bounds[i].into()),
            _ => Ok(neuron.bounds().into()),
        }
    }

    /// [`box_for_neuron`](Self::box_for_neuron) for every neuron of `layer`.
    pub fn box_for_layer(&self, layer: usize) -> Result<Vec<Bound>> {
        let size = self.net.layer(layer)?.len();
        (0..size).map(|i| self.box_for_neuron(layer, i)).collect()
    }

    /// Hidden-state bound of neuron `i` of an LSTM layer after its last step.
    pub fn box_for_lstm_neuron(&self, layer: usize, i: usize) -> Result<Bound> {
        let l = self.net.layer(layer)?;
        let state = l
            .lstm
            .as_ref()
            .ok_or_else(|| FppolyError::InvalidSpec(format!("layer {layer} is not an LSTM layer")))?;
        let h = state.h.get(i).ok_or(FppolyError::InvalidNeuron {
            layer,
            neuron: i,
            size: state.h.len(),
        })?;
        Ok((*h).into())
    }

    /// Symbolic lower bound of output neuron `i` over the input (or, for
    /// polytope inputs, the primitive) dimensions.
    pub fn lexpr_for_output_neuron(&self, i: usize) -> Result<AffineExpr> {
        self.output_expr(i, Side::Lower)
    }

    /// Symbolic upper bound of output neuron `i`.
    pub fn uexpr_for_output_neuron(&self, i: usize) -> Result<AffineExpr> {
        self.output_expr(i, Side::Upper)
    }

    fn output_expr(&self, i: usize, side: Side) -> Result<AffineExpr> {
        let out = self
            .net
            .output
            .as_ref()
            .ok_or_else(|| FppolyError::InvalidSpec("no output layer".to_string()))?;
        let layer = self.net.num_layers() - 1;
        let exprs = match side {
            Side::Lower => &out.lexprs,
            Side::Upper => &out.uexprs,
        };
        let expr = exprs.get(i).ok_or(FppolyError::InvalidNeuron {
            layer,
            neuron: i,
            size: exprs.len(),
        })?;
        let _round_up = RoundingGuard::upward();
        let mut expr = self.context().input_expr(expr, side);
        expr.sort();
        Ok(expr)
    }

    /// `true` if output `y` provably exceeds output `x` everywhere in the
    /// input region.
    pub fn is_greater(&self, y: usize, x: usize) -> Result<bool> {
        let num_layers = self.net.num_layers();
        let last = num_layers
            .checked_sub(1)
            .ok_or(FppolyError::InvalidLayer { layer: 0, num_layers })?;
        let size = self.net.layers[last].len();
        for idx in [y, x] {
            if idx >= size {
                return Err(FppolyError::InvalidNeuron {
                    layer: last,
                    neuron: idx,
                    size,
                });
            }
        }
        if y == x {
            return Ok(false);
        }
        let mut coeffs = vec![Interval::ZERO; size];
        coeffs[y] = Interval::point(1.0);
        coeffs[x] = Interval::point(-1.0);
        let diff = AffineExpr::dense(coeffs, Interval::ZERO);
        let _round_up = RoundingGuard::upward();
        let lb = self.context().bound(diff, Side::Lower, num_layers);
        Ok(lb < 0.0)
    }

    /// Sound bound of `expr`, an expression over the pre-activation
    /// neurons of `layer`.
    pub fn bounds_for_linexpr(&self, layer: usize, expr: &AffineExpr) -> Result<Bound> {
        let l = self.net.layer(layer)?;
        check_dims(expr, l.len(), "linear expression")?;
        let ctx = self.context();
        let _round_up = RoundingGuard::upward();
        let bounds = if l.kind.is_affine() {
            let below = expr_from_previous_layer(ctx.config(), expr, l);
            ctx.bounds(&below, layer)
        } else {
            let lower = replace_with_relaxations(ctx.config(), expr.clone(), Side::Lower, l);
            let upper = replace_with_relaxations(ctx.config(), expr.clone(), Side::Upper, l);
            Interval::new(
                ctx.bound(lower, Side::Lower, layer),
                ctx.bound(upper, Side::Upper, layer),
            )
        };
        Ok(bounds.into())
    }

    /// True lower bound of `expr`, an expression over the outputs of layer
    /// `layerno - 1` (the input when `layerno == 0`).
    pub fn lower_bound_using_previous_layers(&self, expr: &AffineExpr, layerno: usize) -> Result<f64> {
        self.check_from(expr, layerno)?;
        let _round_up = RoundingGuard::upward();
        Ok(-self.context().bound(expr.clone(), Side::Lower, layerno))
    }

    /// Upper counterpart of
    /// [`lower_bound_using_previous_layers`](Self::lower_bound_using_previous_layers).
    pub fn upper_bound_using_previous_layers(&self, expr: &AffineExpr, layerno: usize) -> Result<f64> {
        self.check_from(expr, layerno)?;
        let _round_up = RoundingGuard::upward();
        Ok(self.context().bound(expr.clone(), Side::Upper, layerno))
    }

    fn check_from(&self, expr: &AffineExpr, layerno: usize) -> Result<()> {
        let num_layers = self.net.num_layers();
        if layerno > num_layers {
            return Err(FppolyError::InvalidLayer {
                layer: layerno,
                num_layers,
            });
        }
        check_dims(expr, self.input_dim_of(layerno), "linear expression")
    }

    // ------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------

    /// Replace the published bound of neuron `i` of `layer` with an
    /// externally proven `[lower, upper]`.
    ///
    /// For the output layer the override applies to the post-activation
    /// bound reported by [`box_for_neuron`](Self::box_for_neuron); the
    /// pre-activation bound used by back-substitution is left alone.
    pub fn update_bounds_for_neuron(&mut self, layer: usize, i: usize, lower: f64, upper: f64) -> Result<()> {
        if lower > upper {
            return Err(FppolyError::InvalidSpec(format!(
                "empty bound [{lower}, {upper}] for neuron {i} of layer {layer}"
            )));
        }
        let is_output = self.is_output_layer(layer);
        if let (true, Some(out)) = (is_output, self.net.output.as_mut()) {
            let size = out.bounds.len();
            let bound = out.bounds.get_mut(i).ok_or(FppolyError::InvalidNeuron {
                layer,
                neuron: i,
                size,
            })?;
            *bound = Interval::from_bounds(lower, upper);
            return Ok(());
        }
        let l = self.net.layer_mut(layer)?;
        let size = l.len();
        let neuron = l.neurons.get_mut(i).ok_or(FppolyError::InvalidNeuron {
            layer,
            neuron: i,
            size,
        })?;
        neuron.set_bounds(Interval::from_bounds(lower, upper));
        Ok(())
    }

    /// Replace the input box and recompute every layer on it.
    pub fn set_input_box(&mut self, inf: Vec<f64>, sup: Vec<f64>) -> Result<()> {
        let input = input_box(&inf, &sup)?;
        if input.len() != self.net.input.len() {
            return Err(FppolyError::DimensionMismatch {
                expected: self.net.input.len(),
                actual: input.len(),
                context: "input box".to_string(),
            });
        }
        self.net.input = input;
        self.net.output = None;
        info!("Recomputing {} layers on a new input box", self.net.num_layers());

        let recipes = self.recipes.clone();
        for (layerno, recipe) in recipes.into_iter().enumerate() {
            match recipe {
                Recipe::Affine { output } => self.compute_affine(layerno, output)?,
                Recipe::MaxPool { windows } => {
                    let neurons = self.pool_neurons(layerno, &windows)?;
                    self.net.layers[layerno].neurons = neurons;
                }
                Recipe::Lstm { steps } => {
                    let layer = &mut self.net.layers[layerno];
                    let hidden = layer.len();
                    layer.neurons = vec![Neuron::default(); hidden];
                    layer.lstm = Some(crate::network::LstmState::new(hidden));
                    for (weights, bias) in &steps {
                        self.lstm_step(layerno, weights.view(), bias.view())?;
                    }
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn context(&self) -> BackSubstitution<'_> {
        BackSubstitution::new(
            &self.config.rounding,
            &self.net.layers,
            &self.net.input,
            self.net.polytope.as_ref(),
        )
    }

    fn is_output_layer(&self, layer: usize) -> bool {
        matches!(self.recipes.get(layer), Some(Recipe::Affine { output: true }))
    }

    fn check_open(&self) -> Result<()> {
        if self.net.output.is_some() {
            return Err(FppolyError::InvalidSpec(
                "network already has an output layer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pre-activation bounds and expression of one LSTM gate.
struct Gate {
    expr: AffineExpr,
    bounds: Interval,
}

impl Gate {
    fn new(ctx: &BackSubstitution<'_>, expr: AffineExpr, from: usize) -> Self {
        let bounds = ctx.bounds(&expr, from);
        Self { expr, bounds }
    }

    fn operand(&self) -> Operand<'_> {
        Operand {
            bounds: self.bounds,
            lexpr: &self.expr,
            uexpr: &self.expr,
        }
    }

    /// Post-activation range.
    fn image(&self, kind: SCurve) -> Interval {
        kind.image(self.bounds)
    }
}

/// Flat relaxation of an output neuron onto `image`.
fn boxed(image: Interval) -> ((AffineExpr, f64), (AffineExpr, f64)) {
    (
        (AffineExpr::constant(image), image.inf),
        (AffineExpr::constant(image), image.sup),
    )
}

fn input_box(inf: &[f64], sup: &[f64]) -> Result<Vec<Interval>> {
    if inf.len() != sup.len() {
        return Err(FppolyError::DimensionMismatch {
            expected: inf.len(),
            actual: sup.len(),
            context: "input box".to_string(),
        });
    }
    inf.iter()
        .zip(sup)
        .enumerate()
        .map(|(i, (&lo, &hi))| {
            if lo > hi {
                Err(FppolyError::InvalidSpec(format!(
                    "empty input interval [{lo}, {hi}] at dimension {i}"
                )))
            } else {
                Ok(Interval::from_bounds(lo, hi))
            }
        })
        .collect()
}

/// Check every expression ranges over `dim` variables and sort sparse ones.
fn prepare_exprs(exprs: Vec<AffineExpr>, dim: usize, context: &str) -> Result<Vec<AffineExpr>> {
    exprs
        .into_iter()
        .map(|mut e| {
            check_dims(&e, dim, context)?;
            e.sort();
            Ok(e)
        })
        .collect()
}

fn check_dims(expr: &AffineExpr, dim: usize, context: &str) -> Result<()> {
    if expr.is_constant() {
        return Ok(());
    }
    if expr.is_dense() {
        if expr.len() != dim {
            return Err(FppolyError::DimensionMismatch {
                expected: dim,
                actual: expr.len(),
                context: context.to_string(),
            });
        }
        return Ok(());
    }
    match expr.iter().map(|(d, _)| d).max() {
        Some(max) if max >= dim => Err(FppolyError::DimensionMismatch {
            expected: dim,
            actual: max + 1,
            context: context.to_string(),
        }),
        _ => Ok(()),
    }
}
