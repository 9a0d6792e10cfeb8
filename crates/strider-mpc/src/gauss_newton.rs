//! Gauss-Newton approximation of least-squares costs.
//!
//! A cost is described by a residual `r(t, x, u, p)` whose parameters `p` are
//! computed once per time point from the desired trajectory. The engine
//! evaluates
//!
//! ```text
//! L     = ½ ‖r‖²
//! ∂L/∂x = Jxᵀ r          ∂²L/∂x² ≈ Jxᵀ Jx
//! ∂L/∂u = Juᵀ r          ∂²L/∂u∂x ≈ Juᵀ Jx      ∂²L/∂u² ≈ Juᵀ Ju
//! ```
//!
//! where `J = [Jx Ju]` comes from a [`DerivativeEvaluator`]. Evaluators are
//! produced by a [`Differentiator`] and cached process-wide under the
//! model path of their [`AdSettings`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use strider_core::config::AdSettings;
use strider_core::error::CostError;
use strider_core::traits::DesiredTrajectory;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Least-squares cost over state and input.
pub trait StateInputCostFunction: Send + Sync {
    fn state_dim(&self) -> usize;

    fn input_dim(&self) -> usize;

    /// Length of the residual returned by [`cost_vector`](Self::cost_vector).
    fn cost_vector_length(&self) -> usize;

    /// Parameters of the residual at `time`.
    fn get_parameters(&self, time: f64, desired: &dyn DesiredTrajectory) -> DVector<f64>;

    /// Weighted residual. Must be pure in its arguments.
    fn cost_vector(
        &self,
        time: f64,
        state: &DVector<f64>,
        input: &DVector<f64>,
        parameters: &DVector<f64>,
    ) -> DVector<f64>;
}

/// Residual as seen by a derivative evaluator: a map from the stacked
/// variables `[x; u]` to the residual.
pub type Residual<'a> = dyn Fn(&DVector<f64>) -> DVector<f64> + 'a;

/// Jacobians of residuals with a fixed shape.
pub trait DerivativeEvaluator: Send + Sync {
    fn variables(&self) -> usize;

    fn range(&self) -> usize;

    /// `range × variables` Jacobian of `residual` at `at`.
    fn jacobian(&self, residual: &Residual<'_>, at: &DVector<f64>) -> DMatrix<f64>;
}

/// Builds evaluators for a residual shape.
pub trait Differentiator: Send + Sync {
    fn name(&self) -> &'static str;

    fn compile(
        &self,
        settings: &AdSettings,
        variables: usize,
        range: usize,
    ) -> Result<Arc<dyn DerivativeEvaluator>, CostError>;
}

// ---------------------------------------------------------------------------
// Finite differences
// ---------------------------------------------------------------------------

/// Central finite differences with a relative step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiniteDifference {
    pub step: f64,
}

impl Default for FiniteDifference {
    fn default() -> Self {
        Self { step: 1e-6 }
    }
}

impl Differentiator for FiniteDifference {
    fn name(&self) -> &'static str {
        "finite-difference"
    }

    fn compile(
        &self,
        settings: &AdSettings,
        variables: usize,
        range: usize,
    ) -> Result<Arc<dyn DerivativeEvaluator>, CostError> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(CostError::Compilation {
                model: settings.model_name.clone(),
                message: format!("finite-difference step must be positive, got {}", self.step),
            });
        }
        Ok(Arc::new(CentralDifference {
            step: self.step,
            variables,
            range,
        }))
    }
}

struct CentralDifference {
    step: f64,
    variables: usize,
    range: usize,
}

impl DerivativeEvaluator for CentralDifference {
    fn variables(&self) -> usize {
        self.variables
    }

    fn range(&self) -> usize {
        self.range
    }

    fn jacobian(&self, residual: &Residual<'_>, at: &DVector<f64>) -> DMatrix<f64> {
        debug_assert_eq!(at.len(), self.variables);
        let mut jacobian = DMatrix::zeros(self.range, at.len());
        let mut z = at.clone();
        for i in 0..at.len() {
            let h = self.step * at[i].abs().max(1.0);
            z[i] = at[i] + h;
            let forward = residual(&z);
            z[i] = at[i] - h;
            let backward = residual(&z);
            z[i] = at[i];
            jacobian.set_column(i, &((forward - backward) / (2.0 * h)));
        }
        jacobian
    }
}

// ---------------------------------------------------------------------------
// Evaluator cache
// ---------------------------------------------------------------------------

static EVALUATORS: LazyLock<Mutex<HashMap<PathBuf, Arc<dyn DerivativeEvaluator>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Evaluator cached under `settings.model_path()`, compiled on a miss, on
/// a shape change, or when `settings.recompile` is set.
pub fn load_or_compile(
    differentiator: &dyn Differentiator,
    settings: &AdSettings,
    variables: usize,
    range: usize,
) -> Result<Arc<dyn DerivativeEvaluator>, CostError> {
    let key = settings.model_path();
    let mut cache = EVALUATORS.lock();
    if !settings.recompile {
        if let Some(evaluator) = cache.get(&key) {
            if evaluator.variables() == variables && evaluator.range() == range {
                debug!(model = %key.display(), "reusing cached derivative evaluator");
                return Ok(Arc::clone(evaluator));
            }
            warn!(
                model = %key.display(),
                variables,
                range,
                "cached derivative evaluator has a different shape, recompiling"
            );
        }
    }
    info!(
        model = %key.display(),
        backend = differentiator.name(),
        variables,
        range,
        "compiling derivative evaluator"
    );
    let evaluator = differentiator.compile(settings, variables, range)?;
    cache.insert(key, Arc::clone(&evaluator));
    Ok(evaluator)
}

// ---------------------------------------------------------------------------
// GaussNewtonCost
// ---------------------------------------------------------------------------

/// Second-order approximation of a scalar cost.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarFunctionQuadraticApproximation {
    pub f: f64,
    pub dfdx: DVector<f64>,
    pub dfdu: DVector<f64>,
    pub dfdxx: DMatrix<f64>,
    pub dfdux: DMatrix<f64>,
    pub dfduu: DMatrix<f64>,
}

/// Least-squares cost with a Gauss-Newton Hessian.
#[derive(Clone)]
pub struct GaussNewtonCost<F> {
    function: F,
    evaluator: Arc<dyn DerivativeEvaluator>,
    settings: AdSettings,
}

impl<F: StateInputCostFunction> GaussNewtonCost<F> {
    /// Build with the finite-difference backend.
    pub fn new(function: F, settings: AdSettings) -> Result<Self, CostError> {
        Self::with_differentiator(function, settings, &FiniteDifference::default())
    }

    pub fn with_differentiator(
        function: F,
        settings: AdSettings,
        differentiator: &dyn Differentiator,
    ) -> Result<Self, CostError> {
        let variables = function.state_dim() + function.input_dim();
        let evaluator =
            load_or_compile(differentiator, &settings, variables, function.cost_vector_length())?;
        Ok(Self {
            function,
            evaluator,
            settings,
        })
    }

    pub const fn function(&self) -> &F {
        &self.function
    }

    pub const fn settings(&self) -> &AdSettings {
        &self.settings
    }

    /// Residual at `(time, state, input)` against the desired trajectory.
    pub fn residual(
        &self,
        time: f64,
        state: &DVector<f64>,
        input: &DVector<f64>,
        desired: &dyn DesiredTrajectory,
    ) -> DVector<f64> {
        let parameters = self.function.get_parameters(time, desired);
        self.function.cost_vector(time, state, input, &parameters)
    }

    /// `½ ‖r‖²`.
    pub fn value(
        &self,
        time: f64,
        state: &DVector<f64>,
        input: &DVector<f64>,
        desired: &dyn DesiredTrajectory,
    ) -> f64 {
        0.5 * self.residual(time, state, input, desired).norm_squared()
    }

    pub fn quadratic_approximation(
        &self,
        time: f64,
        state: &DVector<f64>,
        input: &DVector<f64>,
        desired: &dyn DesiredTrajectory,
    ) -> ScalarFunctionQuadraticApproximation {
        let nx = self.function.state_dim();
        let nu = self.function.input_dim();
        debug_assert_eq!(state.len(), nx);
        debug_assert_eq!(input.len(), nu);

        let parameters = self.function.get_parameters(time, desired);
        let r = self.function.cost_vector(time, state, input, &parameters);

        let mut z = DVector::zeros(nx + nu);
        z.rows_mut(0, nx).copy_from(state);
        z.rows_mut(nx, nu).copy_from(input);
        let residual = |z: &DVector<f64>| {
            let x = z.rows(0, nx).into_owned();
            let u = z.rows(nx, nu).into_owned();
            self.function.cost_vector(time, &x, &u, &parameters)
        };
        let j = self.evaluator.jacobian(&residual, &z);
        let jx = j.columns(0, nx);
        let ju = j.columns(nx, nu);

        ScalarFunctionQuadraticApproximation {
            f: 0.5 * r.norm_squared(),
            dfdx: jx.tr_mul(&r),
            dfdu: ju.tr_mul(&r),
            dfdxx: jx.tr_mul(&jx),
            dfdux: ju.tr_mul(&jx),
            dfduu: ju.tr_mul(&ju),
        }
    }
}
