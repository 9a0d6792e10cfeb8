//! Piecewise-linear desired state and input trajectories.

use nalgebra::DVector;

use strider_core::error::CostError;
use strider_core::traits::DesiredTrajectory;

/// Time-stamped state and input references.
///
/// Between samples values are interpolated linearly; outside the sampled
/// range the first or last sample is held.
#[derive(Clone, Debug, PartialEq)]
pub struct CostDesiredTrajectories {
    times: Vec<f64>,
    states: Vec<DVector<f64>>,
    inputs: Vec<DVector<f64>>,
}

impl CostDesiredTrajectories {
    pub fn new(
        times: Vec<f64>,
        states: Vec<DVector<f64>>,
        inputs: Vec<DVector<f64>>,
    ) -> Result<Self, CostError> {
        if times.is_empty() {
            return Err(CostError::InvalidTrajectory("no samples".into()));
        }
        for (what, got) in [("desired states", states.len()), ("desired inputs", inputs.len())] {
            if got != times.len() {
                return Err(CostError::DimensionMismatch {
                    what,
                    expected: times.len(),
                    got,
                });
            }
        }
        if let Some(bad) = times.iter().position(|t| !t.is_finite()) {
            return Err(CostError::InvalidTrajectory(format!(
                "time at index {bad} is not finite"
            )));
        }
        if let Some(index) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(CostError::InvalidTrajectory(format!(
                "times decrease at index {}",
                index + 1
            )));
        }
        check_uniform("desired states", &states)?;
        check_uniform("desired inputs", &inputs)?;
        Ok(Self {
            times,
            states,
            inputs,
        })
    }

    /// Hold `state` and `input` for all time.
    pub fn constant(state: DVector<f64>, input: DVector<f64>) -> Self {
        Self {
            times: vec![0.0],
            states: vec![state],
            inputs: vec![input],
        }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[DVector<f64>] {
        &self.states
    }

    pub fn inputs(&self) -> &[DVector<f64>] {
        &self.inputs
    }

    fn interpolate(&self, samples: &[DVector<f64>], time: f64) -> DVector<f64> {
        let last = self.times.len() - 1;
        let upper = self.times.partition_point(|&t| t <= time);
        if upper == 0 {
            return samples[0].clone();
        }
        if upper > last {
            return samples[last].clone();
        }
        let lower = upper - 1;
        let span = self.times[upper] - self.times[lower];
        if span <= 0.0 {
            return samples[upper].clone();
        }
        let alpha = (time - self.times[lower]) / span;
        samples[lower].scale(1.0 - alpha) + samples[upper].scale(alpha)
    }
}

fn check_uniform(what: &'static str, samples: &[DVector<f64>]) -> Result<(), CostError> {
    let expected = samples.first().map_or(0, DVector::len);
    match samples.iter().find(|s| s.len() != expected) {
        Some(s) => Err(CostError::DimensionMismatch {
            what,
            expected,
            got: s.len(),
        }),
        None => Ok(()),
    }
}

impl DesiredTrajectory for CostDesiredTrajectories {
    fn desired_state(&self, time: f64) -> DVector<f64> {
        self.interpolate(&self.states, time)
    }

    fn desired_input(&self, time: f64) -> DVector<f64> {
        self.interpolate(&self.inputs, time)
    }
}
