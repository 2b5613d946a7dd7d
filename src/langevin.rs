//! Metropolis-adjusted Langevin algorithm (MALA).
//!
//! The proposal distribution is built from the current parameters and the log-density
//! gradient there, by a [`LangevinRule`]. Because forward and backward distributions are
//! built at different points, the acceptance ratio always includes both proposal densities.
//!
//! Random stream order per step: one draw for the candidate from the forward
//! distribution, then the uniform acceptance draw. The backward distribution is
//! deterministic.

use rand::RngCore;

use crate::core::{check_dimension, metropolis_accept, Kernel};
use crate::distributions::{IsotropicGaussian, ProposalDistribution};
use crate::error::{McmcError, Result};
use crate::model::LogDensityModel;
use crate::transition::GradientTransition;

/// Builds the proposal distribution at a point from the point and its gradient.
pub trait LangevinRule {
    type Dist: ProposalDistribution<Vec<f64>>;

    fn distribution(&self, params: &[f64], gradient: &[f64]) -> Self::Dist;
}

/// The standard Langevin discretization: `N(x + ε²/2 ∇log p(x), ε² I)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianLangevin {
    pub step_size: f64,
}

impl LangevinRule for GaussianLangevin {
    type Dist = IsotropicGaussian;

    fn distribution(&self, params: &[f64], gradient: &[f64]) -> IsotropicGaussian {
        let drift = 0.5 * self.step_size * self.step_size;
        let mean = params
            .iter()
            .zip(gradient)
            .map(|(x, g)| x + drift * g)
            .collect();
        IsotropicGaussian::new(mean, self.step_size)
    }
}

/// A rule given as a closure over parameters and gradient.
#[derive(Debug, Clone, Copy)]
pub struct RuleFn<F>(pub F);

impl<F, D> LangevinRule for RuleFn<F>
where
    F: Fn(&[f64], &[f64]) -> D,
    D: ProposalDistribution<Vec<f64>>,
{
    type Dist = D;

    fn distribution(&self, params: &[f64], gradient: &[f64]) -> D {
        (self.0)(params, gradient)
    }
}

/**
The MALA kernel.

Needs a model with a gradient and explicit initial parameters; there is no default
starting point.

# Examples

```rust
use mini_mh::core::{SampleSettings, Sampler};
use mini_mh::langevin::Mala;
use mini_mh::model::GradientModel;

let model = GradientModel::new(
    |x: &Vec<f64>| -0.5 * x.iter().map(|v| v * v).sum::<f64>(),
    |x: &Vec<f64>| x.iter().map(|v| -v).collect(),
);
let mut sampler = Sampler::new(model, Mala::new(0.9), 1)
    .with_initial_params(vec![1.0, -1.0])
    .set_seed(3);
let chains = sampler.run(&SampleSettings::new(100)).unwrap();
assert_eq!(chains[0][0].gradient.len(), 2);
```
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mala<R> {
    pub rule: R,
}

impl Mala<GaussianLangevin> {
    /// MALA with the standard Gaussian rule and step size `step_size`.
    pub fn new(step_size: f64) -> Self {
        Self {
            rule: GaussianLangevin { step_size },
        }
    }
}

impl<F> Mala<RuleFn<F>> {
    /// MALA with a drift/diffusion rule given as a closure.
    pub fn from_fn(f: F) -> Self {
        Self { rule: RuleFn(f) }
    }
}

impl<R> Mala<R> {
    pub fn with_rule(rule: R) -> Self {
        Self { rule }
    }
}

impl<M, R> Kernel<M, Vec<f64>> for Mala<R>
where
    M: LogDensityModel<Vec<f64>>,
    R: LangevinRule,
{
    type Transition = GradientTransition<Vec<f64>>;

    fn initial_step(
        &self,
        model: &M,
        _rng: &mut dyn RngCore,
        initial: Option<Vec<f64>>,
    ) -> Result<GradientTransition<Vec<f64>>> {
        let params = initial.ok_or_else(|| {
            McmcError::Configuration(
                "the Langevin kernel requires initial parameters".to_string(),
            )
        })?;
        check_dimension::<Vec<f64>, _>(model, params.len())?;
        let (log_density, gradient) = model.log_density_and_gradient(&params)?;
        if gradient.len() != params.len() {
            return Err(McmcError::shape(params.len(), gradient.len()));
        }
        Ok(GradientTransition::new(params, log_density, gradient, true))
    }

    fn step(
        &self,
        model: &M,
        rng: &mut dyn RngCore,
        previous: &GradientTransition<Vec<f64>>,
    ) -> Result<GradientTransition<Vec<f64>>> {
        let forward = self.rule.distribution(&previous.params, &previous.gradient);
        let candidate = forward.sample(rng);

        let (candidate_ld, candidate_grad) = model.log_density_and_gradient(&candidate)?;
        if candidate_grad.len() != candidate.len() {
            return Err(McmcError::shape(candidate.len(), candidate_grad.len()));
        }
        let backward = self.rule.distribution(&candidate, &candidate_grad);

        let log_alpha = candidate_ld - previous.log_density
            + backward.log_density(&previous.params)?
            - forward.log_density(&candidate)?;

        if metropolis_accept(rng, candidate_ld, log_alpha) {
            Ok(GradientTransition::new(
                candidate,
                candidate_ld,
                candidate_grad,
                true,
            ))
        } else {
            Ok(GradientTransition {
                accepted: false,
                ..previous.clone()
            })
        }
    }
}
