//! Target densities the kernels sample from.
//!
//! A model maps parameters to an unnormalized log-density. It is total: parameters outside
//! the support map to `f64::NEG_INFINITY`, which the acceptance test always rejects.
//! Gradients are an optional capability that only the Langevin kernel asks for.

use crate::error::{McmcError, Result};

/// A (possibly unnormalized) log-density over parameters of type `P`.
pub trait LogDensityModel<P> {
    /// Log-density at `params`, or `f64::NEG_INFINITY` outside the support.
    fn log_density(&self, params: &P) -> f64;

    /// Log-density together with its gradient, flattened in parameter order.
    fn log_density_and_gradient(&self, _params: &P) -> Result<(f64, Vec<f64>)> {
        Err(McmcError::capability(format!(
            "{} does not provide a log-density gradient",
            std::any::type_name::<Self>()
        )))
    }

    /// Number of scalar parameters, if the model knows it.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

impl<P, M: LogDensityModel<P> + ?Sized> LogDensityModel<P> for &M {
    fn log_density(&self, params: &P) -> f64 {
        (**self).log_density(params)
    }

    fn log_density_and_gradient(&self, params: &P) -> Result<(f64, Vec<f64>)> {
        (**self).log_density_and_gradient(params)
    }

    fn dimension(&self) -> Option<usize> {
        (**self).dimension()
    }
}

/**
Wraps a log-density closure.

# Examples

```rust
use mini_mh::model::{DensityModel, LogDensityModel};

let model = DensityModel::new(|x: &f64| if *x >= 0.0 { -x } else { f64::NEG_INFINITY });
assert_eq!(model.log_density(&2.0), -2.0);
assert_eq!(model.log_density(&-1.0), f64::NEG_INFINITY);
assert!(model.log_density_and_gradient(&1.0).is_err());
```
*/
#[derive(Debug, Clone, Copy)]
pub struct DensityModel<F> {
    logdensity: F,
}

impl<F> DensityModel<F> {
    pub fn new(logdensity: F) -> Self {
        Self { logdensity }
    }
}

impl<P, F> LogDensityModel<P> for DensityModel<F>
where
    F: Fn(&P) -> f64,
{
    fn log_density(&self, params: &P) -> f64 {
        (self.logdensity)(params)
    }
}

/// Wraps a log-density closure and a closure for its gradient.
#[derive(Debug, Clone, Copy)]
pub struct GradientModel<F, G> {
    logdensity: F,
    gradient: G,
    dim: Option<usize>,
}

impl<F, G> GradientModel<F, G> {
    pub fn new(logdensity: F, gradient: G) -> Self {
        Self {
            logdensity,
            gradient,
            dim: None,
        }
    }

    /// Records the number of parameters the model is defined over.
    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dim = Some(dim);
        self
    }
}

impl<P, F, G> LogDensityModel<P> for GradientModel<F, G>
where
    F: Fn(&P) -> f64,
    G: Fn(&P) -> Vec<f64>,
{
    fn log_density(&self, params: &P) -> f64 {
        (self.logdensity)(params)
    }

    fn log_density_and_gradient(&self, params: &P) -> Result<(f64, Vec<f64>)> {
        let lp = (self.logdensity)(params);
        let grad = (self.gradient)(params);
        if let Some(dim) = self.dim {
            if grad.len() != dim {
                return Err(McmcError::shape(dim, grad.len()));
            }
        }
        Ok((lp, grad))
    }

    fn dimension(&self) -> Option<usize> {
        self.dim
    }
}
