/*!
Distributions used to build proposals, plus a small 2D Gaussian target.

A proposal leaf only needs to draw from its distribution. Evaluating the density is an
optional capability: [`ProposalDistribution::log_density`] defaults to a
[`McmcError::Capability`] error, and only asymmetric proposals ever call it.

# Examples

```rust
use mini_mh::distributions::{IsotropicGaussian, ProposalDistribution};
use rand::rngs::SmallRng;
use rand::SeedableRng;

let mut rng = SmallRng::seed_from_u64(42);
let step = IsotropicGaussian::centered(2, 0.5);
let draw = step.sample(&mut rng);
assert_eq!(draw.len(), 2);
assert!(step.log_density(&draw).unwrap().is_finite());
```
*/

use ndarray::{Array1, Array2};
use rand::{Rng, RngCore};
use rand_distr::{Cauchy, Distribution, Normal, StandardNormal};
use std::f64::consts::PI;

use crate::error::{McmcError, Result};
use crate::model::LogDensityModel;

/// A distribution that proposals can draw candidates or steps from.
pub trait ProposalDistribution<X> {
    /// Draws one value.
    fn sample(&self, rng: &mut dyn RngCore) -> X;

    /// Evaluates the normalized log-density at `x`.
    ///
    /// Distributions that cannot do this keep the default, which reports a capability error.
    fn log_density(&self, _x: &X) -> Result<f64> {
        Err(McmcError::capability(format!(
            "{} has no log-density",
            std::any::type_name::<Self>()
        )))
    }
}

fn normal_log_density(x: f64, mean: f64, std: f64) -> f64 {
    let z = (x - mean) / std;
    -0.5 * z * z - std.ln() - 0.5 * (2.0 * PI).ln()
}

impl ProposalDistribution<f64> for Normal<f64> {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        Distribution::sample(self, rng)
    }

    fn log_density(&self, x: &f64) -> Result<f64> {
        Ok(normal_log_density(*x, self.mean(), self.std_dev()))
    }
}

// `rand_distr::Cauchy` does not expose its median and scale, so it can only be sampled.
impl ProposalDistribution<f64> for Cauchy<f64> {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        Distribution::sample(self, rng)
    }
}

/// A continuous uniform distribution on `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    pub low: f64,
    pub high: f64,
}

impl Uniform {
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !(low < high) {
            return Err(McmcError::Configuration(format!(
                "uniform bounds must satisfy low < high, got [{low}, {high})"
            )));
        }
        Ok(Self { low, high })
    }
}

impl ProposalDistribution<f64> for Uniform {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        rng.gen_range(self.low..self.high)
    }

    fn log_density(&self, x: &f64) -> Result<f64> {
        if (self.low..self.high).contains(x) {
            Ok(-(self.high - self.low).ln())
        } else {
            Ok(f64::NEG_INFINITY)
        }
    }
}

/**
An isotropic Gaussian over vectors: every coordinate is independent with the same
standard deviation `std` around its entry in `mean`.

Used as a random-walk step with [`IsotropicGaussian::centered`].

# Examples

```rust
use mini_mh::distributions::{IsotropicGaussian, ProposalDistribution};

let step = IsotropicGaussian::centered(3, 1.0);
assert_eq!(step.mean, vec![0.0; 3]);
let lp = step.log_density(&vec![0.0, 0.0, 0.0]).unwrap();
assert!((lp + 1.5 * (2.0 * std::f64::consts::PI).ln()).abs() < 1e-12);
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct IsotropicGaussian {
    pub mean: Vec<f64>,
    pub std: f64,
}

impl IsotropicGaussian {
    pub fn new(mean: Vec<f64>, std: f64) -> Self {
        Self { mean, std }
    }

    /// Zero-mean isotropic Gaussian of dimension `dim`.
    pub fn centered(dim: usize, std: f64) -> Self {
        Self::new(vec![0.0; dim], std)
    }
}

impl ProposalDistribution<Vec<f64>> for IsotropicGaussian {
    fn sample(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        self.mean
            .iter()
            .map(|m| {
                let z: f64 = rng.sample(StandardNormal);
                m + self.std * z
            })
            .collect()
    }

    fn log_density(&self, x: &Vec<f64>) -> Result<f64> {
        if x.len() != self.mean.len() {
            return Err(McmcError::shape(self.mean.len(), x.len()));
        }
        Ok(x.iter()
            .zip(&self.mean)
            .map(|(&xi, &mi)| normal_log_density(xi, mi, self.std))
            .sum())
    }
}

/// A Gaussian over vectors with independent coordinates and per-coordinate scales.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagGaussian {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl DiagGaussian {
    pub fn new(mean: Vec<f64>, std: Vec<f64>) -> Result<Self> {
        if mean.len() != std.len() {
            return Err(McmcError::shape(mean.len(), std.len()));
        }
        Ok(Self { mean, std })
    }
}

impl ProposalDistribution<Vec<f64>> for DiagGaussian {
    fn sample(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        self.mean
            .iter()
            .zip(&self.std)
            .map(|(m, s)| {
                let z: f64 = rng.sample(StandardNormal);
                m + s * z
            })
            .collect()
    }

    fn log_density(&self, x: &Vec<f64>) -> Result<f64> {
        if x.len() != self.mean.len() {
            return Err(McmcError::shape(self.mean.len(), x.len()));
        }
        Ok(x.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(&xi, (&mi, &si))| normal_log_density(xi, mi, si))
            .sum())
    }
}

/**
A 2D Gaussian target parameterized by a mean vector and a 2×2 covariance matrix.

Provides its log-density gradient, so it can drive the Langevin kernel.

# Examples

```rust
use mini_mh::distributions::Gaussian2D;
use mini_mh::model::LogDensityModel;
use ndarray::{arr1, arr2};

let gauss = Gaussian2D {
    mean: arr1(&[0.0, 0.0]),
    cov: arr2(&[[1.0, 0.0], [0.0, 1.0]]),
};
let (lp, grad) = gauss.log_density_and_gradient(&vec![1.0, 0.0]).unwrap();
assert_eq!(lp, -0.5);
assert_eq!(grad, vec![-1.0, 0.0]);
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian2D {
    pub mean: Array1<f64>,
    pub cov: Array2<f64>,
}

impl Gaussian2D {
    fn precision_times_diff(&self, theta: &[f64]) -> Result<(Array1<f64>, Array1<f64>)> {
        if theta.len() != 2 {
            return Err(McmcError::shape(2, theta.len()));
        }
        let (a, b, c, d) = (
            self.cov[(0, 0)],
            self.cov[(0, 1)],
            self.cov[(1, 0)],
            self.cov[(1, 1)],
        );
        let det = a * d - b * c;
        let inv_cov = Array2::from_shape_vec((2, 2), vec![d, -b, -c, a])
            .map_err(|e| McmcError::Configuration(e.to_string()))?
            / det;
        let diff = Array1::from(theta.to_vec()) - &self.mean;
        let scaled = inv_cov.dot(&diff);
        Ok((diff, scaled))
    }
}

impl LogDensityModel<Vec<f64>> for Gaussian2D {
    /// Unnormalized log-density `-½ (x - μ)ᵀ Σ⁻¹ (x - μ)`.
    fn log_density(&self, theta: &Vec<f64>) -> f64 {
        // Wrong-length input is outside the support; kernels check `dimension` up front.
        match self.precision_times_diff(theta) {
            Ok((diff, scaled)) => -0.5 * diff.dot(&scaled),
            Err(_) => f64::NEG_INFINITY,
        }
    }

    fn log_density_and_gradient(&self, theta: &Vec<f64>) -> Result<(f64, Vec<f64>)> {
        let (diff, scaled) = self.precision_times_diff(theta)?;
        let lp = -0.5 * diff.dot(&scaled);
        Ok((lp, scaled.iter().map(|g| -g).collect()))
    }

    fn dimension(&self) -> Option<usize> {
        Some(2)
    }
}
