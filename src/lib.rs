//! Generic Metropolis–Hastings and Langevin sampling over structured parameters.
//!
//! - [`model`]: target log-densities, optionally with gradients.
//! - [`distributions`]: distributions proposals draw from.
//! - [`proposal`]: static and random-walk proposals with a type-level symmetry marker,
//!   composable over vectors, tuples, and named maps.
//! - [`metropolis_hastings`] and [`langevin`]: the transition kernels.
//! - [`core`]: the kernel trait, chains, and the multi-chain driver.

pub mod core;
pub mod distributions;
pub mod error;
pub mod langevin;
pub mod metropolis_hastings;
pub mod model;
pub mod proposal;
pub mod stats;
pub mod transition;

pub use error::{McmcError, Result};
