//! Per-step records emitted by the kernels.
//!
//! Transitions are values: a kernel builds a new one every step and never mutates the
//! previous one. [`Params::with_params`] substitutes parameters by returning a new record.

use ndarray::Array1;
use std::collections::BTreeMap;

/// One Metropolis-Hastings step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<P> {
    pub params: P,
    pub log_density: f64,
    pub accepted: bool,
}

impl<P> Transition<P> {
    pub fn new(params: P, log_density: f64, accepted: bool) -> Self {
        Self {
            params,
            log_density,
            accepted,
        }
    }
}

/// One Langevin step, which also carries the log-density gradient at `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientTransition<P> {
    pub params: P,
    pub log_density: f64,
    pub gradient: Vec<f64>,
    pub accepted: bool,
}

impl<P> GradientTransition<P> {
    pub fn new(params: P, log_density: f64, gradient: Vec<f64>, accepted: bool) -> Self {
        Self {
            params,
            log_density,
            gradient,
            accepted,
        }
    }
}

/// Access to the parameters and bookkeeping of a transition record.
pub trait Params<P> {
    fn params(&self) -> &P;

    /// Returns the record with `params` replaced and every other field kept.
    fn with_params(self, params: P) -> Self;

    fn log_density(&self) -> f64;

    fn accepted(&self) -> bool;
}

impl<P> Params<P> for Transition<P> {
    fn params(&self) -> &P {
        &self.params
    }

    fn with_params(self, params: P) -> Self {
        Self { params, ..self }
    }

    fn log_density(&self) -> f64 {
        self.log_density
    }

    fn accepted(&self) -> bool {
        self.accepted
    }
}

impl<P> Params<P> for GradientTransition<P> {
    fn params(&self) -> &P {
        &self.params
    }

    fn with_params(self, params: P) -> Self {
        Self { params, ..self }
    }

    fn log_density(&self) -> f64 {
        self.log_density
    }

    fn accepted(&self) -> bool {
        self.accepted
    }
}

/// Parameter shapes that can be laid out as a flat `f64` vector.
///
/// Named mappings flatten in key order, which is the `BTreeMap` iteration order.
pub trait FlatParams {
    fn flatten_into(&self, out: &mut Vec<f64>);

    fn flatten(&self) -> Vec<f64> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }
}

impl FlatParams for f64 {
    fn flatten_into(&self, out: &mut Vec<f64>) {
        out.push(*self);
    }
}

impl<X: FlatParams> FlatParams for Vec<X> {
    fn flatten_into(&self, out: &mut Vec<f64>) {
        self.iter().for_each(|x| x.flatten_into(out));
    }
}

impl FlatParams for Array1<f64> {
    fn flatten_into(&self, out: &mut Vec<f64>) {
        out.extend(self.iter().copied());
    }
}

impl<X: FlatParams> FlatParams for BTreeMap<String, X> {
    fn flatten_into(&self, out: &mut Vec<f64>) {
        self.values().for_each(|x| x.flatten_into(out));
    }
}

macro_rules! tuple_flat {
    ($(($x:ident, $idx:tt)),+) => {
        impl<$($x: FlatParams),+> FlatParams for ($($x,)+) {
            fn flatten_into(&self, out: &mut Vec<f64>) {
                $(self.$idx.flatten_into(out);)+
            }
        }
    };
}

tuple_flat!((X0, 0), (X1, 1));
tuple_flat!((X0, 0), (X1, 1), (X2, 2));
tuple_flat!((X0, 0), (X1, 1), (X2, 2), (X3, 3));
