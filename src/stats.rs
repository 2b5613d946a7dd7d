//! Running chain statistics used for progress messages and the end-of-run summary.

use ndarray::prelude::*;
use ndarray_stats::QuantileExt;
use std::collections::VecDeque;

use crate::error::{McmcError, Result};

const ACCEPT_WINDOW: usize = 100;

/// Tracks running means and the acceptance rate of one chain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChainTracker {
    n: u64,
    n_accepted: u64,
    mean: Array1<f64>,
    mean_sq: Array1<f64>,
    accept_queue: VecDeque<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainStats {
    pub n: u64,
    pub n_accepted: u64,
    pub mean: Array1<f64>,
    pub sm2: Array1<f64>,
}

impl ChainStats {
    pub fn acceptance_rate(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.n_accepted as f64 / self.n as f64
    }
}

impl ChainTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one transition, given its flattened parameters and acceptance flag.
    pub fn step(&mut self, x: &[f64], accepted: bool) -> Result<()> {
        if self.n == 0 {
            self.mean = Array1::zeros(x.len());
            self.mean_sq = Array1::zeros(x.len());
        } else if x.len() != self.mean.len() {
            return Err(McmcError::shape(self.mean.len(), x.len()));
        }
        self.n += 1;
        self.n_accepted += accepted as u64;

        self.accept_queue.push_back(accepted);
        if self.accept_queue.len() > ACCEPT_WINDOW {
            self.accept_queue.pop_front();
        }

        let n = self.n as f64;
        let x_arr = ArrayView1::from(x);
        self.mean = (&self.mean * (n - 1.0) + x_arr) / n;
        self.mean_sq = (&self.mean_sq * (n - 1.0) + x_arr.pow2()) / n;
        Ok(())
    }

    /// Acceptance rate over the last hundred transitions.
    pub fn p_accept(&self) -> f64 {
        if self.accept_queue.is_empty() {
            return 0.0;
        }
        let accepted = self.accept_queue.iter().filter(|&&a| a).count();
        accepted as f64 / self.accept_queue.len() as f64
    }

    /// Unbiased per-coordinate sample variance.
    pub fn sm2(&self) -> Array1<f64> {
        let n = self.n as f64;
        (&self.mean_sq - &self.mean.pow2()) * n / (n - 1.0)
    }

    pub fn stats(&self) -> ChainStats {
        ChainStats {
            n: self.n,
            n_accepted: self.n_accepted,
            mean: self.mean.clone(),
            sm2: self.sm2(),
        }
    }
}

/// Largest potential scale reduction factor over all coordinates.
///
/// Returns `None` with fewer than two chains or when a coordinate's statistic is undefined.
pub fn collect_rhat(all_chain_stats: &[&ChainStats]) -> Option<f64> {
    if all_chain_stats.len() < 2 {
        return None;
    }
    let means: Vec<ArrayView1<f64>> = all_chain_stats.iter().map(|x| x.mean.view()).collect();
    let means = ndarray::stack(Axis(0), &means).ok()?;
    let sm2s: Vec<ArrayView1<f64>> = all_chain_stats.iter().map(|x| x.sm2.view()).collect();
    let sm2s = ndarray::stack(Axis(0), &sm2s).ok()?;

    let w = sm2s.mean_axis(Axis(0))?;
    let global_means = means.mean_axis(Axis(0))?;
    let diffs = &means - &global_means.insert_axis(Axis(0));
    let b = diffs.pow2().sum_axis(Axis(0)) / (all_chain_stats.len() - 1) as f64;

    let n: f64 =
        all_chain_stats.iter().map(|x| x.n as f64).sum::<f64>() / all_chain_stats.len() as f64;
    let rhat = ((&b + &(&w * ((n - 1.0) / n))) / &w).sqrt();
    rhat.max().ok().copied()
}
