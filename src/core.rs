//! Kernels, chains, and the sampling driver.
//!
//! A [`Kernel`] performs one transition given a model and a random stream. A
//! [`KernelChain`] owns the stream and the latest transition of one Markov chain, and a
//! [`Sampler`] runs several chains (serially or on the rayon pool) with discard and
//! thinning applied.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rand::prelude::*;
use rayon::prelude::*;

use crate::error::{McmcError, Result};
use crate::model::LogDensityModel;
use crate::stats::{collect_rhat, ChainStats, ChainTracker};
use crate::transition::{FlatParams, Params};

/// One step of a Markov chain Monte Carlo algorithm.
///
/// `M` is the model the kernel evaluates and `P` the parameter type it moves.
pub trait Kernel<M, P> {
    type Transition: Params<P> + Clone;

    /// Builds the first transition, from `initial` when given.
    fn initial_step(
        &self,
        model: &M,
        rng: &mut dyn RngCore,
        initial: Option<P>,
    ) -> Result<Self::Transition>;

    /// Builds the transition that follows `previous`.
    fn step(
        &self,
        model: &M,
        rng: &mut dyn RngCore,
        previous: &Self::Transition,
    ) -> Result<Self::Transition>;
}

/// Metropolis acceptance test in log space.
///
/// The uniform variate is always drawn, so every step consumes the same amount of the
/// stream. A candidate with log-density `-∞` is rejected regardless of the draw.
pub(crate) fn metropolis_accept(rng: &mut dyn RngCore, candidate_ld: f64, log_alpha: f64) -> bool {
    let u: f64 = rng.gen();
    if candidate_ld == f64::NEG_INFINITY {
        false
    } else if log_alpha >= 0.0 {
        true
    } else {
        u.ln() < log_alpha
    }
}

/// Fails when the model knows its dimension and `n_params` differs from it.
pub(crate) fn check_dimension<P, M: LogDensityModel<P>>(model: &M, n_params: usize) -> Result<()> {
    match model.dimension() {
        Some(dim) if dim != n_params => Err(McmcError::shape(dim, n_params)),
        _ => Ok(()),
    }
}

/// Whether the driver steps chains one after another or on the rayon thread pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    Serial,
    #[default]
    Threads,
}

/// What a call to [`Sampler::run`] collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSettings {
    /// Transitions returned per chain.
    pub n_samples: usize,
    /// Iterations dropped before the first retained one.
    pub discard_initial: usize,
    /// Interval between retained iterations; must be at least 1.
    pub thinning: usize,
    pub execution: Execution,
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            discard_initial: 0,
            thinning: 1,
            execution: Execution::default(),
        }
    }
}

impl SampleSettings {
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.thinning == 0 {
            return Err(McmcError::Configuration(
                "thinning must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Total kernel iterations needed to collect `n_samples` transitions.
    pub fn n_iterations(&self) -> usize {
        match self.n_samples {
            0 => 0,
            n => self.discard_initial + 1 + (n - 1) * self.thinning,
        }
    }

    /// Whether the 1-based raw iteration `i` ends up in the output.
    pub fn retains(&self, i: usize) -> bool {
        i > self.discard_initial && (i - self.discard_initial - 1) % self.thinning == 0
    }
}

/// A single Markov chain: its random stream and the latest transition.
#[derive(Debug, Clone)]
pub struct KernelChain<P, T> {
    /// The latest transition, `None` until the first step.
    pub current: Option<T>,
    /// Starting parameters; when absent the kernel picks its own.
    pub initial_params: Option<P>,
    /// The chain-specific random seed.
    pub seed: u64,
    /// The random number generator for this chain.
    pub rng: SmallRng,
}

impl<P: Clone, T> KernelChain<P, T> {
    pub fn new(initial_params: Option<P>) -> Self {
        let seed = thread_rng().gen::<u64>();
        Self {
            current: None,
            initial_params,
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Advances the chain by one kernel step and returns the new transition.
    pub fn step<M, K>(&mut self, kernel: &K, model: &M) -> Result<&T>
    where
        K: Kernel<M, P, Transition = T>,
    {
        let next = match &self.current {
            Some(previous) => kernel.step(model, &mut self.rng, previous)?,
            None => {
                log::debug!("chain with seed {} takes its initial step", self.seed);
                kernel.initial_step(model, &mut self.rng, self.initial_params.clone())?
            }
        };
        Ok(&*self.current.insert(next))
    }

    /// Runs the chain for `settings.n_iterations()` steps and keeps the retained ones.
    pub fn run<M, K>(
        &mut self,
        kernel: &K,
        model: &M,
        settings: &SampleSettings,
        pb: Option<&ProgressBar>,
    ) -> Result<(Vec<T>, ChainStats)>
    where
        K: Kernel<M, P, Transition = T>,
        T: Params<P> + Clone,
        P: FlatParams,
    {
        let mut out = Vec::with_capacity(settings.n_samples);
        let mut tracker = ChainTracker::new();
        for i in 1..=settings.n_iterations() {
            let transition = self.step(kernel, model)?;
            tracker.step(&transition.params().flatten(), transition.accepted())?;
            if settings.retains(i) {
                out.push(transition.clone());
            }
            if let Some(pb) = pb {
                pb.inc(1);
                if i % 100 == 0 {
                    pb.set_message(format!("p(accept)≈{:.2}", tracker.p_accept()));
                }
            }
        }
        Ok((out, tracker.stats()))
    }
}

/**
Runs independent chains of one kernel against one model.

Each chain owns a `SmallRng`. [`Sampler::set_seed`] seeds chain `i` with `seed + i`, so
runs are reproducible regardless of the execution mode.

# Examples

```rust
use mini_mh::core::{SampleSettings, Sampler};
use mini_mh::metropolis_hastings::MetropolisHastings;
use mini_mh::model::DensityModel;
use mini_mh::proposal::RandomWalkProposal;
use rand_distr::Normal;

let model = DensityModel::new(|x: &f64| -0.5 * x * x);
let kernel = MetropolisHastings::new(RandomWalkProposal::new(Normal::new(0.0, 1.0).unwrap()).symmetric());
let mut sampler = Sampler::new(model, kernel, 2)
    .with_initial_params(0.0)
    .set_seed(42);
let chains = sampler.run(&SampleSettings::new(500)).unwrap();
assert_eq!(chains.len(), 2);
assert_eq!(chains[0].len(), 500);
```
*/
pub struct Sampler<M, K, P>
where
    K: Kernel<M, P>,
{
    /// The target the chains sample from.
    pub model: M,
    /// The transition kernel shared by all chains.
    pub kernel: K,
    /// The independent chains.
    pub chains: Vec<KernelChain<P, K::Transition>>,
    /// The global random seed.
    pub seed: u64,
}

impl<M, K, P> Sampler<M, K, P>
where
    M: Sync,
    K: Kernel<M, P> + Sync,
    K::Transition: Send,
    P: Clone + Send + FlatParams,
{
    pub fn new(model: M, kernel: K, n_chains: usize) -> Self {
        let chains = (0..n_chains).map(|_| KernelChain::new(None)).collect();
        let seed = thread_rng().gen::<u64>();
        Self {
            model,
            kernel,
            chains,
            seed,
        }
    }

    /// Starts every chain from `params`.
    pub fn with_initial_params(mut self, params: P) -> Self {
        for chain in self.chains.iter_mut() {
            chain.initial_params = Some(params.clone());
        }
        self
    }

    /// Sets the global seed; chain `i` is reseeded with `seed + i`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        for (i, chain) in self.chains.iter_mut().enumerate() {
            let chain_seed = seed + i as u64;
            chain.seed = chain_seed;
            chain.rng = SmallRng::seed_from_u64(chain_seed);
        }
        self
    }

    /**
    Runs every chain and returns the retained transitions, one `Vec` per chain.

    Chains continue from where a previous call left them. An error in any chain aborts
    the whole call; no partial output is returned.
    */
    pub fn run(&mut self, settings: &SampleSettings) -> Result<Vec<Vec<K::Transition>>> {
        self.run_inner(settings, None)
    }

    /// Like [`Sampler::run`], with an `indicatif` progress bar per chain.
    pub fn run_progress(&mut self, settings: &SampleSettings) -> Result<Vec<Vec<K::Transition>>> {
        let multi = MultiProgress::new();
        self.run_inner(settings, Some(&multi))
    }

    fn run_inner(
        &mut self,
        settings: &SampleSettings,
        multi: Option<&MultiProgress>,
    ) -> Result<Vec<Vec<K::Transition>>> {
        settings.validate()?;
        if self.chains.is_empty() {
            return Err(McmcError::Configuration(
                "at least one chain is required".to_string(),
            ));
        }
        log::debug!(
            "running {} chain(s) for {} iterations each ({:?})",
            self.chains.len(),
            settings.n_iterations(),
            settings.execution
        );

        let pb_style = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .map_err(|e| McmcError::Configuration(e.to_string()))?
            .progress_chars("##-");
        let make_bar = |i: usize| {
            multi.map(|multi| {
                let pb = multi.add(ProgressBar::new(settings.n_iterations() as u64));
                pb.set_prefix(format!("Chain {i}"));
                pb.set_style(pb_style.clone());
                pb
            })
        };

        let (model, kernel) = (&self.model, &self.kernel);
        let run_one = |(i, chain): (usize, &mut KernelChain<P, K::Transition>)| {
            let pb = make_bar(i);
            let res = chain.run(kernel, model, settings, pb.as_ref());
            if let Some(pb) = pb {
                pb.finish_with_message("Done!");
            }
            res
        };

        let results: Vec<(Vec<K::Transition>, ChainStats)> = match settings.execution {
            Execution::Serial => self
                .chains
                .iter_mut()
                .enumerate()
                .map(run_one)
                .collect::<Result<_>>()?,
            Execution::Threads => self
                .chains
                .par_iter_mut()
                .enumerate()
                .map(run_one)
                .collect::<Result<_>>()?,
        };

        report(&results.iter().map(|(_, s)| s).collect::<Vec<_>>());
        Ok(results.into_iter().map(|(samples, _)| samples).collect())
    }
}

fn report(stats: &[&ChainStats]) {
    for (i, s) in stats.iter().enumerate() {
        if s.n > 1 && s.n_accepted <= 1 {
            log::warn!("chain {i} never moved after its initial step; check the proposal scale");
        }
        log::info!(
            "chain {i}: {} iterations, acceptance rate {:.3}",
            s.n,
            s.acceptance_rate()
        );
    }
    if stats.len() > 1 {
        if let Some(max) = collect_rhat(stats) {
            log::info!("max(rhat) across chains: {max:.3}");
        }
    }
}
