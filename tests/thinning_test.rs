//! End-to-end: discard and thinning select the documented raw iterations.

use mini_mh::core::{Execution, Kernel, SampleSettings, Sampler};
use mini_mh::transition::Transition;
use mini_mh::Result;
use rand::RngCore;

/// A kernel whose parameter is the 1-based index of the iteration that produced it.
struct IterationCounter;

impl<M> Kernel<M, f64> for IterationCounter {
    type Transition = Transition<f64>;

    fn initial_step(
        &self,
        _model: &M,
        _rng: &mut dyn RngCore,
        _initial: Option<f64>,
    ) -> Result<Transition<f64>> {
        Ok(Transition::new(1.0, 0.0, true))
    }

    fn step(
        &self,
        _model: &M,
        _rng: &mut dyn RngCore,
        previous: &Transition<f64>,
    ) -> Result<Transition<f64>> {
        Ok(Transition::new(previous.params + 1.0, 0.0, true))
    }
}

fn retained(settings: SampleSettings, n_chains: usize) -> Vec<Vec<usize>> {
    let mut sampler =
        Sampler::<(), IterationCounter, f64>::new((), IterationCounter, n_chains).set_seed(0);
    sampler
        .run(&settings)
        .unwrap()
        .into_iter()
        .map(|chain| chain.iter().map(|t| t.params as usize).collect())
        .collect()
}

#[test]
fn discard_25_thin_4() {
    let settings = SampleSettings {
        n_samples: 10_000,
        discard_initial: 25,
        thinning: 4,
        execution: Execution::Serial,
    };
    let expected: Vec<usize> = (0..10_000).map(|k| 26 + 4 * k).collect();
    let chains = retained(settings, 1);
    assert_eq!(chains[0].len(), 10_000);
    assert_eq!(chains[0], expected);
}

#[test]
fn parallel_chains_thin_identically() {
    let settings = SampleSettings {
        n_samples: 50,
        discard_initial: 3,
        thinning: 7,
        execution: Execution::Threads,
    };
    let expected: Vec<usize> = (0..50).map(|k| 4 + 7 * k).collect();
    for chain in retained(settings, 4) {
        assert_eq!(chain, expected);
    }
}

#[test]
fn defaults_keep_every_iteration() {
    let chains = retained(SampleSettings::new(5), 1);
    assert_eq!(chains[0], vec![1, 2, 3, 4, 5]);
}
