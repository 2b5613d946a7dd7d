//! Fits the mean and scale of a Normal likelihood to simulated data with a
//! random-walk Metropolis-Hastings sampler, then prints posterior summaries.

use mini_mh::core::{SampleSettings, Sampler};
use mini_mh::metropolis_hastings::MetropolisHastings;
use mini_mh::model::DensityModel;
use mini_mh::proposal::RandomWalkProposal;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::error::Error;
use std::f64::consts::PI;

fn main() -> Result<(), Box<dyn Error>> {
    const N_OBS: usize = 500;
    const N_CHAINS: usize = 4;
    const SEED: u64 = 42;

    let mut rng = SmallRng::seed_from_u64(SEED);
    let truth = Normal::new(2.0, 0.5)?;
    let data: Vec<f64> = (0..N_OBS).map(|_| truth.sample(&mut rng)).collect();

    let model = DensityModel::new(|theta: &Vec<f64>| {
        let (mu, sigma) = (theta[0], theta[1]);
        if sigma <= 0.0 {
            return f64::NEG_INFINITY;
        }
        data.iter()
            .map(|x| -0.5 * ((x - mu) / sigma).powi(2) - sigma.ln() - 0.5 * (2.0 * PI).ln())
            .sum()
    });
    let step = Normal::new(0.0, 0.05)?;
    let proposal = vec![RandomWalkProposal::new(step).symmetric(); 2];

    let mut sampler = Sampler::new(model, MetropolisHastings::new(proposal), N_CHAINS)
        .with_initial_params(vec![0.0, 1.0])
        .set_seed(SEED);
    let settings = SampleSettings {
        discard_initial: 2_000,
        thinning: 2,
        ..SampleSettings::new(10_000)
    };
    let chains = sampler.run_progress(&settings)?;

    let samples: Vec<&Vec<f64>> = chains.iter().flatten().map(|t| &t.params).collect();
    let n = samples.len() as f64;
    let mean_mu = samples.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_sigma = samples.iter().map(|p| p[1]).sum::<f64>() / n;
    let accepted = chains.iter().flatten().filter(|t| t.accepted).count() as f64;

    println!("Generated {} samples", samples.len());
    println!("Posterior mean of mu: {mean_mu:.3} (truth 2.0)");
    println!("Posterior mean of sigma: {mean_sigma:.3} (truth 0.5)");
    println!("Acceptance rate: {:.3}", accepted / n);
    Ok(())
}
