//! End-to-end: fit the mean and scale of a Normal likelihood with an independence sampler.

use mini_mh::core::{SampleSettings, Sampler};
use mini_mh::metropolis_hastings::MetropolisHastings;
use mini_mh::model::DensityModel;
use mini_mh::proposal::StaticProposal;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Normal, StandardNormal};
use std::collections::BTreeMap;
use std::f64::consts::PI;

const N_OBS: usize = 300;
const N_SAMPLES: usize = 100_000;
const SEED: u64 = 42;

/// `N_OBS` draws from a standard normal.
fn standard_normal_data() -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(SEED);
    (0..N_OBS).map(|_| rng.sample(StandardNormal)).collect()
}

fn normal_loglik(data: &[f64], mu: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return f64::NEG_INFINITY;
    }
    data.iter()
        .map(|x| {
            let z = (x - mu) / sigma;
            -0.5 * z * z - sigma.ln() - 0.5 * (2.0 * PI).ln()
        })
        .sum()
}

fn column_means(rows: impl Iterator<Item = (f64, f64)>) -> (f64, f64) {
    let (mut a, mut b, mut n) = (0.0, 0.0, 0.0);
    for (x, y) in rows {
        a += x;
        b += y;
        n += 1.0;
    }
    (a / n, b / n)
}

#[test]
fn static_proposal_recovers_mu_and_sigma() {
    let data = standard_normal_data();
    let model = DensityModel::new(|theta: &Vec<f64>| normal_loglik(&data, theta[0], theta[1]));
    let proposal = vec![StaticProposal::new(Normal::new(0.0, 1.0).unwrap()); 2];
    let mut sampler =
        Sampler::<_, _, Vec<f64>>::new(model, MetropolisHastings::new(proposal), 1).set_seed(SEED);

    let chains = sampler.run(&SampleSettings::new(N_SAMPLES)).unwrap();
    assert_eq!(chains[0].len(), N_SAMPLES);

    let (mu, sigma) = column_means(chains[0].iter().map(|t| (t.params[0], t.params[1])));
    assert!(mu.abs() < 0.1, "mean of mu was {mu}");
    assert!((sigma - 1.0).abs() < 0.1, "mean of sigma was {sigma}");
}

#[test]
fn named_parameters_recover_mu_and_sigma() {
    let data = standard_normal_data();
    let model = DensityModel::new(|theta: &BTreeMap<String, f64>| {
        normal_loglik(&data, theta["mu"], theta["sigma"])
    });
    let proposal: BTreeMap<String, _> = [
        ("mu".to_string(), StaticProposal::new(Normal::new(0.0, 1.0).unwrap())),
        ("sigma".to_string(), StaticProposal::new(Normal::new(1.0, 1.0).unwrap())),
    ]
    .into();
    let mut sampler =
        Sampler::<_, _, BTreeMap<String, f64>>::new(model, MetropolisHastings::new(proposal), 1)
            .set_seed(SEED);

    let chains = sampler.run(&SampleSettings::new(N_SAMPLES)).unwrap();
    let (mu, sigma) = column_means(chains[0].iter().map(|t| (t.params["mu"], t.params["sigma"])));
    assert!(mu.abs() < 0.1, "mean of mu was {mu}");
    assert!((sigma - 1.0).abs() < 0.1, "mean of sigma was {sigma}");
}
