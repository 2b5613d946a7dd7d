/*!
# Metropolis–Hastings Kernel

One Metropolis–Hastings transition for any model `M` and proposal `Q` that agree on the
parameter type:

1. Propose a candidate from the current parameters.
2. Evaluate the model at the candidate.
3. Compute

   \[
   \log \alpha = \log p(\text{candidate}) - \log p(\text{current})
               + \log q(\text{current} \mid \text{candidate}) - \log q(\text{candidate} \mid \text{current})
   \]

   where the proposal term is exactly zero for symmetric proposals.
4. Draw `u ~ Uniform(0, 1)` and accept iff `ln u < log α`.

Static proposals give an independence sampler; random-walk proposals give the usual
random-walk Metropolis sampler. Both are the same kernel with a different proposal.

## Example Usage

```rust
use mini_mh::core::{Execution, SampleSettings, Sampler};
use mini_mh::metropolis_hastings::MetropolisHastings;
use mini_mh::model::DensityModel;
use mini_mh::proposal::StaticProposal;
use rand_distr::Normal;

// Exponential(1) target on the half line.
let model = DensityModel::new(|x: &f64| if *x >= 0.0 { -x } else { f64::NEG_INFINITY });
let kernel = MetropolisHastings::new(StaticProposal::new(Normal::new(1.0, 2.0).unwrap()));

let mut sampler = Sampler::<_, _, f64>::new(model, kernel, 1).set_seed(7);
let settings = SampleSettings {
    n_samples: 1_000,
    discard_initial: 100,
    thinning: 2,
    execution: Execution::Serial,
};
let chains = sampler.run(&settings).unwrap();
assert!(chains[0].iter().all(|t| t.params >= 0.0));
```
*/

use rand::RngCore;

use crate::core::{check_dimension, metropolis_accept, Kernel};
use crate::error::Result;
use crate::model::LogDensityModel;
use crate::proposal::Proposal;
use crate::transition::{FlatParams, Transition};

/// Metropolis–Hastings kernel around a proposal `Q`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetropolisHastings<Q> {
    /// The proposal used to generate candidate states.
    pub proposal: Q,
}

impl<Q> MetropolisHastings<Q> {
    pub fn new(proposal: Q) -> Self {
        Self { proposal }
    }
}

impl<M, P, Q> Kernel<M, P> for MetropolisHastings<Q>
where
    M: LogDensityModel<P>,
    Q: Proposal<P>,
    P: Clone + FlatParams,
{
    type Transition = Transition<P>;

    /// Starts from `initial`, or from a draw of the proposal's default initial point.
    ///
    /// Parameters whose flattened length differs from the model's known dimension are a
    /// shape error here; past the first step the model alone decides what they score.
    fn initial_step(
        &self,
        model: &M,
        rng: &mut dyn RngCore,
        initial: Option<P>,
    ) -> Result<Transition<P>> {
        let params = match initial {
            Some(params) => params,
            None => {
                log::debug!("no initial parameters given, drawing them from the proposal");
                self.proposal.initial(rng)?
            }
        };
        check_dimension::<P, _>(model, params.flatten().len())?;
        let log_density = model.log_density(&params);
        if !log_density.is_finite() {
            log::warn!("initial parameters have log-density {log_density}");
        }
        Ok(Transition::new(params, log_density, true))
    }

    fn step(
        &self,
        model: &M,
        rng: &mut dyn RngCore,
        previous: &Transition<P>,
    ) -> Result<Transition<P>> {
        let candidate = self.proposal.propose(rng, &previous.params)?;
        let candidate_ld = model.log_density(&candidate);
        let log_alpha = candidate_ld - previous.log_density
            + self.proposal.log_ratio(&previous.params, &candidate)?;

        if metropolis_accept(rng, candidate_ld, log_alpha) {
            Ok(Transition::new(candidate, candidate_ld, true))
        } else {
            Ok(Transition::new(
                previous.params.clone(),
                previous.log_density,
                false,
            ))
        }
    }
}
