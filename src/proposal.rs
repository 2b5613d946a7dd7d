/*!
Proposals: how a candidate is generated from the current parameters.

There are two kinds of leaf proposal:

- [`StaticProposal`]: the candidate is drawn directly from a distribution, which may be
  conditioned on the current state.
- [`RandomWalkProposal`]: a step is drawn from a distribution and added to the current state.

Each leaf carries a symmetry marker ([`Symmetric`] or [`Asymmetric`]) as a type parameter.
The two markers get separate [`Proposal`] impls, and only the asymmetric impl ever asks its
distribution for a density. A symmetric leaf therefore works with distributions that can
only be sampled, and its log-ratio is exactly zero.

Leaves compose structurally. A `Vec` of proposals acts on a `Vec` of parameters, a tuple on
a tuple, and a `BTreeMap<String, _>` on a map with the same keys. Log-ratios of composites
are the sums of their leaves' log-ratios.

# Examples

```rust
use mini_mh::distributions::ProposalDistribution;
use mini_mh::proposal::{Proposal, RandomWalkProposal, StaticProposal};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Cauchy, Normal};

let mut rng = SmallRng::seed_from_u64(1);

// Heavy-tailed symmetric random walk on the first slot, independence proposal on the second.
let proposal = (
    RandomWalkProposal::new(Cauchy::new(0.0, 0.5).unwrap()).symmetric(),
    StaticProposal::new(Normal::new(0.0, 1.0).unwrap()),
);
let current = (0.0, 0.0);
let candidate = proposal.propose(&mut rng, &current).unwrap();
let lr = proposal.log_ratio(&current, &candidate).unwrap();

// Only the static leaf contributes.
let q = Normal::new(0.0, 1.0).unwrap();
let expected = q.log_density(&current.1).unwrap() - q.log_density(&candidate.1).unwrap();
assert!((lr - expected).abs() < 1e-12);
```
*/

use ndarray::Array1;
use rand::RngCore;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::distributions::ProposalDistribution;
use crate::error::{McmcError, Result};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Symmetric {}
    impl Sealed for super::Asymmetric {}
}

/// Type-level symmetry marker of a leaf proposal.
pub trait Symmetry: sealed::Sealed + Send + Sync + 'static {
    const IS_SYMMETRIC: bool;
}

/// Forward and backward proposal densities cancel; the log-ratio is zero by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Symmetric;

/// The log-ratio is computed from the distribution's density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Asymmetric;

impl Symmetry for Symmetric {
    const IS_SYMMETRIC: bool = true;
}

impl Symmetry for Asymmetric {
    const IS_SYMMETRIC: bool = false;
}

/// Anything that generates a candidate from the current parameters.
///
/// Methods take the random stream as `&mut dyn RngCore` so proposals can be boxed, which
/// allows heterogeneous leaves inside a `Vec` or `BTreeMap` composite.
pub trait Proposal<P> {
    /// Draws a candidate given the current parameters.
    fn propose(&self, rng: &mut dyn RngCore, current: &P) -> Result<P>;

    /// `log q(current | candidate) - log q(candidate | current)`.
    fn log_ratio(&self, current: &P, candidate: &P) -> Result<f64>;

    /// Draws a starting point when the caller supplies none.
    fn initial(&self, rng: &mut dyn RngCore) -> Result<P>;

    /// Whether every leaf of this proposal is symmetric.
    fn is_symmetric(&self) -> bool;
}

/// Produces the distribution a leaf draws from, given the state it conditions on.
pub trait Conditional<X> {
    type Dist: ProposalDistribution<X>;

    fn given(&self, state: &X) -> Self::Dist;

    /// The distribution to draw a default initial point from, if there is one.
    fn unconditional(&self) -> Option<Self::Dist>;
}

/// A distribution that ignores the state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fixed<D>(pub D);

impl<X, D> Conditional<X> for Fixed<D>
where
    D: ProposalDistribution<X> + Clone,
{
    type Dist = D;

    fn given(&self, _state: &X) -> D {
        self.0.clone()
    }

    fn unconditional(&self) -> Option<D> {
        Some(self.0.clone())
    }
}

/// A distribution built from the state by a function.
#[derive(Debug, Clone, Copy)]
pub struct FromState<F>(pub F);

impl<X, D, F> Conditional<X> for FromState<F>
where
    F: Fn(&X) -> D,
    D: ProposalDistribution<X>,
{
    type Dist = D;

    fn given(&self, state: &X) -> D {
        (self.0)(state)
    }

    fn unconditional(&self) -> Option<D> {
        None
    }
}

/// Parameter types a random walk can move: `shifted` adds a step, `offset` recovers it.
pub trait Translate: Sized {
    /// `self + step`.
    fn shifted(&self, step: &Self) -> Result<Self>;

    /// `self - origin`.
    fn offset(&self, origin: &Self) -> Result<Self>;
}

impl Translate for f64 {
    fn shifted(&self, step: &Self) -> Result<Self> {
        Ok(self + step)
    }

    fn offset(&self, origin: &Self) -> Result<Self> {
        Ok(self - origin)
    }
}

impl<X: Translate> Translate for Vec<X> {
    fn shifted(&self, step: &Self) -> Result<Self> {
        check_len(step.len(), self.len())?;
        self.iter().zip(step).map(|(x, s)| x.shifted(s)).collect()
    }

    fn offset(&self, origin: &Self) -> Result<Self> {
        check_len(origin.len(), self.len())?;
        self.iter().zip(origin).map(|(x, o)| x.offset(o)).collect()
    }
}

impl Translate for Array1<f64> {
    fn shifted(&self, step: &Self) -> Result<Self> {
        check_len(step.len(), self.len())?;
        Ok(self + step)
    }

    fn offset(&self, origin: &Self) -> Result<Self> {
        check_len(origin.len(), self.len())?;
        Ok(self - origin)
    }
}

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(McmcError::shape(
            format!("length {expected}"),
            format!("length {found}"),
        ));
    }
    Ok(())
}

fn initial_from<X, G: Conditional<X>>(generator: &G, rng: &mut dyn RngCore) -> Result<X> {
    generator
        .unconditional()
        .map(|dist| dist.sample(rng))
        .ok_or_else(|| {
            McmcError::Configuration(
                "a state-conditioned proposal has no default initial point; \
                 supply initial parameters"
                    .to_string(),
            )
        })
}

/// Draws candidates directly from a (possibly state-conditioned) distribution.
#[derive(Debug, Clone, Copy)]
pub struct StaticProposal<G, S = Asymmetric> {
    pub generator: G,
    symmetry: PhantomData<S>,
}

impl<D> StaticProposal<Fixed<D>, Asymmetric> {
    pub fn new(dist: D) -> Self {
        Self::from_generator(Fixed(dist))
    }
}

impl<F> StaticProposal<FromState<F>, Asymmetric> {
    /// A proposal whose distribution is built from the current state by `f`.
    pub fn conditional(f: F) -> Self {
        Self::from_generator(FromState(f))
    }
}

impl<G> StaticProposal<G, Asymmetric> {
    pub fn from_generator(generator: G) -> Self {
        Self {
            generator,
            symmetry: PhantomData,
        }
    }

    /// Declares the proposal symmetric, so its log-ratio is zero and no density is evaluated.
    pub fn symmetric(self) -> StaticProposal<G, Symmetric> {
        StaticProposal {
            generator: self.generator,
            symmetry: PhantomData,
        }
    }
}

impl<X, G: Conditional<X>> Proposal<X> for StaticProposal<G, Symmetric> {
    fn propose(&self, rng: &mut dyn RngCore, current: &X) -> Result<X> {
        Ok(self.generator.given(current).sample(rng))
    }

    fn log_ratio(&self, _current: &X, _candidate: &X) -> Result<f64> {
        Ok(0.0)
    }

    fn initial(&self, rng: &mut dyn RngCore) -> Result<X> {
        initial_from(&self.generator, rng)
    }

    fn is_symmetric(&self) -> bool {
        Symmetric::IS_SYMMETRIC
    }
}

impl<X, G: Conditional<X>> Proposal<X> for StaticProposal<G, Asymmetric> {
    fn propose(&self, rng: &mut dyn RngCore, current: &X) -> Result<X> {
        Ok(self.generator.given(current).sample(rng))
    }

    fn log_ratio(&self, current: &X, candidate: &X) -> Result<f64> {
        let backward = self.generator.given(candidate).log_density(current)?;
        let forward = self.generator.given(current).log_density(candidate)?;
        Ok(backward - forward)
    }

    fn initial(&self, rng: &mut dyn RngCore) -> Result<X> {
        initial_from(&self.generator, rng)
    }

    fn is_symmetric(&self) -> bool {
        Asymmetric::IS_SYMMETRIC
    }
}

/// Adds a step drawn from a (possibly state-conditioned) distribution to the current state.
#[derive(Debug, Clone, Copy)]
pub struct RandomWalkProposal<G, S = Asymmetric> {
    pub generator: G,
    symmetry: PhantomData<S>,
}

impl<D> RandomWalkProposal<Fixed<D>, Asymmetric> {
    pub fn new(step: D) -> Self {
        Self::from_generator(Fixed(step))
    }
}

impl<F> RandomWalkProposal<FromState<F>, Asymmetric> {
    /// A random walk whose step distribution is built from the current state by `f`.
    pub fn conditional(f: F) -> Self {
        Self::from_generator(FromState(f))
    }
}

impl<G> RandomWalkProposal<G, Asymmetric> {
    pub fn from_generator(generator: G) -> Self {
        Self {
            generator,
            symmetry: PhantomData,
        }
    }

    /// Declares the step distribution symmetric around zero.
    pub fn symmetric(self) -> RandomWalkProposal<G, Symmetric> {
        RandomWalkProposal {
            generator: self.generator,
            symmetry: PhantomData,
        }
    }
}

impl<X: Translate, G: Conditional<X>> Proposal<X> for RandomWalkProposal<G, Symmetric> {
    fn propose(&self, rng: &mut dyn RngCore, current: &X) -> Result<X> {
        let step = self.generator.given(current).sample(rng);
        current.shifted(&step)
    }

    fn log_ratio(&self, _current: &X, _candidate: &X) -> Result<f64> {
        Ok(0.0)
    }

    fn initial(&self, rng: &mut dyn RngCore) -> Result<X> {
        initial_from(&self.generator, rng)
    }

    fn is_symmetric(&self) -> bool {
        Symmetric::IS_SYMMETRIC
    }
}

impl<X: Translate, G: Conditional<X>> Proposal<X> for RandomWalkProposal<G, Asymmetric> {
    fn propose(&self, rng: &mut dyn RngCore, current: &X) -> Result<X> {
        let step = self.generator.given(current).sample(rng);
        current.shifted(&step)
    }

    fn log_ratio(&self, current: &X, candidate: &X) -> Result<f64> {
        let backward = self
            .generator
            .given(candidate)
            .log_density(&current.offset(candidate)?)?;
        let forward = self
            .generator
            .given(current)
            .log_density(&candidate.offset(current)?)?;
        Ok(backward - forward)
    }

    fn initial(&self, rng: &mut dyn RngCore) -> Result<X> {
        initial_from(&self.generator, rng)
    }

    fn is_symmetric(&self) -> bool {
        Asymmetric::IS_SYMMETRIC
    }
}

impl<P, Q: Proposal<P> + ?Sized> Proposal<P> for Box<Q> {
    fn propose(&self, rng: &mut dyn RngCore, current: &P) -> Result<P> {
        (**self).propose(rng, current)
    }

    fn log_ratio(&self, current: &P, candidate: &P) -> Result<f64> {
        (**self).log_ratio(current, candidate)
    }

    fn initial(&self, rng: &mut dyn RngCore) -> Result<P> {
        (**self).initial(rng)
    }

    fn is_symmetric(&self) -> bool {
        (**self).is_symmetric()
    }
}

impl<X, Q: Proposal<X>> Proposal<Vec<X>> for Vec<Q> {
    fn propose(&self, rng: &mut dyn RngCore, current: &Vec<X>) -> Result<Vec<X>> {
        check_len(self.len(), current.len())?;
        self.iter()
            .zip(current)
            .map(|(q, x)| q.propose(rng, x))
            .collect()
    }

    fn log_ratio(&self, current: &Vec<X>, candidate: &Vec<X>) -> Result<f64> {
        check_len(self.len(), current.len())?;
        check_len(self.len(), candidate.len())?;
        self.iter()
            .zip(current.iter().zip(candidate))
            .map(|(q, (x, y))| q.log_ratio(x, y))
            .sum()
    }

    fn initial(&self, rng: &mut dyn RngCore) -> Result<Vec<X>> {
        self.iter().map(|q| q.initial(rng)).collect()
    }

    fn is_symmetric(&self) -> bool {
        self.iter().all(|q| q.is_symmetric())
    }
}

fn check_keys<A, B>(
    proposal: &BTreeMap<String, A>,
    params: &BTreeMap<String, B>,
) -> Result<()> {
    if !proposal.keys().eq(params.keys()) {
        return Err(McmcError::shape(
            format!("keys {:?}", proposal.keys().collect::<Vec<_>>()),
            format!("keys {:?}", params.keys().collect::<Vec<_>>()),
        ));
    }
    Ok(())
}

impl<X, Q: Proposal<X>> Proposal<BTreeMap<String, X>> for BTreeMap<String, Q> {
    fn propose(
        &self,
        rng: &mut dyn RngCore,
        current: &BTreeMap<String, X>,
    ) -> Result<BTreeMap<String, X>> {
        check_keys(self, current)?;
        self.iter()
            .zip(current.values())
            .map(|((name, q), x)| Ok::<_, McmcError>((name.clone(), q.propose(rng, x)?)))
            .collect()
    }

    fn log_ratio(
        &self,
        current: &BTreeMap<String, X>,
        candidate: &BTreeMap<String, X>,
    ) -> Result<f64> {
        check_keys(self, current)?;
        check_keys(self, candidate)?;
        self.values()
            .zip(current.values().zip(candidate.values()))
            .map(|(q, (x, y))| q.log_ratio(x, y))
            .sum()
    }

    fn initial(&self, rng: &mut dyn RngCore) -> Result<BTreeMap<String, X>> {
        self.iter()
            .map(|(name, q)| Ok::<_, McmcError>((name.clone(), q.initial(rng)?)))
            .collect()
    }

    fn is_symmetric(&self) -> bool {
        self.values().all(|q| q.is_symmetric())
    }
}

macro_rules! tuple_proposal {
    ($(($q:ident, $x:ident, $idx:tt)),+) => {
        impl<$($x, $q: Proposal<$x>),+> Proposal<($($x,)+)> for ($($q,)+) {
            fn propose(&self, rng: &mut dyn RngCore, current: &($($x,)+)) -> Result<($($x,)+)> {
                Ok(($(self.$idx.propose(rng, &current.$idx)?,)+))
            }

            fn log_ratio(&self, current: &($($x,)+), candidate: &($($x,)+)) -> Result<f64> {
                let mut total = 0.0;
                $(total += self.$idx.log_ratio(&current.$idx, &candidate.$idx)?;)+
                Ok(total)
            }

            fn initial(&self, rng: &mut dyn RngCore) -> Result<($($x,)+)> {
                Ok(($(self.$idx.initial(rng)?,)+))
            }

            fn is_symmetric(&self) -> bool {
                true $(&& self.$idx.is_symmetric())+
            }
        }
    };
}

tuple_proposal!((Q0, X0, 0), (Q1, X1, 1));
tuple_proposal!((Q0, X0, 0), (Q1, X1, 1), (Q2, X2, 2));
tuple_proposal!((Q0, X0, 0), (Q1, X1, 1), (Q2, X2, 2), (Q3, X3, 3));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::IsotropicGaussian;
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use rand_distr::{Cauchy, Normal};
    use std::cell::Cell;

    /// Counts density evaluations so tests can check they never happen.
    #[derive(Clone)]
    struct Counting<'a> {
        inner: Normal<f64>,
        calls: &'a Cell<usize>,
    }

    impl ProposalDistribution<f64> for Counting<'_> {
        fn sample(&self, rng: &mut dyn RngCore) -> f64 {
            ProposalDistribution::sample(&self.inner, rng)
        }

        fn log_density(&self, x: &f64) -> Result<f64> {
            self.calls.set(self.calls.get() + 1);
            ProposalDistribution::log_density(&self.inner, x)
        }
    }

    fn normal(mean: f64, std: f64) -> Normal<f64> {
        Normal::new(mean, std).unwrap()
    }

    #[test]
    fn symmetric_leaf_never_touches_density() {
        let calls = Cell::new(0);
        let dist = Counting {
            inner: normal(0.0, 1.0),
            calls: &calls,
        };
        let rw = RandomWalkProposal::new(dist.clone()).symmetric();
        let st = StaticProposal::new(dist).symmetric();
        assert_eq!(rw.log_ratio(&0.3, &-2.0).unwrap(), 0.0);
        assert_eq!(st.log_ratio(&0.3, &-2.0).unwrap(), 0.0);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn asymmetric_leaf_without_density_fails() {
        let rw = RandomWalkProposal::new(Cauchy::new(0.0, 1.0).unwrap());
        let err = rw.log_ratio(&0.0, &1.0).unwrap_err();
        assert!(matches!(err, McmcError::Capability { .. }));

        let st = StaticProposal::new(Cauchy::new(0.0, 1.0).unwrap());
        assert!(st.log_ratio(&0.0, &1.0).is_err());
    }

    #[test]
    fn symmetric_leaf_without_density_samples() {
        let mut rng = SmallRng::seed_from_u64(3);
        let rw = RandomWalkProposal::new(Cauchy::new(0.0, 1.0).unwrap()).symmetric();
        let candidate = rw.propose(&mut rng, &10.0).unwrap();
        assert!(candidate.is_finite());
        assert_eq!(rw.log_ratio(&10.0, &candidate).unwrap(), 0.0);
    }

    #[test]
    fn static_log_ratio_matches_densities() {
        let q = normal(0.5, 2.0);
        let st = StaticProposal::new(q);
        let lr = st.log_ratio(&1.0, &-0.25).unwrap();
        let expected = q.log_density(&1.0).unwrap() - q.log_density(&-0.25).unwrap();
        assert_abs_diff_eq!(lr, expected, epsilon = 1e-12);
    }

    #[test]
    fn conditional_random_walk_log_ratio() {
        // Step scale grows with |x|, so forward and backward densities differ.
        let rw = RandomWalkProposal::conditional(|x: &f64| normal(0.0, 1.0 + x.abs()));
        let (a, b) = (0.5, 2.0);
        let lr = rw.log_ratio(&a, &b).unwrap();
        let backward = normal(0.0, 3.0).log_density(&(a - b)).unwrap();
        let forward = normal(0.0, 1.5).log_density(&(b - a)).unwrap();
        assert_abs_diff_eq!(lr, backward - forward, epsilon = 1e-12);
    }

    #[test]
    fn symmetric_fixed_random_walk_equals_density_ratio() {
        // A fixed zero-mean Gaussian step has equal forward and backward densities, so the
        // asymmetric computation agrees with the symmetric shortcut.
        let rw = RandomWalkProposal::new(normal(0.0, 0.7));
        assert_abs_diff_eq!(rw.log_ratio(&1.2, &-0.4).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn vector_composite_sums_leaves() {
        let p1 = StaticProposal::new(normal(0.0, 1.0));
        let p2 = StaticProposal::new(normal(1.0, 0.5));
        let composite = vec![p1, p2];
        let (s, c) = (vec![0.2, 0.9], vec![-1.0, 1.4]);
        let total = composite.log_ratio(&s, &c).unwrap();
        let parts = p1.log_ratio(&0.2, &-1.0).unwrap() + p2.log_ratio(&0.9, &1.4).unwrap();
        assert_abs_diff_eq!(total, parts, epsilon = 1e-12);
        assert!(!composite.is_symmetric());
    }

    #[test]
    fn named_composite_sums_leaves() {
        let a: Box<dyn Proposal<f64>> = Box::new(StaticProposal::new(normal(0.0, 1.0)));
        let b: Box<dyn Proposal<f64>> =
            Box::new(RandomWalkProposal::new(Cauchy::new(0.0, 1.0).unwrap()).symmetric());
        let composite: BTreeMap<String, Box<dyn Proposal<f64>>> =
            [("mu".to_string(), a), ("sigma".to_string(), b)].into();
        let s: BTreeMap<String, f64> = [("mu".to_string(), 0.1), ("sigma".to_string(), 1.0)].into();
        let c: BTreeMap<String, f64> =
            [("mu".to_string(), -0.6), ("sigma".to_string(), 1.3)].into();

        let expected = StaticProposal::new(normal(0.0, 1.0))
            .log_ratio(&0.1, &-0.6)
            .unwrap();
        assert_abs_diff_eq!(composite.log_ratio(&s, &c).unwrap(), expected, epsilon = 1e-12);
        assert!(!composite.is_symmetric());
    }

    #[test]
    fn composite_shape_mismatch() {
        let mut rng = SmallRng::seed_from_u64(0);
        let composite = vec![StaticProposal::new(normal(0.0, 1.0)); 2];
        assert!(matches!(
            composite.propose(&mut rng, &vec![0.0]),
            Err(McmcError::ShapeMismatch { .. })
        ));

        let named: BTreeMap<String, _> =
            [("a".to_string(), StaticProposal::new(normal(0.0, 1.0)))].into();
        let params: BTreeMap<String, f64> = [("b".to_string(), 0.0)].into();
        assert!(named.log_ratio(&params, &params).is_err());
    }

    #[test]
    fn propose_keeps_shape() {
        let mut rng = SmallRng::seed_from_u64(11);
        let proposal = (
            RandomWalkProposal::new(IsotropicGaussian::centered(3, 0.1)).symmetric(),
            vec![StaticProposal::new(normal(0.0, 1.0)); 2],
        );
        let current = (vec![1.0, 2.0, 3.0], vec![0.0, 0.0]);
        let candidate = proposal.propose(&mut rng, &current).unwrap();
        assert_eq!(candidate.0.len(), 3);
        assert_eq!(candidate.1.len(), 2);
        for (x, y) in current.0.iter().zip(&candidate.0) {
            assert!((x - y).abs() < 1.0);
        }
    }

    #[test]
    fn initial_points() {
        let mut rng = SmallRng::seed_from_u64(5);
        let fixed = vec![RandomWalkProposal::new(normal(0.0, 1.0)); 4];
        assert_eq!(fixed.initial(&mut rng).unwrap().len(), 4);

        let conditioned = StaticProposal::conditional(|x: &f64| normal(*x, 1.0));
        assert!(matches!(
            conditioned.initial(&mut rng),
            Err(McmcError::Configuration(_))
        ));
    }

    #[test]
    fn translate_array() {
        let a = Array1::from(vec![1.0, 2.0]);
        let b = Array1::from(vec![0.5, -1.0]);
        assert_eq!(a.shifted(&b).unwrap(), Array1::from(vec![1.5, 1.0]));
        assert_eq!(a.offset(&b).unwrap(), Array1::from(vec![0.5, 3.0]));
        assert!(a.shifted(&Array1::from(vec![0.0])).is_err());
    }
}
