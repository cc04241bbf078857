use super::config::{CostParams, MonteCarloConfig};
use super::dtl::{cost_eq, min_cost};
use super::error::{ReconError, Result};
use super::input::Instance;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Result of a Monte-Carlo significance test.
#[derive(Debug, Clone, PartialEq)]
pub struct PValue {
    /// MPR cost under the original tip mapping
    pub observed: f64,
    /// One outcome per trial, in trial order
    pub trials: Vec<Result<f64>>,
    /// (1 + #{trial cost ≤ observed}) / (successful trials + 1)
    pub p_value: f64,
}

impl PValue {
    /// Costs of the successful trials.
    pub fn costs(&self) -> Vec<f64> {
        self.trials.iter().filter_map(|t| t.as_ref().ok().copied()).collect()
    }

    pub fn failures(&self) -> usize {
        self.trials.iter().filter(|t| t.is_err()).count()
    }
}

/// A tip mapping with the same host degrees as the instance's.
///
/// Hosts in the image are visited in index order; each draws as many
/// parasite leaves as it had, without replacement, from the remaining pool.
pub fn random_phi<R: Rng + ?Sized>(instance: &Instance, rng: &mut R) -> Vec<Option<usize>> {
    let mut degree: BTreeMap<usize, usize> = BTreeMap::new();
    for h in instance.tip_map().iter().flatten() {
        *degree.entry(*h).or_default() += 1;
    }

    let mut pool: Vec<usize> = instance.parasite().leaves();
    let mut tip_map = vec![None; instance.parasite().len()];
    for (h, k) in degree {
        for _ in 0..k {
            let p = pool.swap_remove(rng.gen_range(0..pool.len()));
            tip_map[p] = Some(h);
        }
    }
    tip_map
}

/// Empirical p-value of the optimal cost against degree-preserving random
/// tip mappings. Trials run in parallel, each with its own seeded RNG.
pub fn p_value(
    instance: &Instance,
    costs: &CostParams,
    config: &MonteCarloConfig,
) -> Result<PValue> {
    let observed = min_cost(instance, costs)?;
    p_value_for(instance, costs, observed, config)
}

/// Same as [`p_value`] for an already known observed cost.
pub fn p_value_for(
    instance: &Instance,
    costs: &CostParams,
    observed: f64,
    config: &MonteCarloConfig,
) -> Result<PValue> {
    if config.trials == 0 {
        return Err(ReconError::Input("trials must be at least 1".to_string()));
    }

    let mut master = StdRng::seed_from_u64(config.seed);
    let seeds: Vec<u64> = (0..config.trials).map(|_| master.gen()).collect();

    let trials: Vec<Result<f64>> = seeds
        .par_iter()
        .map(|&seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let phi = random_phi(instance, &mut rng);
            instance
                .with_tip_map(phi)
                .and_then(|shuffled| min_cost(&shuffled, costs))
        })
        .collect();

    for (i, t) in trials.iter().enumerate() {
        if let Err(e) = t {
            warn!("trial {} failed: {}", i, e);
        }
    }

    let ok: Vec<f64> = trials.iter().filter_map(|t| t.as_ref().ok().copied()).collect();
    if ok.is_empty() {
        return Err(trials
            .into_iter()
            .find_map(|t| t.err())
            .unwrap_or_else(|| ReconError::Invariant("no trial ran".to_string())));
    }

    let hits = ok
        .iter()
        .filter(|&&c| c < observed || cost_eq(c, observed))
        .count();
    let p_value = (1 + hits) as f64 / (ok.len() + 1) as f64;
    debug!(
        "observed {}, {} of {} trials as good, p = {}",
        observed,
        hits,
        ok.len(),
        p_value
    );

    Ok(PValue {
        observed,
        trials,
        p_value,
    })
}
