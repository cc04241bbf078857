use super::error::{ReconError, Result};
use super::graph::{Event, MappingNode, Mpr, ReconGraph};
use super::support::event_counts;
use num_bigint::{BigInt, BigUint};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::debug;

/// MPRs minimizing the summed distance to every MPR of a graph.
#[derive(Debug, Clone)]
pub struct Median {
    /// Every median MPR, as a closed sub-graph
    pub graph: ReconGraph,
    pub count: BigUint,
    /// One median drawn uniformly from `graph`
    pub random_median: Mpr,
    /// Σ over the median's events of (2·count(e) − N)
    pub score: BigInt,
}

/// Finds the median sub-graph.
///
/// Σ_M |M △ M*| = const − Σ_{e ∈ M*} (2·count(e) − N), so the medians are the
/// MPRs maximizing the event weights 2·count(e) − N, found bottom-up exactly.
pub fn median<R: Rng + ?Sized>(graph: &ReconGraph, rng: &mut R) -> Result<Median> {
    if graph.is_empty() {
        return Err(ReconError::Input("the graph has no MPR".to_string()));
    }

    let n = BigInt::from(graph.count_mprs());
    let counts = event_counts(graph);
    let weight = |m: &MappingNode, e| -> BigInt {
        let c = counts
            .get(&(*m, e))
            .cloned()
            .map(BigInt::from)
            .unwrap_or_default();
        c * 2 - &n
    };

    // best achievable weight of the sub-MPR rooted at each node
    let mut best: BTreeMap<MappingNode, BigInt> = BTreeMap::new();
    let mut value: BTreeMap<(MappingNode, Event), BigInt> = BTreeMap::new();
    for (m, events) in graph.nodes() {
        let mut top: Option<BigInt> = None;
        for e in events {
            let v = e
                .children()
                .fold(weight(m, *e), |acc, c| acc + &best[&c]);
            if top.as_ref().map_or(true, |t| &v > t) {
                top = Some(v.clone());
            }
            value.insert((*m, *e), v);
        }
        if let Some(t) = top {
            best.insert(*m, t);
        }
    }

    let score = graph
        .roots()
        .iter()
        .map(|r| best[r].clone())
        .max()
        .ok_or_else(|| ReconError::Invariant("graph without roots".to_string()))?;
    let roots: Vec<MappingNode> = graph
        .roots()
        .iter()
        .filter(|r| best[*r] == score)
        .copied()
        .collect();

    let sub = graph.restrict(&roots, |m, e| value.get(&(*m, *e)) == best.get(m));
    sub.validate()?;

    let count = sub.count_mprs();
    let random_median = sub
        .sample_uniform_mpr(rng)
        .ok_or_else(|| ReconError::Invariant("median sub-graph is empty".to_string()))?;
    debug!("{} median MPRs, score {}", count, score);

    Ok(Median {
        graph: sub,
        count,
        random_median,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::recon::config::CostParams;
    use crate::libs::recon::dtl::reconcile;
    use crate::libs::recon::input::Instance;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn check_optimal(text: &str, costs: CostParams) {
        let instance = Instance::parse(text).unwrap();
        let rec = reconcile(&instance, &costs).unwrap();
        let mprs = rec.graph.enumerate_mprs(10_000).unwrap();

        let total = |x: &Mpr| -> usize { mprs.iter().map(|y| x.distance(y, false)).sum() };
        let best = mprs.iter().map(total).min().unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let med = median(&rec.graph, &mut rng).unwrap();
        assert_eq!(total(&med.random_median), best);

        // every MPR of the median graph is a median, and no other MPR is
        let medians = med.graph.enumerate_mprs(10_000).unwrap();
        assert_eq!(BigInt::from(med.count.clone()), BigInt::from(medians.len()));
        for m in &mprs {
            assert_eq!(medians.contains(m), total(m) == best);
        }
    }

    #[test]
    fn test_median_is_optimal() {
        check_optimal(
            "(h1,h2)m1;\n((p1,p2)q1,p3)q0;\np1:h1\np2:h2\np3:h1\n",
            CostParams::new(0.0, 0.0, 0.0).unwrap(),
        );
        check_optimal(
            "((h1,h2)m1,(h3,h4)m2)m0;\n((p1,p2)q1,(p3,p4)q2)q0;\np1:h1\np2:h3\np3:h2\np4:h4\n",
            CostParams::new(1.0, 1.0, 1.0).unwrap(),
        );
        check_optimal(
            "((h1,h2)m1,(h3,h4)m2)m0;\n(((p1,p2)q2,p3)q1,p4)q0;\np1:h1\np2:h1\np3:h2\np4:h4\n",
            CostParams::new(1.0, 2.0, 0.5).unwrap(),
        );
    }

    #[test]
    fn test_median_single_mpr() {
        let instance = Instance::parse("(h1,h2)m1;\n(p1,p2)q1;\np1:h1\np2:h2\n").unwrap();
        let rec = reconcile(&instance, &CostParams::default()).unwrap();
        let med = median(&rec.graph, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(med.count, BigUint::from(1u32));
        assert_eq!(med.graph, rec.graph);
        // three events, each in the only MPR: 3 · (2 − 1)
        assert_eq!(med.score, BigInt::from(3));
    }

    #[test]
    fn test_median_empty_graph() {
        let err = median(&ReconGraph::empty(), &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(err.is_input());
    }
}
