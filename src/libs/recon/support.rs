use super::graph::{Event, MappingNode, ReconGraph};
use super::histogram::ratio;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::collections::BTreeMap;

/// How many MPRs of a graph use one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSupport {
    pub node: MappingNode,
    pub event: Event,
    pub count: BigUint,
    /// count / N(G)
    pub support: f64,
}

/// Number of MPRs containing each (mapping node, event).
///
/// Two passes: N(m) bottom-up, then the number of upper contexts of every
/// node top-down, up(root) = 1 and up(c) += up(m)·∏ N(siblings of c).
pub fn event_counts(graph: &ReconGraph) -> BTreeMap<(MappingNode, Event), BigUint> {
    let counts = graph.node_counts();

    let mut up: BTreeMap<MappingNode, BigUint> = BTreeMap::new();
    for r in graph.roots() {
        *up.entry(*r).or_default() += BigUint::one();
    }

    let mut result = BTreeMap::new();
    // children are smaller than parents, so reverse order is top-down
    for (m, events) in graph.nodes().rev() {
        let up_m = match up.get(m) {
            Some(u) if !u.is_zero() => u.clone(),
            _ => continue,
        };
        for e in events {
            let kids: Vec<MappingNode> = e.children().collect();
            let below = kids
                .iter()
                .fold(BigUint::one(), |acc, c| acc * &counts[c]);
            for (i, c) in kids.iter().enumerate() {
                let siblings = kids
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .fold(BigUint::one(), |acc, (_, s)| acc * &counts[s]);
                *up.entry(*c).or_default() += &up_m * siblings;
            }
            result.insert((*m, *e), &up_m * below);
        }
    }
    result
}

/// Support of every event, in node then event order.
pub fn event_support(graph: &ReconGraph) -> Vec<EventSupport> {
    let total = graph.count_mprs();
    event_counts(graph)
        .into_iter()
        .map(|((node, event), count)| EventSupport {
            node,
            event,
            support: ratio(&count, &total),
            count,
        })
        .collect()
}

/// Mean support over the distinct events of a graph; 0 for an empty graph.
pub fn mean_support(graph: &ReconGraph) -> f64 {
    let table = event_support(graph);
    if table.is_empty() {
        return 0.0;
    }
    table.iter().map(|s| s.support).sum::<f64>() / table.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::recon::config::CostParams;
    use crate::libs::recon::dtl::reconcile;
    use crate::libs::recon::input::Instance;

    fn brute_counts(graph: &ReconGraph) -> BTreeMap<(MappingNode, Event), BigUint> {
        let mut counts: BTreeMap<(MappingNode, Event), BigUint> = BTreeMap::new();
        for mpr in graph.enumerate_mprs(10_000).unwrap() {
            for (m, e) in mpr.events() {
                *counts.entry((*m, *e)).or_default() += BigUint::one();
            }
        }
        counts
    }

    #[test]
    fn test_counts_match_enumeration() {
        for (text, d, t, l) in [
            ("(h1,h2)m1;\n((p1,p2)q1,p3)q0;\np1:h1\np2:h2\np3:h1\n", 0.0, 0.0, 0.0),
            (
                "((h1,h2)m1,(h3,h4)m2)m0;\n((p1,p2)q1,(p3,p4)q2)q0;\np1:h1\np2:h3\np3:h2\np4:h4\n",
                1.0,
                1.0,
                1.0,
            ),
        ] {
            let instance = Instance::parse(text).unwrap();
            let rec = reconcile(&instance, &CostParams::new(d, t, l).unwrap()).unwrap();
            assert_eq!(event_counts(&rec.graph), brute_counts(&rec.graph));
        }
    }

    #[test]
    fn test_support_values() {
        let instance =
            Instance::parse("(h1,h2)m1;\n((p1,p2)q1,p3)q0;\np1:h1\np2:h2\np3:h1\n").unwrap();
        let rec = reconcile(&instance, &CostParams::default()).unwrap();
        let table = event_support(&rec.graph);

        // the root has two alternatives used by one MPR each
        let root = rec.roots[0];
        let at_root: Vec<f64> = table
            .iter()
            .filter(|s| s.node == root)
            .map(|s| s.support)
            .collect();
        assert_eq!(at_root, vec![0.5, 0.5]);

        // leaves are in every MPR
        let p1 = instance.parasite().index_of("p1").unwrap();
        let h1 = instance.host().index_of("h1").unwrap();
        let leaf = table
            .iter()
            .find(|s| s.node == MappingNode::new(p1, h1))
            .unwrap();
        assert_eq!(leaf.support, 1.0);
        assert!(table.iter().all(|s| s.support > 0.0 && s.support <= 1.0));
        assert!(mean_support(&rec.graph) > 0.5);
        assert_eq!(mean_support(&ReconGraph::empty()), 0.0);
    }
}
