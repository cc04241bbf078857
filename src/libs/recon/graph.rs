use super::config::CostParams;
use super::error::{ReconError, Result};
use fixedbitset::FixedBitSet;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// "Parasite p lives at host h", as post-order indices into the two trees.
///
/// The derived order (parasite first, then host) is a topological order of
/// every reconciliation graph: each event points to strictly smaller nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappingNode {
    pub parasite: usize,
    pub host: usize,
}

impl MappingNode {
    pub fn new(parasite: usize, host: usize) -> Self {
        Self { parasite, host }
    }
}

/// Event kinds, declared in canonical order `S < D < T < L < C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Speciation,
    Duplication,
    Transfer,
    Loss,
    Contemporaneous,
}

impl EventKind {
    pub fn tag(self) -> char {
        match self {
            EventKind::Speciation => 'S',
            EventKind::Duplication => 'D',
            EventKind::Transfer => 'T',
            EventKind::Loss => 'L',
            EventKind::Contemporaneous => 'C',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'S' => Some(EventKind::Speciation),
            'D' => Some(EventKind::Duplication),
            'T' => Some(EventKind::Transfer),
            'L' => Some(EventKind::Loss),
            'C' => Some(EventKind::Contemporaneous),
            _ => None,
        }
    }
}

/// An event node. `None` children stand for the absent mapping (⊥, ⊥).
///
/// For `T`, `left` stays on the parent's host and `right` is the transferred
/// lineage. `L` only uses `left`; `C` has no children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Event {
    pub kind: EventKind,
    pub left: Option<MappingNode>,
    pub right: Option<MappingNode>,
}

impl Event {
    pub fn speciation(left: MappingNode, right: MappingNode) -> Self {
        Self {
            kind: EventKind::Speciation,
            left: Some(left),
            right: Some(right),
        }
    }

    pub fn duplication(left: MappingNode, right: MappingNode) -> Self {
        Self {
            kind: EventKind::Duplication,
            left: Some(left),
            right: Some(right),
        }
    }

    pub fn transfer(stay: MappingNode, jump: MappingNode) -> Self {
        Self {
            kind: EventKind::Transfer,
            left: Some(stay),
            right: Some(jump),
        }
    }

    pub fn loss(child: MappingNode) -> Self {
        Self {
            kind: EventKind::Loss,
            left: Some(child),
            right: None,
        }
    }

    pub fn contemporaneous() -> Self {
        Self {
            kind: EventKind::Contemporaneous,
            left: None,
            right: None,
        }
    }

    pub fn is_loss(&self) -> bool {
        self.kind == EventKind::Loss
    }

    pub fn children(&self) -> impl Iterator<Item = MappingNode> {
        self.left.into_iter().chain(self.right)
    }

    /// The child mapping node carrying the given parasite node.
    pub fn child_for(&self, parasite: usize) -> Option<MappingNode> {
        self.children().find(|c| c.parasite == parasite)
    }

    pub fn cost(&self, costs: &CostParams) -> f64 {
        match self.kind {
            EventKind::Speciation | EventKind::Contemporaneous => 0.0,
            EventKind::Duplication => costs.duplication,
            EventKind::Transfer => costs.transfer,
            EventKind::Loss => costs.loss,
        }
    }
}

/// One reconciliation: exactly one event per reached mapping node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mpr {
    root: MappingNode,
    events: BTreeMap<MappingNode, Event>,
}

impl Mpr {
    pub fn root(&self) -> MappingNode {
        self.root
    }

    pub fn event_at(&self, node: &MappingNode) -> Option<&Event> {
        self.events.get(node)
    }

    /// (mapping node, event) pairs in node order.
    pub fn events(&self) -> impl Iterator<Item = (&MappingNode, &Event)> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn contains(&self, node: &MappingNode, event: &Event) -> bool {
        self.events.get(node) == Some(event)
    }

    pub fn cost(&self, costs: &CostParams) -> f64 {
        self.events.values().map(|e| e.cost(costs)).sum()
    }

    /// |E(self) △ E(other)|, optionally ignoring loss events.
    pub fn distance(&self, other: &Mpr, zero_loss: bool) -> usize {
        let only_in = |a: &Mpr, b: &Mpr| {
            a.events
                .iter()
                .filter(|(m, e)| !(zero_loss && e.is_loss()) && !b.contains(m, e))
                .count()
        };
        only_in(self, other) + only_in(other, self)
    }

    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.values().filter(|e| e.kind == kind).count()
    }
}

/// The union of all optimal reconciliations: mapping node → events.
///
/// Only nodes reachable from the roots are stored. Event lists are sorted in
/// canonical order and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconGraph {
    nodes: BTreeMap<MappingNode, Vec<Event>>,
    roots: Vec<MappingNode>,
}

impl ReconGraph {
    /// Builds and validates a graph. Event lists and roots are sorted and deduplicated.
    pub fn from_parts(
        roots: Vec<MappingNode>,
        mut nodes: BTreeMap<MappingNode, Vec<Event>>,
    ) -> Result<Self> {
        for events in nodes.values_mut() {
            events.sort();
            events.dedup();
        }
        let mut roots = roots;
        roots.sort();
        roots.dedup();

        let graph = Self { nodes, roots };
        graph.validate()?;
        Ok(graph)
    }

    /// Graph with no MPR at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks closure and acyclicity: every root and every child is a node with
    /// at least one event, and children are strictly smaller than their parent.
    pub fn validate(&self) -> Result<()> {
        for r in &self.roots {
            if !self.nodes.contains_key(r) {
                return Err(ReconError::Invariant(format!("root {:?} is not a node", r)));
            }
        }
        for (m, events) in &self.nodes {
            if events.is_empty() {
                return Err(ReconError::Invariant(format!("node {:?} has no event", m)));
            }
            for e in events {
                for c in e.children() {
                    if c >= *m {
                        return Err(ReconError::Invariant(format!(
                            "event {:?} at {:?} points upwards",
                            e, m
                        )));
                    }
                    if !self.nodes.contains_key(&c) {
                        return Err(ReconError::Invariant(format!(
                            "child {:?} of {:?} is not a node",
                            c, m
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn roots(&self) -> &[MappingNode] {
        &self.roots
    }

    /// Events at a mapping node; empty if the node is not in the graph.
    pub fn events_at(&self, node: &MappingNode) -> &[Event] {
        self.nodes.get(node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, node: &MappingNode) -> bool {
        self.nodes.contains_key(node)
    }

    /// Mapping nodes with their events, in topological (children first) order.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = (&MappingNode, &Vec<Event>)> {
        self.nodes.iter()
    }

    /// Mapping nodes of one parasite node, by host index.
    pub fn nodes_of(&self, parasite: usize) -> impl Iterator<Item = (&MappingNode, &Vec<Event>)> {
        self.nodes
            .range(MappingNode::new(parasite, 0)..MappingNode::new(parasite + 1, 0))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.nodes.values().map(|v| v.len()).sum()
    }

    /// N(m) for every node: the number of sub-reconciliations rooted at m.
    pub fn node_counts(&self) -> BTreeMap<MappingNode, BigUint> {
        let mut counts: BTreeMap<MappingNode, BigUint> = BTreeMap::new();
        for (m, events) in &self.nodes {
            let mut n = BigUint::zero();
            for e in events {
                n += e
                    .children()
                    .fold(BigUint::one(), |acc, c| acc * &counts[&c]);
            }
            counts.insert(*m, n);
        }
        counts
    }

    /// Total number of MPRs.
    pub fn count_mprs(&self) -> BigUint {
        let counts = self.node_counts();
        self.count_from(&self.roots, &counts)
    }

    /// Number of MPRs rooted at the given roots, with precomputed node counts.
    pub fn count_from(
        &self,
        roots: &[MappingNode],
        counts: &BTreeMap<MappingNode, BigUint>,
    ) -> BigUint {
        roots
            .iter()
            .filter_map(|r| counts.get(r))
            .fold(BigUint::zero(), |acc, n| acc + n)
    }

    /// Draws one MPR uniformly at random. `None` for an empty graph.
    pub fn sample_uniform_mpr<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Mpr> {
        MprSampler::new(self).sample(rng)
    }

    /// Every MPR of the graph, in canonical order.
    ///
    /// Fails with `ResourceExhaustion` when there are more than `ceiling`.
    pub fn enumerate_mprs(&self, ceiling: u64) -> Result<Vec<Mpr>> {
        let total = self.count_mprs();
        if total > BigUint::from(ceiling) {
            return Err(ReconError::ResourceExhaustion {
                count: total.to_string(),
                ceiling,
            });
        }

        // sub-reconciliations per node, bottom-up
        let mut subs: BTreeMap<MappingNode, Vec<BTreeMap<MappingNode, Event>>> = BTreeMap::new();
        for (m, events) in &self.nodes {
            let mut list = Vec::new();
            for e in events {
                let mut partial = vec![BTreeMap::from([(*m, *e)])];
                for c in e.children() {
                    let mut next = Vec::with_capacity(partial.len() * subs[&c].len());
                    for p in &partial {
                        for s in &subs[&c] {
                            let mut merged = p.clone();
                            merged.extend(s.iter().map(|(k, v)| (*k, *v)));
                            next.push(merged);
                        }
                    }
                    partial = next;
                }
                list.extend(partial);
            }
            subs.insert(*m, list);
        }

        let mut mprs = Vec::new();
        for r in &self.roots {
            for events in &subs[r] {
                mprs.push(Mpr {
                    root: *r,
                    events: events.clone(),
                });
            }
        }
        debug!("enumerated {} MPRs", mprs.len());
        Ok(mprs)
    }

    /// The sub-graph made of exactly one MPR.
    pub fn project(&self, mpr: &Mpr) -> ReconGraph {
        let nodes = mpr.events.iter().map(|(m, e)| (*m, vec![*e])).collect();
        ReconGraph {
            nodes,
            roots: vec![mpr.root],
        }
    }

    /// The sub-graph reachable from `roots` through events accepted by `allowed`.
    ///
    /// Nodes left without a complete event are dropped together with every
    /// event leading to them, so the result is closed.
    pub fn restrict<F>(&self, roots: &[MappingNode], allowed: F) -> ReconGraph
    where
        F: Fn(&MappingNode, &Event) -> bool,
    {
        // reachable through allowed events
        let mut reached: BTreeSet<MappingNode> = BTreeSet::new();
        let mut stack: Vec<MappingNode> = roots
            .iter()
            .filter(|r| self.nodes.contains_key(r))
            .copied()
            .collect();
        while let Some(m) = stack.pop() {
            if !reached.insert(m) {
                continue;
            }
            for e in self.events_at(&m).iter().filter(|e| allowed(&m, e)) {
                stack.extend(e.children().filter(|c| !reached.contains(c)));
            }
        }

        // viable bottom-up: some allowed event whose children are all viable
        let mut kept: BTreeMap<MappingNode, Vec<Event>> = BTreeMap::new();
        for m in &reached {
            let events: Vec<Event> = self
                .events_at(m)
                .iter()
                .filter(|e| allowed(m, e) && e.children().all(|c| kept.contains_key(&c)))
                .copied()
                .collect();
            if !events.is_empty() {
                kept.insert(*m, events);
            }
        }

        let roots: Vec<MappingNode> = roots
            .iter()
            .filter(|r| kept.contains_key(r))
            .copied()
            .collect();
        Self::reachable_part(roots, kept)
    }

    /// Drops nodes of `nodes` that cannot be reached from `roots`.
    fn reachable_part(
        mut roots: Vec<MappingNode>,
        nodes: BTreeMap<MappingNode, Vec<Event>>,
    ) -> ReconGraph {
        roots.sort();
        roots.dedup();

        let index: BTreeMap<MappingNode, usize> =
            nodes.keys().enumerate().map(|(i, m)| (*m, i)).collect();
        let mut seen = FixedBitSet::with_capacity(index.len());
        let mut stack: Vec<MappingNode> = roots.clone();
        while let Some(m) = stack.pop() {
            let i = index[&m];
            if seen.contains(i) {
                continue;
            }
            seen.insert(i);
            for e in &nodes[&m] {
                stack.extend(e.children());
            }
        }

        let nodes = nodes
            .into_iter()
            .filter(|(m, _)| seen.contains(index[m]))
            .collect();
        ReconGraph { nodes, roots }
    }

    /// Node-wise union of two graphs over the same instance.
    pub fn union(&self, other: &ReconGraph) -> ReconGraph {
        let mut nodes = self.nodes.clone();
        for (m, events) in &other.nodes {
            let entry = nodes.entry(*m).or_default();
            entry.extend(events.iter().copied());
            entry.sort();
            entry.dedup();
        }
        let mut roots: Vec<MappingNode> =
            self.roots.iter().chain(other.roots.iter()).copied().collect();
        roots.sort();
        roots.dedup();
        ReconGraph { nodes, roots }
    }

    /// Copy of the graph with the given roots only, unreachable nodes pruned.
    pub fn with_roots(&self, roots: &[MappingNode]) -> ReconGraph {
        let roots = roots
            .iter()
            .filter(|r| self.nodes.contains_key(r))
            .copied()
            .collect();
        Self::reachable_part(roots, self.nodes.clone())
    }

    /// Copy of the graph where `node` keeps only `event`, unreachable nodes pruned.
    pub fn with_fixed_event(&self, node: &MappingNode, event: &Event) -> ReconGraph {
        let mut nodes = self.nodes.clone();
        nodes.insert(*node, vec![*event]);
        Self::reachable_part(self.roots.clone(), nodes)
    }
}

/// Uniform MPR sampler holding the node counts of one graph.
#[derive(Debug)]
pub struct MprSampler<'a> {
    graph: &'a ReconGraph,
    counts: BTreeMap<MappingNode, BigUint>,
    total: BigUint,
}

impl<'a> MprSampler<'a> {
    pub fn new(graph: &'a ReconGraph) -> Self {
        let counts = graph.node_counts();
        let total = graph.count_from(graph.roots(), &counts);
        Self {
            graph,
            counts,
            total,
        }
    }

    /// Picks a root with probability N(r)/N, then descends choosing each
    /// event with probability ∏N(children)/N(m).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Mpr> {
        if self.total.is_zero() {
            return None;
        }

        let mut x = rng.gen_biguint_below(&self.total);
        let mut root = None;
        for r in self.graph.roots() {
            let n = &self.counts[r];
            if &x < n {
                root = Some(*r);
                break;
            }
            x -= n;
        }
        let root = root?;

        let mut events = BTreeMap::new();
        let mut stack = vec![root];
        while let Some(m) = stack.pop() {
            let mut x = rng.gen_biguint_below(&self.counts[&m]);
            for e in self.graph.events_at(&m) {
                let w = e
                    .children()
                    .fold(BigUint::one(), |acc, c| acc * &self.counts[&c]);
                if x < w {
                    events.insert(m, *e);
                    stack.extend(e.children());
                    break;
                }
                x -= w;
            }
        }

        Some(Mpr { root, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn m(p: usize, h: usize) -> MappingNode {
        MappingNode::new(p, h)
    }

    // root (2,2): S -> (0,0),(1,1) | D -> (0,2),(1,2)
    // (0,2): L -> (0,0) | L -> (0,1);  (1,2): L -> (1,1)
    // three MPRs in total
    pub(crate) fn toy_graph() -> ReconGraph {
        let mut nodes = BTreeMap::new();
        nodes.insert(m(0, 0), vec![Event::contemporaneous()]);
        nodes.insert(m(0, 1), vec![Event::contemporaneous()]);
        nodes.insert(m(1, 1), vec![Event::contemporaneous()]);
        nodes.insert(m(0, 2), vec![Event::loss(m(0, 1)), Event::loss(m(0, 0))]);
        nodes.insert(m(1, 2), vec![Event::loss(m(1, 1))]);
        nodes.insert(
            m(2, 2),
            vec![
                Event::duplication(m(0, 2), m(1, 2)),
                Event::speciation(m(0, 0), m(1, 1)),
            ],
        );
        ReconGraph::from_parts(vec![m(2, 2)], nodes).unwrap()
    }

    #[test]
    fn test_canonical_event_order() {
        let g = toy_graph();
        let kinds: Vec<_> = g.events_at(&m(2, 2)).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Speciation, EventKind::Duplication]);
        assert_eq!(g.events_at(&m(0, 2))[0], Event::loss(m(0, 0)));
        assert!(EventKind::Loss < EventKind::Contemporaneous);
        assert_eq!(EventKind::from_tag('T'), Some(EventKind::Transfer));
        assert_eq!(EventKind::Transfer.tag(), 'T');
    }

    #[test]
    fn test_validate_closure() {
        let mut nodes = BTreeMap::new();
        nodes.insert(m(1, 1), vec![Event::loss(m(1, 0))]);
        let err = ReconGraph::from_parts(vec![m(1, 1)], nodes).unwrap_err();
        assert!(matches!(err, ReconError::Invariant(_)));

        let mut nodes = BTreeMap::new();
        nodes.insert(m(1, 1), vec![]);
        assert!(ReconGraph::from_parts(vec![m(1, 1)], nodes).is_err());

        // upward edge
        let mut nodes = BTreeMap::new();
        nodes.insert(m(0, 0), vec![Event::loss(m(0, 1))]);
        nodes.insert(m(0, 1), vec![Event::contemporaneous()]);
        assert!(ReconGraph::from_parts(vec![m(0, 0)], nodes).is_err());
    }

    #[test]
    fn test_counts() {
        let g = toy_graph();
        let counts = g.node_counts();
        assert_eq!(counts[&m(0, 2)], BigUint::from(2u32));
        assert_eq!(counts[&m(2, 2)], BigUint::from(3u32));
        assert_eq!(g.count_mprs(), BigUint::from(3u32));
        assert_eq!(g.event_count(), 8);
    }

    #[test]
    fn test_enumerate() {
        let g = toy_graph();
        let mprs = g.enumerate_mprs(100).unwrap();
        assert_eq!(mprs.len(), 3);
        let distinct: BTreeSet<_> = mprs.iter().cloned().collect();
        assert_eq!(distinct.len(), 3);

        let sizes: Vec<_> = mprs.iter().map(|x| x.len()).collect();
        assert_eq!(sizes, vec![3, 5, 5]);

        match g.enumerate_mprs(2) {
            Err(ReconError::ResourceExhaustion { count, ceiling }) => {
                assert_eq!(count, "3");
                assert_eq!(ceiling, 2);
            }
            other => panic!("expected ResourceExhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_distance() {
        let g = toy_graph();
        let mprs = g.enumerate_mprs(100).unwrap();
        // S-MPR vs D-MPRs: S,C,C against D,L,L,C,C; the C at (1,1) is shared
        assert_eq!(mprs[0].distance(&mprs[0], false), 0);
        assert_eq!(mprs[1].distance(&mprs[2], false), 4);
        assert_eq!(mprs[1].distance(&mprs[2], true), 2);
    }

    #[test]
    fn test_project_and_restrict() {
        let g = toy_graph();
        let mprs = g.enumerate_mprs(100).unwrap();
        let single = g.project(&mprs[1]);
        assert_eq!(single.count_mprs(), BigUint::one());
        assert!(single.validate().is_ok());

        // forbid the S event: only the two D-MPRs remain
        let no_s = g.restrict(g.roots(), |_, e| e.kind != EventKind::Speciation);
        assert_eq!(no_s.count_mprs(), BigUint::from(2u32));
        assert!(no_s.validate().is_ok());
        assert!(!no_s.contains(&m(1, 1)) || no_s.contains(&m(1, 2)));

        // forbid the only loss below (1,2): D becomes incomplete
        let no_l = g.restrict(g.roots(), |n, _| *n != m(1, 2));
        assert_eq!(no_l.count_mprs(), BigUint::one());
        assert!(!no_l.contains(&m(0, 2)));
        assert!(no_l.validate().is_ok());

        let fixed = g.with_fixed_event(&m(0, 2), &Event::loss(m(0, 1)));
        assert_eq!(fixed.count_mprs(), BigUint::from(2u32));

        // no_l lacks (0,2), so only the L event survives there
        let union = no_l.union(&fixed);
        assert_eq!(union.count_mprs(), BigUint::from(2u32));
        assert!(union.validate().is_ok());

        // the S-MPR together with the two D-MPRs rebuilds the whole graph
        let s_mpr = mprs
            .iter()
            .find(|mpr| mpr.events.values().any(|e| e.kind == EventKind::Speciation))
            .unwrap();
        let whole = no_s.union(&g.project(s_mpr));
        assert_eq!(whole.count_mprs(), BigUint::from(3u32));
        assert_eq!(whole.enumerate_mprs(100).unwrap().len(), 3);
    }

    #[test]
    fn test_uniform_sampling() {
        let g = toy_graph();
        let mut rng = StdRng::seed_from_u64(42);
        let mut freq: HashMap<Mpr, usize> = HashMap::new();
        let n = 3000;
        for _ in 0..n {
            *freq.entry(g.sample_uniform_mpr(&mut rng).unwrap()).or_insert(0) += 1;
        }
        assert_eq!(freq.len(), 3);
        // chi-square with 2 degrees of freedom, p = 0.001 critical value 13.82
        let expected = n as f64 / 3.0;
        let chi2: f64 = freq
            .values()
            .map(|&o| (o as f64 - expected).powi(2) / expected)
            .sum();
        assert!(chi2 < 13.82, "chi2 = {}", chi2);
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let g = toy_graph();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| g.sample_uniform_mpr(&mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
        assert!(ReconGraph::empty().sample_uniform_mpr(&mut StdRng::seed_from_u64(0)).is_none());
    }
}
