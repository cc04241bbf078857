use super::config::{ClusterConfig, Scorer, SplitMode};
use super::diameter::pdv_between;
use super::error::{ReconError, Result};
use super::graph::{Event, MappingNode, ReconGraph};
use super::histogram::ratio;
use super::input::Instance;
use super::support::event_counts;
use num_bigint::BigUint;
use num_traits::Zero;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

/// A group of seed sub-graphs.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Indices into [`Clustering::seeds`], ascending
    pub seeds: Vec<usize>,
    pub count: BigUint,
    /// count / N(G)
    pub weight: f64,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct Clustering {
    /// The initial split; their MPR sets partition those of the input graph
    pub seeds: Vec<ReconGraph>,
    pub clusters: Vec<Cluster>,
    /// Σ weight·score over the clusters
    pub objective: f64,
    /// Number of merges performed
    pub iterations: usize,
    /// The split produced fewer than k seeds
    pub shortfall: bool,
}

impl Clustering {
    /// Union of a cluster's seed graphs.
    ///
    /// The union may contain MPRs mixing choices of different seeds; use the
    /// seeds themselves for exact membership.
    pub fn cluster_graph(&self, i: usize) -> ReconGraph {
        self.clusters[i]
            .seeds
            .iter()
            .fold(ReconGraph::empty(), |acc, &s| acc.union(&self.seeds[s]))
    }
}

/// A node present in every MPR that offers a choice, with its parasite depth.
///
/// Several roots split first, at depth 0. Otherwise the mandatory nodes are
/// walked from the root through single-event nodes and the shallowest
/// multi-event one wins, ties to the smaller node. Choices below that node
/// are left to the next pass over each of its parts.
fn split_point(instance: &Instance, graph: &ReconGraph) -> Option<(usize, Vec<ReconGraph>)> {
    let roots = graph.roots();
    if roots.len() > 1 {
        let parts = roots.iter().map(|r| graph.with_roots(&[*r])).collect();
        return Some((0, parts));
    }

    let parasite = instance.parasite();
    let mut best: Option<(usize, MappingNode)> = None;
    let mut seen: BTreeSet<MappingNode> = BTreeSet::new();
    let mut queue: VecDeque<MappingNode> = roots.iter().copied().collect();
    while let Some(m) = queue.pop_front() {
        if !seen.insert(m) {
            continue;
        }
        match graph.events_at(&m) {
            [single] => queue.extend(single.children()),
            [] => {}
            _ => {
                let key = (parasite.depth(m.parasite), m);
                if best.map_or(true, |b| key < b) {
                    best = Some(key);
                }
            }
        }
    }

    let (depth, node) = best?;
    let parts = graph
        .events_at(&node)
        .iter()
        .map(|e| graph.with_fixed_event(&node, e))
        .collect();
    Some((depth, parts))
}

/// Splits `graph` into seed sub-graphs whose MPR sets partition its own.
pub fn split_graph(
    instance: &Instance,
    graph: &ReconGraph,
    mode: SplitMode,
    max_splits: usize,
) -> Vec<ReconGraph> {
    let mut done: Vec<ReconGraph> = Vec::new();
    let mut queue: VecDeque<ReconGraph> = VecDeque::from([graph.clone()]);

    while let Some(g) = queue.pop_front() {
        let current = done.len() + queue.len() + 1;
        if let SplitMode::MprCount(n) = mode {
            if current >= n {
                done.push(g);
                continue;
            }
        }
        match split_point(instance, &g) {
            Some((depth, parts)) if current - 1 + parts.len() <= max_splits => {
                let allowed = match mode {
                    SplitMode::Depth(d) => depth < d,
                    SplitMode::MprCount(_) => true,
                };
                if allowed {
                    debug!("split at depth {} into {}", depth, parts.len());
                    queue.extend(parts);
                } else {
                    done.push(g);
                }
            }
            _ => done.push(g),
        }
    }

    done
}

/// Per-seed quantities the merge scores are computed from.
enum ScoreTable {
    /// Σ over ordered MPR pairs of the distance, for each pair of seeds
    Pdv(Vec<Vec<BigUint>>),
    /// Event counts of each seed
    Support(Vec<BTreeMap<(MappingNode, Event), BigUint>>),
}

impl ScoreTable {
    fn build(
        instance: &Instance,
        seeds: &[ReconGraph],
        config: &ClusterConfig,
    ) -> Result<Self> {
        match config.scorer {
            Scorer::Pdv => {
                let s = seeds.len();
                let pairs: Vec<(usize, usize)> = (0..s)
                    .flat_map(|i| (i..s).map(move |j| (i, j)))
                    .collect();
                let totals = pairs
                    .par_iter()
                    .map(|&(i, j)| {
                        pdv_between(instance, &seeds[i], &seeds[j], config.pdv.zero_loss)
                            .map(|h| h.total_distance())
                    })
                    .collect::<Result<Vec<_>>>()?;

                let mut table = vec![vec![BigUint::zero(); s]; s];
                for (&(i, j), t) in pairs.iter().zip(totals) {
                    table[i][j] = t.clone();
                    table[j][i] = t;
                }
                Ok(ScoreTable::Pdv(table))
            }
            Scorer::Support => Ok(ScoreTable::Support(
                seeds.iter().map(event_counts).collect(),
            )),
        }
    }

    /// Dispersion of the union of some seeds; lower is tighter.
    fn score(&self, members: &[usize], counts: &[BigUint]) -> f64 {
        let n: BigUint = members.iter().map(|&i| &counts[i]).sum();
        if n.is_zero() {
            return 0.0;
        }
        match self {
            ScoreTable::Pdv(table) => {
                let mut total = BigUint::zero();
                for &i in members {
                    for &j in members {
                        total += &table[i][j];
                    }
                }
                ratio(&total, &(&n * &n))
            }
            ScoreTable::Support(tables) => {
                let mut merged: BTreeMap<(MappingNode, Event), BigUint> = BTreeMap::new();
                for &i in members {
                    for (k, v) in &tables[i] {
                        *merged.entry(*k).or_default() += v;
                    }
                }
                if merged.is_empty() {
                    return 0.0;
                }
                let sum: f64 = merged.values().map(|c| ratio(c, &n)).sum();
                -(sum / merged.len() as f64)
            }
        }
    }
}

/// Splits the graph and merges the seeds agglomeratively into `k` clusters.
pub fn cluster(
    instance: &Instance,
    graph: &ReconGraph,
    config: &ClusterConfig,
) -> Result<Clustering> {
    config.validate()?;
    if graph.is_empty() {
        return Err(ReconError::Input("the graph has no MPR".to_string()));
    }

    let seeds = split_graph(instance, graph, config.mode, config.max_splits);
    let counts: Vec<BigUint> = seeds.iter().map(|g| g.count_mprs()).collect();
    let total: BigUint = counts.iter().sum();
    debug!("{} seeds over {} MPRs", seeds.len(), total);

    let shortfall = seeds.len() < config.k;
    if shortfall {
        warn!(
            "split produced {} seeds, fewer than k = {}",
            seeds.len(),
            config.k
        );
    }

    let table = ScoreTable::build(instance, &seeds, config)?;
    let weight = |members: &[usize]| -> f64 {
        let n: BigUint = members.iter().map(|&i| &counts[i]).sum();
        ratio(&n, &total)
    };

    let mut groups: Vec<Vec<usize>> = (0..seeds.len()).map(|i| vec![i]).collect();
    let mut scores: Vec<f64> = groups.iter().map(|g| table.score(g, &counts)).collect();
    let mut iterations = 0;

    while groups.len() > config.k {
        let mut pick: Option<(f64, usize, usize, f64)> = None;
        for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                let merged: Vec<usize> = groups[i].iter().chain(&groups[j]).copied().collect();
                let s = table.score(&merged, &counts);
                let delta = weight(&merged) * s
                    - weight(&groups[i]) * scores[i]
                    - weight(&groups[j]) * scores[j];
                if pick.map_or(true, |(d, ..)| delta < d) {
                    pick = Some((delta, i, j, s));
                }
            }
        }

        let (delta, i, j, s) =
            pick.ok_or_else(|| ReconError::Invariant("no pair left to merge".to_string()))?;
        let moved = groups.remove(j);
        scores.remove(j);
        groups[i].extend(moved);
        groups[i].sort_unstable();
        scores[i] = s;
        iterations += 1;
        debug!("merge {} + {}: delta {:.4}", i, j, delta);
    }

    let clusters: Vec<Cluster> = groups
        .into_iter()
        .zip(scores)
        .map(|(members, score)| Cluster {
            count: members.iter().map(|&i| &counts[i]).sum(),
            weight: weight(&members),
            seeds: members,
            score,
        })
        .collect();
    let objective = clusters.iter().map(|c| c.weight * c.score).sum();

    Ok(Clustering {
        seeds,
        clusters,
        objective,
        iterations,
        shortfall,
    })
}
