//! Pairwise-distance vectors between the MPRs of two reconciliation graphs.
//!
//! The distance between two MPRs is the size of the symmetric difference of
//! their (mapping node, event) sets. It splits over parasite nodes: for each
//! p, both MPRs walk a chain of losses down the host tree and end with one
//! terminal event. Two chains that start at comparable hosts can share a
//! prefix; once they part ways nothing below is shared. The pair DP follows
//! both chains with two cursors and convolves the children's histograms when
//! both chains have ended.

use super::config::PdvOptions;
use super::error::{ReconError, Result};
use super::graph::{Event, MappingNode, ReconGraph};
use super::histogram::{Density, Histogram};
use super::input::Instance;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Cursor {
    /// The event at this node is still to be chosen
    At(MappingNode),
    /// The chain ended with this terminal event
    Done(MappingNode, Event),
}

impl Cursor {
    fn after(node: MappingNode, event: &Event) -> Cursor {
        match (event.is_loss(), event.left) {
            (true, Some(child)) => Cursor::At(child),
            _ => Cursor::Done(node, *event),
        }
    }
}

struct PairDp<'a> {
    instance: &'a Instance,
    g1: &'a ReconGraph,
    g2: &'a ReconGraph,
    zero_loss: bool,
    /// Finished parasite levels: start nodes in G1 × G2 → histogram
    starts: HashMap<(MappingNode, MappingNode), Histogram>,
    /// States of the level being filled
    memo: HashMap<(Cursor, Cursor, bool), Histogram>,
}

impl<'a> PairDp<'a> {
    fn weight(&self, event: &Event) -> u64 {
        if self.zero_loss && event.is_loss() {
            0
        } else {
            1
        }
    }

    fn run(&mut self) -> Result<Histogram> {
        let parasite = self.instance.parasite();
        for p in parasite.postorder() {
            let g1 = self.g1;
            let g2 = self.g2;
            for (m1, _) in g1.nodes_of(p) {
                for (m2, _) in g2.nodes_of(p) {
                    let h = self.eval(Cursor::At(*m1), Cursor::At(*m2), false)?;
                    self.starts.insert((*m1, *m2), h);
                }
            }
            self.memo.clear();
        }

        let mut total = Histogram::new();
        for r1 in self.g1.roots() {
            for r2 in self.g2.roots() {
                if let Some(h) = self.starts.get(&(*r1, *r2)) {
                    total.add_assign(h);
                }
            }
        }
        Ok(total)
    }

    fn eval(&mut self, c1: Cursor, c2: Cursor, diverged: bool) -> Result<Histogram> {
        let key = (c1, c2, diverged);
        if let Some(h) = self.memo.get(&key) {
            return Ok(h.clone());
        }

        let (g1, g2) = (self.g1, self.g2);
        let mut acc = Histogram::new();
        match (c1, c2) {
            (Cursor::Done(_, e1), Cursor::Done(_, e2)) => {
                acc = self.join(&e1, &e2)?;
            }
            (Cursor::At(m1), _) if diverged => {
                for e in g1.events_at(&m1) {
                    let sub = self.eval(Cursor::after(m1, e), c2, true)?;
                    acc.add_assign(&sub.shift(self.weight(e)));
                }
            }
            (_, Cursor::At(m2)) if diverged => {
                for e in g2.events_at(&m2) {
                    let sub = self.eval(c1, Cursor::after(m2, e), true)?;
                    acc.add_assign(&sub.shift(self.weight(e)));
                }
            }
            (Cursor::At(m1), Cursor::At(m2)) => {
                let host = self.instance.host();
                if m1 == m2 {
                    for e1 in g1.events_at(&m1) {
                        for e2 in g2.events_at(&m2) {
                            let sub = if e1 == e2 {
                                self.eval(Cursor::after(m1, e1), Cursor::after(m2, e2), false)?
                            } else {
                                self.eval(Cursor::after(m1, e1), Cursor::after(m2, e2), true)?
                                    .shift(self.weight(e1) + self.weight(e2))
                            };
                            acc.add_assign(&sub);
                        }
                    }
                } else if host.is_ancestor(m1.host, m2.host) {
                    // side 1 walks down towards m2
                    for e in g1.events_at(&m1) {
                        let next = Cursor::after(m1, e);
                        let sub = self.eval(next, c2, matches!(next, Cursor::Done(..)))?;
                        acc.add_assign(&sub.shift(self.weight(e)));
                    }
                } else if host.is_ancestor(m2.host, m1.host) {
                    for e in g2.events_at(&m2) {
                        let next = Cursor::after(m2, e);
                        let sub = self.eval(c1, next, matches!(next, Cursor::Done(..)))?;
                        acc.add_assign(&sub.shift(self.weight(e)));
                    }
                } else {
                    acc = self.eval(c1, c2, true)?;
                }
            }
            _ => {
                return Err(ReconError::Invariant(format!(
                    "undiverged cursor pair {:?} / {:?}",
                    c1, c2
                )))
            }
        }

        self.memo.insert(key, acc.clone());
        Ok(acc)
    }

    /// Both chains ended: combine the children's start pairs.
    fn join(&self, e1: &Event, e2: &Event) -> Result<Histogram> {
        let mut acc = Histogram::unit();
        let kids1: Vec<MappingNode> = e1.children().collect();
        for a1 in kids1 {
            let a2 = e2.child_for(a1.parasite).ok_or_else(|| {
                ReconError::Invariant(format!("events {:?} and {:?} split differently", e1, e2))
            })?;
            let sub = self.starts.get(&(a1, a2)).ok_or_else(|| {
                ReconError::Invariant(format!("missing start pair {:?} / {:?}", a1, a2))
            })?;
            acc = acc.convolve(sub);
        }
        Ok(acc)
    }
}

/// Histogram of distances over ordered pairs (M₁ ∈ G₁, M₂ ∈ G₂).
pub fn pdv_between(
    instance: &Instance,
    g1: &ReconGraph,
    g2: &ReconGraph,
    zero_loss: bool,
) -> Result<Histogram> {
    let mut dp = PairDp {
        instance,
        g1,
        g2,
        zero_loss,
        starts: HashMap::new(),
        memo: HashMap::new(),
    };
    let h = dp.run()?;
    debug!(
        "pdv over {} start pairs, {} distinct distances",
        dp.starts.len(),
        h.len()
    );
    Ok(h)
}

/// The PDV of a graph with itself. Self-pairs are included, so the 0 key
/// holds N(G) and the counts add up to N(G)².
pub fn pdv(instance: &Instance, graph: &ReconGraph, zero_loss: bool) -> Result<Histogram> {
    pdv_between(instance, graph, graph, zero_loss)
}

/// PDV with the options applied; `normalize` yields a [`Density`].
pub fn pdv_with_options(
    instance: &Instance,
    graph: &ReconGraph,
    opts: &PdvOptions,
) -> Result<Density> {
    let h = pdv(instance, graph, opts.zero_loss)?;
    Ok(if opts.normalize {
        normalize(instance, &h)
    } else {
        h.to_density()
    })
}

/// Keys divided by twice the number of internal parasite nodes.
pub fn normalize(instance: &Instance, hist: &Histogram) -> Density {
    let divisor = (2 * instance.parasite().internal_count()).max(1);
    hist.rescale_x(divisor as f64)
}

/// Mean pairwise distance read off a PDV, without a second DP.
pub fn score_nodp(hist: &Histogram) -> f64 {
    hist.mean().unwrap_or(0.0)
}

/// Largest distance between two MPRs.
pub fn diameter(hist: &Histogram) -> u64 {
    hist.max_key().unwrap_or(0)
}
