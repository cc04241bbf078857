use super::config::CostParams;
use super::error::{ReconError, Result};
use super::graph::{Event, MappingNode, ReconGraph};
use super::input::Instance;
use super::tree::RecTree;
use fixedbitset::FixedBitSet;
use num_bigint::BigUint;
use std::collections::BTreeMap;
use tracing::debug;

/// Relative tolerance used when comparing real-valued costs.
pub const COST_EPSILON: f64 = 1e-9;

/// `a` and `b` are the same cost up to [`COST_EPSILON`].
pub fn cost_eq(a: f64, b: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= COST_EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Output of the DTL dynamic program.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub graph: ReconGraph,
    /// Minimum total cost
    pub cost: f64,
    /// Number of MPRs
    pub count: BigUint,
    /// Mapping nodes of the parasite root achieving `cost`
    pub roots: Vec<MappingNode>,
}

/// The A and C tables plus per-node best-transfer rows, indexed `p * nh + h`.
struct Tables {
    nh: usize,
    a: Vec<f64>,
    c: Vec<f64>,
    best: Vec<f64>,
}

impl Tables {
    fn at(&self, p: usize, h: usize) -> usize {
        p * self.nh + h
    }

    fn a(&self, p: usize, h: usize) -> f64 {
        self.a[self.at(p, h)]
    }

    fn c(&self, p: usize, h: usize) -> f64 {
        self.c[self.at(p, h)]
    }

    fn best(&self, p: usize, h: usize) -> f64 {
        self.best[self.at(p, h)]
    }

    fn row_min(&self, p: usize) -> f64 {
        self.c[p * self.nh..(p + 1) * self.nh]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }
}

/// Computes all MPRs of `instance` under `costs`.
///
/// ```
/// use cophy::libs::recon::{reconcile, CostParams, Instance};
///
/// let instance = Instance::parse("(h1,h2)m1;\n(p1,p2)q1;\np1:h1\np2:h2\n").unwrap();
/// let rec = reconcile(&instance, &CostParams::default()).unwrap();
/// assert_eq!(rec.cost, 0.0);
/// assert_eq!(rec.count.to_string(), "1");
/// ```
pub fn reconcile(instance: &Instance, costs: &CostParams) -> Result<Reconciliation> {
    reconcile_with_cancel(instance, costs, || false)
}

/// Like [`reconcile`], polling `cancel` before each parasite node.
pub fn reconcile_with_cancel<F>(
    instance: &Instance,
    costs: &CostParams,
    cancel: F,
) -> Result<Reconciliation>
where
    F: Fn() -> bool,
{
    let tables = fill_tables(instance, costs, &cancel)?;
    let (cost, roots) = best_roots(instance, &tables)?;
    let graph = extract_graph(instance, costs, &tables, &roots)?;
    let count = graph.count_mprs();

    debug!(
        "reconciled: cost {}, {} roots, {} nodes, {} events, {} MPRs",
        cost,
        roots.len(),
        graph.len(),
        graph.event_count(),
        count
    );

    Ok(Reconciliation {
        graph,
        cost,
        count,
        roots,
    })
}

/// Only the optimal cost, skipping graph extraction.
pub fn min_cost(instance: &Instance, costs: &CostParams) -> Result<f64> {
    let tables = fill_tables(instance, costs, &|| false)?;
    let (cost, _) = best_roots(instance, &tables)?;
    Ok(cost)
}

fn fill_tables<F>(instance: &Instance, costs: &CostParams, cancel: &F) -> Result<Tables>
where
    F: Fn() -> bool,
{
    costs.validate()?;

    let host = instance.host();
    let parasite = instance.parasite();
    let nh = host.len();
    let np = parasite.len();
    debug!("filling {} x {} cost tables", np, nh);

    let mut t = Tables {
        nh,
        a: vec![f64::INFINITY; np * nh],
        c: vec![f64::INFINITY; np * nh],
        best: vec![f64::INFINITY; np * nh],
    };

    for p in parasite.postorder() {
        if cancel() {
            return Err(ReconError::Cancelled);
        }

        match parasite.children(p) {
            None => {
                if let Some(h) = instance.phi(p) {
                    let i = t.at(p, h);
                    t.a[i] = 0.0;
                }
            }
            Some((pl, pr)) => {
                for h in host.postorder() {
                    let mut v = t.c(pl, h) + t.c(pr, h) + costs.duplication;
                    if let Some((hl, hr)) = host.children(h) {
                        v = v
                            .min(t.c(pl, hl) + t.c(pr, hr))
                            .min(t.c(pl, hr) + t.c(pr, hl));
                    }
                    v = v
                        .min(t.c(pl, h) + t.best(pr, h) + costs.transfer)
                        .min(t.c(pr, h) + t.best(pl, h) + costs.transfer);
                    let i = t.at(p, h);
                    t.a[i] = v;
                }
            }
        }

        // loss chains, children before parents
        for h in host.postorder() {
            let mut v = t.a(p, h);
            if let Some((hl, hr)) = host.children(h) {
                v = v.min(t.c(p, hl) + costs.loss).min(t.c(p, hr) + costs.loss);
            }
            let i = t.at(p, h);
            t.c[i] = v;
        }

        let row = best_transfer_row(host, &t.c[p * nh..(p + 1) * nh]);
        t.best[p * nh..(p + 1) * nh].copy_from_slice(&row);
    }

    Ok(t)
}

/// For every host h, the minimum of `row` over hosts incomparable to h.
///
/// Subtree minima bottom-up, then top-down: nothing is incomparable to the
/// root, and best(h) = min(submin(sibling(h)), best(parent(h))).
fn best_transfer_row(host: &RecTree, row: &[f64]) -> Vec<f64> {
    let mut submin = row.to_vec();
    for h in host.postorder() {
        if let Some((hl, hr)) = host.children(h) {
            submin[h] = submin[h].min(submin[hl]).min(submin[hr]);
        }
    }

    let mut best = vec![f64::INFINITY; host.len()];
    for h in host.preorder() {
        if let (Some(parent), Some(sib)) = (host.parent(h), host.sibling(h)) {
            best[h] = submin[sib].min(best[parent]);
        }
    }
    best
}

fn best_roots(instance: &Instance, t: &Tables) -> Result<(f64, Vec<MappingNode>)> {
    let host = instance.host();
    let parasite = instance.parasite();
    let root = parasite.root();

    let cost = t.row_min(root);
    if cost.is_infinite() {
        // the feasible sub-problem closest to the parasite root
        let best_partial = parasite
            .postorder()
            .filter(|&p| t.row_min(p).is_finite())
            .min_by_key(|&p| (parasite.depth(p), p))
            .map(|p| (parasite.name(p).to_string(), t.row_min(p)));
        return Err(ReconError::Infeasible { best_partial });
    }

    let roots = host
        .postorder()
        .filter(|&h| cost_eq(t.c(root, h), cost))
        .map(|h| MappingNode::new(root, h))
        .collect();
    Ok((cost, roots))
}

/// Every event realizing C(p,h) at the nodes reachable from `roots`.
fn extract_graph(
    instance: &Instance,
    costs: &CostParams,
    t: &Tables,
    roots: &[MappingNode],
) -> Result<ReconGraph> {
    let host = instance.host();
    let parasite = instance.parasite();

    let mut nodes: BTreeMap<MappingNode, Vec<Event>> = BTreeMap::new();
    let mut seen = FixedBitSet::with_capacity(parasite.len() * t.nh);
    let mut stack: Vec<MappingNode> = roots.to_vec();

    while let Some(m) = stack.pop() {
        let (p, h) = (m.parasite, m.host);
        if seen.contains(t.at(p, h)) {
            continue;
        }
        seen.insert(t.at(p, h));

        let target = t.c(p, h);
        let mut events = Vec::new();

        if cost_eq(t.a(p, h), target) {
            match parasite.children(p) {
                None => {
                    if instance.phi(p) == Some(h) {
                        events.push(Event::contemporaneous());
                    }
                }
                Some((pl, pr)) => {
                    if let Some((hl, hr)) = host.children(h) {
                        if cost_eq(t.c(pl, hl) + t.c(pr, hr), target) {
                            events.push(Event::speciation(
                                MappingNode::new(pl, hl),
                                MappingNode::new(pr, hr),
                            ));
                        }
                        if cost_eq(t.c(pl, hr) + t.c(pr, hl), target) {
                            events.push(Event::speciation(
                                MappingNode::new(pl, hr),
                                MappingNode::new(pr, hl),
                            ));
                        }
                    }
                    if cost_eq(t.c(pl, h) + t.c(pr, h) + costs.duplication, target) {
                        events.push(Event::duplication(
                            MappingNode::new(pl, h),
                            MappingNode::new(pr, h),
                        ));
                    }
                    for (stay, jump) in [(pl, pr), (pr, pl)] {
                        let best = t.best(jump, h);
                        if !cost_eq(t.c(stay, h) + best + costs.transfer, target) {
                            continue;
                        }
                        for recipient in host.postorder() {
                            if !host.comparable(h, recipient)
                                && cost_eq(t.c(jump, recipient), best)
                            {
                                events.push(Event::transfer(
                                    MappingNode::new(stay, h),
                                    MappingNode::new(jump, recipient),
                                ));
                            }
                        }
                    }
                }
            }
        }

        if let Some((hl, hr)) = host.children(h) {
            for hc in [hl, hr] {
                if cost_eq(t.c(p, hc) + costs.loss, target) {
                    events.push(Event::loss(MappingNode::new(p, hc)));
                }
            }
        }

        if events.is_empty() {
            return Err(ReconError::Invariant(format!(
                "no event realizes C({}, {}) = {}",
                parasite.name(p),
                host.name(h),
                target
            )));
        }

        for e in &events {
            stack.extend(e.children());
        }
        nodes.insert(m, events);
    }

    ReconGraph::from_parts(roots.to_vec(), nodes)
}
