use super::error::{ReconError, Result};
use crate::libs::phylo::tree::Tree;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Edge key of the host root edge in the interchange form.
pub const HOST_TOP: &str = "hTop";
/// Edge key of the parasite root edge in the interchange form.
pub const PARASITE_TOP: &str = "pTop";
/// Top vertex recorded on a root edge.
pub const TOP_VERTEX: &str = "Top";

/// (parent-name, child-name); the root edge uses the tree's top key as parent.
pub type EdgeKey = (String, String);

/// One edge record of the interchange form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub top: String,
    pub bottom: String,
    pub left: Option<EdgeKey>,
    pub right: Option<EdgeKey>,
}

/// Rooted binary tree with nodes numbered in post-order.
///
/// Children always have smaller indices than their parent and the root is the
/// last node, so `0..len()` is a valid bottom-up order. A pre-order interval
/// per node makes `is_ancestor` constant time.
#[derive(Debug, Clone)]
pub struct RecTree {
    names: Vec<String>,
    parent: Vec<Option<usize>>,
    children: Vec<Option<(usize, usize)>>,
    depth: Vec<usize>,
    // pre-order rank of a node, and the largest rank inside its subtree
    pre: Vec<usize>,
    last: Vec<usize>,
    index_of: HashMap<String, usize>,
}

impl RecTree {
    /// Converts a parsed Newick tree, checking that it is binary with unique
    /// names on every node. `role` only shapes error messages.
    pub fn from_phylo(tree: &Tree, role: &str) -> Result<Self> {
        let root = tree
            .get_root()
            .ok_or_else(|| ReconError::Input(format!("{} tree is empty", role)))?;

        let dups = tree.duplicated_names();
        if !dups.is_empty() {
            return Err(ReconError::Input(format!(
                "{} tree has duplicated node names: {}",
                role,
                dups.join(", ")
            )));
        }

        let order = tree.postorder(&root);
        let mut new_id: HashMap<usize, usize> = HashMap::new();
        let mut names = Vec::with_capacity(order.len());
        let mut children = Vec::with_capacity(order.len());

        for (i, &id) in order.iter().enumerate() {
            let node = tree
                .get_node(id)
                .ok_or_else(|| ReconError::Invariant(format!("dangling node id {}", id)))?;
            let name = node.name.clone().ok_or_else(|| {
                ReconError::Input(format!(
                    "{} tree has an unnamed node; every node must be named",
                    role
                ))
            })?;
            let pair = match node.children.as_slice() {
                [] => None,
                [l, r] => Some((new_id[l], new_id[r])),
                other => {
                    return Err(ReconError::Input(format!(
                        "{} node '{}' has {} children; trees must be binary",
                        role,
                        name,
                        other.len()
                    )))
                }
            };
            new_id.insert(id, i);
            names.push(name);
            children.push(pair);
        }

        Self::from_parts(names, children)
    }

    /// Builds from the edge-keyed interchange form.
    pub fn from_edges(edges: &BTreeMap<EdgeKey, Edge>, top_key: &str) -> Result<Self> {
        let root_keys: Vec<&EdgeKey> = edges.keys().filter(|(p, _)| p == top_key).collect();
        if root_keys.len() != 1 {
            return Err(ReconError::Input(format!(
                "expected exactly one '{}' edge, found {}",
                top_key,
                root_keys.len()
            )));
        }

        // Iterative post-order over edge keys
        let mut names = Vec::new();
        let mut children = Vec::new();
        let mut index_of_key: HashMap<&EdgeKey, usize> = HashMap::new();
        let mut seen: HashSet<&EdgeKey> = HashSet::new();
        let mut stack = vec![(root_keys[0], false)];

        while let Some((key, expanded)) = stack.pop() {
            if !expanded && !seen.insert(key) {
                return Err(ReconError::Input(format!(
                    "edge {:?} is reached twice; edges must form a tree",
                    key
                )));
            }
            let edge = edges
                .get(key)
                .ok_or_else(|| ReconError::Input(format!("missing edge {:?}", key)))?;
            match (&edge.left, &edge.right, expanded) {
                (None, None, _) => {
                    index_of_key.insert(key, names.len());
                    names.push(edge.bottom.clone());
                    children.push(None);
                }
                (Some(l), Some(r), true) => {
                    let li = *index_of_key
                        .get(l)
                        .ok_or_else(|| ReconError::Input(format!("missing edge {:?}", l)))?;
                    let ri = *index_of_key
                        .get(r)
                        .ok_or_else(|| ReconError::Input(format!("missing edge {:?}", r)))?;
                    index_of_key.insert(key, names.len());
                    names.push(edge.bottom.clone());
                    children.push(Some((li, ri)));
                }
                (Some(l), Some(r), false) => {
                    stack.push((key, true));
                    stack.push((r, false));
                    stack.push((l, false));
                }
                _ => {
                    return Err(ReconError::Input(format!(
                        "edge {:?} has a single child; trees must be binary",
                        key
                    )))
                }
            }
        }

        if names.len() != edges.len() {
            return Err(ReconError::Input(format!(
                "{} edges are not reachable from '{}'",
                edges.len() - names.len(),
                top_key
            )));
        }

        Self::from_parts(names, children)
    }

    /// `children` must already be in post-order with the root last.
    fn from_parts(names: Vec<String>, children: Vec<Option<(usize, usize)>>) -> Result<Self> {
        let n = names.len();
        if n == 0 {
            return Err(ReconError::Input("tree is empty".to_string()));
        }

        let mut parent = vec![None; n];
        for (i, pair) in children.iter().enumerate() {
            if let Some((l, r)) = *pair {
                if l >= i || r >= i || l == r || parent[l].is_some() || parent[r].is_some() {
                    return Err(ReconError::Invariant(
                        "children are not in post-order".to_string(),
                    ));
                }
                parent[l] = Some(i);
                parent[r] = Some(i);
            }
        }
        let root = n - 1;
        if (0..root).any(|i| parent[i].is_none()) {
            return Err(ReconError::Input("tree has more than one root".to_string()));
        }

        let mut depth = vec![0; n];
        let mut pre = vec![0; n];
        let mut last = vec![0; n];
        let mut rank = 0;
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            pre[i] = rank;
            rank += 1;
            if let Some((l, r)) = children[i] {
                depth[l] = depth[i] + 1;
                depth[r] = depth[i] + 1;
                stack.push(r);
                stack.push(l);
            }
        }
        // subtree intervals bottom-up
        for i in 0..n {
            last[i] = match children[i] {
                None => pre[i],
                Some((l, r)) => last[l].max(last[r]),
            };
        }

        let index_of: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        if index_of.len() != n {
            return Err(ReconError::Input("node names must be unique".to_string()));
        }

        Ok(Self {
            names,
            parent,
            children,
            depth,
            pre,
            last,
            index_of,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn root(&self) -> usize {
        self.names.len() - 1
    }

    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_of.get(name).copied()
    }

    pub fn children(&self, i: usize) -> Option<(usize, usize)> {
        self.children[i]
    }

    pub fn is_leaf(&self, i: usize) -> bool {
        self.children[i].is_none()
    }

    pub fn parent(&self, i: usize) -> Option<usize> {
        self.parent[i]
    }

    pub fn sibling(&self, i: usize) -> Option<usize> {
        let (l, r) = self.children[self.parent[i]?]?;
        Some(if l == i { r } else { l })
    }

    /// Number of edges between the root and `i`.
    pub fn depth(&self, i: usize) -> usize {
        self.depth[i]
    }

    /// Bottom-up order: every child before its parent.
    pub fn postorder(&self) -> std::ops::Range<usize> {
        0..self.names.len()
    }

    /// Top-down order: every parent before its children.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = vec![0; self.len()];
        for i in 0..self.len() {
            order[self.pre[i]] = i;
        }
        order
    }

    pub fn leaves(&self) -> Vec<usize> {
        self.postorder().filter(|&i| self.is_leaf(i)).collect()
    }

    pub fn internal_count(&self) -> usize {
        self.children.iter().filter(|c| c.is_some()).count()
    }

    /// `a` is an ancestor of `b` or `a == b`.
    pub fn is_ancestor(&self, a: usize, b: usize) -> bool {
        self.pre[a] <= self.pre[b] && self.pre[b] <= self.last[a]
    }

    /// One node is an ancestor of the other, or they are the same node.
    pub fn comparable(&self, a: usize, b: usize) -> bool {
        self.is_ancestor(a, b) || self.is_ancestor(b, a)
    }

    /// The interchange form: one record per edge, the root edge keyed by `top_key`.
    pub fn to_edges(&self, top_key: &str) -> BTreeMap<EdgeKey, Edge> {
        let mut edges = BTreeMap::new();
        for i in self.postorder() {
            let name = &self.names[i];
            let (key, top) = match self.parent[i] {
                Some(p) => ((self.names[p].clone(), name.clone()), self.names[p].clone()),
                None => ((top_key.to_string(), name.clone()), TOP_VERTEX.to_string()),
            };
            let child_key = |c: usize| (name.clone(), self.names[c].clone());
            let (left, right) = match self.children[i] {
                Some((l, r)) => (Some(child_key(l)), Some(child_key(r))),
                None => (None, None),
            };
            edges.insert(
                key,
                Edge {
                    top,
                    bottom: name.clone(),
                    left,
                    right,
                },
            );
        }
        edges
    }

    /// Newick text with every node named.
    pub fn to_newick(&self) -> String {
        let mut text: Vec<String> = vec![String::new(); self.len()];
        for i in self.postorder() {
            let label = quote_label(&self.names[i]);
            text[i] = match self.children[i] {
                None => label,
                Some((l, r)) => format!("({},{}){}", text[l], text[r], label),
            };
        }
        format!("{};", text[self.root()])
    }
}

/// Quote labels containing Newick structural characters or whitespace.
fn quote_label(label: &str) -> String {
    if label
        .chars()
        .any(|c| "():;,[]'".contains(c) || c.is_whitespace())
    {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}
