use super::node::{Node, NodeId};
use std::collections::BTreeMap;

/// A rooted tree of named nodes, as read from Newick.
///
/// No arity restriction is enforced here; the reconciliation layer checks
/// that trees are binary when it converts them.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    /// Arena storage for all nodes
    nodes: Vec<Node>,

    /// Optional root ID (a tree might be empty or in construction)
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new node to the tree. Returns the new node's ID.
    pub fn add_node(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id));
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get_root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn set_root(&mut self, id: NodeId) {
        if self.get_node(id).is_some() {
            self.root = Some(id);
        }
    }

    /// Add a child to a parent node.
    /// Updates both parent's `children` list and child's `parent` field.
    pub fn add_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), String> {
        if parent_id == child_id {
            return Err("Cannot add node as child of itself".to_string());
        }
        if parent_id >= self.nodes.len() {
            return Err(format!("Parent node {} not found", parent_id));
        }
        if child_id >= self.nodes.len() {
            return Err(format!("Child node {} not found", child_id));
        }
        if let Some(old_parent) = self.nodes[child_id].parent {
            return Err(format!(
                "Node {} already has parent {}",
                child_id, old_parent
            ));
        }

        self.nodes[child_id].parent = Some(parent_id);
        self.nodes[parent_id].children.push(child_id);

        Ok(())
    }

    /// Node IDs, children before parents.
    ///
    /// Iterative, so deep caterpillar trees do not exhaust the call stack.
    pub fn postorder(&self, start_node: &NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        // (node, children already expanded)
        let mut stack = vec![(*start_node, false)];

        while let Some((id, expanded)) = stack.pop() {
            let node = match self.get_node(id) {
                Some(n) => n,
                None => continue,
            };
            if expanded || node.children.is_empty() {
                result.push(id);
            } else {
                stack.push((id, true));
                for &child in node.children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }

        result
    }

    /// Names used by more than one node, sorted.
    pub fn duplicated_names(&self) -> Vec<String> {
        let mut count_of: BTreeMap<&str, usize> = BTreeMap::new();
        for node in &self.nodes {
            if let Some(name) = &node.name {
                *count_of.entry(name.as_str()).or_insert(0) += 1;
            }
        }
        count_of
            .into_iter()
            .filter(|(_, c)| *c > 1)
            .map(|(n, _)| n.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_postorder() {
        let mut tree = Tree::new();
        //    0
        //   / \
        //  1   2
        // / \   \
        //3   4   5
        let n: Vec<NodeId> = (0..6).map(|_| tree.add_node()).collect();
        tree.set_root(n[0]);
        for (p, c) in [(0, 1), (0, 2), (1, 3), (1, 4), (2, 5)] {
            tree.add_child(n[p], n[c]).unwrap();
        }

        assert_eq!(tree.postorder(&n[0]), vec![n[3], n[4], n[1], n[5], n[2], n[0]]);
        assert_eq!(tree.postorder(&n[2]), vec![n[5], n[2]]);
    }

    #[test]
    fn test_tree_add_child_errors() {
        let mut tree = Tree::new();
        let n0 = tree.add_node();
        let n1 = tree.add_node();

        assert!(tree.add_child(n0, n0).is_err());
        assert!(tree.add_child(n0, 7).is_err());
        assert_eq!(tree.add_child(n0, n1), Ok(()));
        // already has a parent
        assert!(tree.add_child(n0, n1).is_err());
    }

    #[test]
    fn test_tree_deep_caterpillar_postorder() {
        let mut newick = "(l0,l1)i1".to_string();
        for i in 2..300 {
            newick = format!("({},l{})i{}", newick, i, i);
        }
        newick.push(';');

        let tree = Tree::from_newick(&newick).unwrap();
        let root = tree.get_root().unwrap();
        let post = tree.postorder(&root);
        assert_eq!(post.len(), tree.len());
        assert_eq!(*post.last().unwrap(), root);
    }

    #[test]
    fn test_tree_very_deep_newick() {
        let depth = 5000;
        let mut newick = String::new();
        for _ in 0..depth {
            newick.push('(');
        }
        newick.push_str("l0");
        for i in 1..=depth {
            newick.push_str(&format!(",l{})i{}", i, i));
        }
        newick.push(';');

        let tree = Tree::from_newick(&newick).unwrap();
        assert_eq!(tree.len(), 2 * depth + 1);
        let root = tree.get_root().unwrap();
        assert_eq!(tree.get_node(root).unwrap().name.as_deref(), Some("i5000"));
        assert_eq!(tree.postorder(&root).len(), tree.len());

        // unbalanced input fails cleanly at the same depth
        assert!(Tree::from_newick(&newick[..newick.len() - 10]).is_err());
    }

    #[test]
    fn test_tree_names() {
        let tree = Tree::from_newick("((h1,h2)m1,h3)m0;").unwrap();
        assert!(tree.duplicated_names().is_empty());

        let dup = Tree::from_newick("((a,b)x,a)x;").unwrap();
        assert_eq!(dup.duplicated_names(), vec!["a".to_string(), "x".to_string()]);
    }
}
