use super::error::{ReconError, Result};
use super::tree::RecTree;
use crate::libs::phylo::parser::parse_newick_prefix;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Read;
use std::sync::Arc;

lazy_static! {
    // parasite_leaf:host_leaf, an optional trailing ';'
    static ref RE_MAPPING: Regex = Regex::new(r"^\s*(.+?)\s*:\s*(.+?)\s*;?\s*$").unwrap();
}

/// A reconciliation problem: host tree, parasite tree and tip mapping.
///
/// Trees are shared behind `Arc` so that resampled tip mappings reuse them.
#[derive(Debug, Clone)]
pub struct Instance {
    host: Arc<RecTree>,
    parasite: Arc<RecTree>,
    /// Indexed by parasite node; `Some(host leaf)` exactly on parasite leaves
    tip_map: Vec<Option<usize>>,
}

impl Instance {
    /// Builds an instance from (parasite leaf, host leaf) name pairs.
    pub fn new(host: RecTree, parasite: RecTree, mapping: &[(String, String)]) -> Result<Self> {
        let mut tip_map = vec![None; parasite.len()];
        for (p_name, h_name) in mapping {
            let p = parasite.index_of(p_name).ok_or_else(|| {
                ReconError::Input(format!("tip mapping names unknown parasite '{}'", p_name))
            })?;
            let h = host.index_of(h_name).ok_or_else(|| {
                ReconError::Input(format!("tip mapping names unknown host '{}'", h_name))
            })?;
            if tip_map[p].is_some() {
                return Err(ReconError::Input(format!(
                    "parasite '{}' is mapped more than once",
                    p_name
                )));
            }
            tip_map[p] = Some(h);
        }

        Self::from_tip_map(Arc::new(host), Arc::new(parasite), tip_map)
    }

    /// Builds an instance from a tip map indexed by parasite node.
    pub fn from_tip_map(
        host: Arc<RecTree>,
        parasite: Arc<RecTree>,
        tip_map: Vec<Option<usize>>,
    ) -> Result<Self> {
        if tip_map.len() != parasite.len() {
            return Err(ReconError::Input(format!(
                "tip map has {} entries for {} parasite nodes",
                tip_map.len(),
                parasite.len()
            )));
        }
        for p in parasite.postorder() {
            match (parasite.is_leaf(p), tip_map[p]) {
                (true, None) => {
                    return Err(ReconError::Input(format!(
                        "parasite leaf '{}' has no host in the tip mapping",
                        parasite.name(p)
                    )))
                }
                (false, Some(_)) => {
                    return Err(ReconError::Input(format!(
                        "internal parasite node '{}' appears in the tip mapping",
                        parasite.name(p)
                    )))
                }
                (true, Some(h)) if h >= host.len() || !host.is_leaf(h) => {
                    return Err(ReconError::Input(format!(
                        "parasite '{}' is mapped to '{}', which is not a host leaf",
                        parasite.name(p),
                        if h < host.len() { host.name(h) } else { "?" }
                    )))
                }
                _ => {}
            }
        }

        Ok(Self {
            host,
            parasite,
            tip_map,
        })
    }

    /// Same trees, another tip map.
    pub fn with_tip_map(&self, tip_map: Vec<Option<usize>>) -> Result<Self> {
        Self::from_tip_map(self.host.clone(), self.parasite.clone(), tip_map)
    }

    /// Parses the three-section text format:
    /// host Newick `;` parasite Newick `;` then `parasite:host` lines.
    ///
    /// ```
    /// use cophy::libs::recon::Instance;
    ///
    /// let text = "(h1,h2)m1;\n(p1,p2)q1;\np1:h1\np2:h2\n";
    /// let instance = Instance::parse(text).unwrap();
    /// assert_eq!(instance.host().len(), 3);
    /// assert_eq!(instance.mapping_pairs().len(), 2);
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let (host_tree, rest) = parse_newick_prefix(text)?;
        let (parasite_tree, rest) = parse_newick_prefix(rest)?;

        let host = RecTree::from_phylo(&host_tree, "host")?;
        let parasite = RecTree::from_phylo(&parasite_tree, "parasite")?;

        let mut mapping = Vec::new();
        for line in rest.lines() {
            let line = line.trim();
            if line.is_empty() || line == ";" {
                continue;
            }
            let caps = RE_MAPPING.captures(line).ok_or_else(|| {
                ReconError::Input(format!("mapping line '{}' is not parasite:host", line))
            })?;
            mapping.push((caps[1].to_string(), caps[2].to_string()));
        }

        Self::new(host, parasite, &mapping)
    }

    /// Reads an input file, or stdin for "stdin".
    pub fn from_file(infile: &str) -> anyhow::Result<Self> {
        let mut reader = intspan::reader(infile);
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| anyhow::anyhow!("Read error: {}", e))?;
        Ok(Self::parse(&text)?)
    }

    pub fn host(&self) -> &RecTree {
        &self.host
    }

    pub fn parasite(&self) -> &RecTree {
        &self.parasite
    }

    /// Host leaf of a parasite leaf; `None` for internal parasite nodes.
    pub fn phi(&self, p: usize) -> Option<usize> {
        self.tip_map[p]
    }

    pub fn tip_map(&self) -> &[Option<usize>] {
        &self.tip_map
    }

    /// (parasite, host) name pairs in parasite post-order.
    pub fn mapping_pairs(&self) -> Vec<(String, String)> {
        self.tip_map
            .iter()
            .enumerate()
            .filter_map(|(p, h)| {
                h.map(|h| {
                    (
                        self.parasite.name(p).to_string(),
                        self.host.name(h).to_string(),
                    )
                })
            })
            .collect()
    }

    /// The instance in the three-section text format.
    pub fn to_text(&self) -> String {
        let mut s = format!("{}\n{}\n", self.host.to_newick(), self.parasite.to_newick());
        for (p, h) in self.mapping_pairs() {
            s.push_str(&format!("{}:{}\n", p, h));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instance() {
        let text = "((h1,h2)m1,h3)m0;\n((p1,p2)q1,p3)q0;\np1:h1\np2 : h2\n\np3:h3;\n";
        let instance = Instance::parse(text).unwrap();

        let p = instance.parasite();
        let h = instance.host();
        let p2 = p.index_of("p2").unwrap();
        assert_eq!(instance.phi(p2), h.index_of("h2"));
        assert_eq!(instance.phi(p.root()), None);
        assert_eq!(instance.mapping_pairs().len(), 3);

        let again = Instance::parse(&instance.to_text()).unwrap();
        assert_eq!(again.mapping_pairs(), instance.mapping_pairs());
    }

    #[test]
    fn test_parse_errors() {
        // unknown parasite
        let text = "(h1,h2)m1;\n(p1,p2)q1;\np1:h1\np2:h2\npx:h1\n";
        assert!(matches!(Instance::parse(text), Err(ReconError::Input(_))));

        // missing tip
        let text = "(h1,h2)m1;\n(p1,p2)q1;\np1:h1\n";
        let err = Instance::parse(text).unwrap_err();
        assert!(err.to_string().contains("p2"));

        // internal host node as target
        let text = "(h1,h2)m1;\n(p1,p2)q1;\np1:m1\np2:h2\n";
        assert!(Instance::parse(text).is_err());

        // mapped twice
        let text = "(h1,h2)m1;\n(p1,p2)q1;\np1:h1\np1:h2\np2:h2\n";
        assert!(Instance::parse(text).is_err());

        // malformed line
        let text = "(h1,h2)m1;\n(p1,p2)q1;\np1 h1\n";
        assert!(Instance::parse(text).is_err());

        // Newick error carries a position
        let text = "(h1,h2)m1\n(p1,p2)q1;\n";
        assert!(matches!(Instance::parse(text), Err(ReconError::Tree(_))));
    }
}
