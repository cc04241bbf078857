//! Tab-separated adjacency dump of a reconciliation graph.
//!
//! ```text
//! q0-m1	me	S q1-h2 p3-h1
//! S q1-h2 p3-h1	em	q1-h2
//! S q1-h2 p3-h1	em	p3-h1
//! p3-h1	me	C p3-h1
//! ```
//!
//! Mapping nodes are written `parasite-host`, events `K child1 child2` with an
//! absent child written as the empty string. A `C` event names its own node so
//! that every event label is unique.

use super::error::{ReconError, Result};
use super::graph::{Event, EventKind, MappingNode, ReconGraph};
use super::input::Instance;
use std::collections::BTreeMap;
use std::io::Write;

pub fn node_label(instance: &Instance, m: &MappingNode) -> String {
    format!(
        "{}-{}",
        instance.parasite().name(m.parasite),
        instance.host().name(m.host)
    )
}

pub fn event_label(instance: &Instance, node: &MappingNode, event: &Event) -> String {
    let child = |c: Option<MappingNode>| c.map(|c| node_label(instance, &c)).unwrap_or_default();
    match event.kind {
        EventKind::Contemporaneous => format!("C {} ", node_label(instance, node)),
        kind => format!("{} {} {}", kind.tag(), child(event.left), child(event.right)),
    }
}

/// Writes every `me` row followed by the `em` rows of its event.
pub fn write_sif<W: Write + ?Sized>(
    writer: &mut W,
    instance: &Instance,
    graph: &ReconGraph,
) -> std::io::Result<()> {
    for (m, events) in graph.nodes() {
        let src = node_label(instance, m);
        for e in events {
            let label = event_label(instance, m, e);
            writer.write_fmt(format_args!("{}\tme\t{}\n", src, label))?;
            for c in e.children() {
                writer.write_fmt(format_args!("{}\tem\t{}\n", label, node_label(instance, &c)))?;
            }
        }
    }
    Ok(())
}

pub fn to_sif(instance: &Instance, graph: &ReconGraph) -> String {
    let mut buf: Vec<u8> = Vec::new();
    // writing into a Vec cannot fail
    let _ = write_sif(&mut buf, instance, graph);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Resolves `parasite-host`, trying every '-' in turn since names may hold one.
fn parse_node(instance: &Instance, label: &str) -> Option<MappingNode> {
    label.match_indices('-').find_map(|(i, _)| {
        let p = instance.parasite().index_of(&label[..i])?;
        let h = instance.host().index_of(&label[i + 1..])?;
        Some(MappingNode::new(p, h))
    })
}

fn parse_child(instance: &Instance, label: &str) -> Result<Option<MappingNode>> {
    if label.is_empty() {
        return Ok(None);
    }
    parse_node(instance, label)
        .map(Some)
        .ok_or_else(|| ReconError::Input(format!("unknown mapping node '{}'", label)))
}

/// Parses an event label; `None` if the text is not shaped like one.
fn parse_event(instance: &Instance, label: &str) -> Result<Option<(EventKind, Event)>> {
    let mut parts = label.splitn(3, ' ');
    let kind = match parts.next() {
        Some(tag) if tag.chars().count() == 1 => match tag.chars().next().and_then(EventKind::from_tag) {
            Some(kind) => kind,
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    let c1 = match parts.next() {
        Some(c) => parse_child(instance, c)?,
        None => return Ok(None),
    };
    let c2 = parse_child(instance, parts.next().unwrap_or(""))?;

    let event = match (kind, c1, c2) {
        (EventKind::Contemporaneous, Some(_), None) => Event::contemporaneous(),
        (EventKind::Loss, Some(c), None) => Event::loss(c),
        (EventKind::Speciation, Some(a), Some(b)) => Event::speciation(a, b),
        (EventKind::Duplication, Some(a), Some(b)) => Event::duplication(a, b),
        (EventKind::Transfer, Some(a), Some(b)) => Event::transfer(a, b),
        _ => {
            return Err(ReconError::Input(format!(
                "event '{}' has the wrong number of children",
                label
            )))
        }
    };
    Ok(Some((kind, event)))
}

/// Loads a graph written by [`write_sif`].
///
/// `em` rows are optional and accepted in either orientation; children come
/// from the event labels. Roots are all the nodes of the parasite root.
pub fn from_sif(instance: &Instance, text: &str) -> Result<ReconGraph> {
    let mut nodes: BTreeMap<MappingNode, Vec<Event>> = BTreeMap::new();
    let mut em_rows: Vec<(String, String)> = Vec::new();

    for (no, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 3 {
            return Err(ReconError::Input(format!(
                "line {}: expected 3 tab-separated columns",
                no + 1
            )));
        }
        match fields[1] {
            "me" => {
                let m = parse_node(instance, fields[0]).ok_or_else(|| {
                    ReconError::Input(format!("line {}: unknown mapping node '{}'", no + 1, fields[0]))
                })?;
                let (kind, event) = parse_event(instance, fields[2])?.ok_or_else(|| {
                    ReconError::Input(format!("line {}: malformed event '{}'", no + 1, fields[2]))
                })?;
                if kind == EventKind::Contemporaneous
                    && fields[2].trim_end() != event_label(instance, &m, &event).trim_end()
                {
                    return Err(ReconError::Input(format!(
                        "line {}: '{}' does not name its node '{}'",
                        no + 1,
                        fields[2],
                        fields[0]
                    )));
                }
                nodes.entry(m).or_default().push(event);
            }
            "em" => em_rows.push((fields[0].to_string(), fields[2].to_string())),
            other => {
                return Err(ReconError::Input(format!(
                    "line {}: unknown relation '{}'",
                    no + 1,
                    other
                )))
            }
        }
    }

    // em rows must agree with the children named in the labels
    for (a, b) in &em_rows {
        let (event_side, node_side) = match parse_event(instance, a)? {
            Some(_) => (a, b),
            None => (b, a),
        };
        let (kind, event) = parse_event(instance, event_side)?.ok_or_else(|| {
            ReconError::Input(format!("em row between '{}' and '{}' has no event", a, b))
        })?;
        let child = parse_node(instance, node_side)
            .ok_or_else(|| ReconError::Input(format!("unknown mapping node '{}'", node_side)))?;
        if kind != EventKind::Contemporaneous && !event.children().any(|c| c == child) {
            return Err(ReconError::Input(format!(
                "'{}' is not a child of '{}'",
                node_side, event_side
            )));
        }
    }

    // an optimal graph only holds parasite-root nodes that are best roots
    let top = instance.parasite().root();
    let roots: Vec<MappingNode> = nodes.keys().filter(|m| m.parasite == top).copied().collect();
    if roots.is_empty() && !nodes.is_empty() {
        return Err(ReconError::Input("no root mapping node found".to_string()));
    }

    ReconGraph::from_parts(roots, nodes)
}
