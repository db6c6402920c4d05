//! Report generation
//!
//! Renders a lineage tree as an indented text tree or as JSON, and a single
//! timepoint's well partition as a text table. Reports only read the tree.

use anyhow::Result;
use lineage_profiler::{LineageTree, NodeRef, PlateGeometry, Timeline, Timepoint, WellId};
use serde::Serialize;
use std::fmt::Write;

/// Serializable snapshot of a lineage tree
#[derive(Debug, Serialize)]
pub struct TreeReport {
    pub node_count: usize,
    pub leaf_count: usize,
    pub root: NodeReport,
}

#[derive(Debug, Serialize)]
pub struct NodeReport {
    pub id: String,
    pub timepoint: Timepoint,
    pub wells: Vec<String>,
    pub children: Vec<NodeReport>,
}

impl NodeReport {
    fn from_node(node: NodeRef<'_>) -> Self {
        Self {
            id: node.id().to_string(),
            timepoint: node.timepoint(),
            wells: node.wells().iter().map(ToString::to_string).collect(),
            children: node.children().map(NodeReport::from_node).collect(),
        }
    }
}

impl TreeReport {
    pub fn new(tree: &LineageTree) -> Self {
        Self {
            node_count: tree.node_count(),
            leaf_count: tree.leaves().count(),
            root: NodeReport::from_node(tree.root()),
        }
    }
}

fn join_wells(wells: &[WellId]) -> String {
    wells.iter().map(WellId::as_str).collect::<Vec<_>>().join(", ")
}

/// Indented tree, one node per line
pub fn render_text(tree: &LineageTree) -> Result<String> {
    let mut out = String::new();
    let root = tree.root();
    writeln!(
        out,
        "Lineage of {} ({} nodes, {} leaves)",
        root.id(),
        tree.node_count(),
        tree.leaves().count()
    )?;

    for node in tree.iter() {
        writeln!(
            out,
            "{}{} [t={}] {}",
            "  ".repeat(node.depth()),
            node.id(),
            node.timepoint(),
            join_wells(node.wells())
        )?;
    }
    Ok(out)
}

pub fn render_json(tree: &LineageTree) -> Result<String> {
    Ok(serde_json::to_string_pretty(&TreeReport::new(tree))?)
}

/// Well groups at one timepoint, each with the actions its wells received
pub fn render_partition(
    timeline: &Timeline,
    timepoint: Timepoint,
    geometry: PlateGeometry,
) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Well groups at t={} on a {} plate", timepoint, geometry)?;

    for group in timeline.well_permutations(timepoint, geometry) {
        let Some(first) = group.first() else {
            continue;
        };
        let actions: Vec<String> = timeline
            .events_in_well(first, timepoint)
            .iter()
            .map(|e| e.action().to_string())
            .collect();
        let signature = if actions.is_empty() {
            "(untouched)".to_string()
        } else {
            actions.join(" + ")
        };

        let wells: Vec<&str> = group.iter().map(WellId::as_str).collect();
        writeln!(out, "  {}: {}", signature, wells.join(", "))?;
    }
    Ok(out)
}
