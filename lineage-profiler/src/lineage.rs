//! Lineage tree construction
//!
//! The [`LineageBuilder`] is the entry point for turning a finished
//! [`Timeline`] into a [`LineageTree`]. The root holds every well the timeline
//! touches; each level below it splits its parent's wells by the combination of
//! events they received at the next timepoint.
//!
//! Nodes live in an arena owned by the tree. A node refers to its parent and
//! children by [`NodeId`], and callers read the tree through [`NodeRef`].

use crate::config::LineageConfig;
use crate::plate::{well_ids, PlateRegistry};
use crate::timeline::Timeline;
use crate::types::{LineageError, Result, Timepoint, WellId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Index of a node within its [`LineageTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
struct LineageNode {
    /// Path label, unique within the tree (`U2OS:0:1`)
    id: String,
    /// Sorted wells belonging to this sub-population
    wells: Vec<WellId>,
    /// Timepoint this node was resolved at
    timepoint: Timepoint,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A read-only tree of well sub-populations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageTree {
    /// Arena of nodes; index 0 is the root
    nodes: Vec<LineageNode>,
}

impl LineageTree {
    /// Build a tree with the default configuration
    pub fn build(timeline: &Timeline, registry: &PlateRegistry) -> Result<Self> {
        LineageBuilder::new(timeline, registry).build()
    }

    fn with_root(id: String, wells: Vec<WellId>, timepoint: Timepoint) -> Self {
        let tree = Self {
            nodes: vec![LineageNode {
                id,
                wells,
                timepoint,
                parent: None,
                children: Vec::new(),
            }],
        };
        log::debug!("{}", tree.root());
        tree
    }

    fn add_child(
        &mut self,
        parent: NodeId,
        id: String,
        wells: Vec<WellId>,
        timepoint: Timepoint,
    ) -> NodeId {
        let child = NodeId(self.nodes.len());
        self.nodes.push(LineageNode {
            id,
            wells,
            timepoint,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(child);
        log::debug!("{}", self.node_ref(child));
        child
    }

    fn node_ref(&self, index: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, index }
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node_ref(NodeId(0))
    }

    pub fn get(&self, index: NodeId) -> Option<NodeRef<'_>> {
        (index.0 < self.nodes.len()).then(|| self.node_ref(index))
    }

    /// Look up a node by its path id
    pub fn find(&self, id: &str) -> Option<NodeRef<'_>> {
        self.nodes
            .iter()
            .position(|node| node.id == id)
            .map(|index| self.node_ref(NodeId(index)))
    }

    /// Total number of nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth-first pre-order traversal, children in sibling order
    pub fn iter(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![NodeId(0)],
        }
    }

    /// Leaf nodes in pre-order
    pub fn leaves(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.iter().filter(NodeRef::is_leaf)
    }
}

/// Pre-order iterator over a [`LineageTree`]
pub struct Preorder<'a> {
    tree: &'a LineageTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = &self.tree.nodes[index.0];
        self.stack.extend(node.children.iter().rev());
        Some(self.tree.node_ref(index))
    }
}

/// Borrowed view of one node
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a LineageTree,
    index: NodeId,
}

impl<'a> NodeRef<'a> {
    fn node(&self) -> &'a LineageNode {
        &self.tree.nodes[self.index.0]
    }

    pub fn node_id(&self) -> NodeId {
        self.index
    }

    /// Path label of this node
    pub fn id(&self) -> &'a str {
        &self.node().id
    }

    pub fn wells(&self) -> &'a [WellId] {
        &self.node().wells
    }

    pub fn timepoint(&self) -> Timepoint {
        self.node().timepoint
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|parent| self.tree.node_ref(parent))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&child| tree.node_ref(child))
    }

    pub fn child_count(&self) -> usize {
        self.node().children.len()
    }

    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.node().children.is_empty()
    }

    /// Number of edges between this node and the root
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent(), NodeRef::parent).count()
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id())
            .field("timepoint", &self.timepoint())
            .field("wells", &self.wells())
            .finish()
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wells: Vec<&str> = self.wells().iter().map(WellId::as_str).collect();
        match self.parent() {
            Some(parent) => write!(
                f,
                "p:{}; id:{}; wells:[{}]",
                parent.id(),
                self.id(),
                wells.join(", ")
            ),
            None => write!(f, "ROOT; id:{}; wells:[{}]", self.id(), wells.join(", ")),
        }
    }
}

/// Builds a [`LineageTree`] from a timeline
pub struct LineageBuilder<'a> {
    timeline: &'a Timeline,
    registry: &'a PlateRegistry,
    config: LineageConfig,
}

impl<'a> LineageBuilder<'a> {
    pub fn new(timeline: &'a Timeline, registry: &'a PlateRegistry) -> Self {
        Self {
            timeline,
            registry,
            config: LineageConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LineageConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the lineage tree
    ///
    /// # Returns
    /// * `Err(LineageError::EmptyTimeline)` if the timeline has no events
    /// * `Err(LineageError::UnknownPlate)` if a plate in scope is not registered
    ///   (only when no fixed geometry is configured)
    pub fn build(&self) -> Result<LineageTree> {
        let timepoints = self.timeline.unique_timepoints();
        let Some(&first) = timepoints.first() else {
            return Err(LineageError::EmptyTimeline);
        };

        let well_space = self.well_space()?;
        log::info!(
            "Building lineage tree over {} timepoints and {} wells",
            timepoints.len(),
            well_space.len()
        );

        let root_wells: Vec<WellId> = self.timeline.well_ids(None).into_iter().collect();
        let known: HashSet<&WellId> = well_space.iter().collect();
        let outside = root_wells.iter().filter(|well| !known.contains(well)).count();
        if outside > 0 {
            log::warn!(
                "{} tracked wells are not on any plate in scope and drop out after the root",
                outside
            );
        }

        let indexes: Vec<GroupIndex> = timepoints[1..]
            .iter()
            .map(|&timepoint| {
                GroupIndex::new(
                    self.timeline
                        .partition_wells(timepoint, well_space.iter().cloned()),
                )
            })
            .collect();

        let root_label = self
            .config
            .root_label
            .clone()
            .unwrap_or_else(|| self.timeline.stock().to_string());

        let mut tree = LineageTree::with_root(root_label, root_wells, first);
        expand(&mut tree, &timepoints, &indexes);

        log::info!(
            "Lineage tree built: {} nodes, {} leaves",
            tree.node_count(),
            tree.leaves().count()
        );
        Ok(tree)
    }

    /// Wells partitioned at every timepoint, in first-seen order
    fn well_space(&self) -> Result<Vec<WellId>> {
        if let Some(geometry) = self.config.fixed_geometry {
            log::debug!("Partitioning against fixed geometry {}", geometry);
            return Ok(well_ids(geometry));
        }

        let mut seen = HashSet::new();
        let mut wells = Vec::new();
        for plate_id in self.timeline.plates() {
            let geometry = self.registry.geometry_of(plate_id)?;
            log::debug!("Plate {} resolved to {}", plate_id, geometry);
            for well in well_ids(geometry) {
                if seen.insert(well.clone()) {
                    wells.push(well);
                }
            }
        }
        Ok(wells)
    }
}

/// Well-to-group lookup for the partition of one timepoint
struct GroupIndex {
    groups: HashMap<WellId, usize>,
}

impl GroupIndex {
    fn new(partition: Vec<BTreeSet<WellId>>) -> Self {
        let groups = partition
            .into_iter()
            .enumerate()
            .flat_map(|(group, wells)| wells.into_iter().map(move |well| (well, group)))
            .collect();
        Self { groups }
    }

    /// Bucket sorted `wells` by group, dropping wells outside the partition
    ///
    /// Buckets come back sorted by their smallest well.
    fn split(&self, wells: &[WellId]) -> Vec<Vec<WellId>> {
        let mut buckets: HashMap<usize, Vec<WellId>> = HashMap::new();
        for well in wells {
            if let Some(&group) = self.groups.get(well) {
                buckets.entry(group).or_default().push(well.clone());
            }
        }

        let mut subsets: Vec<Vec<WellId>> = buckets.into_values().collect();
        subsets.sort_by(|a, b| a.first().cmp(&b.first()));
        subsets
    }
}

/// Expand the tree depth-first from the root
///
/// `indexes[i]` splits the nodes resolved at `timepoints[i]` into children at
/// `timepoints[i + 1]`. Children are pushed in reverse so they are expanded
/// in sibling order.
fn expand(tree: &mut LineageTree, timepoints: &[Timepoint], indexes: &[GroupIndex]) {
    let mut stack: Vec<(NodeId, usize)> = vec![(NodeId(0), 0)];

    while let Some((parent, position)) = stack.pop() {
        let Some(&timepoint) = timepoints.get(position + 1) else {
            continue;
        };

        let node = &tree.nodes[parent.0];
        let label = node.id.clone();
        let subsets = indexes[position].split(&node.wells);

        let children: Vec<NodeId> = subsets
            .into_iter()
            .enumerate()
            .map(|(i, wells)| tree.add_child(parent, format!("{}:{}", label, i), wells, timepoint))
            .collect();

        stack.extend(children.into_iter().rev().map(|child| (child, position + 1)));
    }
}
