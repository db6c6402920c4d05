//! Lineage Profiler Library
//!
//! Tracks how the wells of a multi-well plate diverge as actions (treatments,
//! washes, imaging, no-ops) are applied to subsets of them over time.
//!
//! # Architecture
//!
//! - [`plate`]: well addressing for a plate geometry and the plate registry
//! - [`Timeline`]: the chronological event log and its per-timepoint groupings
//! - [`LineageBuilder`]: splits the initial population into sub-populations,
//!   one tree level per timepoint
//!
//! The library does NOT:
//! - Persist timelines or trees
//! - Render trees (see the `lineage-cli` application for text/JSON output)
//!
//! # Example Usage
//!
//! ```no_run
//! use lineage_profiler::{LineageTree, PlateFormat, PlateRegistry, Timeline, NO_EVENT};
//!
//! let mut registry = PlateRegistry::new();
//! registry.register_plate("fred", PlateFormat::Well6);
//!
//! let mut timeline = Timeline::new("U2OS");
//! timeline.add_event(1, "seed", "fred", PlateFormat::Well6.geometry().well_ids());
//! timeline.add_event(2, "treatment1", "fred", ["A01", "A02", "A03", "B03"]);
//! timeline.add_event(2, "treatment2", "fred", ["A02", "B02", "B03"]);
//! timeline.fill_no_event(2, "fred", &registry).unwrap();
//!
//! let tree = LineageTree::build(&timeline, &registry).unwrap();
//! for node in tree.iter() {
//!     println!("{}{}", "  ".repeat(node.depth()), node);
//! }
//! ```

// Public modules
pub mod config;
pub mod lineage;
pub mod plate;
pub mod timeline;
pub mod types;

// Re-export main types for convenience
pub use config::LineageConfig;
pub use lineage::{LineageBuilder, LineageTree, NodeId, NodeRef, Preorder};
pub use plate::{well_id_at, well_ids, PlateFormat, PlateGeometry, PlateRegistry};
pub use timeline::Timeline;
pub use types::{
    Action, Event, EventId, LineageError, PlateId, Result, Timepoint, WellId, NO_EVENT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
