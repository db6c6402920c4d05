//! Lineage builder configuration
//!
//! This module defines the small set of knobs the lineage builder accepts.
//! Experiment description files and presentation options belong to the
//! application layer.

use crate::plate::PlateGeometry;
use serde::{Deserialize, Serialize};

/// Configuration for the lineage builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Id of the root node (default: the timeline's stock label)
    #[serde(default)]
    pub root_label: Option<String>,

    /// Partition every timepoint against this geometry instead of
    /// resolving each plate's geometry from the registry
    #[serde(default)]
    pub fixed_geometry: Option<PlateGeometry>,
}

impl LineageConfig {
    /// Create a new lineage configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the root node id
    pub fn with_root_label(mut self, label: impl Into<String>) -> Self {
        self.root_label = Some(label.into());
        self
    }

    /// Builder method: restrict partitioning to a single geometry
    pub fn with_fixed_geometry(mut self, geometry: impl Into<PlateGeometry>) -> Self {
        self.fixed_geometry = Some(geometry.into());
        self
    }
}
