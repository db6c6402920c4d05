//! Core types for the lineage profiler library
//!
//! This module defines the fundamental values that flow through the profiler:
//! well and plate identifiers, actions, recorded events and the error type.
//! Events are created once by a [`Timeline`](crate::Timeline) and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Timepoint type used throughout the profiler (e.g. hours since seeding)
pub type Timepoint = u64;

/// Result type for profiler operations
pub type Result<T> = std::result::Result<T, LineageError>;

/// Label of the explicit no-op action
pub const NO_EVENT: &str = "no event";

/// Errors that can occur while addressing plates or building lineages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineageError {
    #[error("Well position out of range: row {row}, col {col} on a {rows}x{cols} plate")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Unknown plate: {0}")]
    UnknownPlate(PlateId),

    #[error("Timeline has no events")]
    EmptyTimeline,

    #[error("Invalid plate geometry: {rows}x{cols} (rows must be 1..=52, cols at least 1)")]
    InvalidGeometry { rows: usize, cols: usize },

    #[error("Unknown plate format: {0}")]
    UnknownPlateFormat(String),
}

/// A well identifier such as `A01` or `b140`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WellId(String);

impl WellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WellId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for WellId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Key into a [`PlateRegistry`](crate::PlateRegistry)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlateId(String);

impl PlateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The action applied by an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    /// Explicit no-op, recorded so untreated wells still carry a signature
    NoEvent,
    /// A named action (treatment, wash, imaging, ...)
    Named(String),
}

impl Action {
    pub fn label(&self) -> &str {
        match self {
            Action::NoEvent => NO_EVENT,
            Action::Named(name) => name,
        }
    }

    pub fn is_no_event(&self) -> bool {
        matches!(self, Action::NoEvent)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for Action {
    fn from(label: &str) -> Self {
        if label == NO_EVENT {
            Action::NoEvent
        } else {
            Action::Named(label.to_string())
        }
    }
}

impl From<String> for Action {
    fn from(label: String) -> Self {
        if label == NO_EVENT {
            Action::NoEvent
        } else {
            Action::Named(label)
        }
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::NoEvent => NO_EVENT.to_string(),
            Action::Named(name) => name,
        }
    }
}

/// Sequence number of an event within its timeline (insertion order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub usize);

/// An action applied to a set of wells on one plate at one timepoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Sequence number assigned by the owning timeline
    pub(crate) id: EventId,
    /// Timepoint this event occurred at
    pub(crate) timepoint: Timepoint,
    /// The action that took place
    pub(crate) action: Action,
    /// Plate the wells belong to
    pub(crate) plate_id: PlateId,
    /// Wells this event affects
    pub(crate) wells: BTreeSet<WellId>,
}

impl Event {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn timepoint(&self) -> Timepoint {
        self.timepoint
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn plate_id(&self) -> &PlateId {
        &self.plate_id
    }

    pub fn wells(&self) -> &BTreeSet<WellId> {
        &self.wells
    }

    /// Check whether this event touched the given well
    pub fn affects(&self, well: &WellId) -> bool {
        self.wells.contains(well)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} event", self.action)
    }
}
