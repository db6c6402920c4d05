//! Plate addressing and the plate registry
//!
//! Maps plate geometries to their well identifiers and keeps track of which
//! geometry each plate in an experiment uses. Well identifiers are the row
//! letter followed by the 1-based column, zero padded to two digits
//! (`A01`, `B12`, `a140`).

use crate::types::{LineageError, PlateId, Result, WellId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Row labels, in row order
const ROW_ALPHABET: &[u8; 52] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Maximum number of rows a plate can have
pub const MAX_ROWS: usize = ROW_ALPHABET.len();

/// Shape of a plate's addressable well space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry")]
pub struct PlateGeometry {
    rows: usize,
    cols: usize,
}

#[derive(Deserialize)]
struct RawGeometry {
    rows: usize,
    cols: usize,
}

impl TryFrom<RawGeometry> for PlateGeometry {
    type Error = LineageError;

    fn try_from(raw: RawGeometry) -> Result<Self> {
        PlateGeometry::new(raw.rows, raw.cols)
    }
}

impl PlateGeometry {
    /// Create a geometry, rejecting empty plates and more rows than there are row labels
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || rows > MAX_ROWS || cols == 0 {
            return Err(LineageError::InvalidGeometry { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of wells on the plate
    pub fn well_count(&self) -> usize {
        self.rows * self.cols
    }

    /// All well identifiers in row-major order
    pub fn well_ids(&self) -> Vec<WellId> {
        well_ids(*self)
    }

    /// Well identifier at a 0-indexed (row, col) position
    pub fn well_id_at(&self, row: usize, col: usize) -> Result<WellId> {
        well_id_at(*self, row, col)
    }
}

impl fmt::Display for PlateGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

impl From<PlateFormat> for PlateGeometry {
    fn from(format: PlateFormat) -> Self {
        format.geometry()
    }
}

/// Standard plate formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlateFormat {
    #[serde(rename = "6-well")]
    Well6,
    #[serde(rename = "96-well")]
    Well96,
    #[serde(rename = "384-well")]
    Well384,
    #[serde(rename = "1536-well")]
    Well1536,
    #[serde(rename = "5600-well")]
    Well5600,
}

impl PlateFormat {
    pub const ALL: [PlateFormat; 5] = [
        PlateFormat::Well6,
        PlateFormat::Well96,
        PlateFormat::Well384,
        PlateFormat::Well1536,
        PlateFormat::Well5600,
    ];

    /// The (rows, cols) shape of this format
    pub const fn geometry(self) -> PlateGeometry {
        let (rows, cols) = match self {
            PlateFormat::Well6 => (2, 3),
            PlateFormat::Well96 => (8, 12),
            PlateFormat::Well384 => (16, 24),
            PlateFormat::Well1536 => (32, 48),
            PlateFormat::Well5600 => (40, 140),
        };
        PlateGeometry { rows, cols }
    }

    /// Canonical name, e.g. `96-well`
    pub const fn name(self) -> &'static str {
        match self {
            PlateFormat::Well6 => "6-well",
            PlateFormat::Well96 => "96-well",
            PlateFormat::Well384 => "384-well",
            PlateFormat::Well1536 => "1536-well",
            PlateFormat::Well5600 => "5600-well",
        }
    }
}

impl fmt::Display for PlateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlateFormat {
    type Err = LineageError;

    /// Accepts `96-well`, `96` and `P96` (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let count = normalized
            .strip_suffix("-well")
            .or_else(|| normalized.strip_prefix('p'))
            .unwrap_or(&normalized);

        PlateFormat::ALL
            .into_iter()
            .find(|format| format.geometry().well_count().to_string() == count)
            .ok_or_else(|| LineageError::UnknownPlateFormat(s.to_string()))
    }
}

fn row_label(row: usize) -> char {
    ROW_ALPHABET[row] as char
}

fn format_well_id(row: usize, col: usize) -> WellId {
    WellId::new(format!("{}{:02}", row_label(row), col + 1))
}

/// Enumerate all wells of a geometry in row-major order
///
/// All columns of row `A` come first, then row `B`, and so on. The result is
/// deterministic, so `wells[row * cols + col]` is the well at `(row, col)`.
pub fn well_ids(geometry: PlateGeometry) -> Vec<WellId> {
    (0..geometry.rows)
        .flat_map(|row| (0..geometry.cols).map(move |col| format_well_id(row, col)))
        .collect()
}

/// Resolve a 0-indexed (row, col) position to its well identifier
pub fn well_id_at(geometry: PlateGeometry, row: usize, col: usize) -> Result<WellId> {
    if row >= geometry.rows || col >= geometry.cols {
        return Err(LineageError::OutOfRange {
            row,
            col,
            rows: geometry.rows,
            cols: geometry.cols,
        });
    }
    Ok(format_well_id(row, col))
}

/// Maps plate ids to their geometry
///
/// One registry is shared by reference between a timeline's consumers;
/// registering a plate id twice replaces its geometry.
#[derive(Debug, Clone, Default)]
pub struct PlateRegistry {
    plates: HashMap<PlateId, PlateGeometry>,
}

impl PlateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plate, returning the geometry it previously mapped to
    pub fn register_plate(
        &mut self,
        plate_id: impl Into<PlateId>,
        geometry: impl Into<PlateGeometry>,
    ) -> Option<PlateGeometry> {
        let plate_id = plate_id.into();
        let geometry = geometry.into();
        log::debug!("Registering plate {} as {}", plate_id, geometry);
        self.plates.insert(plate_id, geometry)
    }

    /// Look up the geometry of a registered plate
    pub fn geometry_of(&self, plate_id: &PlateId) -> Result<PlateGeometry> {
        self.plates
            .get(plate_id)
            .copied()
            .ok_or_else(|| LineageError::UnknownPlate(plate_id.clone()))
    }

    pub fn contains(&self, plate_id: &PlateId) -> bool {
        self.plates.contains_key(plate_id)
    }

    /// Registered plate ids, sorted
    pub fn plate_ids(&self) -> Vec<&PlateId> {
        let mut ids: Vec<&PlateId> = self.plates.keys().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }
}
