//! Experiment file loading and parsing
//!
//! An experiment file declares the stock, the plates in use and the events
//! applied to them. Loading it yields a populated [`PlateRegistry`] and
//! [`Timeline`] ready for lineage construction.

use anyhow::{bail, Context, Result};
use lineage_profiler::{
    LineageConfig, PlateFormat, PlateGeometry, PlateId, PlateRegistry, Timeline, WellId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

/// Experiment description (loaded from experiment.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentConfig {
    pub stock: String,
    pub plates: Vec<PlateConfig>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
    #[serde(default)]
    pub lineage: LineageSection,
}

/// A plate, given either by named format or by explicit rows/cols
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlateConfig {
    pub id: String,
    pub format: Option<String>,
    pub rows: Option<usize>,
    pub cols: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventConfig {
    pub timepoint: u64,
    pub action: String,
    pub plate: String,
    pub wells: WellSelection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WellSelection {
    Keyword(String), // "all" or "remaining"
    List(Vec<String>),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LineageSection {
    pub root_label: Option<String>,
    pub fixed_format: Option<String>,
}

impl PlateConfig {
    pub fn geometry(&self) -> Result<PlateGeometry> {
        match (&self.format, self.rows, self.cols) {
            (Some(format), None, None) => {
                let format: PlateFormat = format
                    .parse()
                    .with_context(|| format!("Plate {}", self.id))?;
                Ok(format.geometry())
            }
            (None, Some(rows), Some(cols)) => {
                PlateGeometry::new(rows, cols).with_context(|| format!("Plate {}", self.id))
            }
            _ => bail!(
                "Plate {} must set either `format` or both `rows` and `cols`",
                self.id
            ),
        }
    }
}

impl ExperimentConfig {
    /// Register every declared plate
    pub fn registry(&self) -> Result<PlateRegistry> {
        let mut registry = PlateRegistry::new();
        for plate in &self.plates {
            let geometry = plate.geometry()?;
            if registry.register_plate(plate.id.as_str(), geometry).is_some() {
                log::warn!("Plate {} declared more than once, keeping {}", plate.id, geometry);
            }
        }
        Ok(registry)
    }

    /// Replay the declared events into a timeline, in file order
    pub fn timeline(&self, registry: &PlateRegistry) -> Result<Timeline> {
        let mut timeline = Timeline::new(self.stock.as_str());

        for (index, event) in self.events.iter().enumerate() {
            let plate_id = PlateId::from(event.plate.as_str());
            let geometry = registry
                .geometry_of(&plate_id)
                .with_context(|| format!("Event {} ({})", index + 1, event.action))?;

            let wells = match &event.wells {
                WellSelection::Keyword(keyword) if keyword == "all" => geometry.well_ids(),
                WellSelection::Keyword(keyword) if keyword == "remaining" => {
                    remaining_wells(&timeline, event.timepoint, &plate_id, geometry)
                }
                WellSelection::Keyword(keyword) => bail!(
                    "Event {} ({}): unknown well selection \"{}\" (expected \"all\", \"remaining\" or a list)",
                    index + 1,
                    event.action,
                    keyword
                ),
                WellSelection::List(ids) => {
                    let valid: HashSet<WellId> = geometry.well_ids().into_iter().collect();
                    let mut wells = Vec::with_capacity(ids.len());
                    for id in ids {
                        let well = WellId::from(id.as_str());
                        if !valid.contains(&well) {
                            bail!(
                                "Event {} ({}): well {} is not on plate {} ({})",
                                index + 1,
                                event.action,
                                id,
                                plate_id,
                                geometry
                            );
                        }
                        wells.push(well);
                    }
                    wells
                }
            };

            if wells.is_empty() {
                log::warn!(
                    "Event {} ({}) at t={} selects no wells",
                    index + 1,
                    event.action,
                    event.timepoint
                );
            }
            timeline.add_event(event.timepoint, event.action.as_str(), plate_id, wells);
        }

        log::info!(
            "Loaded {} events across {} timepoints",
            timeline.len(),
            timeline.unique_timepoints().len()
        );
        Ok(timeline)
    }

    /// Plate whose partition is listed: `requested`, else the first declared plate
    pub fn partition_plate(&self, requested: Option<&str>) -> Result<PlateId> {
        match requested {
            Some(plate) => Ok(PlateId::from(plate)),
            None => self
                .plates
                .first()
                .map(|plate| PlateId::from(plate.id.as_str()))
                .context("Experiment declares no plates"),
        }
    }

    pub fn lineage_config(&self) -> Result<LineageConfig> {
        let mut config = LineageConfig::new();
        if let Some(label) = &self.lineage.root_label {
            config = config.with_root_label(label.as_str());
        }
        if let Some(format) = &self.lineage.fixed_format {
            let format: PlateFormat = format.parse().context("[lineage] fixed_format")?;
            config = config.with_fixed_geometry(format);
        }
        Ok(config)
    }
}

/// Wells of the plate not yet touched at `timepoint`
fn remaining_wells(
    timeline: &Timeline,
    timepoint: u64,
    plate_id: &PlateId,
    geometry: PlateGeometry,
) -> Vec<WellId> {
    let touched: BTreeSet<&WellId> = timeline
        .events_at(timepoint)
        .into_iter()
        .filter(|e| e.plate_id() == plate_id)
        .flat_map(|e| e.wells().iter())
        .collect();

    geometry
        .well_ids()
        .into_iter()
        .filter(|well| !touched.contains(well))
        .collect()
}

/// Load an experiment from a TOML file
pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read experiment file: {:?}", path))?;

    let config: ExperimentConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse experiment file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SIX_WELL: &str = r#"
        stock = "U2OS"

        [[plates]]
        id = "fred"
        format = "6-well"

        [[events]]
        timepoint = 1
        action = "seed"
        plate = "fred"
        wells = "all"

        [[events]]
        timepoint = 2
        action = "treatment1"
        plate = "fred"
        wells = ["A01", "A02", "A03", "B03"]

        [[events]]
        timepoint = 2
        action = "treatment2"
        plate = "fred"
        wells = ["A02", "B02", "B03"]

        [[events]]
        timepoint = 2
        action = "no event"
        plate = "fred"
        wells = "remaining"
    "#;

    #[test]
    fn test_config_deserialization() {
        let config: ExperimentConfig = toml::from_str(SIX_WELL).unwrap();
        assert_eq!(config.stock, "U2OS");
        assert_eq!(config.plates.len(), 1);
        assert_eq!(config.events.len(), 4);
        assert!(matches!(config.events[0].wells, WellSelection::Keyword(_)));
        assert!(matches!(config.events[1].wells, WellSelection::List(_)));
    }

    #[test]
    fn test_timeline_from_config() {
        let config: ExperimentConfig = toml::from_str(SIX_WELL).unwrap();
        let registry = config.registry().unwrap();
        let timeline = config.timeline(&registry).unwrap();

        assert_eq!(timeline.len(), 4);
        assert_eq!(timeline.unique_timepoints(), vec![1, 2]);

        let untreated = timeline
            .events_at(2)
            .into_iter()
            .find(|e| e.action().is_no_event())
            .unwrap();
        let wells: Vec<&str> = untreated.wells().iter().map(WellId::as_str).collect();
        assert_eq!(wells, vec!["B01"]);
    }

    #[test]
    fn test_custom_geometry() {
        let plate = PlateConfig {
            id: "odd".to_string(),
            format: None,
            rows: Some(3),
            cols: Some(5),
        };
        assert_eq!(plate.geometry().unwrap(), PlateGeometry::new(3, 5).unwrap());

        let ambiguous = PlateConfig {
            format: Some("96-well".to_string()),
            ..plate
        };
        assert!(ambiguous.geometry().is_err());
    }

    #[test]
    fn test_well_not_on_plate() {
        let toml_content = r#"
            stock = "U2OS"
            [[plates]]
            id = "fred"
            format = "6-well"
            [[events]]
            timepoint = 1
            action = "seed"
            plate = "fred"
            wells = ["A01", "H12"]
        "#;

        let config: ExperimentConfig = toml::from_str(toml_content).unwrap();
        let registry = config.registry().unwrap();
        let err = config.timeline(&registry).unwrap_err();
        assert!(err.to_string().contains("H12"));
    }

    #[test]
    fn test_undeclared_plate() {
        let toml_content = r#"
            stock = "U2OS"
            plates = []
            [[events]]
            timepoint = 1
            action = "seed"
            plate = "ghost"
            wells = "all"
        "#;

        let config: ExperimentConfig = toml::from_str(toml_content).unwrap();
        let registry = config.registry().unwrap();
        assert!(config.timeline(&registry).is_err());
    }

    #[test]
    fn test_unknown_keyword() {
        let toml_content = r#"
            stock = "U2OS"
            [[plates]]
            id = "fred"
            format = "P6"
            [[events]]
            timepoint = 1
            action = "seed"
            plate = "fred"
            wells = "some"
        "#;

        let config: ExperimentConfig = toml::from_str(toml_content).unwrap();
        let registry = config.registry().unwrap();
        assert!(config.timeline(&registry).is_err());
    }

    #[test]
    fn test_lineage_section() {
        let toml_content = r#"
            stock = "U2OS"
            plates = []
            [lineage]
            root_label = "root"
            fixed_format = "96"
        "#;

        let config: ExperimentConfig = toml::from_str(toml_content).unwrap();
        let lineage = config.lineage_config().unwrap();
        assert_eq!(lineage.root_label.as_deref(), Some("root"));
        assert_eq!(lineage.fixed_geometry, Some(PlateFormat::Well96.geometry()));
    }

    #[test]
    fn test_partition_plate_selection() {
        let toml_content = r#"
            stock = "U2OS"
            [[plates]]
            id = "fred"
            format = "6-well"
            [[plates]]
            id = "barney"
            format = "96-well"
        "#;

        let config: ExperimentConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.partition_plate(None).unwrap(), PlateId::from("fred"));
        assert_eq!(
            config.partition_plate(Some("barney")).unwrap(),
            PlateId::from("barney")
        );

        // An unknown plate is passed through; the registry lookup rejects it
        let ghost = config.partition_plate(Some("ghost")).unwrap();
        assert!(config.registry().unwrap().geometry_of(&ghost).is_err());
    }

    #[test]
    fn test_partition_plate_without_plates() {
        let config: ExperimentConfig = toml::from_str("stock = \"U2OS\"\nplates = []").unwrap();
        let err = config.partition_plate(None).unwrap_err();
        assert_eq!(err.to_string(), "Experiment declares no plates");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SIX_WELL.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.events.len(), 4);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(&dir.path().join("missing.toml"));
        assert!(result.is_err());
    }
}
