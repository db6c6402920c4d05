//! Chronological event log for one experiment
//!
//! A [`Timeline`] owns every [`Event`] recorded for an experiment, kept sorted
//! ascending by timepoint. Events sharing a timepoint stay in the order they
//! were added. All well groupings used by the lineage builder are derived from
//! the queries in this module.

use crate::plate::{well_ids, PlateGeometry, PlateRegistry};
use crate::types::{Action, Event, EventId, PlateId, Result, Timepoint, WellId};
use std::collections::{BTreeMap, BTreeSet};

/// The event log for one experiment
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Label of the starting population (e.g. a cell line)
    stock: String,
    /// Events, ascending by timepoint
    events: Vec<Event>,
    /// Plates referenced by events, in first-seen order
    plates: Vec<PlateId>,
    /// Sequence number handed to the next event
    next_event_id: usize,
}

impl Timeline {
    /// Create an empty timeline for the given stock
    pub fn new(stock: impl Into<String>) -> Self {
        Self {
            stock: stock.into(),
            events: Vec::new(),
            plates: Vec::new(),
            next_event_id: 0,
        }
    }

    pub fn stock(&self) -> &str {
        &self.stock
    }

    /// Record an event and insert it in timepoint order
    ///
    /// The event lands after every existing event whose timepoint is less
    /// than or equal to its own, so same-timepoint events keep call order.
    pub fn add_event<W>(
        &mut self,
        timepoint: Timepoint,
        action: impl Into<Action>,
        plate_id: impl Into<PlateId>,
        wells: W,
    ) -> &Event
    where
        W: IntoIterator,
        W::Item: Into<WellId>,
    {
        let event = Event {
            id: EventId(self.next_event_id),
            timepoint,
            action: action.into(),
            plate_id: plate_id.into(),
            wells: wells.into_iter().map(Into::<WellId>::into).collect(),
        };
        self.next_event_id += 1;

        if !self.plates.contains(&event.plate_id) {
            self.plates.push(event.plate_id.clone());
        }

        let index = self.events.partition_point(|e| e.timepoint <= timepoint);
        log::trace!(
            "Inserting {} at t={} on plate {} ({} wells) at index {}",
            event,
            timepoint,
            event.plate_id,
            event.wells.len(),
            index
        );
        self.events.insert(index, event);
        &self.events[index]
    }

    /// Add a "no event" covering every well of the plate untouched at `timepoint`
    ///
    /// Returns `Ok(None)` without recording anything when every well of the
    /// plate already has an event at that timepoint.
    pub fn fill_no_event(
        &mut self,
        timepoint: Timepoint,
        plate_id: impl Into<PlateId>,
        registry: &PlateRegistry,
    ) -> Result<Option<&Event>> {
        let plate_id = plate_id.into();
        let geometry = registry.geometry_of(&plate_id)?;

        let touched: BTreeSet<&WellId> = self
            .events_at(timepoint)
            .into_iter()
            .filter(|e| e.plate_id == plate_id)
            .flat_map(|e| e.wells.iter())
            .collect();

        let untouched: Vec<WellId> = well_ids(geometry)
            .into_iter()
            .filter(|well| !touched.contains(well))
            .collect();

        if untouched.is_empty() {
            return Ok(None);
        }

        Ok(Some(self.add_event(timepoint, Action::NoEvent, plate_id, untouched)))
    }

    /// A copy of all events in chronological order
    pub fn events(&self) -> Vec<Event> {
        self.events.clone()
    }

    /// Borrowing iterator over events in chronological order
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Plates referenced by any event, in first-seen order
    pub fn plates(&self) -> &[PlateId] {
        &self.plates
    }

    /// Distinct timepoints, ascending
    pub fn unique_timepoints(&self) -> Vec<Timepoint> {
        let mut timepoints: Vec<Timepoint> = self.events.iter().map(|e| e.timepoint).collect();
        // Already sorted, so dedup leaves the distinct values
        timepoints.dedup();
        timepoints
    }

    /// Events at exactly `timepoint`, in log order
    pub fn events_at(&self, timepoint: Timepoint) -> Vec<&Event> {
        let start = self.events.partition_point(|e| e.timepoint < timepoint);
        let end = self.events.partition_point(|e| e.timepoint <= timepoint);
        self.events[start..end].iter().collect()
    }

    /// Wells touched by any event, or only by events at `timepoint` when given
    pub fn well_ids(&self, timepoint: Option<Timepoint>) -> BTreeSet<WellId> {
        self.events
            .iter()
            .filter(|e| timepoint.map_or(true, |t| e.timepoint == t))
            .flat_map(|e| e.wells.iter().cloned())
            .collect()
    }

    /// Events at `timepoint` that touched `well`, in log order
    ///
    /// An empty result means no action touched the well at that timepoint.
    pub fn events_in_well(&self, well: &WellId, timepoint: Timepoint) -> Vec<&Event> {
        self.events_at(timepoint)
            .into_iter()
            .filter(|e| e.affects(well))
            .collect()
    }

    /// Distinct combinations of simultaneous events at `timepoint`
    ///
    /// Every well touched by some event at the timepoint contributes the set
    /// of events affecting it; wells sharing a combination collapse into one
    /// entry. Untouched wells are not represented. Entries are ordered by
    /// their event sequence ids.
    pub fn event_permutations(&self, timepoint: Timepoint) -> Vec<Vec<&Event>> {
        let events = self.events_at(timepoint);

        let mut by_well: BTreeMap<&WellId, Vec<&Event>> = BTreeMap::new();
        for &event in &events {
            for well in &event.wells {
                by_well.entry(well).or_default().push(event);
            }
        }

        let mut permutations: BTreeMap<Vec<EventId>, Vec<&Event>> = BTreeMap::new();
        for combination in by_well.into_values() {
            let mut key: Vec<EventId> = combination.iter().map(|e| e.id).collect();
            key.sort_unstable();
            permutations.entry(key).or_insert(combination);
        }

        permutations.into_values().collect()
    }

    /// Partition every well of `geometry` by its event signature at `timepoint`
    ///
    /// Wells no event touched share the empty signature and form their own
    /// group. Groups are disjoint, cover the whole plate, and are ordered by
    /// their smallest well id.
    pub fn well_permutations(
        &self,
        timepoint: Timepoint,
        geometry: PlateGeometry,
    ) -> Vec<BTreeSet<WellId>> {
        self.partition_wells(timepoint, well_ids(geometry))
    }

    /// Partition an arbitrary well space by event signature at `timepoint`
    pub(crate) fn partition_wells<I>(&self, timepoint: Timepoint, wells: I) -> Vec<BTreeSet<WellId>>
    where
        I: IntoIterator<Item = WellId>,
    {
        let events = self.events_at(timepoint);

        let mut groups: BTreeMap<Vec<EventId>, BTreeSet<WellId>> = BTreeMap::new();
        for well in wells {
            let signature: Vec<EventId> = events
                .iter()
                .filter(|e| e.affects(&well))
                .map(|e| e.id)
                .collect();
            groups.entry(signature).or_default().insert(well);
        }

        let mut partition: Vec<BTreeSet<WellId>> = groups.into_values().collect();
        partition.sort_by(|a, b| a.first().cmp(&b.first()));
        partition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::PlateFormat;
    use crate::types::NO_EVENT;

    fn wells(ids: &[&str]) -> BTreeSet<WellId> {
        ids.iter().map(|id| WellId::from(*id)).collect()
    }

    /// Six-well plate: seed everything, then two overlapping treatments at t=2
    fn six_well_timeline() -> (Timeline, PlateRegistry) {
        let mut registry = PlateRegistry::new();
        registry.register_plate("fred", PlateFormat::Well6);
        let all = well_ids(PlateFormat::Well6.geometry());

        let mut timeline = Timeline::new("U2OS");
        timeline.add_event(1, "seed", "fred", all);
        timeline.add_event(2, "X", "fred", ["A01", "A02", "A03", "B03"]);
        timeline.add_event(2, "Y", "fred", ["A02", "B02", "B03"]);
        timeline.add_event(2, NO_EVENT, "fred", ["B01"]);
        (timeline, registry)
    }

    #[test]
    fn test_empty_timeline() {
        let timeline = Timeline::new("U2OS");
        assert!(timeline.is_empty());
        assert!(timeline.unique_timepoints().is_empty());
        assert!(timeline.well_ids(None).is_empty());
        assert!(timeline.events_at(1).is_empty());
    }

    #[test]
    fn test_out_of_order_insertion() {
        let mut timeline = Timeline::new("U2OS");
        timeline.add_event(3, "late", "fred", ["A01"]);
        timeline.add_event(1, "early", "fred", ["A01"]);

        let timepoints: Vec<Timepoint> = timeline.events().iter().map(Event::timepoint).collect();
        assert_eq!(timepoints, vec![1, 3]);
    }

    #[test]
    fn test_insertion_before_all_existing_events() {
        let mut timeline = Timeline::new("U2OS");
        timeline.add_event(5, "a", "fred", ["A01"]);
        timeline.add_event(7, "b", "fred", ["A01"]);
        timeline.add_event(2, "c", "fred", ["A01"]);

        let timepoints: Vec<Timepoint> = timeline.iter().map(Event::timepoint).collect();
        assert_eq!(timepoints, vec![2, 5, 7]);
    }

    #[test]
    fn test_same_timepoint_keeps_call_order() {
        let mut timeline = Timeline::new("U2OS");
        timeline.add_event(2, "first", "fred", ["A01"]);
        timeline.add_event(1, "seed", "fred", ["A01"]);
        timeline.add_event(2, "second", "fred", ["A01"]);
        timeline.add_event(2, "third", "fred", ["A01"]);

        let actions: Vec<&str> = timeline.events_at(2).iter().map(|e| e.action().label()).collect();
        assert_eq!(actions, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_events_is_a_copy() {
        let (timeline, _) = six_well_timeline();
        let mut copy = timeline.events();
        copy.clear();
        assert_eq!(timeline.len(), 4);
    }

    #[test]
    fn test_unique_timepoints() {
        let (mut timeline, _) = six_well_timeline();
        timeline.add_event(10, "imaging", "fred", ["A01"]);
        timeline.add_event(4, "wash", "fred", ["A01"]);
        assert_eq!(timeline.unique_timepoints(), vec![1, 2, 4, 10]);
    }

    #[test]
    fn test_well_ids_by_timepoint() {
        let (timeline, _) = six_well_timeline();
        assert_eq!(timeline.well_ids(None).len(), 6);
        assert_eq!(timeline.well_ids(Some(2)).len(), 6);
        assert!(timeline.well_ids(Some(3)).is_empty());

        let mut partial = Timeline::new("U2OS");
        partial.add_event(1, "treat", "fred", ["A01", "B02"]);
        partial.add_event(1, "wash", "fred", ["B02", "B03"]);
        assert_eq!(partial.well_ids(Some(1)), wells(&["A01", "B02", "B03"]));
    }

    #[test]
    fn test_events_in_well() {
        let (timeline, _) = six_well_timeline();

        let a02: Vec<&str> = timeline
            .events_in_well(&WellId::from("A02"), 2)
            .iter()
            .map(|e| e.action().label())
            .collect();
        assert_eq!(a02, vec!["X", "Y"]);

        let b01 = timeline.events_in_well(&WellId::from("B01"), 2);
        assert_eq!(b01.len(), 1);
        assert!(b01[0].action().is_no_event());

        assert!(timeline.events_in_well(&WellId::from("A01"), 3).is_empty());
    }

    #[test]
    fn test_well_permutations_scenario() {
        let (timeline, _) = six_well_timeline();
        let partition = timeline.well_permutations(2, PlateFormat::Well6.geometry());

        assert_eq!(
            partition,
            vec![
                wells(&["A01", "A03"]),
                wells(&["A02", "B03"]),
                wells(&["B01"]),
                wells(&["B02"]),
            ]
        );
    }

    #[test]
    fn test_well_permutations_include_untouched_wells() {
        let mut timeline = Timeline::new("U2OS");
        timeline.add_event(1, "treat", "fred", ["A01"]);

        let partition = timeline.well_permutations(1, PlateFormat::Well6.geometry());
        assert_eq!(
            partition,
            vec![wells(&["A01"]), wells(&["A02", "A03", "B01", "B02", "B03"])]
        );
    }

    #[test]
    fn test_well_permutations_cover_plate() {
        let (timeline, _) = six_well_timeline();
        for format in [PlateFormat::Well6, PlateFormat::Well96] {
            let geometry = format.geometry();
            for timepoint in [1, 2, 3] {
                let partition = timeline.well_permutations(timepoint, geometry);
                let total: usize = partition.iter().map(BTreeSet::len).sum();
                let union: BTreeSet<WellId> = partition.iter().flatten().cloned().collect();

                assert_eq!(total, geometry.well_count(), "groups overlap");
                assert_eq!(union, well_ids(geometry).into_iter().collect::<BTreeSet<WellId>>());
            }
        }
    }

    #[test]
    fn test_event_permutations() {
        let (timeline, _) = six_well_timeline();
        let permutations = timeline.event_permutations(2);

        let labels: Vec<Vec<&str>> = permutations
            .iter()
            .map(|combo| combo.iter().map(|e| e.action().label()).collect())
            .collect();

        assert_eq!(labels.len(), 4);
        assert!(labels.contains(&vec!["X"]));
        assert!(labels.contains(&vec!["X", "Y"]));
        assert!(labels.contains(&vec!["Y"]));
        assert!(labels.contains(&vec![NO_EVENT]));
    }

    #[test]
    fn test_event_permutations_skip_untouched_wells() {
        let mut timeline = Timeline::new("U2OS");
        timeline.add_event(1, "treat", "fred", ["A01", "A02"]);

        let permutations = timeline.event_permutations(1);
        assert_eq!(permutations.len(), 1);
        assert!(permutations.iter().all(|combo| !combo.is_empty()));
        assert!(timeline.event_permutations(2).is_empty());
    }

    #[test]
    fn test_identical_events_stay_distinct() {
        let mut timeline = Timeline::new("U2OS");
        timeline.add_event(1, "treat", "fred", ["A01", "A02"]);
        timeline.add_event(1, "treat", "fred", ["A02"]);

        let partition = timeline.well_permutations(1, PlateFormat::Well6.geometry());
        assert!(partition.contains(&wells(&["A01"])));
        assert!(partition.contains(&wells(&["A02"])));
    }

    #[test]
    fn test_fill_no_event() {
        let mut registry = PlateRegistry::new();
        registry.register_plate("fred", PlateFormat::Well6);

        let mut timeline = Timeline::new("U2OS");
        timeline.add_event(3, "treat", "fred", ["A02"]);
        timeline.add_event(3, "wash", "fred", ["A01"]);

        let filled = timeline.fill_no_event(3, "fred", &registry).unwrap().unwrap();
        assert!(filled.action().is_no_event());
        assert_eq!(filled.wells(), &wells(&["A03", "B01", "B02", "B03"]));

        // Nothing left to fill
        assert!(timeline.fill_no_event(3, "fred", &registry).unwrap().is_none());
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn test_fill_no_event_unknown_plate() {
        let registry = PlateRegistry::new();
        let mut timeline = Timeline::new("U2OS");
        assert!(timeline.fill_no_event(1, "ghost", &registry).is_err());
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_plates_in_scope() {
        let mut timeline = Timeline::new("U2OS");
        timeline.add_event(2, "treat", "bob", ["A01"]);
        timeline.add_event(1, "seed", "fred", ["A01"]);
        timeline.add_event(3, "wash", "bob", ["A01"]);
        assert_eq!(timeline.plates(), &[PlateId::from("bob"), PlateId::from("fred")]);
    }
}
