//! Six-well walk-through
//!
//! Seeds a six-well plate, applies two overlapping treatments, a treat/wash
//! step and a final imaging pass, then prints the resulting lineage tree.
//!
//! Usage:
//!   RUST_LOG=debug cargo run --example six_well

use lineage_profiler::{LineageTree, PlateFormat, PlateId, PlateRegistry, Timeline, WellId};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut registry = PlateRegistry::new();
    registry.register_plate("fred", PlateFormat::Well6);
    let all_wells = registry.geometry_of(&PlateId::from("fred"))?.well_ids();

    let mut timeline = Timeline::new("U2OS");
    timeline.add_event(1, "seed", "fred", all_wells.clone());

    timeline.add_event(2, "treatment1", "fred", ["A01", "A02", "A03", "B03"]);
    timeline.add_event(2, "treatment2", "fred", ["A02", "B02", "B03"]);
    timeline.fill_no_event(2, "fred", &registry)?;

    timeline.add_event(3, "treat", "fred", ["A02"]);
    timeline.add_event(3, "wash", "fred", ["A01"]);
    timeline.fill_no_event(3, "fred", &registry)?;

    timeline.add_event(4, "imaging", "fred", all_wells);

    println!("Well groups at t=2:");
    for group in timeline.well_permutations(2, PlateFormat::Well6.geometry()) {
        let wells: Vec<&str> = group.iter().map(WellId::as_str).collect();
        println!("  {}", wells.join(", "));
    }

    println!("\nEvent combinations at t=3:");
    for combination in timeline.event_permutations(3) {
        let actions: Vec<String> = combination.iter().map(|e| e.to_string()).collect();
        println!("  {}", actions.join(" + "));
    }

    let tree = LineageTree::build(&timeline, &registry)?;
    println!("\nLineage ({} nodes):", tree.node_count());
    for node in tree.iter() {
        let wells: Vec<&str> = node.wells().iter().map(WellId::as_str).collect();
        println!(
            "{}{} [t={}] {}",
            "  ".repeat(node.depth()),
            node.id(),
            node.timepoint(),
            wells.join(", ")
        );
    }

    Ok(())
}
