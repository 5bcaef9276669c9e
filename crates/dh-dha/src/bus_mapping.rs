//! Building -> LV bus mapping (spec §4.8).
//!
//! Each building centroid is mapped to the nearest LV bus in the same
//! projected CRS. Buildings farther than the distance threshold are flagged
//! unmapped and dropped from the power-flow step with a warning, mirroring
//! `dh-cha::attachment`'s distance-gated attach/reject split.

use crate::lv_grid::LvGrid;
use dh_core::{Building, Diagnostics, Id, LvBusKind};
use std::collections::HashMap;

pub const DEFAULT_MAX_MAPPING_DISTANCE_M: f64 = 1000.0;

/// Building id -> nearest LV bus id, for buildings within the distance
/// threshold. Buildings absent from the map were flagged unmapped.
pub fn map_buildings_to_buses(
    buildings: &[Building],
    grid: &LvGrid,
    max_distance_m: f64,
    diagnostics: &mut Diagnostics,
) -> HashMap<Id, Id> {
    let candidates: Vec<&dh_core::LvBus> =
        grid.buses.iter().filter(|b| b.kind != LvBusKind::MvSlack).collect();

    let mut mapping = HashMap::new();
    for building in buildings {
        let nearest = candidates
            .iter()
            .map(|bus| (bus, building.centroid.distance(&bus.coords)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        match nearest {
            Some((bus, distance)) if distance <= max_distance_m => {
                mapping.insert(building.id.clone(), bus.id.clone());
            }
            Some((_, distance)) => {
                diagnostics.add_warning_with_entity(
                    "bus_mapping",
                    &format!("building farther than {max_distance_m} m from nearest LV bus ({distance:.1} m)"),
                    &building.id,
                );
            }
            None => {
                diagnostics.add_warning_with_entity("bus_mapping", "no LV bus available to map to", &building.id);
            }
        }
    }
    mapping
}
