//! # dh-dha: low-voltage electrical grid constructor, building-to-bus
//! mapper, load composer, multi-hour power-flow driver, and VDE-AR-N 4100
//! KPI extractor (spec §4.7-§4.11).
//!
//! Pipeline: [`lv_grid`] -> [`bus_mapping`] -> [`load_composition`] ->
//! [`power_flow`] -> [`kpi`].

pub mod bus_mapping;
pub mod kpi;
pub mod load_composition;
pub mod lv_grid;
pub mod power_flow;

use dh_core::{Building, Diagnostics, DhResult, HourlyProfileMatrix, Id, LvBus, LvLine, Transformer};
use std::collections::{BTreeSet, HashMap};

pub use bus_mapping::{map_buildings_to_buses, DEFAULT_MAX_MAPPING_DISTANCE_M};
pub use kpi::{extract_kpis, CostTier, DhaKpiConfig, DhaKpis, DhaReasonCode, MitigationClass};
pub use load_composition::{aggregate_bus_loads, compose_building_loads, LoadCompositionParams, ReactivePowerMode};
pub use lv_grid::{build_lv_grid, LvGrid, DEFAULT_ENDPOINT_SNAP_TOLERANCE_M};
pub use power_flow::{run_multi_hour, solve_hour, PowerFlowConfig};

/// Configuration for one end-to-end DHA run.
#[derive(Debug, Clone)]
pub struct DhaConfig {
    pub snap_tolerance_m: f64,
    pub max_mapping_distance_m: f64,
    pub load_composition: LoadCompositionParams,
    pub power_flow: PowerFlowConfig,
    pub kpi: DhaKpiConfig,
    pub top_n_hours: usize,
}

impl Default for DhaConfig {
    fn default() -> Self {
        Self {
            snap_tolerance_m: lv_grid::DEFAULT_ENDPOINT_SNAP_TOLERANCE_M,
            max_mapping_distance_m: bus_mapping::DEFAULT_MAX_MAPPING_DISTANCE_M,
            load_composition: LoadCompositionParams::default(),
            power_flow: PowerFlowConfig::default(),
            kpi: DhaKpiConfig::default(),
            top_n_hours: 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DhaRunResult {
    pub kpis: DhaKpis,
    pub snapshots: Vec<dh_core::PowerFlowSnapshot>,
    pub unmapped_building_count: usize,
    pub diagnostics: Diagnostics,
}

/// Run the full DHA pipeline for one cluster: build the LV grid, map
/// buildings to buses, compose and aggregate loads per simulated hour, run
/// the multi-hour power flow, and extract KPIs.
pub fn run_dha(
    buses: Vec<LvBus>,
    lines: Vec<LvLine>,
    transformers: Vec<Transformer>,
    buildings: &[Building],
    heat_profiles: &HourlyProfileMatrix,
    base_load: &dh_io::BaseLoadSource,
    design_hour: usize,
    config: &DhaConfig,
) -> DhResult<DhaRunResult> {
    tracing::info!(buildings = buildings.len(), "starting DHA run");

    let grid = build_lv_grid(buses, lines, transformers, config.snap_tolerance_m)?;

    let mut diagnostics = Diagnostics::new();
    let building_to_bus = map_buildings_to_buses(buildings, &grid, config.max_mapping_distance_m, &mut diagnostics);
    let unmapped_building_count = buildings.len() - building_to_bus.len();

    let mut hours: BTreeSet<usize> = heat_profiles.top_n_hours(config.top_n_hours).into_iter().collect();
    hours.insert(design_hour);
    let hours: Vec<usize> = hours.into_iter().collect();

    let building_ids: Vec<Id> = building_to_bus.keys().cloned().collect();
    let mut bus_loads_by_hour: HashMap<usize, HashMap<Id, dh_core::BuildingLoad>> = HashMap::new();
    for &hour in &hours {
        let building_loads =
            compose_building_loads(&building_ids, heat_profiles, base_load, hour, &config.load_composition);
        let bus_loads = aggregate_bus_loads(&building_to_bus, &building_loads);
        bus_loads_by_hour.insert(hour, bus_loads);
    }

    let snapshots = run_multi_hour(&grid, &bus_loads_by_hour, &hours, &config.power_flow);
    let kpis = extract_kpis(&grid, &snapshots, &config.kpi);

    Ok(DhaRunResult { kpis, snapshots, unmapped_building_count, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::units::Kilovolts;
    use dh_core::{Crs, LvBusKind, Point, Polygon, UseType};
    use dh_core::{ConstructionBand, RenovationState};
    use dh_io::BaseLoadSource;

    fn building(id: &str, x: f64, y: f64) -> Building {
        Building {
            id: id.into(),
            centroid: Point::new(x, y),
            crs: Crs("EPSG:25833".into()),
            footprint: Polygon { points: vec![Point::new(x, y), Point::new(x + 1.0, y), Point::new(x, y + 1.0)] },
            use_type: UseType::ResidentialSfh,
            construction_band: ConstructionBand::Post2010,
            renovation_state: RenovationState::Full,
            floor_area_m2: None,
            volume_m3: None,
            heat_transmission_coefficient_w_per_k: None,
            annual_heat_demand_kwh: Some(30_000.0),
        }
    }

    #[test]
    fn end_to_end_run_produces_kpis() {
        let buses = vec![
            LvBus { id: "mv1".into(), nominal_kv: Kilovolts(20.0), coords: Point::new(0.0, 0.0), kind: LvBusKind::MvSlack },
            LvBus { id: "tlv".into(), nominal_kv: Kilovolts(0.4), coords: Point::new(0.0, 1.0), kind: LvBusKind::TransformerLvSide },
            LvBus { id: "b1".into(), nominal_kv: Kilovolts(0.4), coords: Point::new(50.0, 1.0), kind: LvBusKind::LvNode },
        ];
        let lines = vec![LvLine {
            id: "l1".into(),
            from_bus: "tlv".into(),
            to_bus: "b1".into(),
            length_km: 0.05,
            r_ohm_per_km: 0.284,
            x_ohm_per_km: 0.083,
            c_nf_per_km: 260.0,
            max_current_ka: 0.27,
        }];
        let transformers = vec![Transformer {
            id: "t1".into(),
            hv_bus: "mv1".into(),
            lv_bus: "tlv".into(),
            rated_mva: 0.4,
            short_circuit_voltage_pct: 4.0,
            resistive_loss_pct: 1.0,
            tap_position: 0,
            tap_range: (-2, 2),
        }];
        let buildings = vec![building("house1", 50.0, 1.0)];

        let mut series = vec![2.0; dh_core::HOURS_PER_YEAR];
        series[100] = 15.0;
        let mut hours_per_building = HashMap::new();
        hours_per_building.insert("house1".to_string(), series);
        let profiles = HourlyProfileMatrix { hours_per_building };

        let mut scenario = HashMap::new();
        scenario.insert("house1".to_string(), 1.0);
        let base_load = BaseLoadSource::Scenario(scenario);

        let result =
            run_dha(buses, lines, transformers, &buildings, &profiles, &base_load, 100, &DhaConfig::default())
                .unwrap();
        assert_eq!(result.unmapped_building_count, 0);
        assert!(!result.snapshots.is_empty());
        assert!(result.snapshots.iter().any(|s| s.hour == 100));
    }
}
