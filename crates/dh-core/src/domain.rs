//! Entity types from the canonical data model (spec §3): buildings, street
//! segments, the hourly heat-profile matrix, clusters, pipes, hydraulic and
//! power-flow results, and LV grid elements. These are the arena-indexed
//! value types the CHA/DHA graphs carry and the results arrays key into,
//! split the same way a power-flow network separates its node/edge
//! elements (bus/branch/generator/load) from the result arrays keyed on
//! them.

use crate::geometry::{Crs, Point, Polygon};
use crate::units::{Bar, BarPer100m, Celsius, Kilovolts, Kilowatts, Megavars, Megawatts, MetersPerSecond};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque, stable string identifier shared by every entity kind.
pub type Id = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseType {
    ResidentialSfh,
    ResidentialMfh,
    Commercial,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionBand {
    #[serde(rename = "pre_1978")]
    Pre1978,
    #[serde(rename = "1979_1994")]
    Y1979_1994,
    #[serde(rename = "1995_2009")]
    Y1995_2009,
    #[serde(rename = "post_2010")]
    Post2010,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenovationState {
    Unrenovated,
    Partial,
    Full,
}

/// A building footprint with its CRS, use type, and optional thermal
/// parameters. Invariant: geometry non-empty, in a projected CRS, and
/// `annual_heat_demand_kwh >= 0` when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: Id,
    pub centroid: Point,
    pub crs: Crs,
    pub footprint: Polygon,
    pub use_type: UseType,
    pub construction_band: ConstructionBand,
    pub renovation_state: RenovationState,
    pub floor_area_m2: Option<f64>,
    pub volume_m3: Option<f64>,
    pub heat_transmission_coefficient_w_per_k: Option<f64>,
    pub annual_heat_demand_kwh: Option<f64>,
}

impl Building {
    /// Validate the entity invariants that are cheap to check at
    /// construction time (geometry non-empty, CRS projected, demand >= 0).
    pub fn validate(&self) -> Result<(), String> {
        if self.footprint.is_empty() {
            return Err(format!("building {} has empty footprint", self.id));
        }
        if !self.crs.is_projected() {
            return Err(format!("building {} is not in a projected CRS", self.id));
        }
        if let Some(d) = self.annual_heat_demand_kwh {
            if d < 0.0 {
                return Err(format!("building {} has negative annual demand", self.id));
            }
        }
        Ok(())
    }
}

/// An ordered street polyline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetSegment {
    pub id: Id,
    pub geometry: crate::geometry::Polyline,
    pub name: Option<String>,
    pub crs: Crs,
}

/// Mapping from building id to a fixed-length (8760) sequence of non-negative
/// heat rates in kW. Invariant: sum of hourly values matches annual demand
/// within 1% (checked by `validate_against`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyProfileMatrix {
    pub hours_per_building: HashMap<Id, Vec<f64>>,
}

pub const HOURS_PER_YEAR: usize = 8760;

impl HourlyProfileMatrix {
    pub fn get(&self, building_id: &str) -> Option<&[f64]> {
        self.hours_per_building.get(building_id).map(|v| v.as_slice())
    }

    pub fn annual_sum_kwh(&self, building_id: &str) -> Option<f64> {
        self.get(building_id).map(|v| v.iter().sum())
    }

    /// Validate all invariants: fixed length, non-negative, and within 1% of
    /// the building's declared annual demand when present.
    pub fn validate_against(&self, buildings: &[Building]) -> Result<(), String> {
        for (id, series) in &self.hours_per_building {
            if series.len() != HOURS_PER_YEAR {
                return Err(format!(
                    "building {id} profile has {} hours, expected {HOURS_PER_YEAR}",
                    series.len()
                ));
            }
            if series.iter().any(|v| *v < 0.0) {
                return Err(format!("building {id} profile contains a negative heat rate"));
            }
        }
        for b in buildings {
            if let (Some(annual), Some(series)) =
                (b.annual_heat_demand_kwh, self.hours_per_building.get(&b.id))
            {
                let sum: f64 = series.iter().sum();
                if annual > 1e-9 {
                    let rel = (sum - annual).abs() / annual;
                    if rel > 0.01 {
                        return Err(format!(
                            "building {} hourly sum {:.1} kWh deviates {:.2}% from declared annual demand {:.1} kWh",
                            b.id, sum, rel * 100.0, annual
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Hourly totals across all buildings, used by the top-N hours selection
    /// for the DHA multi-hour power-flow driver.
    pub fn aggregate_hourly_kw(&self) -> Vec<f64> {
        let mut totals = vec![0.0; HOURS_PER_YEAR];
        for series in self.hours_per_building.values() {
            for (h, v) in series.iter().enumerate().take(HOURS_PER_YEAR) {
                totals[h] += v;
            }
        }
        totals
    }

    /// Indices (0-based hour-of-year) of the N largest aggregate-demand
    /// hours, ties broken by ascending hour index for determinism.
    pub fn top_n_hours(&self, n: usize) -> Vec<usize> {
        let totals = self.aggregate_hourly_kw();
        let mut idx: Vec<usize> = (0..totals.len()).collect();
        idx.sort_by(|&a, &b| {
            totals[b]
                .partial_cmp(&totals[a])
                .unwrap()
                .then(a.cmp(&b))
        });
        idx.truncate(n);
        idx
    }
}

/// A cluster of buildings served by one plant, exogenous and stable across
/// runs (never moved unless an explicit re-siting flag is set upstream).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: Id,
    pub member_buildings: Vec<Id>,
    pub plant_location: Point,
    pub plant_crs: Crs,
    pub design_hour: usize,
    pub design_load_kw: f64,
}

impl Cluster {
    pub fn validate(&self) -> Result<(), String> {
        if self.design_hour >= HOURS_PER_YEAR {
            return Err(format!(
                "cluster {} design_hour {} out of range [0,{})",
                self.id, self.design_hour, HOURS_PER_YEAR
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeRole {
    TrunkSupply,
    TrunkReturn,
    ServiceSupply,
    ServiceReturn,
    LoopStabilizer,
}

impl PipeRole {
    /// Role-specific velocity limit in m/s (spec §4.4: trunk and service are
    /// both 1.5 m/s in this system).
    pub fn velocity_limit_ms(&self) -> f64 {
        1.5
    }
}

/// A single physical pipe in the district-heating network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipe {
    pub id: Id,
    pub from_node: Id,
    pub to_node: Id,
    pub role: PipeRole,
    pub length_m: f64,
    pub dn: String,
    pub inner_diameter_m: f64,
    pub roughness_mm: f64,
    pub u_w_per_m_k: f64,
}

/// Per-pipe hydraulic result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeHydraulicResult {
    pub pipe_id: Id,
    pub velocity_ms: MetersPerSecond,
    pub pressure_drop_bar: Bar,
    pub pressure_drop_per_100m_bar: BarPer100m,
    pub t_from_c: Celsius,
    pub t_to_c: Celsius,
    pub heat_loss_kw: Kilowatts,
}

/// Per-junction hydraulic result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JunctionResult {
    pub node_id: Id,
    pub pressure_bar: Bar,
    pub temperature_c: Celsius,
}

/// Network-wide hydraulic solve outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydraulicNetworkResult {
    pub converged: bool,
    pub pipes: Vec<PipeHydraulicResult>,
    pub junctions: Vec<JunctionResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LvBusKind {
    LvNode,
    MvSlack,
    TransformerLvSide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LvBus {
    pub id: Id,
    pub nominal_kv: Kilovolts,
    pub coords: Point,
    pub kind: LvBusKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LvLine {
    pub id: Id,
    pub from_bus: Id,
    pub to_bus: Id,
    pub length_km: f64,
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    pub c_nf_per_km: f64,
    pub max_current_ka: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer {
    pub id: Id,
    pub hv_bus: Id,
    pub lv_bus: Id,
    pub rated_mva: f64,
    pub short_circuit_voltage_pct: f64,
    pub resistive_loss_pct: f64,
    pub tap_position: i32,
    pub tap_range: (i32, i32),
}

/// Per-bus, per-line, per-transformer results for one simulated hour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerFlowSnapshot {
    pub hour: usize,
    pub converged: bool,
    pub bus_voltage_pu: HashMap<Id, f64>,
    pub line_loading_pct: HashMap<Id, f64>,
    pub transformer_loading_pct: HashMap<Id, f64>,
}

/// Per-building electrical load at a given hour, produced by load
/// composition (spec §4.9) ahead of being aggregated per bus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BuildingLoad {
    pub active_power: Megawatts,
    pub reactive_power: Megavars,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_building(id: &str, demand: Option<f64>) -> Building {
        Building {
            id: id.into(),
            centroid: Point::new(0.0, 0.0),
            crs: Crs("EPSG:25833".into()),
            footprint: Polygon {
                points: vec![
                    Point::new(0.0, 0.0),
                    Point::new(1.0, 0.0),
                    Point::new(1.0, 1.0),
                ],
            },
            use_type: UseType::ResidentialSfh,
            construction_band: ConstructionBand::Post2010,
            renovation_state: RenovationState::Full,
            floor_area_m2: None,
            volume_m3: None,
            heat_transmission_coefficient_w_per_k: None,
            annual_heat_demand_kwh: demand,
        }
    }

    #[test]
    fn rejects_geographic_crs() {
        let mut b = sample_building("b1", None);
        b.crs = Crs("EPSG:4326".into());
        assert!(b.validate().is_err());
    }

    #[test]
    fn profile_matrix_length_check() {
        let mut m = HourlyProfileMatrix {
            hours_per_building: HashMap::new(),
        };
        m.hours_per_building.insert("b1".into(), vec![1.0; 10]);
        assert!(m.validate_against(&[]).is_err());
    }

    #[test]
    fn profile_matrix_within_one_percent() {
        let mut series = vec![0.0; HOURS_PER_YEAR];
        series[0] = 1000.0;
        let mut m = HourlyProfileMatrix {
            hours_per_building: HashMap::new(),
        };
        m.hours_per_building.insert("b1".into(), series);
        let b = sample_building("b1", Some(1000.0));
        assert!(m.validate_against(&[b]).is_ok());
    }

    #[test]
    fn top_n_hours_breaks_ties_ascending() {
        let mut m = HourlyProfileMatrix {
            hours_per_building: HashMap::new(),
        };
        let mut series = vec![5.0; HOURS_PER_YEAR];
        series[0] = 10.0;
        series[1] = 10.0;
        m.hours_per_building.insert("b1".into(), series);
        let top = m.top_n_hours(2);
        assert_eq!(top, vec![0, 1]);
    }
}
