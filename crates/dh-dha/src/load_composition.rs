//! Base-load & HP-load composer (spec §4.9).
//!
//! `P_total(b,h) = P_base(b,h) + Q_heat(b,h)/COP`. Reactive power comes from
//! either a single power factor applied to the composed total, or a split
//! applied separately to the base and heat-pump components. Loads aggregate
//! per bus by summation once mapped (spec §4.8).

use dh_core::units::{Megavars, Megawatts};
use dh_core::{BuildingLoad, HourlyProfileMatrix, Id};
use dh_io::BaseLoadSource;
use std::collections::HashMap;

/// How reactive power is derived from the composed active power.
#[derive(Debug, Clone, Copy)]
pub enum ReactivePowerMode {
    /// `Q = P * tan(acos(pf))` applied to the combined active power.
    SinglePowerFactor(f64),
    /// Base and heat-pump active power are converted to reactive power with
    /// their own power factors, then summed.
    SplitByComponent { base_power_factor: f64, hp_power_factor: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct LoadCompositionParams {
    pub hp_cop: f64,
    pub reactive_mode: ReactivePowerMode,
}

impl Default for LoadCompositionParams {
    fn default() -> Self {
        Self { hp_cop: 3.2, reactive_mode: ReactivePowerMode::SinglePowerFactor(0.95) }
    }
}

fn reactive_from_active(p_mw: f64, power_factor: f64) -> f64 {
    if p_mw <= 0.0 {
        return 0.0;
    }
    let pf = power_factor.clamp(1e-6, 1.0);
    p_mw * (pf.acos().tan())
}

/// Compose the per-building electrical load at one hour, in MW/MVAr
/// (matching [`BuildingLoad`]'s units; catalog/base-load figures are in kW).
pub fn compose_building_loads(
    building_ids: &[Id],
    heat_profiles: &HourlyProfileMatrix,
    base_load: &BaseLoadSource,
    hour: usize,
    params: &LoadCompositionParams,
) -> HashMap<Id, BuildingLoad> {
    let mut loads = HashMap::new();
    for id in building_ids {
        let p_base_kw = base_load.at(id, hour);
        let q_heat_kw = heat_profiles.get(id).and_then(|series| series.get(hour)).copied().unwrap_or(0.0);
        let p_hp_kw = q_heat_kw / params.hp_cop;
        let p_total_mw = (p_base_kw + p_hp_kw) / 1000.0;

        let q_total_mvar = match params.reactive_mode {
            ReactivePowerMode::SinglePowerFactor(pf) => reactive_from_active(p_total_mw, pf),
            ReactivePowerMode::SplitByComponent { base_power_factor, hp_power_factor } => {
                reactive_from_active(p_base_kw / 1000.0, base_power_factor)
                    + reactive_from_active(p_hp_kw / 1000.0, hp_power_factor)
            }
        };

        loads.insert(id.clone(), BuildingLoad { active_power: Megawatts(p_total_mw), reactive_power: Megavars(q_total_mvar) });
    }
    loads
}

/// Aggregate per-building loads onto their mapped bus, summing active and
/// reactive power for buildings sharing a bus. Buildings absent from
/// `building_to_bus` (unmapped, spec §4.8) contribute nothing.
pub fn aggregate_bus_loads(
    building_to_bus: &HashMap<Id, Id>,
    building_loads: &HashMap<Id, BuildingLoad>,
) -> HashMap<Id, BuildingLoad> {
    let mut by_bus: HashMap<Id, BuildingLoad> = HashMap::new();
    for (building_id, bus_id) in building_to_bus {
        let Some(load) = building_loads.get(building_id) else { continue };
        let entry = by_bus.entry(bus_id.clone()).or_insert(BuildingLoad {
            active_power: Megawatts(0.0),
            reactive_power: Megavars(0.0),
        });
        entry.active_power = entry.active_power + load.active_power;
        entry.reactive_power = entry.reactive_power + load.reactive_power;
    }
    by_bus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles() -> HourlyProfileMatrix {
        let mut series = vec![0.0; dh_core::HOURS_PER_YEAR];
        series[10] = 20.0;
        let mut hours_per_building = HashMap::new();
        hours_per_building.insert("b1".to_string(), series);
        HourlyProfileMatrix { hours_per_building }
    }

    #[test]
    fn composes_base_plus_hp_over_cop() {
        let mut scenario = HashMap::new();
        scenario.insert("b1".to_string(), 5.0);
        let base = BaseLoadSource::Scenario(scenario);
        let params = LoadCompositionParams { hp_cop: 4.0, reactive_mode: ReactivePowerMode::SinglePowerFactor(1.0) };
        let loads = compose_building_loads(&["b1".to_string()], &profiles(), &base, 10, &params);
        // 5 kW base + 20/4 kW hp = 10 kW -> 0.01 MW
        assert!((loads["b1"].active_power.value() - 0.01).abs() < 1e-9);
        assert!(loads["b1"].reactive_power.value().abs() < 1e-9);
    }

    #[test]
    fn aggregates_shared_bus() {
        let mut building_to_bus = HashMap::new();
        building_to_bus.insert("b1".to_string(), "bus0".to_string());
        building_to_bus.insert("b2".to_string(), "bus0".to_string());
        let mut building_loads = HashMap::new();
        building_loads.insert("b1".to_string(), BuildingLoad { active_power: Megawatts(0.01), reactive_power: Megavars(0.002) });
        building_loads.insert("b2".to_string(), BuildingLoad { active_power: Megawatts(0.02), reactive_power: Megavars(0.003) });
        let by_bus = aggregate_bus_loads(&building_to_bus, &building_loads);
        assert!((by_bus["bus0"].active_power.value() - 0.03).abs() < 1e-9);
        assert!((by_bus["bus0"].reactive_power.value() - 0.005).abs() < 1e-9);
    }
}
