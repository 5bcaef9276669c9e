//! Base-electrical-load source composition (spec §4.9, §6).
//!
//! Two pluggable sources of `P_base(b, h)`:
//! (a) a per-scenario scalar table (`scenario.json`: building -> scenario ->
//!     kW or MW, magnitude auto-detected), constant across all hours;
//! (b) a standard-load-profile (SLP) CSV of normalized hourly shapes per
//!     profile class, combined with a building-function mapping and a
//!     per-household/per-area population table to produce an hourly kW
//!     series per building.

use dh_core::{DhError, DhResult, HOURS_PER_YEAR};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// A resolved base-load source: either a constant-per-hour scalar per
/// building, or a full 8760-hour series per building.
#[derive(Debug, Clone)]
pub enum BaseLoadSource {
    Scenario(HashMap<String, f64>),
    StandardProfile(HashMap<String, Vec<f64>>),
}

impl BaseLoadSource {
    /// Base active-power load of `building_id` at hour `hour`, in kW. Zero
    /// for buildings absent from the source (the load composer treats a
    /// missing base load as zero rather than an error).
    pub fn at(&self, building_id: &str, hour: usize) -> f64 {
        match self {
            BaseLoadSource::Scenario(map) => map.get(building_id).copied().unwrap_or(0.0),
            BaseLoadSource::StandardProfile(map) => map
                .get(building_id)
                .and_then(|series| series.get(hour))
                .copied()
                .unwrap_or(0.0),
        }
    }
}

/// One row of the per-scenario scalar table: `building_id,scenario,value`.
#[derive(Debug, Deserialize)]
struct ScenarioRow {
    building_id: String,
    scenario: String,
    value: f64,
}

/// Read a scenario-scalar base-load table and resolve it to the requested
/// scenario. Magnitude (kW vs MW) is auto-detected: if the resolved
/// scenario's median magnitude is below 1.0, values are assumed to be MW
/// and scaled by 1000 to kW, matching the heuristic that a single
/// building's peak base load is rarely below 1 kW but is plausibly below
/// 1 MW.
pub fn read_scenario_loads(path: impl AsRef<Path>, scenario: &str) -> DhResult<BaseLoadSource> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("scenario load table {}: {e}", path.display())))?;
    let rows: Vec<ScenarioRow> = if path.extension().map(|e| e == "json").unwrap_or(false) {
        #[derive(Deserialize)]
        struct Doc(HashMap<String, HashMap<String, f64>>);
        let doc: HashMap<String, HashMap<String, f64>> =
            serde_json::from_str(&raw).map_err(|e| DhError::Parse(format!("scenario JSON: {e}")))?;
        doc.into_iter()
            .flat_map(|(building_id, by_scenario)| {
                by_scenario
                    .into_iter()
                    .map(move |(scenario, value)| ScenarioRow { building_id: building_id.clone(), scenario, value })
            })
            .collect()
    } else {
        let mut reader = csv::Reader::from_reader(raw.as_bytes());
        reader
            .deserialize::<ScenarioRow>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DhError::Parse(format!("scenario CSV row: {e}")))?
    };

    let mut resolved: HashMap<String, f64> = HashMap::new();
    for row in rows {
        if row.scenario == scenario {
            resolved.insert(row.building_id, row.value);
        }
    }
    if resolved.is_empty() {
        return Err(DhError::MissingInputArtifact(format!(
            "scenario '{scenario}' not present in base-load table {}",
            path.display()
        )));
    }

    let mut sorted: Vec<f64> = resolved.values().map(|v| v.abs()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = sorted[sorted.len() / 2];
    if median < 1.0 {
        for v in resolved.values_mut() {
            *v *= 1000.0;
        }
    }

    Ok(BaseLoadSource::Scenario(resolved))
}

/// One row of the standard-load-profile CSV: `hour,profile,kw_per_unit`,
/// normalized so that summing `kw_per_unit` over the year times the
/// per-unit annual consumption reproduces that consumption.
#[derive(Debug, Deserialize)]
struct SlpRow {
    hour: usize,
    profile: String,
    kw_per_unit: f64,
}

/// Read the SLP CSV into normalized per-unit hourly shapes keyed by
/// profile name. Each shape is rescaled so it sums to 1.0 over the year,
/// so it can be multiplied by any annual-consumption figure directly.
pub fn read_slp_table(path: impl AsRef<Path>) -> DhResult<HashMap<String, Vec<f64>>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("SLP table {}: {e}", path.display())))?;
    let mut shapes: HashMap<String, Vec<f64>> = HashMap::new();
    for record in reader.deserialize::<SlpRow>() {
        let row = record.map_err(|e| DhError::Parse(format!("SLP row: {e}")))?;
        let series = shapes.entry(row.profile).or_insert_with(|| vec![0.0; HOURS_PER_YEAR]);
        if row.hour >= HOURS_PER_YEAR {
            return Err(DhError::Parse(format!("SLP hour {} out of range", row.hour)));
        }
        series[row.hour] = row.kw_per_unit;
    }
    for series in shapes.values_mut() {
        let sum: f64 = series.iter().sum();
        if sum > 1e-9 {
            for v in series.iter_mut() {
                *v /= sum;
            }
        }
    }
    Ok(shapes)
}

/// One row of the population table: either a household-count basis or a
/// direct per-building annual consumption, matching spec §4.9's "requires
/// a population table for household profiles."
#[derive(Debug, Deserialize)]
pub struct PopulationRow {
    pub building_id: String,
    pub household_count: f64,
    pub annual_kwh_per_household: f64,
}

pub fn read_population_table(path: impl AsRef<Path>) -> DhResult<HashMap<String, PopulationRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("population table {}: {e}", path.display())))?;
    let mut rows = HashMap::new();
    for record in reader.deserialize::<PopulationRow>() {
        let row = record.map_err(|e| DhError::Parse(format!("population table row: {e}")))?;
        rows.insert(row.building_id.clone(), row);
    }
    Ok(rows)
}

/// Compose the final per-building hourly base load from an SLP shape
/// table, a building -> profile-name function mapping, and the population
/// table's annual consumption. Buildings absent from the function mapping
/// or population table are left out of the resulting source (the load
/// composer treats them as zero).
pub fn compose_standard_profile(
    slp: &HashMap<String, Vec<f64>>,
    building_function: &HashMap<String, String>,
    population: &HashMap<String, PopulationRow>,
) -> DhResult<BaseLoadSource> {
    let mut per_building = HashMap::new();
    for (building_id, profile_name) in building_function {
        let Some(shape) = slp.get(profile_name) else {
            return Err(DhError::MissingInputArtifact(format!(
                "SLP profile '{profile_name}' referenced by building {building_id} not found"
            )));
        };
        let Some(pop) = population.get(building_id) else {
            continue;
        };
        let annual_kwh = pop.household_count * pop.annual_kwh_per_household;
        let series: Vec<f64> = shape.iter().map(|v| v * annual_kwh).collect();
        per_building.insert(building_id.clone(), series);
    }
    Ok(BaseLoadSource::StandardProfile(per_building))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn scenario_json_resolves_and_scales_mw_to_kw() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"b1": {{"base": 0.005}}, "b2": {{"base": 0.01}}}}"#).unwrap();
        let source = read_scenario_loads(file.path(), "base").unwrap();
        match source {
            BaseLoadSource::Scenario(map) => {
                assert!((map["b1"] - 5.0).abs() < 1e-9);
                assert!((map["b2"] - 10.0).abs() < 1e-9);
            }
            _ => panic!("expected scenario source"),
        }
    }

    #[test]
    fn missing_scenario_errors() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"b1": {{"base": 5.0}}}}"#).unwrap();
        assert!(read_scenario_loads(file.path(), "other").is_err());
    }

    #[test]
    fn slp_shape_normalizes_to_unity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hour,profile,kw_per_unit").unwrap();
        writeln!(file, "0,H0,2.0").unwrap();
        writeln!(file, "1,H0,2.0").unwrap();
        let shapes = read_slp_table(file.path()).unwrap();
        let sum: f64 = shapes["H0"].iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn composes_annual_consumption_into_hourly_series() {
        let mut shape = vec![0.0; HOURS_PER_YEAR];
        shape[0] = 0.5;
        shape[1] = 0.5;
        let mut slp = HashMap::new();
        slp.insert("H0".to_string(), shape);
        let mut function = HashMap::new();
        function.insert("b1".to_string(), "H0".to_string());
        let mut population = HashMap::new();
        population.insert(
            "b1".to_string(),
            PopulationRow { building_id: "b1".into(), household_count: 2.0, annual_kwh_per_household: 1000.0 },
        );
        let source = compose_standard_profile(&slp, &function, &population).unwrap();
        assert!((source.at("b1", 0) - 1000.0).abs() < 1e-6);
    }
}
