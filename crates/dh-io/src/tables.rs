//! CSV table readers for the building, street, and hourly heat-profile
//! inputs (spec §6 "Inputs").

use dh_core::{
    Building, Cluster, ConstructionBand, Crs, HourlyProfileMatrix, Point, Polygon,
    RenovationState, StreetSegment, UseType,
};
use dh_core::{DhError, DhResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// One row of the building CSV table. Footprint is stored as a
/// `;`-separated list of `x,y` coordinate pairs, e.g. `0,0;10,0;10,10`.
#[derive(Debug, Deserialize)]
struct BuildingRow {
    id: String,
    centroid_x: f64,
    centroid_y: f64,
    crs: String,
    footprint_wkt_like: String,
    use_type: UseType,
    construction_band: ConstructionBand,
    renovation_state: RenovationState,
    floor_area_m2: Option<f64>,
    volume_m3: Option<f64>,
    heat_transmission_coefficient_w_per_k: Option<f64>,
    annual_heat_demand_kwh: Option<f64>,
}

fn parse_footprint(raw: &str) -> DhResult<Polygon> {
    let mut points = Vec::new();
    for pair in raw.split(';').filter(|s| !s.trim().is_empty()) {
        let mut parts = pair.split(',');
        let x: f64 = parts
            .next()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| DhError::Parse(format!("malformed footprint coordinate: {pair}")))?;
        let y: f64 = parts
            .next()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| DhError::Parse(format!("malformed footprint coordinate: {pair}")))?;
        points.push(Point::new(x, y));
    }
    Ok(Polygon { points })
}

/// Read the building table from a CSV file, validating every row's entity
/// invariants (non-empty footprint, projected CRS, non-negative demand).
pub fn read_building_table(path: impl AsRef<Path>) -> DhResult<Vec<Building>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("building table {}: {e}", path.display())))?;
    let mut buildings = Vec::new();
    for record in reader.deserialize::<BuildingRow>() {
        let row = record.map_err(|e| DhError::Parse(format!("building table row: {e}")))?;
        let building = Building {
            id: row.id,
            centroid: Point::new(row.centroid_x, row.centroid_y),
            crs: Crs(row.crs),
            footprint: parse_footprint(&row.footprint_wkt_like)?,
            use_type: row.use_type,
            construction_band: row.construction_band,
            renovation_state: row.renovation_state,
            floor_area_m2: row.floor_area_m2,
            volume_m3: row.volume_m3,
            heat_transmission_coefficient_w_per_k: row.heat_transmission_coefficient_w_per_k,
            annual_heat_demand_kwh: row.annual_heat_demand_kwh,
        };
        building.validate().map_err(DhError::InvalidGeometry)?;
        buildings.push(building);
    }
    Ok(buildings)
}

#[derive(Debug, Deserialize)]
struct StreetRow {
    id: String,
    geometry_wkt_like: String,
    name: Option<String>,
    crs: String,
}

/// Read the street table from a CSV file; geometry is a `;`-separated
/// `x,y` polyline, same convention as the building footprint column.
pub fn read_street_table(path: impl AsRef<Path>) -> DhResult<Vec<StreetSegment>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("street table {}: {e}", path.display())))?;
    let mut segments = Vec::new();
    for record in reader.deserialize::<StreetRow>() {
        let row = record.map_err(|e| DhError::Parse(format!("street table row: {e}")))?;
        let polygon_like = parse_footprint(&row.geometry_wkt_like)?;
        segments.push(StreetSegment {
            id: row.id,
            geometry: dh_core::Polyline { points: polygon_like.points },
            name: row.name,
            crs: Crs(row.crs),
        });
    }
    Ok(segments)
}

/// Read the 8760 x N hourly heat-profile matrix from a wide CSV: one
/// column per building id, one row per hour, no index column.
pub fn read_profile_matrix(path: impl AsRef<Path>) -> DhResult<HourlyProfileMatrix> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("profile matrix {}: {e}", path.display())))?;
    let headers = reader
        .headers()
        .map_err(|e| DhError::Parse(format!("profile matrix header: {e}")))?
        .clone();

    let mut hours_per_building: HashMap<String, Vec<f64>> =
        headers.iter().map(|h| (h.to_string(), Vec::with_capacity(dh_core::HOURS_PER_YEAR))).collect();

    for record in reader.records() {
        let record = record.map_err(|e| DhError::Parse(format!("profile matrix row: {e}")))?;
        for (header, value) in headers.iter().zip(record.iter()) {
            let v: f64 = value
                .trim()
                .parse()
                .map_err(|_| DhError::Parse(format!("non-numeric profile value for {header}: {value}")))?;
            hours_per_building.get_mut(header).expect("header seeded above").push(v);
        }
    }

    Ok(HourlyProfileMatrix { hours_per_building })
}

/// Per-cluster metadata row, matching the `Cluster` entity.
#[derive(Debug, Deserialize)]
struct ClusterRow {
    id: String,
    member_buildings: String,
    plant_x: f64,
    plant_y: f64,
    plant_crs: String,
    design_hour: usize,
    design_load_kw: f64,
}

pub fn read_cluster_table(path: impl AsRef<Path>) -> DhResult<Vec<Cluster>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("cluster table {}: {e}", path.display())))?;
    let mut clusters = Vec::new();
    for record in reader.deserialize::<ClusterRow>() {
        let row = record.map_err(|e| DhError::Parse(format!("cluster table row: {e}")))?;
        let cluster = Cluster {
            id: row.id,
            member_buildings: row
                .member_buildings
                .split(';')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
            plant_location: Point::new(row.plant_x, row.plant_y),
            plant_crs: Crs(row.plant_crs),
            design_hour: row.design_hour,
            design_load_kw: row.design_load_kw,
        };
        cluster.validate().map_err(DhError::InvalidGeometry)?;
        clusters.push(cluster);
    }
    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_building_table_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "id,centroid_x,centroid_y,crs,footprint_wkt_like,use_type,construction_band,renovation_state,floor_area_m2,volume_m3,heat_transmission_coefficient_w_per_k,annual_heat_demand_kwh"
        )
        .unwrap();
        writeln!(
            file,
            "b1,5,5,EPSG:25833,\"0,0;10,0;10,10\",residential_sfh,post_2010,full,120,300,150,15000"
        )
        .unwrap();
        let buildings = read_building_table(file.path()).unwrap();
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].id, "b1");
    }

    #[test]
    fn rejects_geographic_crs_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "id,centroid_x,centroid_y,crs,footprint_wkt_like,use_type,construction_band,renovation_state,floor_area_m2,volume_m3,heat_transmission_coefficient_w_per_k,annual_heat_demand_kwh"
        )
        .unwrap();
        writeln!(
            file,
            "b1,5,5,EPSG:4326,\"0,0;10,0;10,10\",residential_sfh,post_2010,full,,,,"
        )
        .unwrap();
        assert!(read_building_table(file.path()).is_err());
    }

    #[test]
    fn reads_profile_matrix_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "b1,b2").unwrap();
        writeln!(file, "1.0,2.0").unwrap();
        writeln!(file, "1.5,2.5").unwrap();
        let matrix = read_profile_matrix(file.path()).unwrap();
        assert_eq!(matrix.get("b1").unwrap(), &[1.0, 1.5]);
        assert_eq!(matrix.get("b2").unwrap(), &[2.0, 2.5]);
    }
}
