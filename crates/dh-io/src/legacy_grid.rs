//! Legacy LV-grid JSON importer (spec §6, §9 "Open Questions" resolution).
//!
//! The legacy format is a flat node/way graph in geographic coordinates
//! (reprojection happens in the caller, since `dh-core` never reprojects).
//! Only the documented `power` tag values are honored; anything else is
//! ignored with a warning, per spec §9's resolution of the undocumented-tag
//! question.

use dh_core::{DhError, DhResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// The closed set of `power` tag values this importer understands.
pub const HONORED_POWER_TAGS: &[&str] = &["line", "cable", "minor_line", "substation"];

#[derive(Debug, Deserialize)]
struct LegacyNode {
    id: String,
    lat: f64,
    lon: f64,
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct LegacyWay {
    id: String,
    nodes: Vec<String>,
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct LegacyGridDocument {
    nodes: Vec<LegacyNode>,
    ways: Vec<LegacyWay>,
}

/// A node surviving the tag filter, in raw (lat, lon) geographic
/// coordinates -- the caller reprojects before handing these to `dh-core`.
#[derive(Debug, Clone)]
pub struct ImportedNode {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub power_tag: Option<String>,
}

/// A way surviving the tag filter: a polyline of node ids with its power
/// classification.
#[derive(Debug, Clone)]
pub struct ImportedWay {
    pub id: String,
    pub node_ids: Vec<String>,
    pub power_tag: String,
}

/// Parsed legacy grid, with every unhonored tag dropped and counted for a
/// one-line warning summary.
#[derive(Debug, Clone)]
pub struct ImportedLegacyGrid {
    pub nodes: Vec<ImportedNode>,
    pub ways: Vec<ImportedWay>,
    pub ignored_tag_count: usize,
}

/// Parse a legacy node/way JSON document, keeping only ways whose `power`
/// tag is in [`HONORED_POWER_TAGS`]; all other ways are dropped and
/// counted. Nodes are kept unconditionally (referenced by kept ways) but
/// their own `power` tag, if any, is recorded for bus-kind inference.
pub fn import_legacy_grid(path: impl AsRef<Path>) -> DhResult<ImportedLegacyGrid> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("legacy grid {}: {e}", path.display())))?;
    parse_legacy_grid(&raw)
}

fn parse_legacy_grid(raw: &str) -> DhResult<ImportedLegacyGrid> {
    let doc: LegacyGridDocument =
        serde_json::from_str(raw).map_err(|e| DhError::Parse(format!("legacy grid JSON: {e}")))?;

    let nodes: Vec<ImportedNode> = doc
        .nodes
        .into_iter()
        .map(|n| ImportedNode {
            id: n.id,
            lat: n.lat,
            lon: n.lon,
            power_tag: n.tags.and_then(|t| t.get("power").cloned()),
        })
        .collect();

    let mut ignored_tag_count = 0;
    let mut ways = Vec::new();
    for way in doc.ways {
        let power_tag = way.tags.as_ref().and_then(|t| t.get("power").cloned());
        match power_tag {
            Some(tag) if HONORED_POWER_TAGS.contains(&tag.as_str()) => {
                ways.push(ImportedWay { id: way.id, node_ids: way.nodes, power_tag: tag });
            }
            Some(tag) => {
                tracing::warn!(way_id = %way.id, power_tag = %tag, "ignoring way with unhonored power tag");
                ignored_tag_count += 1;
            }
            None => {
                tracing::warn!(way_id = %way.id, "ignoring way with no power tag");
                ignored_tag_count += 1;
            }
        }
    }

    Ok(ImportedLegacyGrid { nodes, ways, ignored_tag_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nodes": [
            {"id": "n1", "lat": 52.1, "lon": 13.1, "tags": {}},
            {"id": "n2", "lat": 52.2, "lon": 13.2, "tags": {"power": "substation"}},
            {"id": "n3", "lat": 52.3, "lon": 13.3, "tags": {}}
        ],
        "ways": [
            {"id": "w1", "nodes": ["n1", "n2"], "tags": {"power": "line"}},
            {"id": "w2", "nodes": ["n2", "n3"], "tags": {"power": "footpath"}},
            {"id": "w3", "nodes": ["n1", "n3"], "tags": {}}
        ]
    }"#;

    #[test]
    fn keeps_only_honored_power_tags() {
        let grid = parse_legacy_grid(SAMPLE).unwrap();
        assert_eq!(grid.ways.len(), 1);
        assert_eq!(grid.ways[0].id, "w1");
        assert_eq!(grid.ignored_tag_count, 2);
    }

    #[test]
    fn keeps_all_nodes_regardless_of_tag() {
        let grid = parse_legacy_grid(SAMPLE).unwrap();
        assert_eq!(grid.nodes.len(), 3);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_legacy_grid("{not json").is_err());
    }
}
