//! Static LV cable/line catalog providing default electrical parameters
//! (resistance, reactance, charging capacitance, ampacity) when the input
//! LV-grid description omits them (spec §4.7: "Line parameters come from a
//! catalog or configured defaults").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CableCatalogEntry {
    pub name: &'static str,
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    pub c_nf_per_km: f64,
    pub max_current_ka: f64,
}

/// Representative 0.4 kV underground cable cross-sections (NAYY-type).
pub const CABLE_CATALOG: &[CableCatalogEntry] = &[
    CableCatalogEntry { name: "NAYY4x50", r_ohm_per_km: 0.641, x_ohm_per_km: 0.083, c_nf_per_km: 250.0, max_current_ka: 0.142 },
    CableCatalogEntry { name: "NAYY4x95", r_ohm_per_km: 0.313, x_ohm_per_km: 0.079, c_nf_per_km: 280.0, max_current_ka: 0.211 },
    CableCatalogEntry { name: "NAYY4x150", r_ohm_per_km: 0.206, x_ohm_per_km: 0.075, c_nf_per_km: 300.0, max_current_ka: 0.270 },
    CableCatalogEntry { name: "NAYY4x240", r_ohm_per_km: 0.125, x_ohm_per_km: 0.072, c_nf_per_km: 330.0, max_current_ka: 0.350 },
];

/// The catalog row used when no explicit line parameters are supplied.
pub const DEFAULT_LV_LINE: CableCatalogEntry = CABLE_CATALOG[1]; // NAYY4x95, a common distribution default

pub fn by_name(name: &str) -> Option<&'static CableCatalogEntry> {
    CABLE_CATALOG.iter().find(|e| e.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_in_catalog() {
        assert!(by_name(DEFAULT_LV_LINE.name).is_some());
    }
}
