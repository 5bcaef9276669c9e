//! Static district-heating pipe catalog: DN size -> inner diameter, default
//! roughness, and installed cost per meter. Used by pipe sizing (spec §4.4)
//! and by the economics CAPEX sum (spec §4.12).

use serde::{Deserialize, Serialize};

/// One catalog row: nominal diameter, inner diameter, default roughness, and
/// installed cost per meter of trench (both pipes of a supply/return pair
/// included).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipeCatalogEntry {
    pub dn: &'static str,
    pub inner_diameter_m: f64,
    pub roughness_mm: f64,
    pub cost_eur_per_m: f64,
    /// Twin-pipe heat-loss coefficient, W/(m*K), EN 253 preinsulated series.
    pub u_w_per_m_k: f64,
}

/// Preinsulated steel DH pipe series, ascending by diameter. Figures are
/// representative of typical central-European district-heating twin-pipe
/// catalogs (EN 253 preinsulated pipe, roughness per DVGW/EN 13941
/// practice).
pub const PIPE_CATALOG: &[PipeCatalogEntry] = &[
    PipeCatalogEntry { dn: "DN20", inner_diameter_m: 0.0217, roughness_mm: 0.1, cost_eur_per_m: 180.0, u_w_per_m_k: 0.14 },
    PipeCatalogEntry { dn: "DN25", inner_diameter_m: 0.0285, roughness_mm: 0.1, cost_eur_per_m: 210.0, u_w_per_m_k: 0.16 },
    PipeCatalogEntry { dn: "DN32", inner_diameter_m: 0.0372, roughness_mm: 0.1, cost_eur_per_m: 240.0, u_w_per_m_k: 0.17 },
    PipeCatalogEntry { dn: "DN40", inner_diameter_m: 0.0430, roughness_mm: 0.1, cost_eur_per_m: 270.0, u_w_per_m_k: 0.19 },
    PipeCatalogEntry { dn: "DN50", inner_diameter_m: 0.0545, roughness_mm: 0.1, cost_eur_per_m: 310.0, u_w_per_m_k: 0.21 },
    PipeCatalogEntry { dn: "DN65", inner_diameter_m: 0.0703, roughness_mm: 0.1, cost_eur_per_m: 360.0, u_w_per_m_k: 0.24 },
    PipeCatalogEntry { dn: "DN80", inner_diameter_m: 0.0825, roughness_mm: 0.1, cost_eur_per_m: 410.0, u_w_per_m_k: 0.26 },
    PipeCatalogEntry { dn: "DN100", inner_diameter_m: 0.1071, roughness_mm: 0.1, cost_eur_per_m: 480.0, u_w_per_m_k: 0.30 },
    PipeCatalogEntry { dn: "DN125", inner_diameter_m: 0.1325, roughness_mm: 0.1, cost_eur_per_m: 560.0, u_w_per_m_k: 0.34 },
    PipeCatalogEntry { dn: "DN150", inner_diameter_m: 0.1603, roughness_mm: 0.1, cost_eur_per_m: 650.0, u_w_per_m_k: 0.38 },
    PipeCatalogEntry { dn: "DN200", inner_diameter_m: 0.2101, roughness_mm: 0.1, cost_eur_per_m: 820.0, u_w_per_m_k: 0.45 },
    PipeCatalogEntry { dn: "DN250", inner_diameter_m: 0.263, roughness_mm: 0.1, cost_eur_per_m: 1020.0, u_w_per_m_k: 0.52 },
    PipeCatalogEntry { dn: "DN300", inner_diameter_m: 0.3127, roughness_mm: 0.1, cost_eur_per_m: 1250.0, u_w_per_m_k: 0.58 },
];

/// Smallest catalog entry whose inner diameter meets or exceeds `d_req_m`.
/// Returns the largest catalog entry (exhausted) when no entry suffices.
pub fn smallest_fitting(d_req_m: f64) -> &'static PipeCatalogEntry {
    PIPE_CATALOG
        .iter()
        .find(|e| e.inner_diameter_m >= d_req_m)
        .unwrap_or_else(|| PIPE_CATALOG.last().unwrap())
}

/// Catalog entries at or above the given entry's diameter, in ascending
/// order, used to "advance to next DN" during iterative sizing.
pub fn entries_from(dn: &str) -> Vec<&'static PipeCatalogEntry> {
    let start = PIPE_CATALOG.iter().position(|e| e.dn == dn).unwrap_or(0);
    PIPE_CATALOG[start..].iter().collect()
}

pub fn by_dn(dn: &str) -> Option<&'static PipeCatalogEntry> {
    PIPE_CATALOG.iter().find(|e| e.dn == dn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_ascending() {
        for w in PIPE_CATALOG.windows(2) {
            assert!(w[0].inner_diameter_m < w[1].inner_diameter_m);
        }
    }

    #[test]
    fn smallest_fitting_picks_exact_or_next() {
        let e = smallest_fitting(0.05);
        assert_eq!(e.dn, "DN50");
    }

    #[test]
    fn exhausted_catalog_returns_largest() {
        let e = smallest_fitting(10.0);
        assert_eq!(e.dn, "DN300");
    }
}
