//! Minimal projected-plane geometry primitives.
//!
//! The core never performs CRS reprojection itself (that is a `dh-io`
//! importer concern); it only asserts that a CRS tag claims to be
//! projected before accepting coordinates into the domain model.

use serde::{Deserialize, Serialize};

/// A coordinate reference system tag. Only `is_projected` is consulted by
/// the core; reprojection, if needed, happens in `dh-io` before data enters
/// these types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs(pub String);

impl Crs {
    /// True for EPSG codes conventionally understood to be projected
    /// (metric) rather than geographic (degrees). A handful of common
    /// projected EPSG codes are allow-listed; anything else is treated as
    /// geographic unless it starts with "EPSG:" followed by a code outside
    /// the well-known geographic set (4326, 4258, 4269...).
    pub fn is_projected(&self) -> bool {
        const GEOGRAPHIC: &[&str] = &["EPSG:4326", "EPSG:4258", "EPSG:4269", "CRS84", "WGS84"];
        if GEOGRAPHIC.iter().any(|g| self.0.eq_ignore_ascii_case(g)) {
            return false;
        }
        self.0.to_uppercase().starts_with("EPSG:")
    }
}

/// A point in a projected CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Round to the nearest multiple of `tolerance_m`, used for node
    /// snapping (street graph construction, LV bus deduplication).
    pub fn snapped(&self, tolerance_m: f64) -> (i64, i64) {
        (
            (self.x / tolerance_m).round() as i64,
            (self.y / tolerance_m).round() as i64,
        )
    }
}

/// An ordered polyline in a projected CRS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point>,
}

impl Polyline {
    pub fn is_empty(&self) -> bool {
        self.points.len() < 2
    }

    pub fn length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }

    /// Project `p` onto the polyline, returning the closest point on any
    /// segment and the distance to it.
    pub fn closest_point(&self, p: &Point) -> (Point, f64) {
        let mut best_point = self.points.first().copied().unwrap_or(*p);
        let mut best_dist = f64::INFINITY;
        for w in self.points.windows(2) {
            let (a, b) = (w[0], w[1]);
            let (proj, dist) = closest_point_on_segment(a, b, *p);
            if dist < best_dist {
                best_dist = dist;
                best_point = proj;
            }
        }
        (best_point, best_dist)
    }
}

fn closest_point_on_segment(a: Point, b: Point, p: Point) -> (Point, f64) {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq < 1e-12 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let proj = Point::new(a.x + t * dx, a.y + t * dy);
    (proj, proj.distance(&p))
}

/// A non-empty closed polygon in a projected CRS (building footprint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn is_empty(&self) -> bool {
        self.points.len() < 3
    }

    /// Centroid via the signed-area formula; falls back to the arithmetic
    /// mean of vertices for degenerate (near-zero-area) polygons.
    pub fn centroid(&self) -> Point {
        let n = self.points.len();
        if n < 3 {
            return self.points.first().copied().unwrap_or(Point::new(0.0, 0.0));
        }
        let mut area = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let p0 = self.points[i];
            let p1 = self.points[(i + 1) % n];
            let cross = p0.x * p1.y - p1.x * p0.y;
            area += cross;
            cx += (p0.x + p1.x) * cross;
            cy += (p0.y + p1.y) * cross;
        }
        area *= 0.5;
        if area.abs() < 1e-9 {
            let mean_x = self.points.iter().map(|p| p.x).sum::<f64>() / n as f64;
            let mean_y = self.points.iter().map(|p| p.y).sum::<f64>() / n as f64;
            return Point::new(mean_x, mean_y);
        }
        Point::new(cx / (6.0 * area), cy / (6.0 * area))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projected_crs_detection() {
        assert!(!Crs("EPSG:4326".into()).is_projected());
        assert!(Crs("EPSG:25833".into()).is_projected());
    }

    #[test]
    fn square_centroid() {
        let poly = Polygon {
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(2.0, 0.0),
                Point::new(2.0, 2.0),
                Point::new(0.0, 2.0),
            ],
        };
        let c = poly.centroid();
        assert!((c.x - 1.0).abs() < 1e-9);
        assert!((c.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn closest_point_on_polyline() {
        let line = Polyline {
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
        };
        let (proj, dist) = line.closest_point(&Point::new(5.0, 3.0));
        assert!((proj.x - 5.0).abs() < 1e-9);
        assert!((dist - 3.0).abs() < 1e-9);
    }
}
