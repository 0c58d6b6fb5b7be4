//! Spherical Web-Mercator helpers for deriving camera bounds from center and zoom.

use crate::geo::LonLat;

/// Tile size in pixels at zoom 0 (the common vector-tile convention).
pub const TILE_SIZE_PX: f64 = 512.0;

/// Latitude limit of the Web-Mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// World width in pixels at `zoom`.
pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * 2f64.powf(zoom)
}

/// Projects to normalized mercator `[0, 1]` space (y grows southwards).
pub fn project(p: LonLat) -> [f64; 2] {
    let lat = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (p.lon + 180.0) / 360.0;
    let y = 0.5 - (std::f64::consts::FRAC_PI_4 + lat * 0.5).tan().ln() / (2.0 * std::f64::consts::PI);
    [x, y]
}

pub fn unproject(xy: [f64; 2]) -> LonLat {
    let lon = xy[0] * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * xy[1]);
    let lat = n.sinh().atan().to_degrees();
    LonLat::new(lon, lat)
}

/// Offsets `center` by a pixel delta at `zoom` (x right, y down).
pub fn offset_px(center: LonLat, zoom: f64, dx_px: f64, dy_px: f64) -> LonLat {
    let size = world_size_px(zoom);
    let [x, y] = project(center);
    let p = unproject([x + dx_px / size, (y + dy_px / size).clamp(0.0, 1.0)]);
    LonLat::new(p.lon.clamp(-180.0, 180.0), p.lat)
}

#[cfg(test)]
mod tests {
    use super::{offset_px, project, unproject};
    use crate::geo::LonLat;

    #[test]
    fn project_unproject_is_stable() {
        let p = LonLat::new(124.2475, 13.8);
        let q = unproject(project(p));
        assert!(p.approx_eq(q, 1e-9), "{p:?} vs {q:?}");
    }

    #[test]
    fn positive_dy_moves_south() {
        let c = LonLat::new(124.2475, 13.8);
        let s = offset_px(c, 10.0, 0.0, 100.0);
        assert!(s.lat < c.lat);
        assert!((s.lon - c.lon).abs() < 1e-12);
    }
}
