//! Visual field (degrees of visual angle) to retinal surface (microns).
//!
//! Uses the Watson (2014) radial fit. The polar angle is preserved and only
//! eccentricity is remapped.

/// Eccentricity in dva to retinal distance from the fovea in microns.
pub fn eccentricity_to_um(r_dva: f64) -> f64 {
    let r = r_dva.abs();
    let r_mm = 0.268 * r + 3.427e-4 * r * r - 8.3309e-7 * r * r * r;
    r_mm * 1000.0
}

/// Maps a visual-field point `(x, y)` in dva to retinal `(x, y)` in microns.
pub fn dva_to_retina(x: f64, y: f64) -> (f64, f64) {
    let r = x.hypot(y);
    if r == 0.0 {
        return (0.0, 0.0);
    }
    let scale = eccentricity_to_um(r) / r;
    (x * scale, y * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fovea_maps_to_origin() {
        assert_eq!(dva_to_retina(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn one_degree_is_roughly_268_microns() {
        let (x, y) = dva_to_retina(1.0, 0.0);
        assert!((x - 268.3418).abs() < 1e-3, "got {x}");
        assert_eq!(y, 0.0);
    }

    #[test]
    fn direction_is_preserved() {
        let (x, y) = dva_to_retina(-3.0, 4.0);
        assert!(x < 0.0 && y > 0.0);
        assert!((y / x + 4.0 / 3.0).abs() < 1e-12);
        assert!((x.hypot(y) - eccentricity_to_um(5.0)).abs() < 1e-9);
    }
}
