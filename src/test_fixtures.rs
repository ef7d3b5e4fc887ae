//! Synthetic HEALPix map fixtures for development and testing
//!
//! Deterministic full-sky maps with known structure, so tests and demos do
//! not need to ship binary FITS files.

use crate::healpix::{self, Ordering};
use crate::map::{CoordSys, HealpixMap};
use std::f64::consts::FRAC_PI_2;

/// A compact source on the sky: position in degrees, peak value, width in degrees.
#[derive(Debug, Clone, Copy)]
pub struct PointSource {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub peak: f64,
    pub sigma_deg: f64,
}

/// Evaluate `f(lon, lat)` at every RING pixel centre.
fn from_fn<F>(nside: u32, f: F) -> HealpixMap
where
    F: Fn(f64, f64) -> f64,
{
    let values = (0..healpix::nside2npix(nside))
        .map(|pix| {
            let (theta, phi) = healpix::pix2ang_ring(nside, pix);
            f(phi, FRAC_PI_2 - theta)
        })
        .collect();

    HealpixMap {
        nside,
        ordering: Ordering::Ring,
        coordsys: Some(CoordSys::Galactic),
        values,
    }
}

/// Every pixel set to `value`.
///
/// # Example
/// ```
/// use skymap_tools::test_fixtures::constant_map;
/// let map = constant_map(4, 2.0);
/// assert_eq!(map.values.len(), 192);
/// ```
pub fn constant_map(nside: u32, value: f64) -> HealpixMap {
    from_fn(nside, |_, _| value)
}

/// Dipole along the z axis: `offset + amplitude * sin(lat)`.
pub fn dipole_map(nside: u32, offset: f64, amplitude: f64) -> HealpixMap {
    from_fn(nside, |_, lat| offset + amplitude * lat.sin())
}

/// Bright band along the equator with a gaussian latitude profile.
///
/// Resembles the galactic plane in a counts map; `background` is added everywhere.
pub fn plane_map(nside: u32, background: f64, peak: f64, width_deg: f64) -> HealpixMap {
    let width = width_deg.to_radians();
    from_fn(nside, |_, lat| {
        background + peak * (-(lat * lat) / (2.0 * width * width)).exp()
    })
}

/// Gaussian sources over a uniform background.
pub fn point_sources_map(nside: u32, background: f64, sources: &[PointSource]) -> HealpixMap {
    from_fn(nside, |lon, lat| {
        background
            + sources
                .iter()
                .map(|s| {
                    let d = angular_distance(
                        lon,
                        lat,
                        s.lon_deg.to_radians(),
                        s.lat_deg.to_radians(),
                    );
                    let sigma = s.sigma_deg.to_radians();
                    s.peak * (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .sum::<f64>()
    })
}

/// Great-circle distance between two directions, in radians.
pub fn angular_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let cos_d = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon1 - lon2).cos();
    cos_d.clamp(-1.0, 1.0).acos()
}

/// A representative sample: galactic plane, a few sources and empty regions.
pub fn sample_sky(nside: u32) -> HealpixMap {
    let sources = [
        PointSource {
            lon_deg: 0.0,
            lat_deg: 0.0,
            peak: 5000.0,
            sigma_deg: 4.0,
        },
        PointSource {
            lon_deg: 184.6,
            lat_deg: -5.8,
            peak: 2000.0,
            sigma_deg: 3.0,
        },
        PointSource {
            lon_deg: 263.6,
            lat_deg: -2.8,
            peak: 3000.0,
            sigma_deg: 3.0,
        },
    ];
    let sources_map = point_sources_map(nside, 0.0, &sources);
    let plane = plane_map(nside, 0.5, 200.0, 8.0);

    HealpixMap {
        values: plane
            .values
            .iter()
            .zip(&sources_map.values)
            .map(|(a, b)| a + b)
            .collect(),
        ..plane
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_map_size() {
        let map = constant_map(8, 3.0);
        assert_eq!(map.npix(), 768);
        assert!(map.values.iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_dipole_poles() {
        let map = dipole_map(16, 10.0, 5.0);
        let north = map.value_at(0.0, 0.0);
        let south = map.value_at(std::f64::consts::PI, 0.0);
        assert!(north > 14.0 && north <= 15.0);
        assert!(south < 6.0 && south >= 5.0);
    }

    #[test]
    fn test_plane_peaks_at_equator() {
        let map = plane_map(16, 1.0, 100.0, 5.0);
        let equator = map.value_at(FRAC_PI_2, 1.0);
        let pole = map.value_at(0.1, 1.0);
        assert!(equator > 50.0);
        assert!((pole - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_source_location() {
        let source = PointSource {
            lon_deg: 90.0,
            lat_deg: 30.0,
            peak: 100.0,
            sigma_deg: 5.0,
        };
        let map = point_sources_map(32, 0.0, &[source]);
        let (lo, hi) = map.valid_range().unwrap();
        assert!(lo >= 0.0);
        assert!(hi > 80.0);

        let at_source = map.value_at(FRAC_PI_2 - 30f64.to_radians(), 90f64.to_radians());
        let opposite = map.value_at(FRAC_PI_2 + 30f64.to_radians(), 270f64.to_radians());
        assert!(at_source > 80.0);
        assert!(opposite < 1e-6);
    }

    #[test]
    fn test_sample_sky_is_positive() {
        let map = sample_sky(8);
        assert!(map.values.iter().all(|&v| v >= 0.5));
        assert_eq!(map.coordsys, Some(CoordSys::Galactic));
    }
}
