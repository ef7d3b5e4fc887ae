//! Mollweide equal-area projection.
//!
//! Plane coordinates are normalized so the full sky fills the ellipse
//! `x²/4 + y² <= 1`, with `x` in `[-2, 2]` and `y` in `[-1, 1]`.

use std::f64::consts::{FRAC_PI_2, PI};

const MAX_ITERATIONS: usize = 50;
const TOLERANCE: f64 = 1e-12;

/// Project `(lon, lat)` in radians onto the Mollweide plane.
pub fn mollweide_forward(lon: f64, lat: f64) -> (f64, f64) {
    let theta = auxiliary_angle(lat);
    let x = 2.0 / PI * lon * theta.cos();
    let y = theta.sin();
    (x, y)
}

/// Inverse projection. `None` outside the ellipse.
pub fn mollweide_inverse(x: f64, y: f64) -> Option<(f64, f64)> {
    if x * x / 4.0 + y * y > 1.0 {
        return None;
    }
    let theta = y.clamp(-1.0, 1.0).asin();
    let lat = ((2.0 * theta + (2.0 * theta).sin()) / PI)
        .clamp(-1.0, 1.0)
        .asin();
    let cos_theta = theta.cos();
    let lon = if cos_theta.abs() < 1e-12 {
        0.0
    } else {
        PI * x / (2.0 * cos_theta)
    };
    Some((lon.clamp(-PI, PI), lat))
}

/// Solve `2θ + sin 2θ = π sin(lat)` by Newton iteration.
fn auxiliary_angle(lat: f64) -> f64 {
    if (FRAC_PI_2 - lat.abs()).abs() < 1e-10 {
        return lat.signum() * FRAC_PI_2;
    }
    let target = PI * lat.sin();
    let mut t = 2.0 * lat;
    for _ in 0..MAX_ITERATIONS {
        let delta = (t + t.sin() - target) / (1.0 + t.cos());
        t -= delta;
        if delta.abs() < TOLERANCE {
            break;
        }
    }
    t / 2.0
}

/// Maps image pixels to sky directions for a full-sky Mollweide view.
///
/// The view is centred on longitude 0 with longitude increasing to the left,
/// the usual astronomical orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MollweideFrame {
    pub width: u32,
    pub height: u32,
}

impl MollweideFrame {
    /// A frame `width` pixels wide with the 2:1 aspect of the ellipse.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            height: (width / 2).max(1),
        }
    }

    /// Sky direction `(lon, lat)` at the centre of image pixel `(px, py)`.
    pub fn pixel_to_sky(&self, px: u32, py: u32) -> Option<(f64, f64)> {
        let x = ((px as f64 + 0.5) / self.width as f64) * 4.0 - 2.0;
        let y = 1.0 - ((py as f64 + 0.5) / self.height as f64) * 2.0;
        mollweide_inverse(x, y).map(|(lon, lat)| (-lon, lat))
    }

    /// Image position (fractional pixels) of sky direction `(lon, lat)`.
    pub fn sky_to_pixel(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = mollweide_forward(-wrap_longitude(lon), lat);
        let px = (x + 2.0) / 4.0 * self.width as f64;
        let py = (1.0 - y) / 2.0 * self.height as f64;
        (px, py)
    }
}

/// Wrap a longitude into `[-π, π]`.
pub fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = (lon + PI).rem_euclid(2.0 * PI) - PI;
    // Keep +π on the right edge instead of folding it onto -π
    if wrapped == -PI && lon > 0.0 {
        PI
    } else {
        wrapped
    }
}
