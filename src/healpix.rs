//! HEALPix pixelization geometry.
//!
//! Pixel indexing for the RING and NESTED schemes. Angles follow the usual
//! convention: `theta` is the colatitude in `[0, π]` measured from the north
//! pole, `phi` the longitude in radians (any value, wrapped to `[0, 2π)`).

use crate::error::MapError;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use std::str::FromStr;

/// Largest nside representable with 64-bit nested indices.
pub const MAX_NSIDE: u32 = 1 << 29;

/// Pixel numbering scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ordering {
    #[default]
    Ring,
    Nested,
}

impl Ordering {
    /// Pixel index containing the direction `(theta, phi)`.
    pub fn ang2pix(self, nside: u32, theta: f64, phi: f64) -> u64 {
        match self {
            Ordering::Ring => ang2pix_ring(nside, theta, phi),
            Ordering::Nested => ang2pix_nest(nside, theta, phi),
        }
    }

    /// Header keyword value (`ORDERING`)
    pub fn as_str(self) -> &'static str {
        match self {
            Ordering::Ring => "RING",
            Ordering::Nested => "NESTED",
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ordering {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RING" => Ok(Ordering::Ring),
            "NESTED" | "NEST" => Ok(Ordering::Nested),
            other => Err(MapError::InvalidKeyword {
                keyword: "ORDERING".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Check that `nside` is usable with the given ordering.
///
/// Any positive nside works for RING; NESTED needs a power of two.
pub fn validate_nside(nside: u64, ordering: Ordering) -> Result<u32, MapError> {
    let valid = match ordering {
        Ordering::Ring => (1..=MAX_NSIDE as u64).contains(&nside),
        Ordering::Nested => nside.is_power_of_two() && nside <= MAX_NSIDE as u64,
    };
    if valid {
        Ok(nside as u32)
    } else {
        Err(MapError::InvalidNside {
            nside,
            ordering: ordering.as_str(),
        })
    }
}

/// Number of pixels for a given nside
pub fn nside2npix(nside: u32) -> u64 {
    12 * nside as u64 * nside as u64
}

/// Inverse of [`nside2npix`].
pub fn npix2nside(npix: u64) -> Result<u32, MapError> {
    if npix == 0 || npix % 12 != 0 {
        return Err(MapError::InvalidPixelCount { npix });
    }
    let nside = isqrt(npix / 12);
    if nside * nside * 12 != npix || nside > MAX_NSIDE as u64 {
        return Err(MapError::InvalidPixelCount { npix });
    }
    Ok(nside as u32)
}

fn isqrt(v: u64) -> u64 {
    let mut r = (v as f64).sqrt() as u64;
    while r * r > v {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}

/// Longitude wrapped into `[0, 4)` in units of π/2.
fn wrapped_tt(phi: f64) -> f64 {
    let tt = phi.rem_euclid(TAU) / FRAC_PI_2;
    // rem_euclid can round up to exactly TAU
    if tt >= 4.0 {
        0.0
    } else {
        tt
    }
}

/// RING index of the pixel containing `(theta, phi)`.
pub fn ang2pix_ring(nside: u32, theta: f64, phi: f64) -> u64 {
    let ns = nside as i64;
    let nl4 = 4 * ns;
    let ncap = 2 * ns * (ns - 1);
    let npix = 12 * ns * ns;

    let z = theta.clamp(0.0, PI).cos();
    let za = z.abs();
    let tt = wrapped_tt(phi);

    let pix = if za <= 2.0 / 3.0 {
        // Equatorial region
        let temp1 = ns as f64 * (0.5 + tt);
        let temp2 = ns as f64 * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;

        let ir = ns + 1 + jp - jm; // in 1..=2n+1
        let kshift = 1 - (ir & 1);
        let t1 = jp + jm - ns + kshift + 1 + 2 * nl4;
        let ip = (t1 / 2) % nl4;

        ncap + (ir - 1) * nl4 + ip
    } else {
        // Polar caps
        let tp = tt - tt.floor();
        let tmp = ns as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = (tp * tmp) as i64;
        let jm = ((1.0 - tp) * tmp) as i64;

        let ir = jp + jm + 1; // ring number counted from the closest pole
        let ip = ((tt * ir as f64) as i64).min(4 * ir - 1);

        if z > 0.0 {
            2 * ir * (ir - 1) + ip
        } else {
            npix - 2 * ir * (ir + 1) + ip
        }
    };

    pix as u64
}

/// NESTED index of the pixel containing `(theta, phi)`.
///
/// `nside` must be a power of two.
pub fn ang2pix_nest(nside: u32, theta: f64, phi: f64) -> u64 {
    let ns = nside as i64;
    let z = theta.clamp(0.0, PI).cos();
    let za = z.abs();
    let tt = wrapped_tt(phi);

    let (face, ix, iy) = if za <= 2.0 / 3.0 {
        let temp1 = ns as f64 * (0.5 + tt);
        let temp2 = ns as f64 * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ifp = jp / ns;
        let ifm = jm / ns;
        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };
        (face, jm & (ns - 1), ns - (jp & (ns - 1)) - 1)
    } else {
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = ns as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = ((tp * tmp) as i64).min(ns - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(ns - 1);
        if z >= 0.0 {
            (ntt, ns - jm - 1, ns - jp - 1)
        } else {
            (ntt + 8, jp, jm)
        }
    };

    (face as u64) * (ns * ns) as u64 + spread_bits(ix as u64) + (spread_bits(iy as u64) << 1)
}

/// Centre of RING pixel `pix` as `(theta, phi)`.
pub fn pix2ang_ring(nside: u32, pix: u64) -> (f64, f64) {
    let ns = nside as i64;
    let pix = pix as i64;
    let ncap = 2 * ns * (ns - 1);
    let npix = 12 * ns * ns;
    let fact2 = 4.0 / npix as f64;

    let (z, phi) = if pix < ncap {
        // North polar cap
        let iring = (1 + isqrt((1 + 2 * pix) as u64) as i64) >> 1;
        let iphi = pix + 1 - 2 * iring * (iring - 1);
        let z = 1.0 - (iring * iring) as f64 * fact2;
        (z, (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64)
    } else if pix < npix - ncap {
        // Equatorial belt
        let ip = pix - ncap;
        let nl4 = 4 * ns;
        let iring = ip / nl4 + ns;
        let iphi = ip % nl4 + 1;
        let fodd = if (iring + ns) & 1 == 1 { 1.0 } else { 0.5 };
        let z = (2 * ns - iring) as f64 * 2.0 / (3.0 * ns as f64);
        (z, (iphi as f64 - fodd) * PI / (2.0 * ns as f64))
    } else {
        // South polar cap
        let ip = npix - pix;
        let iring = (1 + isqrt((2 * ip - 1) as u64) as i64) >> 1;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        let z = -1.0 + (iring * iring) as f64 * fact2;
        (z, (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64)
    };

    (z.clamp(-1.0, 1.0).acos(), phi)
}

const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

/// Convert a NESTED index to the RING index of the same pixel.
pub fn nest2ring(nside: u32, ipix: u64) -> u64 {
    let ns = nside as i64;
    let npface = (ns * ns) as u64;
    let face = (ipix / npface) as usize;
    let rest = ipix % npface;
    let ix = compress_bits(rest) as i64;
    let iy = compress_bits(rest >> 1) as i64;

    let nl4 = 4 * ns;
    let ncap = 2 * ns * (ns - 1);
    let npix = 12 * ns * ns;
    let jr = JRLL[face] * ns - ix - iy - 1;

    let (nr, n_before, kshift) = if jr < ns {
        (jr, 2 * jr * (jr - 1), 0)
    } else if jr > 3 * ns {
        let nr = nl4 - jr;
        (nr, npix - 2 * (nr + 1) * nr, 0)
    } else {
        (ns, ncap + (jr - ns) * nl4, (jr - ns) & 1)
    };

    let mut jp = (JPLL[face] * nr + ix - iy + 1 + kshift) / 2;
    if jp > nl4 {
        jp -= nl4;
    } else if jp < 1 {
        jp += nl4;
    }

    (n_before + jp - 1) as u64
}

/// Interleave the bits of `v` with zeros (x → bits 0, 2, 4, …).
fn spread_bits(v: u64) -> u64 {
    let mut out = 0;
    for bit in 0..32 {
        out |= ((v >> bit) & 1) << (2 * bit);
    }
    out
}

/// Inverse of [`spread_bits`], reading the even bits of `v`.
fn compress_bits(v: u64) -> u64 {
    let mut out = 0;
    for bit in 0..32 {
        out |= ((v >> (2 * bit)) & 1) << bit;
    }
    out
}
