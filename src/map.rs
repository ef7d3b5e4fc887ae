//! In-memory HEALPix map and file-level load/save.

use crate::error::{MapError, Result};
use crate::fits;
use crate::healpix::{self, Ordering};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Sentinel value HEALPix tools use for unobserved pixels.
pub const UNSEEN: f64 = -1.6375e30;

/// Returns `true` for pixels that carry no data (UNSEEN, NaN or infinite).
pub fn is_bad(value: f64) -> bool {
    !value.is_finite() || (value - UNSEEN).abs() <= UNSEEN.abs() * 1e-5
}

/// Coordinate frame of the pixelization (`COORDSYS` keyword).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordSys {
    Galactic,
    Ecliptic,
    Celestial,
}

impl CoordSys {
    pub fn as_str(self) -> &'static str {
        match self {
            CoordSys::Galactic => "G",
            CoordSys::Ecliptic => "E",
            CoordSys::Celestial => "C",
        }
    }

    /// Label used under the projection
    pub fn label(self) -> &'static str {
        match self {
            CoordSys::Galactic => "Galactic",
            CoordSys::Ecliptic => "Ecliptic",
            CoordSys::Celestial => "Equatorial",
        }
    }
}

impl fmt::Display for CoordSys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CoordSys {
    type Err = MapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "G" | "GALACTIC" => Ok(CoordSys::Galactic),
            "E" | "ECLIPTIC" => Ok(CoordSys::Ecliptic),
            "C" | "Q" | "EQUATORIAL" | "CELESTIAL" => Ok(CoordSys::Celestial),
            other => Err(MapError::InvalidKeyword {
                keyword: "COORDSYS".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// A full-sky map: one value per pixel, indexed by `ordering`.
#[derive(Debug, Clone, PartialEq)]
pub struct HealpixMap {
    pub nside: u32,
    pub ordering: Ordering,
    pub coordsys: Option<CoordSys>,
    pub values: Vec<f64>,
}

impl HealpixMap {
    /// Build a map, checking that `values` holds exactly 12·nside² pixels.
    pub fn new(
        nside: u32,
        ordering: Ordering,
        coordsys: Option<CoordSys>,
        values: Vec<f64>,
    ) -> std::result::Result<Self, MapError> {
        let nside = healpix::validate_nside(nside as u64, ordering)?;
        let expected = healpix::nside2npix(nside);
        if values.len() as u64 != expected {
            return Err(MapError::SizeMismatch {
                nside,
                expected,
                actual: values.len() as u64,
            });
        }
        Ok(Self {
            nside,
            ordering,
            coordsys,
            values,
        })
    }

    pub fn npix(&self) -> u64 {
        self.values.len() as u64
    }

    /// Value of the pixel containing direction `(theta, phi)`.
    pub fn value_at(&self, theta: f64, phi: f64) -> f64 {
        let pix = self.ordering.ang2pix(self.nside, theta, phi);
        self.values[pix as usize]
    }

    /// Smallest and largest good pixel values, `None` if every pixel is bad.
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| !is_bad(*v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Same map in RING ordering.
    pub fn to_ring(&self) -> HealpixMap {
        match self.ordering {
            Ordering::Ring => self.clone(),
            Ordering::Nested => {
                let mut values = vec![UNSEEN; self.values.len()];
                for (nest, &v) in self.values.iter().enumerate() {
                    values[healpix::nest2ring(self.nside, nest as u64) as usize] = v;
                }
                HealpixMap {
                    nside: self.nside,
                    ordering: Ordering::Ring,
                    coordsys: self.coordsys,
                    values,
                }
            }
        }
    }

    /// Same map in NESTED ordering. Fails when `nside` is not a power of two.
    pub fn to_nested(&self) -> std::result::Result<HealpixMap, MapError> {
        if self.ordering == Ordering::Nested {
            return Ok(self.clone());
        }
        healpix::validate_nside(self.nside as u64, Ordering::Nested)?;
        let values = (0..self.npix())
            .map(|nest| self.values[healpix::nest2ring(self.nside, nest) as usize])
            .collect();
        Ok(HealpixMap {
            nside: self.nside,
            ordering: Ordering::Nested,
            coordsys: self.coordsys,
            values,
        })
    }
}

/// Load a full-sky map from a HEALPix FITS file.
pub fn read_map<P: AsRef<Path>>(path: P) -> Result<HealpixMap> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| MapError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let map = fits::parse_healpix(&bytes)?;

    tracing::info!(
        path = %path.display(),
        nside = map.nside,
        ordering = %map.ordering,
        coordsys = ?map.coordsys,
        "Loaded HEALPix map"
    );

    Ok(map)
}

/// Save `map` as a HEALPix FITS file, replacing any existing file.
pub fn write_map<P: AsRef<Path>>(path: P, map: &HealpixMap) -> Result<()> {
    let path = path.as_ref();
    let write_failed = |source| MapError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::create(path).map_err(write_failed)?;
    let mut out = BufWriter::new(file);
    fits::write_healpix(&mut out, map).map_err(write_failed)?;
    out.flush().map_err(write_failed)?;

    tracing::debug!(path = %path.display(), npix = map.npix(), "Wrote HEALPix map");
    Ok(())
}
