//! Full-sky Mollweide rendering of HEALPix maps.
//!
//! Produces an RGBA image of the projected map with an optional coordinate
//! graticule and a horizontal colour bar underneath, the same layout as a
//! `mollview` plot.

use crate::colormap::{Colormap, BACKGROUND, BAD_COLOR};
use crate::error::RenderError;
use crate::map::{is_bad, CoordSys, HealpixMap};
use crate::projection::MollweideFrame;
use image::{Pixel, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// Colour scale normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    Linear,
    #[default]
    Log,
}

/// Coordinate grid spacing in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Graticule {
    /// Spacing between parallels
    pub dpar_deg: f64,
    /// Spacing between meridians
    pub dmer_deg: f64,
}

impl Default for Graticule {
    fn default() -> Self {
        Self {
            dpar_deg: 30.0,
            dmer_deg: 30.0,
        }
    }
}

impl Graticule {
    fn validate(&self) -> Result<(), RenderError> {
        for spacing_deg in [self.dpar_deg, self.dmer_deg] {
            if !(spacing_deg > 0.0 && spacing_deg <= 180.0) {
                return Err(RenderError::InvalidGraticule { spacing_deg });
            }
        }
        Ok(())
    }
}

/// Rendering options.
#[derive(Debug, Clone, PartialEq)]
pub struct MollviewParams {
    /// Image width in pixels; the map area is half as tall
    pub width: u32,
    pub norm: Norm,
    /// Lower bound of the colour scale (defaults to the data minimum)
    pub min: Option<f64>,
    /// Upper bound of the colour scale (defaults to the data maximum)
    pub max: Option<f64>,
    /// Grid overlay, `None` to disable
    pub graticule: Option<Graticule>,
}

impl Default for MollviewParams {
    fn default() -> Self {
        Self {
            width: 800,
            norm: Norm::Log,
            min: Some(1.0),
            max: None,
            graticule: Some(Graticule::default()),
        }
    }
}

/// Resolved bounds and normalization of the colour scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
    pub norm: Norm,
}

impl ColorScale {
    /// Resolve the scale for `map`, filling unset bounds from the data.
    pub fn resolve(
        map: &HealpixMap,
        norm: Norm,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Self, RenderError> {
        let range = map.valid_range();

        let min = match (min, norm) {
            (Some(min), _) => min,
            (None, Norm::Linear) => range.map_or(0.0, |(lo, _)| lo),
            // Smallest positive value, since log scales cannot start at or below zero
            (None, Norm::Log) => map
                .values
                .iter()
                .copied()
                .filter(|v| !is_bad(*v) && *v > 0.0)
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
                .unwrap_or(1.0),
        };
        if norm == Norm::Log && min <= 0.0 {
            return Err(RenderError::NonPositiveLogMin { min });
        }

        let max = max.unwrap_or_else(|| range.map_or(min, |(_, hi)| hi.max(min)));

        Ok(Self { min, max, norm })
    }

    /// Position of `value` on the scale in `[0, 1]`, clipping out-of-range values.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.max <= self.min {
            return 0.0;
        }
        let v = value.clamp(self.min, self.max);
        let t = match self.norm {
            Norm::Linear => (v - self.min) / (self.max - self.min),
            Norm::Log => {
                (v.log10() - self.min.log10()) / (self.max.log10() - self.min.log10())
            }
        };
        t.clamp(0.0, 1.0)
    }
}

/// A rendered map plus the information needed to label it.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub image: RgbaImage,
    pub frame: MollweideFrame,
    pub scale: ColorScale,
    pub coordsys: Option<CoordSys>,
}

const GRID_COLOR: Rgba<u8> = Rgba([40, 40, 40, 110]);
const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Render `map` as a full-sky Mollweide projection.
pub fn render_mollview(
    map: &HealpixMap,
    params: &MollviewParams,
) -> Result<RenderedMap, RenderError> {
    if !(16..=16384).contains(&params.width) {
        return Err(RenderError::InvalidWidth {
            width: params.width,
        });
    }
    if let Some(graticule) = &params.graticule {
        graticule.validate()?;
    }

    let scale = ColorScale::resolve(map, params.norm, params.min, params.max)?;
    let cmap = Colormap::viridis();
    let frame = MollweideFrame::new(params.width);
    let bar_area = colorbar_area_height(frame);
    let mut image = RgbaImage::from_pixel(
        frame.width,
        frame.height + bar_area,
        Rgba(BACKGROUND),
    );

    for py in 0..frame.height {
        for px in 0..frame.width {
            if let Some((lon, lat)) = frame.pixel_to_sky(px, py) {
                let value = map.value_at(FRAC_PI_2 - lat, lon);
                let color = if is_bad(value) {
                    BAD_COLOR
                } else {
                    cmap.color(scale.normalize(value))
                };
                image.put_pixel(px, py, Rgba(color));
            }
        }
    }

    if let Some(graticule) = &params.graticule {
        draw_graticule(&mut image, frame, graticule);
    }
    draw_outline(&mut image, frame);
    draw_colorbar(&mut image, frame, &cmap);

    tracing::debug!(
        width = frame.width,
        height = image.height(),
        min = scale.min,
        max = scale.max,
        norm = ?scale.norm,
        "Rendered mollview"
    );

    Ok(RenderedMap {
        image,
        frame,
        scale,
        coordsys: map.coordsys,
    })
}

fn colorbar_area_height(frame: MollweideFrame) -> u32 {
    (frame.height / 8).max(6)
}

/// Trace a sky curve `t -> (lon, lat)` for `t` in `[0, 1]`, blending each
/// image pixel it crosses once.
fn trace<F>(image: &mut RgbaImage, frame: MollweideFrame, color: Rgba<u8>, curve: F)
where
    F: Fn(f64) -> (f64, f64),
{
    // Enough samples that consecutive points are under a pixel apart
    let samples = (frame.width as usize * 4).max(64);
    let mut last = None;
    for i in 0..=samples {
        let (lon, lat) = curve(i as f64 / samples as f64);
        let (x, y) = frame.sky_to_pixel(lon, lat);
        if x < 0.0 || y < 0.0 {
            continue;
        }
        // The ±180° meridian lands exactly on the right edge
        let px = (x as u32).min(frame.width - 1);
        let py = y as u32;
        if py >= frame.height || last == Some((px, py)) {
            continue;
        }
        image.get_pixel_mut(px, py).blend(&color);
        last = Some((px, py));
    }
}

fn draw_graticule(image: &mut RgbaImage, frame: MollweideFrame, graticule: &Graticule) {
    // Parallels, excluding the poles
    let dpar = graticule.dpar_deg.to_radians();
    let mut lat = -FRAC_PI_2 + dpar;
    while lat < FRAC_PI_2 - 1e-9 {
        trace(image, frame, GRID_COLOR, |t| (-PI + 2.0 * PI * t, lat));
        lat += dpar;
    }

    // Meridians; the ±180° meridian is the outline
    let dmer = graticule.dmer_deg.to_radians();
    trace(image, frame, GRID_COLOR, |t| (0.0, -FRAC_PI_2 + PI * t));
    let mut lon = dmer;
    while lon < PI - 1e-9 {
        for meridian in [lon, -lon] {
            trace(image, frame, GRID_COLOR, |t| (meridian, -FRAC_PI_2 + PI * t));
        }
        lon += dmer;
    }
}

fn draw_outline(image: &mut RgbaImage, frame: MollweideFrame) {
    for edge in [PI, -PI] {
        trace(image, frame, OUTLINE_COLOR, |t| (edge, -FRAC_PI_2 + PI * t));
    }
}

fn draw_colorbar(image: &mut RgbaImage, frame: MollweideFrame, cmap: &Colormap) {
    let area = colorbar_area_height(frame);
    let x0 = frame.width / 5;
    let x1 = frame.width - frame.width / 5;
    let y0 = frame.height + area / 3;
    let y1 = (frame.height + area - area / 6).max(y0 + 1);

    for x in x0..x1 {
        let t = (x - x0) as f64 / (x1 - x0 - 1).max(1) as f64;
        let color = Rgba(cmap.color(t));
        for y in y0..y1 {
            image.put_pixel(x, y, color);
        }
    }
    for x in x0..x1 {
        image.put_pixel(x, y0, OUTLINE_COLOR);
        image.put_pixel(x, y1 - 1, OUTLINE_COLOR);
    }
    for y in y0..y1 {
        image.put_pixel(x0, y, OUTLINE_COLOR);
        image.put_pixel(x1 - 1, y, OUTLINE_COLOR);
    }
}
