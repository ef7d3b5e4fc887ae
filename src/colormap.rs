use palette::{LinSrgb, Mix, Srgb};

/// Viridis anchor colours at evenly spaced positions in `[0, 1]`.
const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (72, 40, 120),
    (59, 82, 139),
    (44, 113, 142),
    (33, 145, 140),
    (40, 174, 128),
    (94, 201, 98),
    (173, 220, 48),
    (253, 231, 37),
];

const LUT_SIZE: usize = 256;

/// Colour for pixels without data.
pub const BAD_COLOR: [u8; 4] = [128, 128, 128, 255];
/// Colour outside the projected sky.
pub const BACKGROUND: [u8; 4] = [255, 255, 255, 255];

/// Continuous colormap sampled into a lookup table.
#[derive(Debug, Clone)]
pub struct Colormap {
    lut: Vec<[u8; 4]>,
}

impl Colormap {
    /// Matplotlib's viridis, the default for mollview plots.
    pub fn viridis() -> Self {
        Self::from_anchors(&VIRIDIS)
    }

    fn from_anchors(anchors: &[(u8, u8, u8)]) -> Self {
        let linear: Vec<LinSrgb<f32>> = anchors
            .iter()
            .map(|&(r, g, b)| Srgb::new(r, g, b).into_format::<f32>().into_linear())
            .collect();
        let segments = (linear.len() - 1) as f32;

        let lut = (0..LUT_SIZE)
            .map(|i| {
                let t = i as f32 / (LUT_SIZE - 1) as f32 * segments;
                let lo = (t.floor() as usize).min(linear.len() - 2);
                let mixed = linear[lo].mix(linear[lo + 1], t - lo as f32);
                let encoded: Srgb<f32> = Srgb::from_linear(mixed);
                let rgb: Srgb<u8> = encoded.into_format();
                [rgb.red, rgb.green, rgb.blue, 255]
            })
            .collect();

        Self { lut }
    }

    /// Colour for a normalized value; `t` is clamped to `[0, 1]`.
    pub fn color(&self, t: f64) -> [u8; 4] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self.lut[(t * (LUT_SIZE - 1) as f64).round() as usize]
    }
}

impl Default for Colormap {
    fn default() -> Self {
        Self::viridis()
    }
}
