use crate::error::RenderError;
use image::RgbaImage;
use std::path::Path;

/// Convert a rendered image into an egui texture image.
pub fn to_color_image(image: &RgbaImage) -> egui::ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw())
}

/// Save a rendered image as PNG.
pub fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<(), RenderError> {
    let path = path.as_ref();
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| RenderError::SaveFailed {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(path = %path.display(), "Saved image");
    Ok(())
}
