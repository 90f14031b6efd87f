//! Bridging helpers between `image` crate buffers and the pipeline's own
//! frame type. The surrounding application loads reference images once at
//! startup; nothing here is touched by the per-tick pipeline.

use std::path::Path;

use object_spot_core::RgbImage;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to open image file")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image")]
    Decode(#[from] image::ImageError),
}

/// Load an image file into an owned RGB frame.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, LoadError> {
    let decoded = image::ImageReader::open(path)?.decode()?.to_rgb8();
    Ok(from_image(&decoded))
}

/// Convert a decoded `image` buffer into the pipeline's frame type.
pub fn from_image(img: &image::RgbImage) -> RgbImage {
    RgbImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// Convert a pipeline frame back into an `image` buffer, e.g. for saving an
/// annotated frame. `None` if the dimensions do not fit the buffer.
pub fn to_image(img: &RgbImage) -> Option<image::RgbImage> {
    image::RgbImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
}
