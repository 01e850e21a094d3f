//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! The stored upload may be a JPEG, an animated GIF or a 40-megapixel photo.
//! The model only needs a still, reasonably sized frame, so the decoded image
//! is downscaled to a maximum side length and re-encoded as PNG before it is
//! embedded in the request body.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a decoded upload as a base64 PNG ready for the VLM API.
///
/// Images whose longer side exceeds `max_dimension` are shrunk proportionally;
/// smaller images are sent as-is.
pub fn encode_image(img: &DynamicImage, max_dimension: u32) -> Result<ImageData, image::ImageError> {
    let scaled;
    let img = if img.width() > max_dimension || img.height() > max_dimension {
        scaled = img.thumbnail(max_dimension, max_dimension);
        debug!(
            "Downscaled {}x{} → {}x{} for the model",
            img.width(),
            img.height(),
            scaled.width(),
            scaled.height()
        );
        &scaled
    } else {
        img
    };

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_image(&img, 2048).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        let back = image::load_from_memory(&decoded).expect("valid png");
        assert_eq!((back.width(), back.height()), (10, 10));
    }

    #[test]
    fn encode_downscales_large_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(400, 100, Rgba([0, 0, 255, 255])));
        let data = encode_image(&img, 200).expect("encode should succeed");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        let back = image::load_from_memory(&decoded).expect("valid png");
        assert_eq!(back.width(), 200);
        assert_eq!(back.height(), 50);
    }
}
