//! QR-code reading and rendering.
//!
//! Decoding loads any PNG/JPEG through the `image` crate, converts it to
//! greyscale and hands the luma plane to `rqrr` for grid detection.
//! Encoding uses `qrcode` and renders a PNG, which is how enrollment
//! payloads are displayed back and how test fixtures are produced.

use std::path::Path;

use image::{GrayImage, Luma};
use qrcode::QrCode;

use crate::verify::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Decode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode the first readable QR code in an encoded raster image.
pub fn decode_qr_image(bytes: &[u8]) -> Result<String, VerifyError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| VerifyError::Unreadable(format!("image decode error: {}", e)))?
        .to_luma8();
    decode_qr_luma(&img)
}

/// Read an image file and decode the QR code it contains.
pub fn decode_qr_file(path: impl AsRef<Path>) -> Result<String, VerifyError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        VerifyError::Unreadable(format!("cannot read {}: {}", path.display(), e))
    })?;
    decode_qr_image(&bytes)
}

fn decode_qr_luma(img: &GrayImage) -> Result<String, VerifyError> {
    let (width, height) = img.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        width as usize,
        height as usize,
        |x, y| img.get_pixel(x as u32, y as u32).0[0],
    );

    let grids = prepared.detect_grids();
    if grids.is_empty() {
        return Err(VerifyError::Unreadable("no QR code detected".into()));
    }

    let mut last_error = String::new();
    for grid in grids {
        match grid.decode() {
            Ok((_meta, content)) => return Ok(content),
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(VerifyError::Unreadable(format!("QR decode error: {}", last_error)))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Encode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Module size in pixels (each QR "module" becomes this many px wide).
const MODULE_PX: u32 = 8;
/// Quiet-zone border in modules.
const QUIET_ZONE: u32 = 4;

/// Render `text` as a QR code and return the PNG bytes.
pub fn text_to_qr_png(text: &str, module_px: Option<u32>) -> Result<Vec<u8>, VerifyError> {
    let code = QrCode::new(text.as_bytes())
        .map_err(|e| VerifyError::InvalidUri(format!("QR encode error: {}", e)))?;

    let px = module_px.unwrap_or(MODULE_PX).max(1);
    let matrix = code.to_colors();
    let width = code.width() as u32;
    let img_size = (width + QUIET_ZONE * 2) * px;

    let mut img = GrayImage::from_pixel(img_size, img_size, Luma([255u8]));

    for y in 0..width {
        for x in 0..width {
            if matrix[(y * width + x) as usize] == qrcode::Color::Dark {
                let px_x = (x + QUIET_ZONE) * px;
                let px_y = (y + QUIET_ZONE) * px;
                for dy in 0..px {
                    for dx in 0..px {
                        img.put_pixel(px_x + dx, px_y + dy, Luma([0u8]));
                    }
                }
            }
        }
    }

    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img_size,
        img_size,
        image::ExtendedColorType::L8,
    )
    .map_err(|e| VerifyError::Unreadable(format!("PNG encode error: {}", e)))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = "oktaverify://enroll?t=tok123&f=aut456&issuer=acme.okta.com";

    #[test]
    fn png_has_magic() {
        let png = text_to_qr_png(PAYLOAD, None).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn encode_then_decode() {
        let png = text_to_qr_png(PAYLOAD, None).unwrap();
        assert_eq!(decode_qr_image(&png).unwrap(), PAYLOAD);
    }

    #[test]
    fn decode_small_modules() {
        let png = text_to_qr_png(PAYLOAD, Some(4)).unwrap();
        assert_eq!(decode_qr_image(&png).unwrap(), PAYLOAD);
    }

    #[test]
    fn garbage_bytes_unreadable() {
        let err = decode_qr_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, VerifyError::Unreadable(_)));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn blank_image_unreadable() {
        let img = GrayImage::from_pixel(64, 64, Luma([255u8]));
        let err = decode_qr_luma(&img).unwrap_err();
        assert!(matches!(err, VerifyError::Unreadable(_)));
    }

    #[test]
    fn decode_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr.png");
        std::fs::write(&path, text_to_qr_png(PAYLOAD, None).unwrap()).unwrap();
        assert_eq!(decode_qr_file(&path).unwrap(), PAYLOAD);
    }

    #[test]
    fn missing_file_unreadable() {
        let err = decode_qr_file("/nonexistent/qr.png").unwrap_err();
        assert!(matches!(err, VerifyError::Unreadable(_)));
    }
}
