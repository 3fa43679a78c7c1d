use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use rand::Rng;
use std::io::Cursor;

/// Prefix prepended to booking codes when encoded into a QR payload.
pub const BOOKING_CODE_PREFIX: &str = "BJC:";

/// Code alphabet without the glyphs people misread (0/O, 1/I/L).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

/// Generate a short human-typeable booking code.
pub fn generate_booking_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Normalize a staff-entered code: trim, uppercase, strip the QR prefix.
/// Accepts both the typed form (`abc123`) and the scanned form
/// (`BJC:ABC123`).
pub fn normalize_booking_code(input: &str) -> String {
    let code = input.trim().to_uppercase();
    code.strip_prefix(BOOKING_CODE_PREFIX)
        .unwrap_or(&code)
        .to_string()
}

/// QR payload for a booking code.
pub fn qr_payload(code: &str) -> String {
    format!("{BOOKING_CODE_PREFIX}{code}")
}

/// Render data as a base64-encoded PNG QR image.
pub fn generate_qr_base64(data: &str) -> Result<String> {
    let code = QrCode::new(data)?;
    let image = code.render::<Luma<u8>>().build();

    let dynamic_image = DynamicImage::ImageLuma8(image);
    let mut buffer = Cursor::new(Vec::new());
    dynamic_image.write_to(&mut buffer, image::ImageOutputFormat::Png)?;

    Ok(general_purpose::STANDARD.encode(buffer.get_ref()))
}
