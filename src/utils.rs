const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Media type from the leading magic bytes.
pub fn detect_media_type(bytes: &[u8]) -> &'static str {
    if bytes.len() < 8 {
        return "application/octet-stream";
    }

    if bytes.starts_with(&PNG_MAGIC) {
        return "image/png";
    }

    if bytes.starts_with(&JPEG_MAGIC) {
        return "image/jpeg";
    }

    if bytes.len() > 12
        && bytes[0..4] == [0x52, 0x49, 0x46, 0x46]
        && bytes[8..12] == [0x57, 0x45, 0x42, 0x50]
    {
        return "image/webp";
    }

    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return "image/gif";
    }

    if bytes.starts_with(b"BM") {
        return "image/bmp";
    }

    "application/octet-stream"
}

pub fn format_file_size(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log(THRESHOLD) as usize).min(UNITS.len() - 1);
    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Swaps the extension of `file_name`, appending one when there is none.
pub fn change_file_extension(file_name: &str, extension: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(index) => &file_name[..index],
    };
    format!("{stem}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_signatures() {
        assert_eq!(detect_media_type(&PNG_MAGIC), "image/png");
        assert_eq!(
            detect_media_type(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0]),
            "image/jpeg"
        );
        assert_eq!(detect_media_type(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(detect_media_type(b"GIF89a\0\0"), "image/gif");
        assert_eq!(detect_media_type(b"short"), "application/octet-stream");
    }

    #[test]
    fn sizes_are_binary_units() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(200 * 1024), "200.00 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024 / 2), "1.50 MB");
    }

    #[test]
    fn extension_is_replaced() {
        assert_eq!(change_file_extension("photo.png", "jpg"), "photo.jpg");
        assert_eq!(change_file_extension("archive.tar.png", "webp"), "archive.tar.webp");
        assert_eq!(change_file_extension("README", "png"), "README.png");
        assert_eq!(change_file_extension(".hidden", "png"), ".hidden.png");
    }
}
