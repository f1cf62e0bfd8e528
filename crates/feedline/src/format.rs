//! Stateless formatting helpers for feed rows.

use time::OffsetDateTime;
use time::macros::format_description;

/// Human-readable file size with a single decimal above the byte range
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Short glyph for a file row, chosen from mime type first, extension second
pub fn file_icon(mime_type: Option<&str>, original_name: Option<&str>) -> &'static str {
    if let Some(mime) = mime_type {
        if is_image_mime(mime) {
            return "🖼";
        }
        if mime.starts_with("audio/") {
            return "🎵";
        }
        if mime.starts_with("video/") {
            return "🎬";
        }
        if mime == "application/pdf" || mime.starts_with("text/") {
            return "📄";
        }
        if mime.contains("zip") || mime.contains("compressed") || mime.contains("tar") {
            return "🗜";
        }
    }
    if let Some(name) = original_name {
        let ext = name.rsplit('.').next().unwrap_or("");
        if matches!(ext, "rs" | "py" | "js" | "ts" | "go" | "c" | "cpp" | "java") {
            return "💻";
        }
    }
    "📎"
}

/// Whether a mime type denotes a previewable image
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Clock-face time for a message meta line (UTC)
pub fn format_time(timestamp_ms: u64) -> String {
    let nanos = i128::from(timestamp_ms) * 1_000_000;
    let Ok(datetime) = OffsetDateTime::from_unix_timestamp_nanos(nanos) else {
        return String::new();
    };
    let description = format_description!("[hour]:[minute]");
    datetime.format(&description).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size_ranges() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2.0 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_file_icon_prefers_mime() {
        assert_eq!(file_icon(Some("image/png"), Some("code.rs")), "🖼");
        assert_eq!(file_icon(Some("audio/ogg"), None), "🎵");
        assert_eq!(file_icon(None, Some("main.rs")), "💻");
        assert_eq!(file_icon(None, Some("notes")), "📎");
    }

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/webp"));
        assert!(!is_image_mime("application/pdf"));
    }

    #[test]
    fn test_format_time() {
        // 2023-11-14 22:13:20 UTC
        assert_eq!(format_time(1_700_000_000_000), "22:13");
    }
}
