//! Content-type sniffing for uploads and file extensions for downloads.

/// Number of leading bytes inspected when sniffing.
pub const SNIFF_LEN: usize = 512;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess the content type of a payload from its first [`SNIFF_LEN`] bytes.
///
/// Known binary signatures are matched first. Anything else is plain text
/// unless it contains control bytes that never occur in text.
pub fn detect_content_type(data: &[u8]) -> String {
    let head = &data[..data.len().min(SNIFF_LEN)];
    if let Some(kind) = infer::get(head) {
        return kind.mime_type().to_string();
    }
    if head.iter().any(|&b| is_binary_byte(b)) {
        OCTET_STREAM.to_string()
    } else {
        TEXT_PLAIN.to_string()
    }
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

/// Preferred file extension (without the dot) for a content type.
///
/// Parameters such as `; charset=utf-8` are ignored.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "text/plain" => Some("txt"),
        "application/octet-stream" => Some("bin"),
        "image/jpeg" => Some("jpg"),
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|extensions| extensions.first().copied()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_known_signatures() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(detect_content_type(png), "image/png");
        assert_eq!(detect_content_type(b"%PDF-1.7\n"), "application/pdf");
    }

    #[test]
    fn text_and_binary_fallbacks() {
        assert_eq!(detect_content_type(b"hello"), TEXT_PLAIN);
        assert_eq!(detect_content_type(b""), TEXT_PLAIN);
        assert_eq!(detect_content_type(&[0x01, 0x02, 0x03, 0xff]), OCTET_STREAM);
    }

    #[test]
    fn only_leading_bytes_are_inspected() {
        let mut data = vec![b'a'; SNIFF_LEN];
        data.push(0x00);
        assert_eq!(detect_content_type(&data), TEXT_PLAIN);
    }

    #[test]
    fn extensions_ignore_parameters() {
        assert_eq!(extension_for("text/plain; charset=utf-8"), Some("txt"));
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("application/x-definitely-unknown"), None);
    }
}
