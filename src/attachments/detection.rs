use super::types::{Classification, ImageFormat, TextEncoding};
use chardetng::EncodingDetector;

/// Share of control bytes above which data is treated as binary (1 in N).
const CONTROL_BYTE_RATIO: usize = 20;

/// Leading bytes fed to the charset detector.
const DETECTION_WINDOW: usize = 10 * 1_024;

/// Image format by magic bytes; extensions are never consulted.
#[must_use]
pub fn detect_image_format(data: &[u8]) -> Option<ImageFormat> {
    infer::get(data).and_then(|info| ImageFormat::from_mime(info.mime_type()))
}

/// Classify `data` as a supported image or as decodable text.
///
/// Returns `None` when the content is neither.
#[must_use]
pub fn classify(data: &[u8]) -> Option<Classification> {
    if let Some(format) = detect_image_format(data) {
        return Some(Classification::Image(format));
    }
    decode_text(data).map(|(encoding, content)| Classification::Text { encoding, content })
}

/// Permissive text decoding.
///
/// BOM-tagged UTF-8/UTF-16 is honoured, then plain UTF-8. Anything else goes
/// through charset detection, with GBK and then windows-1252 as fallbacks
/// when the guessed encoding cannot decode the data cleanly. Data with NUL
/// bytes, a high share of control bytes, or a recognised binary signature is
/// rejected.
#[must_use]
pub fn decode_text(data: &[u8]) -> Option<(TextEncoding, String)> {
    if let Some(rest) = data.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return std::str::from_utf8(rest)
            .ok()
            .map(|s| (TextEncoding::Utf8Bom, s.to_owned()));
    }
    if let Some(rest) = data.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes).map(|s| (TextEncoding::Utf16Le, s));
    }
    if let Some(rest) = data.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes).map(|s| (TextEncoding::Utf16Be, s));
    }

    if data.contains(&0) || has_binary_signature(data) || too_many_control_bytes(data) {
        return None;
    }

    if let Ok(s) = std::str::from_utf8(data) {
        return Some((TextEncoding::Utf8, s.to_owned()));
    }
    Some(decode_legacy(data))
}

fn decode_legacy(data: &[u8]) -> (TextEncoding, String) {
    let sample = &data[..data.len().min(DETECTION_WINDOW)];
    let mut detector = EncodingDetector::new();
    detector.feed(sample, sample.len() == data.len());
    let guessed = detector.guess(None, false);

    for encoding in [guessed, encoding_rs::GBK] {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(data) {
            return (TextEncoding::Legacy(encoding), text.into_owned());
        }
    }
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(data);
    (
        TextEncoding::Legacy(encoding_rs::WINDOWS_1252),
        text.into_owned(),
    )
}

/// MIME type reported for an accepted text file, by extension.
#[must_use]
pub fn text_mime_from_extension(filename: &str) -> mime::Mime {
    let ext = filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase());
    match ext.as_deref() {
        Some("html" | "htm" | "xhtml") => mime::TEXT_HTML,
        Some("css" | "scss" | "sass" | "less") => mime::TEXT_CSS,
        Some("csv") => mime::TEXT_CSV,
        Some("js" | "mjs" | "cjs" | "jsx") => mime::TEXT_JAVASCRIPT,
        Some("xml" | "xsl" | "xsd") => mime::TEXT_XML,
        Some("json" | "jsonc") => mime::APPLICATION_JSON,
        _ => mime::TEXT_PLAIN,
    }
}

fn decode_utf16(data: &[u8], to_unit: fn([u8; 2]) -> u16) -> Option<String> {
    if data.len() % 2 != 0 {
        return None;
    }
    let units = data.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

fn has_binary_signature(data: &[u8]) -> bool {
    infer::get(data).is_some_and(|info| info.matcher_type() != infer::MatcherType::Text)
}

fn too_many_control_bytes(data: &[u8]) -> bool {
    let control = data
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C | 0x1B))
        .count();
    control * CONTROL_BYTE_RATIO > data.len()
}
