/// Lenient base64url decoding for compact token segments
///
/// Issuers differ on padding, so segments are normalised to the standard
/// alphabet and re-padded before decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Decode one base64url segment, with or without `=` padding
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let unpadded = segment.trim_end_matches('=');
    let mut normalized: String = unpadded
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let remainder = normalized.len() % 4;
    if remainder != 0 {
        normalized.extend(std::iter::repeat('=').take(4 - remainder));
    }

    STANDARD.decode(normalized)
}
