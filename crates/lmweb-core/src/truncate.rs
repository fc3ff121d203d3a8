//! Budget helpers for text that gets fed back into a model context.

/// Longest prefix of `s` that fits in `max_bytes` without splitting a UTF-8 character.
///
/// ASCII input is cut to exactly `max_bytes`.
pub fn truncate_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// `bytes` without a multi-byte UTF-8 sequence left incomplete at the end.
pub fn trim_partial_utf8(bytes: &[u8]) -> &[u8] {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let b = bytes[len - back];
        // Continuation bytes are 0b10xx_xxxx; keep walking back to the lead byte.
        if b & 0xC0 == 0x80 {
            continue;
        }
        let need = match b {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if need > back { &bytes[..len - back] } else { bytes };
    }
    bytes
}

/// First `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
