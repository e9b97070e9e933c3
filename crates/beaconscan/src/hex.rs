//! Lowercase hex formatting for identity keys and packet dumps

/// Format `bytes` as two lowercase hex digits per byte joined by `separator`
pub fn to_hex(bytes: &[u8], separator: &str) -> String {
    let digits = ::hex::encode(bytes);
    if separator.is_empty() {
        return digits;
    }

    let mut out = String::with_capacity(digits.len() + bytes.len() * separator.len());
    for start in (0..digits.len()).step_by(2) {
        if start > 0 {
            out.push_str(separator);
        }
        out.push_str(&digits[start..start + 2]);
    }
    out
}

/// Hex without separators, as used in identity keys
pub fn to_hex_plain(bytes: &[u8]) -> String {
    to_hex(bytes, "")
}

/// Colon separated hex, as used for MAC addresses and diagnostics
pub fn to_hex_colon(bytes: &[u8]) -> String {
    to_hex(bytes, ":")
}
