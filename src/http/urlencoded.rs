//! `application/x-www-form-urlencoded` decoding
//!
//! Used for both query strings and url-encoded form bodies. Pairs are kept
//! in order so repeated keys are preserved.

/// Split `input` into decoded `(key, value)` pairs.
///
/// A key without `=` yields an empty value. Empty segments are skipped.
pub fn parse(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(key), percent_decode(value))
        })
        .collect()
}

/// First value for `name`, if present.
pub fn first(input: &str, name: &str) -> Option<String> {
    parse(input)
        .into_iter()
        .find_map(|(key, value)| (key == name).then_some(value))
}

/// Decode `%XX` escapes and `+` as space.
pub fn percent_decode(input: &str) -> String {
    decode(input, true)
}

/// Decode `%XX` escapes in a path segment; `+` is kept as is.
pub fn percent_decode_path(input: &str) -> String {
    decode(input, false)
}

/// Bytes are collected first and converted once, so multi-byte UTF-8
/// sequences survive. Malformed escapes are kept literally.
fn decode(input: &str, plus_as_space: bool) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let hi = bytes.get(i + 1).copied().and_then(hex_val);
                let lo = bytes.get(i + 2).copied().and_then(hex_val);
                if let (Some(h), Some(l)) = (hi, lo) {
                    out.push((h << 4) | l);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

const fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
