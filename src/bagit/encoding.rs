use crate::bagit::consts::*;
use std::borrow::Cow;

const CR_ENCODED: &str = "%0D";
const LF_ENCODED: &str = "%0A";
const PERCENT_ENCODED: &str = "%25";

/// Percent encodes any CR, LF, or % characters in the input string
pub fn percent_encode(value: &str) -> Cow<str> {
    if let Some(i) = value.find(|c: char| c == CR || c == LF || c == '%') {
        let mut encoded = Vec::with_capacity(value.len() + 2);
        encoded.extend_from_slice(value[..i].as_bytes());

        let search = value[i..].bytes();

        for c in search {
            match c {
                CR_B => encoded.extend_from_slice(CR_ENCODED.as_bytes()),
                LF_B => encoded.extend_from_slice(LF_ENCODED.as_bytes()),
                b'%' => encoded.extend_from_slice(PERCENT_ENCODED.as_bytes()),
                _ => encoded.push(c),
            }
        }

        // This is fine because the original value is known to be valid UTF-8
        Cow::Owned(unsafe { String::from_utf8_unchecked(encoded) })
    } else {
        value.into()
    }
}

/// Reverses [`percent_encode`]: resolves `%0D`, `%0A`, and `%25` escapes back to CR, LF, and `%`
/// (§4.2.2). Unrecognized `%xx` sequences are left untouched rather than treated as an error,
/// since a manifest path may legitimately contain a literal `%` followed by other characters.
pub fn percent_decode(value: &str) -> Cow<str> {
    if !value.contains('%') {
        return value.into();
    }

    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            match &bytes[i..i + 3] {
                b"%0D" => {
                    decoded.push(CR_B);
                    i += 3;
                    continue;
                }
                b"%0A" => {
                    decoded.push(LF_B);
                    i += 3;
                    continue;
                }
                b"%25" => {
                    decoded.push(b'%');
                    i += 3;
                    continue;
                }
                _ => {}
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    // Fine because the only transformation is dropping recognized ASCII %xx triplets, which
    // can't split a multi-byte UTF-8 sequence.
    Cow::Owned(unsafe { String::from_utf8_unchecked(decoded) })
}
