use std::io::Cursor;

use crate::bagit::encoding::{percent_decode, percent_encode};
use crate::bagit::error::*;
use crate::bagit::io::LineReader;
use crate::bagit::kv::KeyValueCollection;

/// Splits a manifest line of the form `<hex-digest><SP><relpath>` into `(digest, path)`. The
/// path may itself contain whitespace; everything after the first run of whitespace belongs to
/// it (§6.2). The path is returned percent-decoded, reversing any CR/LF/`%` escaping applied on
/// write (§4.2.2).
pub fn parse_manifest_line(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(char::is_whitespace)?;
    let digest = &line[..idx];
    let path = line[idx..].trim_start();
    if digest.is_empty() || path.is_empty() {
        None
    } else {
        Some((digest, path))
    }
}

/// Formats a manifest line, percent-encoding any CR, LF, or `%` in `rel_path` so the line stays
/// on a single, unambiguous row (§4.2.2).
pub fn format_manifest_line(digest: &str, rel_path: &str) -> String {
    format!("{digest}  {}\n", percent_encode(rel_path))
}

/// Streaming parser for `manifest-<alg>.txt` / `tagmanifest-<alg>.txt` content (§4.D): accepts
/// bytes as they arrive from the reader and, once the file ends, resolves into a
/// `KeyValueCollection` mapping relative path -> digest.
#[derive(Debug, Default)]
pub struct ManifestParser {
    buf: Vec<u8>,
}

impl ManifestParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn end(self) -> Result<KeyValueCollection> {
        let mut kv = KeyValueCollection::new();
        let reader = LineReader::new(Cursor::new(self.buf));
        for line in reader {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some((digest, path)) = parse_manifest_line(&line) {
                kv.add(percent_decode(path).into_owned(), digest);
            } else {
                return Err(Error::InvalidTagLine {
                    details: format!("malformed manifest line: '{line}'"),
                });
            }
        }
        Ok(kv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_line() {
        assert_eq!(
            Some(("abc123", "data/file.txt")),
            parse_manifest_line("abc123  data/file.txt")
        );
    }

    #[test]
    fn path_may_contain_spaces() {
        assert_eq!(
            Some(("abc123", "data/my file.txt")),
            parse_manifest_line("abc123 data/my file.txt")
        );
    }

    #[test]
    fn parser_builds_collection() {
        let mut parser = ManifestParser::new();
        parser.write(b"aaa  data/one.txt\n");
        parser.write(b"bbb  data/two.txt\n");
        let kv = parser.end().unwrap();

        assert_eq!(Some("aaa"), kv.first("data/one.txt"));
        assert_eq!(Some("bbb"), kv.first("data/two.txt"));
    }

    #[test]
    fn path_with_newline_round_trips_through_percent_encoding() {
        let line = format_manifest_line("aaa", "data/odd\nname.txt");
        assert_eq!("aaa  data/odd%0Aname.txt\n", line);

        let mut parser = ManifestParser::new();
        parser.write(line.as_bytes());
        let kv = parser.end().unwrap();
        assert_eq!(Some("aaa"), kv.first("data/odd\nname.txt"));
    }
}
