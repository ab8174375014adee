use std::io::{Cursor, Write};

use snafu::ResultExt;

use crate::bagit::error::*;
use crate::bagit::io::TagLineReader;
use crate::bagit::kv::KeyValueCollection;

/// Writes `kv` as an RFC 8493 §2.2.2 tag file: `Name: Value` pairs, UTF-8, LF-terminated, sorted
/// by name ascending for deterministic output (§4.F). A value with embedded newlines is folded
/// across continuation lines, each starting with a single leading space.
pub fn write_tag_file<W: Write>(kv: &KeyValueCollection, mut writer: W) -> Result<()> {
    let mut pairs: Vec<(&str, &str)> = kv.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    for (name, value) in pairs {
        let folded = value.replace('\n', "\n ");
        writeln!(writer, "{name}: {folded}").context(IoGeneralSnafu {})?;
    }

    Ok(())
}

/// Streaming parser for tag-file content (§4.D / §4.C): accepts bytes as they arrive and, once
/// the file ends, resolves into a `KeyValueCollection` by splitting each logical line (after
/// continuation folding) on the first `:`.
#[derive(Debug, Default)]
pub struct TagFileParser {
    buf: Vec<u8>,
}

impl TagFileParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn end(self) -> Result<KeyValueCollection> {
        let mut kv = KeyValueCollection::new();
        let reader = TagLineReader::new(Cursor::new(self.buf));

        for (num, line) in reader.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match line.split_once(':') {
                Some((name, value)) => kv.add(name.trim(), value.trim_start()),
                None => {
                    return Err(Error::InvalidTagLineWithRef {
                        path: Default::default(),
                        num: num as u32 + 1,
                        details: format!("missing ':' separator: '{line}'"),
                    })
                }
            }
        }

        Ok(kv)
    }
}
