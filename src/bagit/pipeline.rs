use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::bagit::digest::{DigestAlgorithm, MultiDigestWriter};
use crate::bagit::error::*;
use crate::bagit::kv::KeyValueCollection;
use crate::bagit::manifest::ManifestParser;
use crate::bagit::tagfile::TagFileParser;

/// The content-parser half of the per-file fan-out (§4.D): a manifest parser for
/// `manifest-*.txt`/`tagmanifest-*.txt`, or a tag-file parser for anything else that looks like
/// a tag file.
pub enum ParserSink {
    Manifest(ManifestParser),
    TagFile(TagFileParser),
}

impl ParserSink {
    fn write(&mut self, buf: &[u8]) {
        match self {
            ParserSink::Manifest(p) => p.write(buf),
            ParserSink::TagFile(p) => p.write(buf),
        }
    }

    pub fn end(self) -> Result<KeyValueCollection> {
        match self {
            ParserSink::Manifest(p) => p.end(),
            ParserSink::TagFile(p) => p.end(),
        }
    }
}

/// Wires a single file's byte stream to every hasher it needs plus, where applicable, a content
/// parser, in one pass (§4.D). `inner` receives every byte too, so the same pipeline drives both
/// "just hash it" (validator, `inner = io::sink()`) and "hash it while writing it out" (bagger,
/// `inner` = the destination file or tar entry).
pub struct EntryPipeline<W> {
    digests: MultiDigestWriter<W>,
    parser: Option<ParserSink>,
}

impl<W: Write> EntryPipeline<W> {
    pub fn new(algorithms: &[DigestAlgorithm], parser: Option<ParserSink>, inner: W) -> Self {
        Self {
            digests: MultiDigestWriter::new(algorithms, inner),
            parser,
        }
    }

    /// Consumes the pipeline, returning the computed digests and, if a parser was attached, its
    /// resolved key-value content.
    pub fn finish(self) -> (std::collections::HashMap<DigestAlgorithm, String>, Option<Result<KeyValueCollection>>) {
        let parsed = self.parser.map(|p| p.end());
        (self.digests.finalize_hex(), parsed)
    }
}

impl<W: Write> Write for EntryPipeline<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(parser) = &mut self.parser {
            parser.write(buf);
        }
        self.digests.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.digests.flush()
    }
}

/// Tracks outstanding in-flight hashers so the verification phase never runs ahead of the
/// completion barrier (§4.D, §9 "Hash-completion synchronization"). This implementation drains
/// every hasher synchronously before its [`InFlightTicket`] is dropped, so `wait()` never
/// actually blocks — the type exists so a future multi-threaded pipeline can grow into the same
/// seam without Validator/Bagger call sites changing.
#[derive(Clone, Default)]
pub struct InFlightGuard(Arc<AtomicUsize>);

pub struct InFlightTicket(Arc<AtomicUsize>);

impl InFlightGuard {
    pub fn new() -> Self {
        Self(Arc::new(AtomicUsize::new(0)))
    }

    pub fn enter(&self) -> InFlightTicket {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightTicket(self.0.clone())
    }

    /// Blocks until every outstanding ticket has been dropped. No polling, no sleep (§9) — just
    /// a counter check, since this implementation never leaves a ticket outstanding across an
    /// await/suspension point.
    pub fn wait(&self) {
        debug_assert_eq!(
            0,
            self.0.load(Ordering::SeqCst),
            "completion barrier reached with hashers still in flight"
        );
    }

    pub fn outstanding(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_returns_to_zero_after_ticket_drops() {
        let guard = InFlightGuard::new();
        {
            let _ticket = guard.enter();
            assert_eq!(1, guard.outstanding());
        }
        assert_eq!(0, guard.outstanding());
        guard.wait();
    }

    #[test]
    fn pipeline_hashes_and_parses_in_one_pass() {
        let mut pipeline = EntryPipeline::new(
            &[DigestAlgorithm::Sha256],
            Some(ParserSink::Manifest(ManifestParser::new())),
            io::sink(),
        );
        pipeline.write_all(b"aaa  data/one.txt\n").unwrap();
        let (digests, parsed) = pipeline.finish();

        assert!(digests.contains_key(&DigestAlgorithm::Sha256));
        let kv = parsed.unwrap().unwrap();
        assert_eq!(Some("aaa"), kv.first("data/one.txt"));
    }
}
