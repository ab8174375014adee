use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::str::FromStr;

use digest::DynDigest;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::bagit::consts::SUPPORTED_ALGORITHMS;
use crate::bagit::error::Error::UnknownDigestAlgorithm;
use crate::bagit::error::*;

/// The digest algorithms the registry (§4.A) knows how to hash. Looking one up by an
/// unsupported name is a programming error, not a validation error — callers are expected to
/// have already confirmed the name is one of [`SUPPORTED_ALGORITHMS`] before asking for a
/// hasher.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Builds a fresh hasher for this algorithm, type-erased behind [`DynDigest`] so that a
    /// single [`MultiDigestWriter`] can fan out to any combination of algorithms.
    pub fn new_hasher(self) -> Box<dyn DynDigest> {
        match self {
            DigestAlgorithm::Md5 => Box::<Md5>::default(),
            DigestAlgorithm::Sha1 => Box::<Sha1>::default(),
            DigestAlgorithm::Sha224 => Box::<Sha224>::default(),
            DigestAlgorithm::Sha256 => Box::<Sha256>::default(),
            DigestAlgorithm::Sha384 => Box::<Sha384>::default(),
            DigestAlgorithm::Sha512 => Box::<Sha512>::default(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha224 => "sha224",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "sha224" => Ok(DigestAlgorithm::Sha224),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(UnknownDigestAlgorithm { name: s.to_string() }),
        }
    }
}

/// Returns every name the registry recognizes, lower-case, in the canonical order used to
/// generate manifests.
pub fn supported_algorithm_names() -> &'static [&'static str] {
    &SUPPORTED_ALGORITHMS
}

/// Streams bytes through zero or more hashers in a single pass (§4.D), optionally also
/// forwarding every byte written to an inner sink (a file being written by the bagger, or
/// `io::sink()` when only digests are wanted).
pub struct MultiDigestWriter<W> {
    hashers: Vec<(DigestAlgorithm, Box<dyn DynDigest>)>,
    inner: W,
}

impl<W: Write> MultiDigestWriter<W> {
    pub fn new(algorithms: &[DigestAlgorithm], inner: W) -> Self {
        let hashers = algorithms
            .iter()
            .map(|alg| (*alg, alg.new_hasher()))
            .collect();
        Self { hashers, inner }
    }

    /// Consumes the writer and returns the hex digest produced by each hasher.
    pub fn finalize_hex(self) -> HashMap<DigestAlgorithm, String> {
        self.hashers
            .into_iter()
            .map(|(alg, hasher)| (alg, hex::encode(hasher.finalize())))
            .collect()
    }
}

impl<W: Write> Write for MultiDigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for (_, hasher) in &mut self.hashers {
            hasher.update(buf);
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_known_vector() {
        let mut writer = MultiDigestWriter::new(
            &[DigestAlgorithm::Md5, DigestAlgorithm::Sha256],
            io::sink(),
        );
        writer.write_all(b"hello world").unwrap();
        let digests = writer.finalize_hex();

        assert_eq!(
            Some(&"5eb63bbbe01eeed093cb22bb8f5acdc3".to_string()),
            digests.get(&DigestAlgorithm::Md5)
        );
        assert_eq!(
            Some(&"b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde".to_string()),
            digests.get(&DigestAlgorithm::Sha256)
        );
    }

    #[test]
    fn rejects_unknown_algorithm_name() {
        assert!("blake3".parse::<DigestAlgorithm>().is_err());
        assert_eq!(DigestAlgorithm::Sha512, "SHA512".parse().unwrap());
    }
}
