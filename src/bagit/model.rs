use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use crate::bagit::consts::*;
use crate::bagit::error::Error::*;
use crate::bagit::error::*;
use crate::bagit::kv::KeyValueCollection;

/// A parsed `BagIt-Version` value, e.g. `1.0`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BagItVersion {
    major: u8,
    minor: u8,
}

impl BagItVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Display for BagItVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl TryFrom<&str> for BagItVersion {
    type Error = Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        if let Some((major, minor)) = value.split_once('.') {
            let major = major.parse::<u8>().map_err(|_| InvalidBagItVersion {
                value: value.to_string(),
            })?;
            let minor = minor.parse::<u8>().map_err(|_| InvalidBagItVersion {
                value: value.to_string(),
            })?;
            Ok(BagItVersion::new(major, minor))
        } else {
            Err(InvalidBagItVersion {
                value: value.to_string(),
            })
        }
    }
}

/// What part of the bag a file plays, classified purely from its relative path (§3).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FileRole {
    Payload,
    /// Carries the lower-cased algorithm token extracted from the filename, which may not be
    /// one the digest registry (§4.A) actually knows how to hash.
    PayloadManifest(String),
    TagManifest(String),
    Tag,
}

/// Classifies `rel_path` (already forward-slashed and bag-root-relative) per §3.
pub fn classify_role(rel_path: &str) -> FileRole {
    let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);

    if let Some(caps) = PAYLOAD_MANIFEST_MATCHER.captures(file_name) {
        FileRole::PayloadManifest(caps[1].to_ascii_lowercase())
    } else if let Some(caps) = TAG_MANIFEST_MATCHER.captures(file_name) {
        FileRole::TagManifest(caps[1].to_ascii_lowercase())
    } else if rel_path == DATA || rel_path.starts_with(&format!("{DATA}/")) {
        FileRole::Payload
    } else {
        FileRole::Tag
    }
}

/// Per-file state accumulated during a validation or bagging run (§3). Lives only for the
/// duration of that run.
#[derive(Debug, Clone)]
pub struct BagItFile {
    pub rel_path: String,
    pub role: FileRole,
    pub size: u64,
    pub checksums: HashMap<String, String>,
    pub parsed: Option<KeyValueCollection>,
}

impl BagItFile {
    pub fn new(rel_path: String, role: FileRole, size: u64) -> Self {
        Self {
            rel_path,
            role,
            size,
            checksums: HashMap::new(),
            parsed: None,
        }
    }

    /// True when `rel_path` is a text file that could plausibly carry parsed tag content
    /// (manifests, tag manifests, and any `.txt` tag file — §4.D).
    pub fn is_parseable(&self) -> bool {
        match &self.role {
            FileRole::PayloadManifest(_) | FileRole::TagManifest(_) => true,
            FileRole::Tag => self.rel_path.ends_with(".txt"),
            FileRole::Payload => false,
        }
    }
}
