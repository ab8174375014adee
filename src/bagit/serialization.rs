use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::bagit::events::{ErrorKind, ValidationError};
use crate::bagit::profile::{Profile, SerializationPolicy};

/// Built-in, extensible MIME-type -> filename-extension mapping used to validate a serialized
/// bag's format against `acceptSerialization` (§4.E.1).
static MIME_EXTENSION_MATCHERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("application/tar", Regex::new(r"\.tar$").unwrap()),
        ("application/zip", Regex::new(r"\.zip$").unwrap()),
        ("application/gzip", Regex::new(r"\.gzip$|\.gz$").unwrap()),
        (
            "application/tar+gzip",
            Regex::new(r"\.tgz$|\.tar\.gz$").unwrap(),
        ),
        ("application/x-7z-compressed", Regex::new(r"\.7z$").unwrap()),
        ("application/x-rar", Regex::new(r"\.rar$").unwrap()),
    ]
});

/// Runs the §4.E.1 serialization check. `is_directory` is whether `bag_path` is a directory (as
/// opposed to a single archive file). Returns zero or one error, per the table in §4.E.1.
pub fn check_serialization(
    bag_path: &Path,
    profile: &Profile,
    is_directory: bool,
    disable: bool,
) -> Option<ValidationError> {
    if disable {
        log::info!("Serialization check disabled; skipping");
        return None;
    }

    match (profile.serialization, is_directory) {
        (SerializationPolicy::Required, true) => Some(ValidationError::new(
            ErrorKind::SerializationViolation,
            "bag must be serialized but a directory was supplied".to_string(),
        )),
        (SerializationPolicy::Required, false) => validate_format(bag_path, profile),
        (SerializationPolicy::Forbidden, true) => None,
        (SerializationPolicy::Forbidden, false) => Some(ValidationError::new(
            ErrorKind::SerializationViolation,
            "bag must not be serialized but a single file was supplied".to_string(),
        )),
        (SerializationPolicy::Optional, true) => None,
        (SerializationPolicy::Optional, false) => validate_format(bag_path, profile),
    }
}

fn validate_format(bag_path: &Path, profile: &Profile) -> Option<ValidationError> {
    if profile.accept_serialization.is_empty() {
        return None;
    }

    let file_name = bag_path.to_string_lossy();
    let matches = profile.accept_serialization.iter().any(|mime| {
        MIME_EXTENSION_MATCHERS
            .iter()
            .find(|(m, _)| m == mime)
            .map(|(_, re)| re.is_match(&file_name))
            .unwrap_or(false)
    });

    if matches {
        None
    } else {
        Some(ValidationError::new(
            ErrorKind::SerializationViolation,
            format!(
                "'{}' does not match any accepted serialization format: {:?}",
                file_name, profile.accept_serialization
            ),
        ))
    }
}
