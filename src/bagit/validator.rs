use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;

use snafu::ResultExt;

use crate::bagit::config::EngineConfig;
use crate::bagit::consts::{BAGIT_TXT, BAG_INFO_TXT, FETCH_TXT, LABEL_PAYLOAD_OXUM};
use crate::bagit::digest::DigestAlgorithm;
use crate::bagit::error::*;
use crate::bagit::events::{ErrorKind, Observer, Task, TaskKind, ValidationError};
use crate::bagit::glob::glob_matches;
use crate::bagit::model::{classify_role, BagItFile, FileRole};
use crate::bagit::pipeline::{EntryPipeline, InFlightGuard, ParserSink};
use crate::bagit::profile::Profile;
use crate::bagit::reader::ReaderRegistry;
use crate::bagit::serialization::check_serialization;
use crate::bagit::tagfile::TagFileParser;

/// Outcome of a validation run: the accumulated error list (§7 policy — these are collected, not
/// short-circuited, except where a phase is terminal).
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Orchestrates the reader, the hashing/parsing pipeline, and profile rule checks against a
/// single bag (§4.E).
pub struct Validator<'a> {
    bag_path: PathBuf,
    profile: &'a Profile,
    config: EngineConfig,
    registry: ReaderRegistry,
}

impl<'a> Validator<'a> {
    pub fn new<P: AsRef<Path>>(bag_path: P, profile: &'a Profile, config: EngineConfig) -> Self {
        Self {
            bag_path: bag_path.as_ref().to_path_buf(),
            profile,
            config,
            registry: ReaderRegistry::with_defaults(),
        }
    }

    pub fn validate(&self, observer: &mut dyn Observer) -> Result<ValidationReport> {
        let mut errors = Vec::new();
        observer.on_validate_start(&self.bag_path);

        // Phase 1: existence check.
        if !self.bag_path.exists() {
            errors.push(ValidationError::new(
                ErrorKind::IoMissing,
                format!("{} does not exist", self.bag_path.display()),
            ));
            return self.finish(errors, observer);
        }

        // Phase 2: profile self-check. Terminal.
        let profile_errors = self.profile.self_check();
        if !profile_errors.is_empty() {
            for message in profile_errors {
                errors.push(ValidationError::new(ErrorKind::ProfileInvalid, message));
            }
            return self.finish(errors, observer);
        }

        // Phase 3: serialization check. Terminal.
        let is_directory = self.bag_path.is_dir();
        if let Some(err) = check_serialization(
            &self.bag_path,
            self.profile,
            is_directory,
            self.config.disable_serialization_check,
        ) {
            errors.push(err);
            return self.finish(errors, observer);
        }

        let mut reader = match self.registry.open(&self.bag_path) {
            Ok(r) => r,
            Err(e) => {
                errors.push(ValidationError::new(ErrorKind::IoRead, e.to_string()));
                return self.finish(errors, observer);
            }
        };

        let is_tar = !is_directory;
        let expected_root = self
            .bag_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string());

        // Phase 4: initial scan — discover manifest/tag-manifest algorithms actually present.
        let listed = match reader.list() {
            Ok(l) => l,
            Err(e) => {
                errors.push(ValidationError::new(ErrorKind::IoRead, e.to_string()));
                return self.finish(errors, observer);
            }
        };

        let mut digest_algorithms: BTreeSet<String> = self
            .profile
            .manifests_required
            .union(&self.profile.tag_manifests_required)
            .cloned()
            .collect();

        let mut observed_roots: BTreeSet<String> = BTreeSet::new();

        for entry in &listed {
            if !entry.is_file {
                continue;
            }
            let (root, rel_path) = if is_tar {
                split_tar_root(&entry.rel_path)
            } else {
                (None, entry.rel_path.as_str())
            };
            if let Some(root) = root {
                observed_roots.insert(root.to_string());
            }
            let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
            if let FileRole::PayloadManifest(alg) | FileRole::TagManifest(alg) =
                classify_role(file_name)
            {
                digest_algorithms.insert(alg);
            }
        }

        // §4.E.2: untar directory check.
        if is_tar && self.profile.tar_dir_must_match_name {
            if let Some(expected) = &expected_root {
                let mismatched = match observed_roots.len() {
                    1 => observed_roots.iter().next().map(|r| r != expected),
                    _ => Some(true),
                }
                .unwrap_or(false);

                if mismatched {
                    let actual = observed_roots
                        .iter()
                        .next()
                        .cloned()
                        .unwrap_or_else(|| "?".to_string());
                    errors.push(ValidationError::new(
                        ErrorKind::UntarNameMismatch,
                        format!("Bag should untar to directory '{expected}', not '{actual}'"),
                    ));
                    return self.finish(errors, observer);
                }
            }
        }

        let known_algorithms: Vec<DigestAlgorithm> = digest_algorithms
            .iter()
            .filter_map(|name| DigestAlgorithm::from_str(name).ok())
            .collect();

        // Phase 5/6: read pass + completion barrier.
        let guard = InFlightGuard::new();
        let mut files: HashMap<String, BagItFile> = HashMap::new();
        let mut read_errors = Vec::new();
        let total = listed.iter().filter(|e| e.is_file).count().max(1);
        let mut processed = 0usize;

        let read_result = reader.read(&mut |entry_info, stream: &mut dyn Read| {
            if !self.config.slow_motion_delay.is_zero() {
                thread::sleep(self.config.slow_motion_delay);
            }

            let (_, rel_path) = if is_tar {
                split_tar_root(&entry_info.rel_path)
            } else {
                (None, entry_info.rel_path.as_str())
            };
            let rel_path = rel_path.to_string();

            processed += 1;
            let percent = (processed as f32 / total as f32) * 100.0;
            observer.on_task(&Task::new(TaskKind::Start, &rel_path, "reading", percent));

            let role = classify_role(&rel_path);
            let parseable = matches!(
                &role,
                FileRole::PayloadManifest(_) | FileRole::TagManifest(_)
            ) || (matches!(&role, FileRole::Tag) && rel_path.ends_with(".txt"));

            let parser = if parseable {
                match &role {
                    FileRole::PayloadManifest(_) | FileRole::TagManifest(_) => Some(
                        ParserSink::Manifest(crate::bagit::manifest::ManifestParser::new()),
                    ),
                    _ => Some(ParserSink::TagFile(TagFileParser::new())),
                }
            } else {
                None
            };

            let ticket = guard.enter();
            let mut pipeline = EntryPipeline::new(&known_algorithms, parser, std::io::sink());
            let size = std::io::copy(stream, &mut pipeline).context(IoGeneralSnafu {})?;
            let (digests, parsed) = pipeline.finish();
            drop(ticket);

            observer.on_task(&Task::new(TaskKind::Checksum, &rel_path, "hashed", percent));

            let mut file = BagItFile::new(rel_path.clone(), role, size);
            for (alg, hex) in digests {
                file.checksums.insert(alg.name().to_string(), hex);
            }
            if let Some(parsed) = parsed {
                match parsed {
                    Ok(kv) => file.parsed = Some(kv),
                    Err(e) => read_errors.push(ValidationError::new(
                        ErrorKind::IoRead,
                        format!("failed to parse '{rel_path}': {e}"),
                    )),
                }
            }

            files.insert(rel_path, file);
            Ok(())
        });

        if let Err(e) = read_result {
            errors.push(ValidationError::new(ErrorKind::IoRead, e.to_string()));
            return self.finish(errors, observer);
        }

        errors.extend(read_errors);
        guard.wait();

        // Phase 7: verification.
        self.verify_manifests_present(&files, &mut errors);
        self.verify_manifests_allowed(&files, &mut errors);
        self.verify_tag_files_allowed(&files, &mut errors);
        self.verify_fetch_txt(&files, &mut errors);
        self.verify_manifest_entries(&files, &mut errors);
        self.verify_extraneous_payload(&files, &mut errors);
        self.verify_payload_oxum(&files, &mut errors);
        self.verify_tags(&files, &mut errors);

        self.finish(errors, observer)
    }

    fn finish(
        &self,
        errors: Vec<ValidationError>,
        observer: &mut dyn Observer,
    ) -> Result<ValidationReport> {
        for error in &errors {
            observer.on_error(error);
        }
        observer.on_end();
        Ok(ValidationReport { errors })
    }

    fn verify_manifests_present(&self, files: &HashMap<String, BagItFile>, errors: &mut Vec<ValidationError>) {
        let present_payload: BTreeSet<&str> = files
            .values()
            .filter_map(|f| match &f.role {
                FileRole::PayloadManifest(alg) => Some(alg.as_str()),
                _ => None,
            })
            .collect();
        for alg in &self.profile.manifests_required {
            if !present_payload.contains(alg.as_str()) {
                errors.push(ValidationError::new(
                    ErrorKind::ManifestMissing,
                    format!("required manifest-{alg}.txt is missing"),
                ));
            }
        }

        let present_tag: BTreeSet<&str> = files
            .values()
            .filter_map(|f| match &f.role {
                FileRole::TagManifest(alg) => Some(alg.as_str()),
                _ => None,
            })
            .collect();
        for alg in &self.profile.tag_manifests_required {
            if !present_tag.contains(alg.as_str()) {
                errors.push(ValidationError::new(
                    ErrorKind::ManifestMissing,
                    format!("required tagmanifest-{alg}.txt is missing"),
                ));
            }
        }
    }

    fn verify_manifests_allowed(&self, files: &HashMap<String, BagItFile>, errors: &mut Vec<ValidationError>) {
        for file in files.values() {
            match &file.role {
                FileRole::PayloadManifest(alg) if !self.profile.manifests_allowed.contains(alg) => {
                    errors.push(ValidationError::new(
                        ErrorKind::ManifestNotAllowed,
                        format!("manifest-{alg}.txt uses an algorithm not in manifestsAllowed"),
                    ));
                }
                FileRole::TagManifest(alg) if !self.profile.tag_manifests_allowed.contains(alg) => {
                    errors.push(ValidationError::new(
                        ErrorKind::ManifestNotAllowed,
                        format!("tagmanifest-{alg}.txt uses an algorithm not in tagManifestsAllowed"),
                    ));
                }
                _ => {}
            }
        }
    }

    fn verify_tag_files_allowed(&self, files: &HashMap<String, BagItFile>, errors: &mut Vec<ValidationError>) {
        if self
            .profile
            .tag_files_allowed
            .iter()
            .any(|p| p.is_empty() || p == "*")
        {
            return;
        }

        for file in files.values() {
            if !matches!(file.role, FileRole::Tag) || file.rel_path == BAGIT_TXT {
                continue;
            }
            let matched = self
                .profile
                .tag_files_allowed
                .iter()
                .any(|pattern| glob_matches(pattern, &file.rel_path));
            if !matched {
                errors.push(ValidationError::new(
                    ErrorKind::TagFileNotAllowed,
                    format!("tag file '{}' does not match any allowed pattern", file.rel_path),
                ));
            }
        }
    }

    fn verify_fetch_txt(&self, files: &HashMap<String, BagItFile>, errors: &mut Vec<ValidationError>) {
        if !self.profile.allow_fetch_txt && files.contains_key(FETCH_TXT) {
            errors.push(ValidationError::new(
                ErrorKind::TagFileNotAllowed,
                format!("{FETCH_TXT} is present but not allowed by this profile"),
            ));
        }
    }

    fn verify_manifest_entries(&self, files: &HashMap<String, BagItFile>, errors: &mut Vec<ValidationError>) {
        for file in files.values() {
            let (prefix, alg) = match &file.role {
                FileRole::PayloadManifest(alg) => ("manifest", alg.as_str()),
                FileRole::TagManifest(alg) => ("tagmanifest", alg.as_str()),
                _ => continue,
            };
            let Some(parsed) = &file.parsed else { continue };
            let manifest_name = format!("{prefix}-{alg}.txt");

            for (path, expected_digest) in parsed.iter() {
                match files.get(path) {
                    None => errors.push(ValidationError::new(
                        ErrorKind::FileMissingInBag,
                        format!("File '{path}' in {manifest_name} is missing from bag."),
                    )),
                    Some(target) => match target.checksums.get(alg) {
                        Some(actual) if actual == expected_digest => {}
                        Some(actual) => errors.push(ValidationError::new(
                            ErrorKind::ChecksumMismatch,
                            format!(
                                "Bad {alg} digest for '{path}': manifest says '{expected_digest}', file digest is '{actual}'."
                            ),
                        )),
                        None => errors.push(ValidationError::new(
                            ErrorKind::ChecksumMismatch,
                            format!("No {alg} digest was computed for '{path}'."),
                        )),
                    },
                }
            }
        }
    }

    fn verify_extraneous_payload(&self, files: &HashMap<String, BagItFile>, errors: &mut Vec<ValidationError>) {
        let payload_manifests: Vec<&BagItFile> = files
            .values()
            .filter(|f| matches!(f.role, FileRole::PayloadManifest(_)))
            .collect();
        if payload_manifests.is_empty() {
            return;
        }

        let payload_files: Vec<&BagItFile> = files
            .values()
            .filter(|f| matches!(f.role, FileRole::Payload))
            .collect();

        for manifest in payload_manifests {
            let FileRole::PayloadManifest(alg) = &manifest.role else { unreachable!() };
            let Some(parsed) = &manifest.parsed else { continue };
            for payload in &payload_files {
                if parsed.first(&payload.rel_path).is_none() {
                    errors.push(ValidationError::new(
                        ErrorKind::PayloadMissingInManifest,
                        format!(
                            "Payload file {} not found in manifest-{alg}.txt",
                            payload.rel_path
                        ),
                    ));
                }
            }
        }
    }

    fn verify_payload_oxum(&self, files: &HashMap<String, BagItFile>, errors: &mut Vec<ValidationError>) {
        let Some(bag_info) = files.get(BAG_INFO_TXT).and_then(|f| f.parsed.as_ref()) else {
            return;
        };
        let Some(oxum) = bag_info.first(LABEL_PAYLOAD_OXUM) else {
            return;
        };
        let Some((bytes_str, count_str)) = oxum.rsplit_once('.') else {
            errors.push(ValidationError::new(
                ErrorKind::OxumMismatch,
                format!("{LABEL_PAYLOAD_OXUM} value '{oxum}' is malformed"),
            ));
            return;
        };
        let (Ok(expected_bytes), Ok(expected_count)) =
            (bytes_str.parse::<u64>(), count_str.parse::<u64>())
        else {
            errors.push(ValidationError::new(
                ErrorKind::OxumMismatch,
                format!("{LABEL_PAYLOAD_OXUM} value '{oxum}' is malformed"),
            ));
            return;
        };

        let payload_files: Vec<&BagItFile> = files
            .values()
            .filter(|f| matches!(f.role, FileRole::Payload))
            .collect();
        let actual_bytes: u64 = payload_files.iter().map(|f| f.size).sum();
        let actual_count = payload_files.len() as u64;

        if actual_bytes != expected_bytes {
            errors.push(ValidationError::new(
                ErrorKind::OxumMismatch,
                format!(
                    "{LABEL_PAYLOAD_OXUM} byte count mismatch: bag-info.txt says {expected_bytes}, payload is {actual_bytes} bytes"
                ),
            ));
        }
        if actual_count != expected_count {
            errors.push(ValidationError::new(
                ErrorKind::OxumMismatch,
                format!(
                    "{LABEL_PAYLOAD_OXUM} file count mismatch: bag-info.txt says {expected_count}, payload has {actual_count} files"
                ),
            ));
        }
    }

    fn verify_tags(&self, files: &HashMap<String, BagItFile>, errors: &mut Vec<ValidationError>) {
        for tag_file in self.profile.tag_files() {
            let Some(file) = files.get(tag_file) else {
                errors.push(ValidationError::new(
                    ErrorKind::TagMissing,
                    format!("{tag_file} is missing"),
                ));
                continue;
            };
            let Some(parsed) = &file.parsed else {
                errors.push(ValidationError::new(
                    ErrorKind::TagMissing,
                    format!("{tag_file} has no data"),
                ));
                continue;
            };

            for tag in self.profile.tags_for_file(tag_file) {
                let values = parsed.all(&tag.tag_name);
                if tag.required {
                    let non_empty = values.iter().any(|v| !v.trim().is_empty());
                    if values.is_empty() || !non_empty {
                        errors.push(ValidationError::new(
                            ErrorKind::TagMissing,
                            format!("{tag_file} is missing required tag '{}'", tag.tag_name),
                        ));
                        continue;
                    }
                }
                if !tag.empty_ok && values.iter().any(|v| v.trim().is_empty()) {
                    errors.push(ValidationError::new(
                        ErrorKind::TagEmpty,
                        format!("tag '{}' in {tag_file} must not be empty", tag.tag_name),
                    ));
                }
                if !tag.values.is_empty() {
                    for value in &values {
                        if !tag.values.iter().any(|v| v == value) {
                            errors.push(ValidationError::new(
                                ErrorKind::TagIllegalValue,
                                format!(
                                    "tag '{}' in {tag_file} has illegal value '{value}'; allowed: {:?}",
                                    tag.tag_name, tag.values
                                ),
                            ));
                        }
                    }
                }
            }
        }
    }
}

/// Splits a verbatim TAR entry path into `(root-dir, rest)`. When there is no `/` the entry sits
/// at the archive root with no bag directory at all.
fn split_tar_root(raw: &str) -> (Option<&str>, &str) {
    match raw.split_once('/') {
        Some((root, rest)) if !rest.is_empty() => (Some(root), rest),
        _ => (None, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_tar_root() {
        assert_eq!((Some("mybag"), "data/file.txt"), split_tar_root("mybag/data/file.txt"));
        assert_eq!((None, "bagit.txt"), split_tar_root("bagit.txt"));
    }
}
