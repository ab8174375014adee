use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use snafu::prelude::*;

use crate::bagit::config::EngineConfig;
use crate::bagit::consts::{
    BAGIT_DEFAULT_VERSION, BAGIT_TXT, BAG_INFO_TXT, DATA, LABEL_BAGGING_DATE, LABEL_BAGIT_VERSION,
    LABEL_FILE_ENCODING, LABEL_PAYLOAD_OXUM, UTF_8,
};
use crate::bagit::digest::{DigestAlgorithm, MultiDigestWriter};
use crate::bagit::error::*;
use crate::bagit::events::{Observer, Task, TaskKind};
use crate::bagit::kv::KeyValueCollection;
use crate::bagit::manifest::format_manifest_line;
use crate::bagit::profile::{choose_manifest_algorithms, Profile};
use crate::bagit::tagfile::write_tag_file;
use crate::bagit::validator::{ValidationReport, Validator};

/// Where a freshly built bag should land (§4.F step 2): a plain directory, or a single TAR
/// archive named after the bag.
pub enum BagSink {
    Directory(PathBuf),
    Tar(PathBuf),
}

/// One source file to fold into the bag's `data/` payload, paired with the path it should land
/// at relative to `data/`.
pub struct PayloadSource {
    pub source_path: PathBuf,
    pub dest_rel_path: String,
}

/// Builds a new bag against a profile (§4.F). Mutable bag-info overrides may be supplied by the
/// caller; everything the profile marks required with a `default_value` is seeded automatically.
pub struct Bagger<'a> {
    profile: &'a Profile,
    config: EngineConfig,
}

impl<'a> Bagger<'a> {
    pub fn new(profile: &'a Profile, config: EngineConfig) -> Self {
        Self { profile, config }
    }

    /// Runs the full bagging pipeline and, unless `self_validate` is false, validates the result
    /// before returning (§4.F step 9).
    pub fn bag(
        &self,
        sources: &[PayloadSource],
        sink: &BagSink,
        bag_info_overrides: &KeyValueCollection,
        self_validate: bool,
        observer: &mut dyn Observer,
    ) -> Result<Option<ValidationReport>> {
        // Step 1: pre-validate required tags can be satisfied.
        self.check_required_tags_satisfiable(bag_info_overrides)?;

        for source in sources {
            if !source.source_path.exists() {
                return BaggerSourceMissingSnafu {
                    path: source.source_path.clone(),
                }
                .fail();
            }
        }

        let algorithms: Vec<DigestAlgorithm> = choose_manifest_algorithms(self.profile)
            .iter()
            .filter_map(|name| DigestAlgorithm::from_str(name).ok())
            .collect();

        // Tag-manifest algorithms are chosen from `tag_manifests_required` directly rather than
        // reusing `algorithms`: the two `_required` sets are independent and may be disjoint, and
        // `choose_manifest_algorithms` only falls back to `tag_manifests_required` when
        // `manifests_required` is itself empty, so it can't stand in for the tag manifest side.
        let tag_algorithms: Vec<DigestAlgorithm> = if self.profile.tag_manifests_required.is_empty() {
            algorithms.clone()
        } else {
            self.profile
                .tag_manifests_required
                .iter()
                .filter_map(|name| DigestAlgorithm::from_str(name).ok())
                .collect()
        };

        match sink {
            BagSink::Directory(dir) => {
                self.bag_to_directory(sources, dir, bag_info_overrides, &algorithms, &tag_algorithms, observer)?
            }
            BagSink::Tar(tar_path) => {
                self.bag_to_tar(sources, tar_path, bag_info_overrides, &algorithms, &tag_algorithms, observer)?
            }
        }

        if self_validate {
            let bag_path = match sink {
                BagSink::Directory(dir) => dir.clone(),
                BagSink::Tar(tar_path) => tar_path.clone(),
            };
            let validator = Validator::new(&bag_path, self.profile, self.config.clone());
            Ok(Some(validator.validate(observer)?))
        } else {
            Ok(None)
        }
    }

    fn check_required_tags_satisfiable(&self, overrides: &KeyValueCollection) -> Result<()> {
        for tag in &self.profile.tags {
            if !tag.required {
                continue;
            }
            let has_value = overrides.first(&tag.tag_name).is_some()
                || tag.default_value.is_some()
                || tag.tag_name == LABEL_BAGIT_VERSION
                || tag.tag_name == LABEL_FILE_ENCODING
                || tag.tag_name == LABEL_PAYLOAD_OXUM
                || tag.tag_name == LABEL_BAGGING_DATE;
            if !has_value {
                return MissingTagSnafu {
                    tag: tag.tag_name.clone(),
                }
                .fail();
            }
        }
        Ok(())
    }

    fn build_bag_info(&self, overrides: &KeyValueCollection, oxum: &str) -> KeyValueCollection {
        let mut kv = KeyValueCollection::new();
        kv.add(LABEL_BAGGING_DATE, overrides.first(LABEL_BAGGING_DATE).map(str::to_string).unwrap_or_else(today));
        kv.add(LABEL_PAYLOAD_OXUM, oxum.to_string());

        for tag in self.profile.tags_for_file(BAG_INFO_TXT) {
            if tag.tag_name == LABEL_BAGGING_DATE || tag.tag_name == LABEL_PAYLOAD_OXUM {
                continue;
            }
            let values = overrides.all(&tag.tag_name);
            if !values.is_empty() {
                for value in values {
                    kv.add(tag.tag_name.clone(), value.to_string());
                }
            } else if let Some(default) = &tag.default_value {
                kv.add(tag.tag_name.clone(), default.clone());
            }
        }

        for (name, value) in overrides.iter() {
            if kv.first(name).is_none() {
                kv.add(name.to_string(), value.to_string());
            }
        }

        kv
    }

    fn bag_to_directory(
        &self,
        sources: &[PayloadSource],
        dir: &Path,
        overrides: &KeyValueCollection,
        algorithms: &[DigestAlgorithm],
        tag_algorithms: &[DigestAlgorithm],
        observer: &mut dyn Observer,
    ) -> Result<()> {
        let data_dir = dir.join(DATA);
        fs::create_dir_all(&data_dir).context(IoCreateSnafu { path: data_dir.clone() })?;

        let mut payload_manifests: Vec<KeyValueCollection> =
            algorithms.iter().map(|_| KeyValueCollection::new()).collect();
        let mut tag_manifest_inputs: Vec<(String, Vec<u8>)> = Vec::new();
        let mut total_bytes = 0u64;

        for (i, source) in sources.iter().enumerate() {
            let percent = (i as f32 / sources.len().max(1) as f32) * 100.0;
            observer.on_task(&Task::new(TaskKind::Add, &source.dest_rel_path, "copying", percent));

            let dest_path = data_dir.join(&source.dest_rel_path);
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).context(IoCreateSnafu { path: parent.to_path_buf() })?;
            }

            let mut input = File::open(&source.source_path)
                .context(IoReadSnafu { path: source.source_path.clone() })?;
            let output = File::create(&dest_path).context(IoCreateSnafu { path: dest_path.clone() })?;
            let mut pipeline = MultiDigestWriter::new(algorithms, BufWriter::new(output));

            let size = std::io::copy(&mut input, &mut pipeline)
                .context(BaggerWriteFailedSnafu { path: dest_path.clone() })?;
            total_bytes += size;

            let digests = pipeline.finalize_hex();
            let rel_path = format!("{DATA}/{}", source.dest_rel_path);
            for (idx, alg) in algorithms.iter().enumerate() {
                if let Some(hex) = digests.get(alg) {
                    payload_manifests[idx].add(rel_path.clone(), hex.clone());
                }
            }
            observer.on_task(&Task::new(TaskKind::Checksum, &source.dest_rel_path, "hashed", percent));
        }

        let oxum = format!("{total_bytes}.{}", sources.len());
        let bag_info = self.build_bag_info(overrides, &oxum);
        self.write_tag_file_tracked(dir, BAG_INFO_TXT, &bag_info, &mut tag_manifest_inputs)?;

        let mut bagit_kv = KeyValueCollection::new();
        bagit_kv.add(LABEL_BAGIT_VERSION, BAGIT_DEFAULT_VERSION);
        bagit_kv.add(LABEL_FILE_ENCODING, UTF_8);
        self.write_tag_file_tracked(dir, BAGIT_TXT, &bagit_kv, &mut tag_manifest_inputs)?;

        for (idx, alg) in algorithms.iter().enumerate() {
            let manifest_name = format!("manifest-{}.txt", alg.name());
            let manifest_path = dir.join(&manifest_name);
            write_manifest(&manifest_path, &payload_manifests[idx])?;
            tag_manifest_inputs.push((manifest_name, fs::read(&manifest_path).context(IoReadSnafu { path: manifest_path })?));
        }

        for alg in tag_algorithms {
            let tagmanifest_name = format!("tagmanifest-{}.txt", alg.name());
            let mut tm = KeyValueCollection::new();
            for (name, bytes) in &tag_manifest_inputs {
                let mut hasher = MultiDigestWriter::new(&[*alg], std::io::sink());
                hasher.write_all(bytes).context(IoGeneralSnafu {})?;
                let digest = hasher.finalize_hex();
                if let Some(hex) = digest.get(alg) {
                    tm.add(name.clone(), hex.clone());
                }
            }
            let path = dir.join(&tagmanifest_name);
            let mut file = File::create(&path).context(IoCreateSnafu { path: path.clone() })?;
            write_tag_file(&tm, &mut file)?;
        }

        Ok(())
    }

    fn write_tag_file_tracked(
        &self,
        dir: &Path,
        name: &str,
        kv: &KeyValueCollection,
        tracked: &mut Vec<(String, Vec<u8>)>,
    ) -> Result<()> {
        let path = dir.join(name);
        let mut buf = Vec::new();
        write_tag_file(kv, &mut buf)?;
        fs::write(&path, &buf).context(IoCreateSnafu { path: path.clone() })?;
        tracked.push((name.to_string(), buf));
        Ok(())
    }

    /// TAR output is built by staging the bag in a temporary directory and then archiving it, a
    /// simplification noted in the grounding ledger rather than streaming entries straight into
    /// `tar::Builder`.
    fn bag_to_tar(
        &self,
        sources: &[PayloadSource],
        tar_path: &Path,
        overrides: &KeyValueCollection,
        algorithms: &[DigestAlgorithm],
        tag_algorithms: &[DigestAlgorithm],
        observer: &mut dyn Observer,
    ) -> Result<()> {
        let staging = tempfile::tempdir().context(IoGeneralSnafu {})?;
        let bag_name = tar_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("bag")
            .to_string();
        let staged_bag = staging.path().join(&bag_name);

        self.bag_to_directory(sources, &staged_bag, overrides, algorithms, tag_algorithms, observer)?;

        let tar_file = File::create(tar_path).context(IoCreateSnafu { path: tar_path.to_path_buf() })?;
        let mut builder = tar::Builder::new(tar_file);
        builder
            .append_dir_all(&bag_name, &staged_bag)
            .context(BaggerWriteFailedSnafu { path: tar_path.to_path_buf() })?;
        builder.finish().context(BaggerWriteFailedSnafu { path: tar_path.to_path_buf() })?;

        Ok(())
    }
}

fn write_manifest(path: &Path, kv: &KeyValueCollection) -> Result<()> {
    let mut pairs: Vec<(&str, &str)> = kv.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut file = File::create(path).context(IoCreateSnafu { path: path.to_path_buf() })?;
    for (rel_path, digest) in pairs {
        file.write_all(format_manifest_line(digest, rel_path).as_bytes())
            .context(IoWriteSnafu { path: path.to_path_buf() })?;
    }
    Ok(())
}

/// Today's date as `YYYY-MM-DD`, per §4.F step 7. `chrono::Local::now()` matches the teacher's
/// existing dependency on `chrono` for bag-info timestamps.
fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bagit::profile::Profile;

    fn profile_with_sha256() -> Profile {
        let mut p = Profile::new_empty("id", "name");
        p.manifests_required = BTreeSet::from(["sha256".to_string()]);
        p.manifests_allowed = BTreeSet::from(["sha256".to_string()]);
        p.tag_manifests_allowed = BTreeSet::from(["sha256".to_string()]);
        p.tags.push(crate::bagit::profile::TagDefinition::new(
            BAG_INFO_TXT,
            "Source-Organization",
            false,
        ));
        p
    }

    #[test]
    fn bags_a_directory_with_expected_tag_files() {
        let src_dir = tempfile::tempdir().unwrap();
        let file_path = src_dir.path().join("hello.txt");
        fs::write(&file_path, b"hello world").unwrap();

        let profile = profile_with_sha256();
        let bagger = Bagger::new(&profile, EngineConfig::default());
        let out_dir = tempfile::tempdir().unwrap();
        let bag_dir = out_dir.path().join("mybag");

        let sources = vec![PayloadSource {
            source_path: file_path,
            dest_rel_path: "hello.txt".to_string(),
        }];

        let mut observer = crate::bagit::events::NoopObserver;
        bagger
            .bag(
                &sources,
                &BagSink::Directory(bag_dir.clone()),
                &KeyValueCollection::new(),
                false,
                &mut observer,
            )
            .unwrap();

        assert!(bag_dir.join("bagit.txt").exists());
        assert!(bag_dir.join("bag-info.txt").exists());
        assert!(bag_dir.join("manifest-sha256.txt").exists());
        assert!(bag_dir.join("tagmanifest-sha256.txt").exists());
        assert!(bag_dir.join("data/hello.txt").exists());

        let manifest = fs::read_to_string(bag_dir.join("manifest-sha256.txt")).unwrap();
        assert!(manifest.contains("data/hello.txt"));
    }

    #[test]
    fn rejects_missing_source_file() {
        let profile = profile_with_sha256();
        let bagger = Bagger::new(&profile, EngineConfig::default());
        let out_dir = tempfile::tempdir().unwrap();

        let sources = vec![PayloadSource {
            source_path: PathBuf::from("/does/not/exist.txt"),
            dest_rel_path: "exist.txt".to_string(),
        }];

        let mut observer = crate::bagit::events::NoopObserver;
        let result = bagger.bag(
            &sources,
            &BagSink::Directory(out_dir.path().join("bag")),
            &KeyValueCollection::new(),
            false,
            &mut observer,
        );
        assert!(result.is_err());
    }

    #[test]
    fn self_validates_when_requested() {
        let src_dir = tempfile::tempdir().unwrap();
        let file_path = src_dir.path().join("a.txt");
        fs::write(&file_path, b"payload").unwrap();

        let profile = profile_with_sha256();
        let bagger = Bagger::new(&profile, EngineConfig::default());
        let out_dir = tempfile::tempdir().unwrap();

        let sources = vec![PayloadSource {
            source_path: file_path,
            dest_rel_path: "a.txt".to_string(),
        }];

        let mut observer = crate::bagit::events::NoopObserver;
        let report = bagger
            .bag(
                &sources,
                &BagSink::Directory(out_dir.path().join("bag")),
                &KeyValueCollection::new(),
                true,
                &mut observer,
            )
            .unwrap()
            .expect("self-validation requested");

        assert!(report.is_valid(), "{:?}", report.errors);
    }
}
