use std::collections::BTreeSet;
use std::fs;

use sha2::{Digest, Sha256};

use bagr::bagit::{
    choose_manifest_algorithms, export_profile, import_profile, BagSink, Bagger, EngineConfig,
    KeyValueCollection, NoopObserver, PayloadSource, Profile, TagDefinition, Validator,
};

fn profile_with(required: &[&str], allowed: &[&str]) -> Profile {
    let mut profile = Profile::new_empty("it-profile", "Integration Test Profile");
    profile.manifests_required = required.iter().map(|s| s.to_string()).collect();
    profile.manifests_allowed = allowed.iter().map(|s| s.to_string()).collect();
    profile.tag_manifests_allowed = allowed.iter().map(|s| s.to_string()).collect();
    profile.tags.push(TagDefinition::new(
        "bag-info.txt",
        "Source-Organization",
        false,
    ));
    profile
}

fn write_source(dir: &std::path::Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Rewrites a single `Name: Value` line in tag-file text, leaving every other line untouched.
fn patch_tag_value(contents: &str, name: &str, new_value: &str) -> String {
    let mut out = String::new();
    for line in contents.lines() {
        match line.split_once(':') {
            Some((n, _)) if n.trim() == name => out.push_str(&format!("{name}: {new_value}\n")),
            _ => out.push_str(&format!("{line}\n")),
        }
    }
    out
}

/// Rewrites the digest for one path's entry in manifest-file text, leaving every other line
/// untouched.
fn patch_manifest_digest(contents: &str, rel_path: &str, new_digest: &str) -> String {
    let mut out = String::new();
    for line in contents.lines() {
        match line.find(char::is_whitespace) {
            Some(idx) if line[idx..].trim_start() == rel_path => {
                out.push_str(&format!("{new_digest}  {rel_path}\n"))
            }
            _ => out.push_str(&format!("{line}\n")),
        }
    }
    out
}

#[test]
fn bags_then_validates_a_directory_bag() {
    let src = tempfile::tempdir().unwrap();
    let hello = write_source(src.path(), "hello.txt", b"hello integration test");
    let nested = write_source(src.path(), "sub/nested.txt", b"nested payload");

    let profile = profile_with(&["sha256"], &["sha256", "md5"]);
    let bagger = Bagger::new(&profile, EngineConfig::default());

    let out = tempfile::tempdir().unwrap();
    let bag_dir = out.path().join("mybag");

    let sources = vec![
        PayloadSource {
            source_path: hello,
            dest_rel_path: "hello.txt".to_string(),
        },
        PayloadSource {
            source_path: nested,
            dest_rel_path: "sub/nested.txt".to_string(),
        },
    ];

    let mut observer = NoopObserver;
    let self_report = bagger
        .bag(
            &sources,
            &BagSink::Directory(bag_dir.clone()),
            &KeyValueCollection::new(),
            true,
            &mut observer,
        )
        .unwrap()
        .expect("self-validation requested");
    assert!(self_report.is_valid(), "{:?}", self_report.errors);

    let validator = Validator::new(&bag_dir, &profile, EngineConfig::default());
    let mut observer = NoopObserver;
    let report = validator.validate(&mut observer).unwrap();
    assert!(report.is_valid(), "{:?}", report.errors);
}

#[test]
fn detects_tampered_payload() {
    let src = tempfile::tempdir().unwrap();
    let hello = write_source(src.path(), "hello.txt", b"original content");

    let profile = profile_with(&["sha256"], &["sha256"]);
    let bagger = Bagger::new(&profile, EngineConfig::default());

    let out = tempfile::tempdir().unwrap();
    let bag_dir = out.path().join("mybag");

    let sources = vec![PayloadSource {
        source_path: hello,
        dest_rel_path: "hello.txt".to_string(),
    }];

    let mut observer = NoopObserver;
    bagger
        .bag(
            &sources,
            &BagSink::Directory(bag_dir.clone()),
            &KeyValueCollection::new(),
            false,
            &mut observer,
        )
        .unwrap();

    fs::write(bag_dir.join("data/hello.txt"), b"tampered content!!").unwrap();

    let validator = Validator::new(&bag_dir, &profile, EngineConfig::default());
    let mut observer = NoopObserver;
    let report = validator.validate(&mut observer).unwrap();
    assert!(!report.is_valid());
    assert!(report
        .errors
        .iter()
        .any(|e| e.message.contains("Bad sha256 digest")));
}

#[test]
fn detects_extraneous_payload_file_not_in_manifest() {
    let src = tempfile::tempdir().unwrap();
    let payload_content: &[u8] = b"payload";
    let hello = write_source(src.path(), "hello.txt", payload_content);

    let profile = profile_with(&["sha256"], &["sha256"]);
    let bagger = Bagger::new(&profile, EngineConfig::default());

    let out = tempfile::tempdir().unwrap();
    let bag_dir = out.path().join("mybag");

    let sources = vec![PayloadSource {
        source_path: hello,
        dest_rel_path: "hello.txt".to_string(),
    }];

    let mut observer = NoopObserver;
    bagger
        .bag(
            &sources,
            &BagSink::Directory(bag_dir.clone()),
            &KeyValueCollection::new(),
            false,
            &mut observer,
        )
        .unwrap();

    // Drop a stray payload file in after bagging (spec §8 scenario S2). Bagger computed
    // bag-info.txt's Payload-Oxum before sneaky.txt existed, so it has to be brought up to date
    // by hand here -- otherwise the byte/file-count mismatch it would trip adds two more errors
    // on top of the one this test means to demonstrate. Updating bag-info.txt in turn changes its
    // bytes, so its tagmanifest-sha256.txt entry has to be re-signed too, or that becomes a third
    // spurious error. With both patched, the only thing left broken is the untracked payload
    // file itself.
    let sneaky_content: &[u8] = b"not in any manifest";
    fs::write(bag_dir.join("data/sneaky.txt"), sneaky_content).unwrap();

    let bag_info_path = bag_dir.join("bag-info.txt");
    let bag_info = fs::read_to_string(&bag_info_path).unwrap();
    let new_oxum = format!("{}.{}", payload_content.len() + sneaky_content.len(), 2);
    let bag_info = patch_tag_value(&bag_info, "Payload-Oxum", &new_oxum);
    fs::write(&bag_info_path, &bag_info).unwrap();

    let new_digest = hex::encode(Sha256::digest(bag_info.as_bytes()));
    let tagmanifest_path = bag_dir.join("tagmanifest-sha256.txt");
    let tagmanifest = fs::read_to_string(&tagmanifest_path).unwrap();
    let tagmanifest = patch_manifest_digest(&tagmanifest, "bag-info.txt", &new_digest);
    fs::write(&tagmanifest_path, &tagmanifest).unwrap();

    let validator = Validator::new(&bag_dir, &profile, EngineConfig::default());
    let mut observer = NoopObserver;
    let report = validator.validate(&mut observer).unwrap();
    assert!(!report.is_valid());
    assert_eq!(1, report.errors.len(), "{:?}", report.errors);
    assert!(report
        .errors
        .iter()
        .any(|e| e.message.contains("not found in manifest-sha256.txt")));
}

#[test]
fn profile_json_round_trips_through_import_and_export() {
    let json = r#"{
        "Accept-BagIt-Version": ["1.0"],
        "Accept-Serialization": ["application/tar"],
        "Serialization": "optional",
        "Manifests-Required": ["sha256"],
        "Manifests-Allowed": ["sha256", "md5"],
        "BagIt-Profile-Info": {
            "BagIt-Profile-Identifier": "round-trip",
            "Source-Organization": "Example University"
        },
        "Bag-Info": {
            "Source-Organization": { "required": true, "values": ["Example University"] }
        }
    }"#;

    let profile = import_profile(json, "round-trip.json").unwrap();
    assert_eq!("round-trip", profile.id);

    let exported = export_profile(&profile).unwrap();
    let reimported = import_profile(&exported, "round-trip.json").unwrap();

    assert_eq!(profile.id, reimported.id);
    assert_eq!(profile.manifests_required, reimported.manifests_required);
    assert_eq!(profile.manifests_allowed, reimported.manifests_allowed);
}

#[test]
fn chooses_manifest_algorithms_when_profile_leaves_it_ambiguous() {
    let profile = profile_with(&[], &["md5", "sha1", "sha256"]);
    assert_eq!(vec!["sha256".to_string()], choose_manifest_algorithms(&profile));
}

#[test]
fn wrong_untar_directory_name_is_rejected() {
    let src = tempfile::tempdir().unwrap();
    let hello = write_source(src.path(), "hello.txt", b"payload");

    let profile = profile_with(&["sha256"], &["sha256"]);
    let bagger = Bagger::new(&profile, EngineConfig::default());

    let out = tempfile::tempdir().unwrap();
    let staged_dir = out.path().join("mybag");
    let sources = vec![PayloadSource {
        source_path: hello,
        dest_rel_path: "hello.txt".to_string(),
    }];
    let mut observer = NoopObserver;
    bagger
        .bag(
            &sources,
            &BagSink::Directory(staged_dir.clone()),
            &KeyValueCollection::new(),
            false,
            &mut observer,
        )
        .unwrap();

    // Archive the directory under its real name, then rename the resulting tar to a name that
    // disagrees with the directory actually stored inside it (§4.E.2 / scenario S3).
    let tar_path = out.path().join("other.tar");
    let tar_file = fs::File::create(&tar_path).unwrap();
    let mut builder = tar::Builder::new(tar_file);
    builder.append_dir_all("mybag", &staged_dir).unwrap();
    builder.finish().unwrap();

    let validator = Validator::new(&tar_path, &profile, EngineConfig::default());
    let mut observer = NoopObserver;
    let report = validator.validate(&mut observer).unwrap();
    assert!(!report.is_valid());
    assert!(report
        .errors
        .iter()
        .any(|e| e.message.contains("should untar to directory 'other', not 'mybag'")));
}

#[test]
fn tar_bag_round_trips_through_self_validation() {
    let src = tempfile::tempdir().unwrap();
    let hello = write_source(src.path(), "hello.txt", b"tar payload");

    let mut profile = profile_with(&["sha256"], &["sha256"]);
    profile.tar_dir_must_match_name = true;
    let bagger = Bagger::new(&profile, EngineConfig::default());

    let out = tempfile::tempdir().unwrap();
    let tar_path = out.path().join("mybag.tar");

    let sources = vec![PayloadSource {
        source_path: hello,
        dest_rel_path: "hello.txt".to_string(),
    }];
    let mut observer = NoopObserver;
    let report = bagger
        .bag(
            &sources,
            &BagSink::Tar(tar_path),
            &KeyValueCollection::new(),
            true,
            &mut observer,
        )
        .unwrap()
        .expect("self-validation requested");

    assert!(report.is_valid(), "{:?}", report.errors);
}

#[test]
fn well_formed_profile_with_tag_manifests_passes_self_check() {
    let mut profile = profile_with(&["sha256"], &["sha256"]);
    profile.tag_manifests_required = BTreeSet::from(["sha256".to_string()]);
    assert!(profile.self_check().is_empty());
}
