use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::bagit::consts::{BAG_INFO_TXT, BAGIT_TXT, SUPPORTED_ALGORITHMS};
use crate::bagit::error::*;
use crate::bagit::profile::{Profile, SerializationPolicy, TagDefinition};

/// A single entry of the standard schema's nested `Bag-Info` map (§4.B).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BagInfoTagSpec {
    #[serde(default)]
    required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
}

/// The community "standard" bagit-profiles JSON schema (§4.B / §6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StandardProfileJson {
    #[serde(rename = "Accept-BagIt-Version")]
    accept_bagit_version: Vec<String>,
    #[serde(rename = "Accept-Serialization", default)]
    accept_serialization: Vec<String>,
    #[serde(rename = "Allow-Fetch.txt", default)]
    allow_fetch_txt: bool,
    #[serde(rename = "Serialization", default = "default_serialization")]
    serialization: String,
    #[serde(rename = "Manifests-Required", default)]
    manifests_required: Vec<String>,
    #[serde(rename = "Manifests-Allowed", default)]
    manifests_allowed: Option<Vec<String>>,
    #[serde(rename = "Tag-Manifests-Required", default)]
    tag_manifests_required: Option<Vec<String>>,
    #[serde(rename = "Tag-Manifests-Allowed", default)]
    tag_manifests_allowed: Option<Vec<String>>,
    #[serde(rename = "Tag-Files-Allowed", default)]
    tag_files_allowed: Option<Vec<String>>,
    #[serde(rename = "Tag-Files-Required", default)]
    tag_files_required: Vec<String>,
    #[serde(rename = "BagIt-Profile-Info", default)]
    bagit_profile_info: BTreeMap<String, String>,
    #[serde(rename = "Bag-Info", default)]
    bag_info: BTreeMap<String, BagInfoTagSpec>,
}

fn default_serialization() -> String {
    "optional".to_string()
}

fn all_supported_algorithms() -> Vec<String> {
    SUPPORTED_ALGORITHMS.iter().map(|s| s.to_string()).collect()
}

/// Imports a profile from the standard JSON schema (§4.B import contract). `identifier` is a
/// human-meaningful label for where the JSON came from (a file path, a URL); it seeds the
/// profile's `id` and `description` when `BagIt-Profile-Info` doesn't already supply them.
pub fn import_profile(json: &str, identifier: &str) -> Result<Profile> {
    let parsed: StandardProfileJson = serde_json::from_str(json).context(ProfileParseSnafu {})?;

    let id = parsed
        .bagit_profile_info
        .get("BagIt-Profile-Identifier")
        .cloned()
        .unwrap_or_else(|| identifier.to_string());
    let name = parsed
        .bagit_profile_info
        .get("Source-Organization")
        .cloned()
        .unwrap_or_else(|| identifier.to_string());
    let description = parsed
        .bagit_profile_info
        .get("External-Description")
        .cloned()
        .unwrap_or_else(|| format!("Imported from {identifier}"));

    let serialization = match parsed.serialization.to_ascii_lowercase().as_str() {
        "required" => SerializationPolicy::Required,
        "forbidden" => SerializationPolicy::Forbidden,
        _ => SerializationPolicy::Optional,
    };

    let manifests_allowed: BTreeSet<String> = parsed
        .manifests_allowed
        .unwrap_or_else(all_supported_algorithms)
        .into_iter()
        .collect();
    let tag_manifests_allowed: BTreeSet<String> = parsed
        .tag_manifests_allowed
        .unwrap_or_else(all_supported_algorithms)
        .into_iter()
        .collect();
    let tag_manifests_required: BTreeSet<String> = parsed
        .tag_manifests_required
        .unwrap_or_default()
        .into_iter()
        .collect();
    let tag_files_allowed = parsed
        .tag_files_allowed
        .unwrap_or_else(|| vec!["*".to_string()]);

    let mut profile = Profile {
        id,
        name,
        description,
        is_built_in: false,
        accept_bagit_version: parsed.accept_bagit_version.into_iter().collect(),
        accept_serialization: parsed.accept_serialization,
        serialization,
        allow_fetch_txt: parsed.allow_fetch_txt,
        manifests_required: parsed.manifests_required.into_iter().collect(),
        manifests_allowed,
        tag_manifests_required,
        tag_manifests_allowed,
        tag_files_allowed,
        tar_dir_must_match_name: false,
        tags: vec![
            TagDefinition::new(BAGIT_TXT, "BagIt-Version", true),
            TagDefinition::new(BAGIT_TXT, "Tag-File-Character-Encoding", true),
        ],
    };

    for (tag_name, spec) in parsed.bag_info {
        let existing = profile
            .tags
            .iter_mut()
            .find(|t| t.tag_file == BAG_INFO_TXT && t.tag_name == tag_name);

        let default_value = if spec.values.len() == 1 {
            Some(spec.values[0].clone())
        } else {
            None
        };

        match existing {
            Some(tag) => {
                tag.required = spec.required;
                tag.values = spec.values;
                tag.default_value = default_value;
            }
            None => {
                let mut tag = TagDefinition::new(BAG_INFO_TXT, tag_name, spec.required);
                tag.values = spec.values;
                tag.default_value = default_value;
                profile.tags.push(tag);
            }
        }
    }

    // Open question (§9.1): Tag-Files-Required is read but not otherwise enforced here; §4.E.6
    // only enforces presence of files referenced by an actual TagDefinition. See DESIGN.md.
    let _ = parsed.tag_files_required;

    Ok(profile)
}

/// Exports a profile to the standard JSON schema (§4.B export contract). Two caveats are lossy
/// and documented rather than worked around:
///
/// 1. A required tag outside `bag-info.txt` cannot be expressed individually; its tag file is
///    appended to `Tag-Files-Required` instead (deduplicated, insertion order).
/// 2. `bagit.txt` tags are omitted from the exported `Bag-Info` block.
pub fn export_profile(profile: &Profile) -> Result<String> {
    let mut bag_info = BTreeMap::new();
    let mut tag_files_required = Vec::new();

    for tag in &profile.tags {
        if tag.tag_file == BAGIT_TXT {
            continue;
        }
        if tag.tag_file == BAG_INFO_TXT {
            bag_info.insert(
                tag.tag_name.clone(),
                BagInfoTagSpec {
                    required: tag.required,
                    values: tag.values.clone(),
                },
            );
        } else if tag.required && !tag_files_required.contains(&tag.tag_file) {
            tag_files_required.push(tag.tag_file.clone());
        }
    }

    let mut bagit_profile_info = BTreeMap::new();
    bagit_profile_info.insert("BagIt-Profile-Identifier".to_string(), profile.id.clone());
    bagit_profile_info.insert("Source-Organization".to_string(), profile.name.clone());
    bagit_profile_info.insert(
        "External-Description".to_string(),
        profile.description.clone(),
    );

    let serialization = match profile.serialization {
        SerializationPolicy::Required => "required",
        SerializationPolicy::Optional => "optional",
        SerializationPolicy::Forbidden => "forbidden",
    }
    .to_string();

    let standard = StandardProfileJson {
        accept_bagit_version: profile.accept_bagit_version.iter().cloned().collect(),
        accept_serialization: profile.accept_serialization.clone(),
        allow_fetch_txt: profile.allow_fetch_txt,
        serialization,
        manifests_required: profile.manifests_required.iter().cloned().collect(),
        manifests_allowed: Some(profile.manifests_allowed.iter().cloned().collect()),
        tag_manifests_required: Some(profile.tag_manifests_required.iter().cloned().collect()),
        tag_manifests_allowed: Some(profile.tag_manifests_allowed.iter().cloned().collect()),
        tag_files_allowed: Some(profile.tag_files_allowed.clone()),
        tag_files_required,
        bagit_profile_info,
        bag_info,
    };

    serde_json::to_string_pretty(&standard).context(ProfileParseSnafu {})
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISK_IMAGES_FIXTURE: &str = r#"{
        "Accept-BagIt-Version": ["1.0"],
        "Accept-Serialization": ["application/zip", "application/tar"],
        "Allow-Fetch.txt": false,
        "Serialization": "required",
        "Manifests-Required": ["sha256"],
        "BagIt-Profile-Info": {
            "BagIt-Profile-Identifier": "disk-images",
            "Source-Organization": "Simon Fraser University"
        },
        "Bag-Info": {
            "Source-Organization": {
                "required": true,
                "values": ["Simon Fraser University", "York University"]
            },
            "Contact-Name": { "required": true }
        }
    }"#;

    #[test]
    fn imports_disk_images_fixture() {
        let profile = import_profile(DISK_IMAGES_FIXTURE, "disk-images.json").unwrap();
        assert_eq!("disk-images", profile.id);
        assert_eq!(
            vec!["application/zip".to_string(), "application/tar".to_string()],
            profile.accept_serialization
        );
        assert!(!profile.allow_fetch_txt);
        assert!(matches!(profile.serialization, SerializationPolicy::Required));

        let source_org = profile
            .tags
            .iter()
            .find(|t| t.tag_name == "Source-Organization")
            .unwrap();
        assert_eq!(
            vec!["Simon Fraser University".to_string(), "York University".to_string()],
            source_org.values
        );
    }

    #[test]
    fn defaults_allowed_sets_when_absent() {
        let profile = import_profile(DISK_IMAGES_FIXTURE, "disk-images.json").unwrap();
        assert_eq!(6, profile.manifests_allowed.len());
        assert_eq!(6, profile.tag_manifests_allowed.len());
        assert!(profile.tag_manifests_required.is_empty());
        assert_eq!(vec!["*".to_string()], profile.tag_files_allowed);
    }

    #[test]
    fn single_value_seeds_default() {
        let json = r#"{
            "Accept-BagIt-Version": ["1.0"],
            "Bag-Info": { "Internal-Sender-Identifier": { "required": false, "values": ["only-one"] } }
        }"#;
        let profile = import_profile(json, "id").unwrap();
        let tag = profile
            .tags
            .iter()
            .find(|t| t.tag_name == "Internal-Sender-Identifier")
            .unwrap();
        assert_eq!(Some("only-one".to_string()), tag.default_value);
    }

    #[test]
    fn export_then_import_round_trips_bag_info_subset() {
        let original = import_profile(DISK_IMAGES_FIXTURE, "disk-images.json").unwrap();
        let exported = export_profile(&original).unwrap();
        let reimported = import_profile(&exported, "disk-images").unwrap();

        assert_eq!(original.id, reimported.id);
        assert_eq!(original.accept_serialization, reimported.accept_serialization);
        assert_eq!(original.manifests_required, reimported.manifests_required);

        let mut orig_bag_info: Vec<_> = original
            .tags_for_file(BAG_INFO_TXT)
            .map(|t| (t.tag_name.clone(), t.required, t.values.clone()))
            .collect();
        let mut reimported_bag_info: Vec<_> = reimported
            .tags_for_file(BAG_INFO_TXT)
            .map(|t| (t.tag_name.clone(), t.required, t.values.clone()))
            .collect();
        orig_bag_info.sort();
        reimported_bag_info.sort();
        assert_eq!(orig_bag_info, reimported_bag_info);
    }

    #[test]
    fn export_omits_bagit_txt_tags() {
        let profile = Profile::new_empty("id", "name");
        let exported = export_profile(&profile).unwrap();
        assert!(!exported.contains("BagIt-Version"));
    }
}
