use std::collections::BTreeSet;

use crate::bagit::consts::{ALGORITHM_PREFERENCE, BAGIT_1_0, BAG_INFO_TXT, BAGIT_TXT, LABEL_BAGIT_VERSION, LABEL_FILE_ENCODING};

/// Whether a bag must, may, or must not be serialized into a single archive (§3).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SerializationPolicy {
    Required,
    Optional,
    Forbidden,
}

/// A single tag constraint within a tag file (§3).
#[derive(Debug, Clone)]
pub struct TagDefinition {
    pub tag_file: String,
    pub tag_name: String,
    pub required: bool,
    pub empty_ok: bool,
    /// Empty means free-form; a non-empty list is an enumeration of legal values.
    pub values: Vec<String>,
    pub default_value: Option<String>,
    pub user_value: Option<String>,
    pub is_built_in: bool,
    pub is_user_added_file: bool,
    pub is_user_added_tag: bool,
    pub was_added_for_job: bool,
}

impl TagDefinition {
    pub fn new<F: Into<String>, N: Into<String>>(tag_file: F, tag_name: N, required: bool) -> Self {
        Self {
            tag_file: tag_file.into(),
            tag_name: tag_name.into(),
            required,
            empty_ok: !required,
            values: Vec::new(),
            default_value: None,
            user_value: None,
            is_built_in: false,
            is_user_added_file: false,
            is_user_added_tag: false,
            was_added_for_job: false,
        }
    }
}

/// Declarative rule set that specializes BagIt for a community (§3). Mutable until persisted;
/// persistence is the caller's concern, not the engine's (§9: no `Repository` baked in here).
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_built_in: bool,
    pub accept_bagit_version: BTreeSet<String>,
    /// Ordered; earlier entries are preferred (§3).
    pub accept_serialization: Vec<String>,
    pub serialization: SerializationPolicy,
    pub allow_fetch_txt: bool,
    pub manifests_required: BTreeSet<String>,
    pub manifests_allowed: BTreeSet<String>,
    pub tag_manifests_required: BTreeSet<String>,
    pub tag_manifests_allowed: BTreeSet<String>,
    /// Ordered glob patterns; `["*"]` means "any" (§3).
    pub tag_files_allowed: Vec<String>,
    pub tar_dir_must_match_name: bool,
    pub tags: Vec<TagDefinition>,
}

impl Profile {
    /// A new, empty profile seeded only with the `bagit.txt` tag definitions every profile must
    /// carry to satisfy invariant 5 (§3).
    pub fn new_empty<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            is_built_in: false,
            accept_bagit_version: BTreeSet::from([BAGIT_1_0.to_string()]),
            accept_serialization: Vec::new(),
            serialization: SerializationPolicy::Optional,
            allow_fetch_txt: false,
            manifests_required: BTreeSet::new(),
            manifests_allowed: BTreeSet::new(),
            tag_manifests_required: BTreeSet::new(),
            tag_manifests_allowed: BTreeSet::new(),
            tag_files_allowed: vec!["*".to_string()],
            tar_dir_must_match_name: false,
            tags: vec![
                TagDefinition::new(BAGIT_TXT, LABEL_BAGIT_VERSION, true),
                TagDefinition::new(BAGIT_TXT, LABEL_FILE_ENCODING, true),
            ],
        }
    }

    pub fn tags_for_file<'a>(&'a self, tag_file: &'a str) -> impl Iterator<Item = &'a TagDefinition> {
        self.tags.iter().filter(move |t| t.tag_file == tag_file)
    }

    /// Distinct tag files referenced by this profile's tag definitions, in first-appearance
    /// order.
    pub fn tag_files(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for tag in &self.tags {
            if !seen.contains(&tag.tag_file.as_str()) {
                seen.push(tag.tag_file.as_str());
            }
        }
        seen
    }

    /// Checks the profile's own well-formedness (§3 invariants 1-6). Returns one message per
    /// violation; an empty vec means the profile is well-formed.
    pub fn self_check(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("profile id must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("profile name must not be empty".to_string());
        }
        if self.accept_bagit_version.is_empty() {
            errors.push("accept_bagit_version must not be empty".to_string());
        }
        if self.manifests_allowed.is_empty() {
            errors.push("manifests_allowed must not be empty".to_string());
        } else if !self.manifests_required.is_subset(&self.manifests_allowed) {
            errors.push("manifests_required must be a subset of manifests_allowed".to_string());
        }
        if self.tag_manifests_allowed.is_empty() {
            errors.push("tag_manifests_allowed must not be empty".to_string());
        } else if !self
            .tag_manifests_required
            .is_subset(&self.tag_manifests_allowed)
        {
            errors.push(
                "tag_manifests_required must be a subset of tag_manifests_allowed".to_string(),
            );
        }

        let has_bagit_version = self
            .tags_for_file(BAGIT_TXT)
            .any(|t| t.tag_name == LABEL_BAGIT_VERSION);
        let has_encoding = self
            .tags_for_file(BAGIT_TXT)
            .any(|t| t.tag_name == LABEL_FILE_ENCODING);
        if !has_bagit_version || !has_encoding {
            errors.push(format!(
                "{BAGIT_TXT} must define both {LABEL_BAGIT_VERSION} and {LABEL_FILE_ENCODING}"
            ));
        }
        if self.tags_for_file(BAG_INFO_TXT).next().is_none() {
            errors.push(format!("profile must define at least one tag in {BAG_INFO_TXT}"));
        }

        for tag in &self.tags {
            if let (Some(user_value), false) = (&tag.user_value, tag.values.is_empty()) {
                if !tag.values.contains(user_value) {
                    errors.push(format!(
                        "tag '{}' in {} has user_value '{}' not present in its enumerated values",
                        tag.tag_name, tag.tag_file, user_value
                    ));
                }
            }
        }

        errors
    }
}

/// §4.G: picks the digest algorithms a bagger should use for manifests when the profile itself
/// leaves the choice ambiguous.
pub fn choose_manifest_algorithms(profile: &Profile) -> Vec<String> {
    let intersection: BTreeSet<String> = profile
        .manifests_required
        .intersection(&profile.tag_manifests_required)
        .cloned()
        .collect();
    if !intersection.is_empty() {
        return intersection.into_iter().collect();
    }
    if !profile.manifests_required.is_empty() {
        return profile.manifests_required.iter().cloned().collect();
    }
    if !profile.tag_manifests_required.is_empty() {
        return profile.tag_manifests_required.iter().cloned().collect();
    }
    for candidate in ALGORITHM_PREFERENCE {
        if profile.manifests_allowed.contains(candidate) {
            return vec![candidate.to_string()];
        }
    }
    vec!["sha512".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(vals: &[&str]) -> BTreeSet<String> {
        vals.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_profile_fails_self_check_without_bag_info_tag() {
        let profile = Profile::new_empty("id", "name");
        let errors = profile.self_check();
        assert!(errors.iter().any(|e| e.contains("bag-info.txt")));
    }

    #[test]
    fn well_formed_profile_passes() {
        let mut profile = Profile::new_empty("id", "name");
        profile.manifests_allowed = set(&["sha256"]);
        profile.tag_manifests_allowed = set(&["sha256"]);
        profile
            .tags
            .push(TagDefinition::new(BAG_INFO_TXT, "Source-Organization", true));
        assert!(profile.self_check().is_empty());
    }

    #[test]
    fn chooser_prefers_intersection() {
        let mut profile = Profile::new_empty("id", "name");
        profile.manifests_required = set(&["sha256", "md5"]);
        profile.tag_manifests_required = set(&["md5"]);
        profile.manifests_allowed = set(&["sha256", "md5"]);
        profile.tag_manifests_allowed = set(&["md5"]);
        assert_eq!(vec!["md5".to_string()], choose_manifest_algorithms(&profile));
    }

    #[test]
    fn chooser_falls_back_to_strength_order() {
        let mut profile = Profile::new_empty("id", "name");
        profile.manifests_allowed = set(&["md5", "sha1", "sha256"]);
        assert_eq!(
            vec!["sha256".to_string()],
            choose_manifest_algorithms(&profile)
        );
    }

    #[test]
    fn chooser_default_is_sha512() {
        let profile = Profile::new_empty("id", "name");
        assert_eq!(vec!["sha512".to_string()], choose_manifest_algorithms(&profile));
    }
}
