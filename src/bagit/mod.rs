pub use crate::bagit::bagger::{BagSink, Bagger, PayloadSource};
pub use crate::bagit::config::EngineConfig;
pub use crate::bagit::digest::DigestAlgorithm;
pub use crate::bagit::error::*;
pub use crate::bagit::events::{ErrorKind, NoopObserver, Observer, Task, TaskKind, ValidationError};
pub use crate::bagit::kv::KeyValueCollection;
pub use crate::bagit::model::{BagItFile, BagItVersion, FileRole};
pub use crate::bagit::profile::{choose_manifest_algorithms, Profile, SerializationPolicy, TagDefinition};
pub use crate::bagit::profile_json::{export_profile, import_profile};
pub use crate::bagit::reader::{BagEntryReader, ReaderRegistry};
pub use crate::bagit::validator::{ValidationReport, Validator};

mod bagger;
mod config;
mod consts;
mod digest;
mod encoding;
mod error;
mod events;
mod glob;
mod io;
mod kv;
mod manifest;
mod model;
mod pipeline;
mod profile;
mod profile_json;
mod reader;
mod serialization;
mod tagfile;
mod validator;
