use std::path::Path;

/// Error kinds surfaced by the engine (§7). Distinct from [`crate::bagit::error::Error`], which
/// is reserved for hard I/O/programming failures — these are accumulated validation outcomes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    ProfileInvalid,
    IoMissing,
    IoRead,
    SerializationViolation,
    UntarNameMismatch,
    ManifestMissing,
    ManifestNotAllowed,
    TagFileNotAllowed,
    PayloadMissingInManifest,
    FileMissingInBag,
    ChecksumMismatch,
    OxumMismatch,
    TagMissing,
    TagEmpty,
    TagIllegalValue,
    BaggerSourceMissing,
    BaggerWriteFailed,
}

/// One accumulated validation failure (§7). Carries enough to both drive CLI output and let a
/// GUI collaborator group/filter by kind.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The four task kinds a [`Task`] event can report (§4.E).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TaskKind {
    Start,
    Add,
    Checksum,
    Read,
}

/// A progress update for a single bag entry (§4.E).
#[derive(Debug, Clone)]
pub struct Task {
    pub kind: TaskKind,
    pub rel_path: String,
    pub message: String,
    pub percent: f32,
}

impl Task {
    pub fn new(kind: TaskKind, rel_path: impl Into<String>, message: impl Into<String>, percent: f32) -> Self {
        Self {
            kind,
            rel_path: rel_path.into(),
            message: message.into(),
            percent,
        }
    }
}

/// Narrow event-delivery contract consumed by [`crate::bagit::validator::Validator`] and
/// [`crate::bagit::bagger::Bagger`] (§9 "Event delivery"). All methods have a no-op default so
/// callers only implement what they care about — there is no language-level event emitter
/// backing this, just ordinary trait dispatch.
pub trait Observer {
    fn on_validate_start(&mut self, _bag_path: &Path) {}
    fn on_task(&mut self, _task: &Task) {}
    fn on_error(&mut self, _error: &ValidationError) {}
    fn on_end(&mut self) {}
}

/// The default no-op [`Observer`].
#[derive(Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
