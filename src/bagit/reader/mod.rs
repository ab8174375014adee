mod directory;
mod tar_reader;

pub use directory::DirectoryReader;
pub use tar_reader::TarReader;

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::bagit::error::*;

/// The sentinel extension key used to select [`DirectoryReader`] from a [`ReaderRegistry`].
pub const DIRECTORY_KEY: &str = "directory";

/// An entry discovered while listing or reading a bag container (§4.C). For a directory
/// container, `rel_path` is already bag-root-relative and forward-slashed. For a TAR container
/// it is returned verbatim, including the leading bag-root directory — callers strip that
/// themselves once they know the expected bag name.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub rel_path: String,
    pub is_file: bool,
    pub size: Option<u64>,
}

/// The bag-entry iteration contract (§4.C, §9 "Polymorphism over readers"). `list()` walks
/// metadata only; `read()` opens a forward-only stream per entry and must not advance to the
/// next entry until the caller has fully drained the current one.
pub trait BagEntryReader {
    fn list(&mut self) -> Result<Vec<EntryInfo>>;

    fn read(
        &mut self,
        on_entry: &mut dyn FnMut(&EntryInfo, &mut dyn Read) -> Result<()>,
    ) -> Result<()>;
}

type ReaderFactory = Box<dyn Fn(&Path) -> Result<Box<dyn BagEntryReader>> + Send + Sync>;

/// Maps a file extension (or the [`DIRECTORY_KEY`] sentinel) to a reader factory (§4.C
/// "Selecting a reader"). The built-in set is `directory` and `tar`; callers may register
/// additional containers (e.g. zip) without the engine needing to know about them.
pub struct ReaderRegistry {
    factories: HashMap<String, ReaderFactory>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// The registry with the built-in `directory` and `tar` readers registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DIRECTORY_KEY, |path| {
            Ok(Box::new(DirectoryReader::new(path)) as Box<dyn BagEntryReader>)
        });
        registry.register("tar", |path| {
            Ok(Box::new(TarReader::open(path)?) as Box<dyn BagEntryReader>)
        });
        registry
    }

    pub fn register<F>(&mut self, key: &str, factory: F)
    where
        F: Fn(&Path) -> Result<Box<dyn BagEntryReader>> + Send + Sync + 'static,
    {
        self.factories.insert(key.to_ascii_lowercase(), Box::new(factory));
    }

    /// Picks and opens a reader for `bag_path`: `directory` if it's a directory, otherwise by
    /// its lower-cased extension.
    pub fn open(&self, bag_path: &Path) -> Result<Box<dyn BagEntryReader>> {
        let key = if bag_path.is_dir() {
            DIRECTORY_KEY.to_string()
        } else {
            bag_path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default()
        };

        match self.factories.get(key.as_str()) {
            Some(factory) => factory(bag_path),
            None => Err(Error::UnsupportedFile {
                path: bag_path.to_path_buf(),
            }),
        }
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Normalizes a filesystem path component sequence into a bag-root-relative, forward-slashed
/// string, matching the teacher's `convert_path_separator` for non-Windows/Windows parity.
pub(crate) fn forward_slashed(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
