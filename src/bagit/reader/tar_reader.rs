use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::info;
use snafu::ResultExt;

use crate::bagit::error::*;
use crate::bagit::reader::{BagEntryReader, EntryInfo};

/// Reads a regular uncompressed USTAR/POSIX tar as a bag container (§4.C, §6.1). Paths are
/// returned verbatim, including the leading bag-root directory inside the archive — the caller
/// strips it once it knows the expected bag name (§3).
pub struct TarReader {
    path: PathBuf,
}

impl TarReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    fn open_archive(&self) -> Result<tar::Archive<File>> {
        let file = File::open(&self.path).context(TarReadSnafu { path: &self.path })?;
        Ok(tar::Archive::new(file))
    }
}

impl BagEntryReader for TarReader {
    fn list(&mut self) -> Result<Vec<EntryInfo>> {
        let mut archive = self.open_archive()?;
        let mut entries = Vec::new();

        for entry in archive.entries().context(TarReadSnafu { path: &self.path })? {
            let entry = entry.context(TarReadSnafu { path: &self.path })?;
            let header = entry.header();
            let rel_path = entry
                .path()
                .context(TarReadSnafu { path: &self.path })?
                .to_string_lossy()
                .replace('\\', "/");

            entries.push(EntryInfo {
                rel_path,
                is_file: header.entry_type().is_file(),
                size: header.size().ok(),
            });
        }

        Ok(entries)
    }

    fn read(
        &mut self,
        on_entry: &mut dyn FnMut(&EntryInfo, &mut dyn Read) -> Result<()>,
    ) -> Result<()> {
        let mut archive = self.open_archive()?;

        for entry in archive.entries().context(TarReadSnafu { path: &self.path })? {
            let mut entry = entry.context(TarReadSnafu { path: &self.path })?;
            let header = entry.header();

            if !header.entry_type().is_file() {
                if header.entry_type().is_symlink() {
                    info!("Skipping symlink in tar archive {}", self.path.display());
                }
                continue;
            }

            let rel_path = entry
                .path()
                .context(TarReadSnafu { path: &self.path })?
                .to_string_lossy()
                .replace('\\', "/");
            let size = header.size().ok();
            let info = EntryInfo {
                rel_path,
                is_file: true,
                size,
            };

            on_entry(&info, &mut entry)?;
        }

        Ok(())
    }
}
