use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::info;
use snafu::ResultExt;
use walkdir::WalkDir;

use crate::bagit::error::*;
use crate::bagit::reader::{forward_slashed, BagEntryReader, EntryInfo};

/// Walks a filesystem directory as a bag container (§4.C, §6.1). The directory name is the bag
/// name. Symlinks and other non-regular entries are skipped with an informational log rather
/// than failing the read (§4.C, §9.3).
pub struct DirectoryReader {
    base_dir: PathBuf,
}

impl DirectoryReader {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn walk(&self) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
        WalkDir::new(&self.base_dir)
            .into_iter()
            .filter_entry(|_| true)
    }
}

impl BagEntryReader for DirectoryReader {
    fn list(&mut self) -> Result<Vec<EntryInfo>> {
        let mut entries = Vec::new();

        for entry in self.walk() {
            let entry = entry.context(WalkFileSnafu {})?;
            if entry.path() == self.base_dir {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                info!("Skipping symlink {}", entry.path().display());
                continue;
            }

            let rel_path = entry
                .path()
                .strip_prefix(&self.base_dir)
                .unwrap_or(entry.path());

            entries.push(EntryInfo {
                rel_path: forward_slashed(rel_path),
                is_file: file_type.is_file(),
                size: entry.metadata().ok().map(|m| m.len()),
            });
        }

        Ok(entries)
    }

    fn read(
        &mut self,
        on_entry: &mut dyn FnMut(&EntryInfo, &mut dyn Read) -> Result<()>,
    ) -> Result<()> {
        for entry in self.walk() {
            let entry = entry.context(WalkFileSnafu {})?;
            if entry.path() == self.base_dir {
                continue;
            }

            let file_type = entry.file_type();
            if !file_type.is_file() {
                if file_type.is_symlink() {
                    info!("Skipping symlink {}", entry.path().display());
                }
                continue;
            }

            let rel_path = entry
                .path()
                .strip_prefix(&self.base_dir)
                .unwrap_or(entry.path());
            let info = EntryInfo {
                rel_path: forward_slashed(rel_path),
                is_file: true,
                size: entry.metadata().ok().map(|m| m.len()),
            };

            let mut file = File::open(entry.path()).context(IoReadSnafu {
                path: entry.path().to_path_buf(),
            })?;
            on_entry(&info, &mut file)?;
        }

        Ok(())
    }
}
