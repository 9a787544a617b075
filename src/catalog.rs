use crate::cursor::SourceCursor;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The sources of one run and a key-to-index lookup.
#[derive(Debug, Default)]
pub struct SourceCatalog {
    cursors: Vec<SourceCursor>,
    index: FxHashMap<String, usize>,
}

impl SourceCatalog {
    /// Lists the regular files in `dir` in path order, one source per file.
    ///
    /// A missing or non-directory `dir` yields an empty catalog. `exclude`
    /// is skipped if it turns up in the listing.
    pub fn discover(dir: &Path, exclude: Option<&Path>) -> Self {
        if !dir.is_dir() {
            warn!(path = %dir.display(), "input path is not a directory, merging zero sources");
            return Self::default();
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "cannot list input directory, merging zero sources");
                return Self::default();
            }
        };

        let excluded = exclude.and_then(|p| fs::canonicalize(p).ok());
        let paths = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|path| path.is_file())
            .filter(|path| match &excluded {
                Some(excluded) => fs::canonicalize(path).ok().as_ref() != Some(excluded),
                None => true,
            })
            .sorted();

        let mut catalog = Self::default();
        for path in paths {
            catalog.add(path);
        }
        catalog
    }

    fn add(&mut self, path: PathBuf) {
        let Some(key) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            warn!(path = %path.display(), "skipping file without a name");
            return;
        };
        if let Some(&existing) = self.index.get(&key) {
            warn!(
                path = %path.display(),
                existing = %self.cursors[existing].path().display(),
                "duplicate source key, skipping"
            );
            return;
        }
        let index = self.cursors.len();
        self.index.insert(key.clone(), index);
        self.cursors.push(SourceCursor::new(index, path, key));
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn cursors(&self) -> &[SourceCursor] {
        &self.cursors
    }

    pub fn cursors_mut(&mut self) -> &mut [SourceCursor] {
        &mut self.cursors
    }
}
