use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::criteria::Criteria;
use crate::entity::Entity;

/// Lazily yields the files under `root` whose metadata matches `criteria`.
/// With `recursive` off only the root's direct children are considered.
/// Unreadable entries are skipped and logged so one bad directory cannot
/// abort the scan.
pub fn select_files<'a>(criteria: &'a Criteria, root: &Path, recursive: bool) -> SelectedFiles<'a> {
    let mut walker = WalkDir::new(root).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }
    SelectedFiles {
        criteria,
        root: root.to_path_buf(),
        iter: walker.into_iter(),
    }
}

pub struct SelectedFiles<'a> {
    criteria: &'a Criteria,
    root: PathBuf,
    iter: walkdir::IntoIter,
}

impl Iterator for SelectedFiles<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.iter.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    if err.io_error().map(io::Error::kind) == Some(io::ErrorKind::PermissionDenied)
                    {
                        debug!("walk permission denied: err={err}");
                    } else {
                        warn!("walk failed: err={err}");
                    }
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    debug!(
                        "metadata unavailable: path={} err={err}",
                        entry.path().display()
                    );
                    continue;
                }
            };
            let name = relative_name(&self.root, entry.path());
            if self.criteria.matches(&Entity::from_fs(&name, &meta)) {
                return Some(entry.into_path());
            }
        }
    }
}

pub(crate) fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let name = rel.to_string_lossy().replace('\\', "/");
    if name.is_empty() {
        // The walk root itself was a file.
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        name
    }
}
