//! Criteria-driven selection and rewriting of zip-archive entries.

mod error;

pub use error::{ArchiveError, ArchiveErrorCode, ArchiveResult};

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{
    DateTime as ChronoDateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike,
};
use tracing::debug;
use zip::{
    write::SimpleFileOptions, CompressionMethod, DateTime as ZipDateTime, ZipArchive, ZipWriter,
};

use crate::criteria::Criteria;
use crate::entity::{final_component, Attributes, Entity};
use crate::walk;

/// Owned snapshot of one entry's central-directory metadata. Selection
/// works on these so no borrow into the archive escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    /// Virtual path inside the archive, slash separated.
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub modified: NaiveDateTime,
    pub attributes: Attributes,
    pub is_dir: bool,
}

impl ArchiveEntry {
    /// The shape the criteria engine evaluates. Archives only store a
    /// modification time, so it stands in for all three timestamps.
    pub fn to_entity(&self) -> Entity {
        Entity {
            name: self.name.clone(),
            size: self.size,
            modified: self.modified,
            created: self.modified,
            accessed: self.modified,
            attributes: self.attributes,
        }
    }
}

/// Opens the archive at `path` for reading.
pub fn open_archive(path: &Path) -> ArchiveResult<ZipArchive<BufReader<File>>> {
    let file = File::open(path).map_err(|e| ArchiveError::io("open archive", e))?;
    ZipArchive::new(BufReader::new(file))
        .map_err(|e| ArchiveError::zip("read archive", ArchiveErrorCode::ReadFailed, e))
}

/// Snapshots every entry in archive order.
pub fn list_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> ArchiveResult<Vec<ArchiveEntry>> {
    let mut out = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| ArchiveError::zip("read zip entry", ArchiveErrorCode::ReadFailed, e))?;
        let name = entry.name().to_string();
        let is_dir = entry.is_dir() || name.ends_with('/');
        let modified = entry
            .last_modified()
            .and_then(zip_datetime_to_naive)
            .unwrap_or_else(dos_epoch);
        let attributes = entry_attributes(&name, entry.unix_mode(), is_dir);
        out.push(ArchiveEntry {
            index: i,
            name,
            size: entry.size(),
            compressed_size: entry.compressed_size(),
            modified,
            attributes,
            is_dir,
        });
    }
    Ok(out)
}

/// Entries matching `criteria`. A non-empty `directory` restricts the
/// candidates to that virtual subtree before the criteria apply, so the
/// restriction never interferes with the expression itself.
pub fn select_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    criteria: &Criteria,
    directory: &str,
) -> ArchiveResult<Vec<ArchiveEntry>> {
    let scope = directory.replace('\\', "/");
    let scope = scope.trim_matches('/');
    let entries = list_entries(archive)?;
    Ok(entries
        .into_iter()
        .filter(|entry| in_directory(&entry.name, scope) && criteria.matches(&entry.to_entity()))
        .collect())
}

/// Selects files under `root` and appends them to the archive at
/// `archive_path`, creating it first when absent. Entry names are
/// relative to `root`, slash separated; modification times and unix
/// permissions are carried over. Returns the names added, in entry order.
pub fn add_selected_files(
    archive_path: &Path,
    criteria: &Criteria,
    root: &Path,
    recursive: bool,
) -> ArchiveResult<Vec<String>> {
    let mut selected: Vec<PathBuf> = walk::select_files(criteria, root, recursive)
        .filter(|path| !is_same_path(path, archive_path))
        .collect();
    selected.sort();

    let mut writer = open_writer(archive_path)?;
    let deflated_opts = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(6));
    let stored_opts = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .compression_level(Some(0));

    let mut added = Vec::with_capacity(selected.len());
    for path in &selected {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            // Raced replacements and symlinks are not stored.
            Ok(_) => continue,
            Err(err) => {
                debug!(
                    "skipping unreadable file: path={} err={err}",
                    path.display()
                );
                continue;
            }
        };
        let rel_name = walk::relative_name(root, path);
        let base_opts = if is_precompressed(path) {
            stored_opts
        } else {
            deflated_opts
        };
        let opts = with_file_metadata(base_opts, &meta);
        writer
            .start_file(rel_name.clone(), opts)
            .map_err(|e| ArchiveError::zip("start zip entry", ArchiveErrorCode::WriteFailed, e))?;
        let file = File::open(path).map_err(|e| ArchiveError::io("open selected file", e))?;
        io::copy(&mut BufReader::new(file), &mut writer)
            .map_err(|e| ArchiveError::io("write zip entry", e))?;
        added.push(rel_name);
    }
    writer
        .finish()
        .map_err(|e| ArchiveError::zip("finalize archive", ArchiveErrorCode::WriteFailed, e))?;
    debug!(
        "archive updated: path={} added={}",
        archive_path.display(),
        added.len()
    );
    Ok(added)
}

/// Rewrites the archive without the entries matching `criteria` and
/// returns how many were dropped.
pub fn remove_selected(archive_path: &Path, criteria: &Criteria) -> ArchiveResult<usize> {
    let names: Vec<String> = {
        let mut archive = open_archive(archive_path)?;
        select_entries(&mut archive, criteria, "")?
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    };
    remove_named(archive_path, &names)
}

/// Rewrites the archive without the named entries. Surviving entries are
/// copied raw, so nothing is recompressed, and the original file is only
/// replaced once the rewrite has been finalized.
pub fn remove_named(archive_path: &Path, names: &[String]) -> ArchiveResult<usize> {
    if names.is_empty() {
        return Ok(0);
    }
    let removing: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut archive = open_archive(archive_path)?;
    let (rewrite_path, rewrite_file) = create_rewrite_target(archive_path)?;
    let mut writer = ZipWriter::new(rewrite_file);
    let mut removed = 0usize;
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| ArchiveError::zip("read zip entry", ArchiveErrorCode::ReadFailed, e))?;
        if removing.contains(entry.name()) {
            removed += 1;
            continue;
        }
        writer
            .raw_copy_file(entry)
            .map_err(|e| ArchiveError::zip("copy zip entry", ArchiveErrorCode::WriteFailed, e))?;
    }
    if let Err(err) = writer.finish() {
        let _ = fs::remove_file(&rewrite_path);
        return Err(ArchiveError::zip(
            "finalize archive",
            ArchiveErrorCode::WriteFailed,
            err,
        ));
    }
    drop(archive);
    if let Err(err) = fs::rename(&rewrite_path, archive_path) {
        let _ = fs::remove_file(&rewrite_path);
        return Err(ArchiveError::io("replace archive", err));
    }
    debug!(
        "archive rewritten: path={} removed={removed}",
        archive_path.display()
    );
    Ok(removed)
}

fn in_directory(name: &str, scope: &str) -> bool {
    if scope.is_empty() {
        return true;
    }
    match name.trim_start_matches('/').strip_prefix(scope) {
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

fn entry_attributes(name: &str, unix_mode: Option<u32>, is_dir: bool) -> Attributes {
    let mut attrs = Attributes::empty();
    if is_dir {
        attrs.insert(Attributes::DIRECTORY);
    }
    if final_component(name).starts_with('.') {
        attrs.insert(Attributes::HIDDEN);
    }
    if let Some(mode) = unix_mode {
        if mode & 0o200 == 0 {
            attrs.insert(Attributes::READ_ONLY);
        }
    }
    attrs
}

fn open_writer(path: &Path) -> ArchiveResult<ZipWriter<File>> {
    match File::options().read(true).write(true).open(path) {
        Ok(file) => ZipWriter::new_append(file)
            .map_err(|e| ArchiveError::zip("append to archive", ArchiveErrorCode::WriteFailed, e)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let file = File::create(path).map_err(|e| ArchiveError::io("create archive", e))?;
            Ok(ZipWriter::new(file))
        }
        Err(err) => Err(ArchiveError::io("open archive", err)),
    }
}

fn create_rewrite_target(path: &Path) -> ArchiveResult<(PathBuf, File)> {
    let mut idx = 0usize;
    loop {
        let ext = if idx == 0 {
            "rewrite".to_string()
        } else {
            format!("rewrite{idx}")
        };
        let candidate = path.with_extension(ext);
        match File::options().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                idx = idx.saturating_add(1);
            }
            Err(err) => return Err(ArchiveError::io("create rewrite file", err)),
        }
    }
}

fn is_same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => a == b,
    }
}

fn with_file_metadata(base: SimpleFileOptions, meta: &fs::Metadata) -> SimpleFileOptions {
    let mut opts = base;
    if let Some(mode) = metadata_mode(meta) {
        opts = opts.unix_permissions(mode);
    }
    if let Some(modified) = meta.modified().ok().and_then(system_time_to_zip_datetime) {
        opts = opts.last_modified_time(modified);
    }
    opts
}

#[cfg(unix)]
fn metadata_mode(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.mode())
}

#[cfg(not(unix))]
fn metadata_mode(_meta: &fs::Metadata) -> Option<u32> {
    None
}

fn system_time_to_zip_datetime(time: SystemTime) -> Option<ZipDateTime> {
    let dt: ChronoDateTime<Local> = time.into();
    ZipDateTime::from_date_and_time(
        dt.year() as u16,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
    )
    .ok()
}

fn zip_datetime_to_naive(dt: ZipDateTime) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(
        i32::from(dt.year()),
        u32::from(dt.month()),
        u32::from(dt.day()),
    )?;
    let time = NaiveTime::from_hms_opt(
        u32::from(dt.hour()),
        u32::from(dt.minute()),
        u32::from(dt.second()),
    )?;
    Some(date.and_time(time))
}

fn dos_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1980, 1, 1)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
}

fn is_precompressed(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref(),
        Some(
            "zip" | "gz" | "tgz" | "bz2" | "xz" | "zst" | "7z" | "rar" | "jpg" | "jpeg" | "png"
                | "gif" | "mp3" | "mp4" | "mkv" | "mov" | "avi" | "webm" | "pdf"
        )
    )
}
