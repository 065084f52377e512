//! Criteria-driven selection of filesystem files and zip-archive entries.
//! A [`Criteria`] is parsed once from text such as `name = *.txt AND size > 1024`
//! and then applied to candidates from a directory walk or a zip archive.

pub mod archive;
pub mod criteria;
pub mod entity;
pub mod walk;

pub use archive::{
    add_selected_files, list_entries, open_archive, remove_named, remove_selected, select_entries,
    ArchiveEntry, ArchiveError, ArchiveErrorCode, ArchiveResult,
};
pub use criteria::{
    CompareOp, Criteria, CriteriaError, CriteriaErrorKind, Criterion, MatchOptions, TimeField,
};
pub use entity::{Attributes, Entity};
pub use walk::{select_files, SelectedFiles};
