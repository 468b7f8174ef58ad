//! Diff-related DTOs.
//!
//! `FileChangeDto` is one changed file inside a porcelain commit or a
//! compare document; `CompareDto` is the two-revision compare response.

use serde::Serialize;

use crate::git::diff::{ChangeStatus, FileChange};
use crate::models::commit::{ObjectLink, StatsDto};
use crate::models::links::ApiUrls;

#[derive(Debug, Clone, Serialize)]
pub struct FileChangeDto {
    /// Blob id of the surviving side (the old side for removals).
    pub sha: String,
    pub status: &'static str,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_filename: Option<String>,
    pub additions: usize,
    pub deletions: usize,
    pub changes: usize,
    pub raw_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

impl FileChangeDto {
    /// `new_rev`/`old_rev` are the revisions the raw link should address;
    /// removed files only exist on the old side.
    pub fn new(urls: &ApiUrls<'_>, change: &FileChange, new_rev: &str, old_rev: Option<&str>) -> Self {
        let removed = change.status == ChangeStatus::Removed;
        let sha = if removed {
            change.old_id.as_ref()
        } else {
            change.new_id.as_ref()
        };
        let raw_rev = if removed {
            old_rev.unwrap_or(new_rev)
        } else {
            new_rev
        };
        Self {
            sha: sha.map(|id| id.to_string()).unwrap_or_default(),
            status: change.status.as_str(),
            filename: change.path.clone(),
            previous_filename: change.previous_path.clone(),
            additions: change.additions,
            deletions: change.deletions,
            changes: change.additions + change.deletions,
            raw_url: urls.raw(raw_rev, &change.path),
            patch: change.patch.clone(),
        }
    }
}

/// Diff document for `GET /repos/:repo/compare/:old...:new`.
#[derive(Debug, Clone, Serialize)]
pub struct CompareDto {
    pub base: ObjectLink,
    pub head: ObjectLink,
    pub stats: StatsDto,
    pub files: Vec<FileChangeDto>,
}
