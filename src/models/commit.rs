//! Commit DTOs, plumbing and porcelain variants.
//!
//! The plumbing shape mirrors `GET /repos/:repo/git/commits/:sha` on the
//! GitHub API; the porcelain shape wraps it with resolved-revision links
//! and, when requested, the commit's diff.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Serialize;

use crate::git::diff::DiffTotals;
use crate::git::store::{Commit, Signature};
use crate::models::diff::FileChangeDto;
use crate::models::links::ApiUrls;

#[derive(Debug, Clone, Serialize)]
pub struct SignatureDto {
    pub name: String,
    pub email: String,
    pub date: String,
}

impl SignatureDto {
    pub fn new(sig: &Signature) -> Self {
        Self {
            name: sig.name.clone(),
            email: sig.email.clone(),
            date: format_date(sig),
        }
    }
}

/// ISO-8601 in the identity's original UTC offset, `Z` for UTC.
fn format_date(sig: &Signature) -> String {
    let offset = FixedOffset::east_opt(sig.offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset"));
    match DateTime::from_timestamp(sig.time, 0) {
        Some(utc) => utc
            .with_timezone(&offset)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        None => String::new(),
    }
}

/// `{sha, url}` pair pointing at another object.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectLink {
    pub sha: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitDto {
    pub url: String,
    pub sha: String,
    pub author: SignatureDto,
    pub committer: SignatureDto,
    pub message: String,
    pub tree: ObjectLink,
    pub parents: Vec<ObjectLink>,
}

impl CommitDto {
    pub fn new(urls: &ApiUrls<'_>, commit: &Commit) -> Self {
        Self {
            url: urls.commit(commit.id.as_str()),
            sha: commit.id.to_string(),
            author: SignatureDto::new(&commit.author),
            committer: SignatureDto::new(&commit.committer),
            message: commit.message.clone(),
            tree: ObjectLink {
                sha: commit.tree.to_string(),
                url: urls.tree(commit.tree.as_str()),
            },
            parents: commit
                .parents
                .iter()
                .map(|p| ObjectLink {
                    sha: p.to_string(),
                    url: urls.commit(p.as_str()),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsDto {
    pub additions: usize,
    pub deletions: usize,
    pub total: usize,
}

impl From<DiffTotals> for StatsDto {
    fn from(t: DiffTotals) -> Self {
        Self {
            additions: t.additions,
            deletions: t.deletions,
            total: t.additions + t.deletions,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PorcelainCommitDto {
    pub sha: String,
    pub url: String,
    pub commit: CommitDto,
    pub author: SignatureDto,
    pub committer: SignatureDto,
    pub parents: Vec<ObjectLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileChangeDto>>,
}

impl PorcelainCommitDto {
    pub fn new(urls: &ApiUrls<'_>, commit: &Commit) -> Self {
        Self {
            sha: commit.id.to_string(),
            url: urls.porcelain_commit(commit.id.as_str()),
            commit: CommitDto::new(urls, commit),
            author: SignatureDto::new(&commit.author),
            committer: SignatureDto::new(&commit.committer),
            parents: commit
                .parents
                .iter()
                .map(|p| ObjectLink {
                    sha: p.to_string(),
                    url: urls.porcelain_commit(p.as_str()),
                })
                .collect(),
            stats: None,
            files: None,
        }
    }

    pub fn with_diff(mut self, stats: StatsDto, files: Vec<FileChangeDto>) -> Self {
        self.stats = Some(stats);
        self.files = Some(files);
        self
    }
}
