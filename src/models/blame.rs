//! Blame DTOs: per-line attribution plus a deduplicated commit map.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::git::blame::BlameOutcome;
use crate::models::commit::CommitDto;
use crate::models::links::ApiUrls;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlameLineDto {
    /// Attributing commit sha; absent when attribution ran incomplete.
    pub commit: Option<String>,
    pub orig_path: String,
    pub line_num: usize,
    pub line: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlameDto {
    pub lines: Vec<BlameLineDto>,
    pub commits: BTreeMap<String, CommitDto>,
    /// Unset when a store failure cut the walk short; the resolved lines
    /// above are still meaningful.
    pub complete: bool,
}

impl BlameDto {
    pub fn new(urls: &ApiUrls<'_>, path: &str, outcome: BlameOutcome) -> Self {
        let lines = outcome
            .lines
            .into_iter()
            .map(|line| BlameLineDto {
                commit: line.commit.as_ref().map(|id| id.to_string()),
                orig_path: path.to_string(),
                line_num: line.line_number,
                line: line.text,
            })
            .collect();
        let commits = outcome
            .commits
            .iter()
            .map(|(id, commit)| (id.to_string(), CommitDto::new(urls, commit)))
            .collect();
        Self {
            lines,
            commits,
            complete: outcome.complete,
        }
    }
}
