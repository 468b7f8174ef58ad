//! Tree listing and porcelain contents DTOs.

use serde::Serialize;

use crate::git::store::EntryKind;
use crate::git::tree::FlatEntry;
use crate::models::links::ApiUrls;

#[derive(Debug, Clone, Serialize)]
pub struct TreeEntryDto {
    pub path: String,
    /// Octal file mode, zero-padded the way git prints it.
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl TreeEntryDto {
    pub fn new(urls: &ApiUrls<'_>, entry: &FlatEntry) -> Self {
        let url = match entry.kind {
            EntryKind::Blob => Some(urls.blob(entry.id.as_str())),
            EntryKind::Tree => Some(urls.tree(entry.id.as_str())),
            EntryKind::Submodule => None,
        };
        Self {
            path: entry.path.clone(),
            mode: format!("{:06o}", entry.mode),
            kind: entry.kind.as_str(),
            sha: entry.id.to_string(),
            size: entry.size,
            url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeDto {
    pub sha: String,
    pub url: String,
    pub tree: Vec<TreeEntryDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelfLinks {
    #[serde(rename = "self")]
    pub self_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
}

/// One record of the porcelain contents endpoint: `type` is `file` or
/// `dir`, directories report size zero, and file content is only embedded
/// for direct file lookups.
#[derive(Debug, Clone, Serialize)]
pub struct ContentsEntryDto {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub url: String,
    pub git_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "_links")]
    pub links: SelfLinks,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContentsDto {
    File(Box<ContentsEntryDto>),
    Dir(Vec<ContentsEntryDto>),
}
