//! Repository, branch, porcelain-tag, and contributor DTOs.

use serde::Serialize;

use crate::git::history::Contributor;
use crate::models::commit::{ObjectLink, PorcelainCommitDto};
use crate::models::links::ApiUrls;
use crate::models::objects::TagDto;

#[derive(Debug, Clone, Serialize)]
pub struct RepoDto {
    pub name: String,
    pub description: Option<String>,
    pub default_branch: Option<String>,
    pub url: String,
}

impl RepoDto {
    pub fn new(
        urls: &ApiUrls<'_>,
        name: &str,
        description: Option<String>,
        default_branch: Option<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description,
            default_branch,
            url: urls.repo(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchSummaryDto {
    pub name: String,
    pub commit: ObjectLink,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchLinks {
    #[serde(rename = "self")]
    pub self_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchDto {
    pub name: String,
    pub commit: PorcelainCommitDto,
    pub url: String,
    #[serde(rename = "_links")]
    pub links: BranchLinks,
}

impl BranchDto {
    pub fn new(urls: &ApiUrls<'_>, name: &str, commit: PorcelainCommitDto) -> Self {
        let url = urls.branch(name);
        Self {
            name: name.to_string(),
            commit,
            url: url.clone(),
            links: BranchLinks { self_url: url },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagSummaryDto {
    pub name: String,
    pub commit: ObjectLink,
    pub url: String,
}

/// Single-tag porcelain response; `tag` is only present for annotated tags.
#[derive(Debug, Clone, Serialize)]
pub struct TagDetailDto {
    pub name: String,
    pub commit: PorcelainCommitDto,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContributorDto {
    pub email: String,
    pub name: String,
    pub contributions: usize,
}

impl From<Contributor> for ContributorDto {
    fn from(c: Contributor) -> Self {
        Self {
            email: c.email,
            name: c.name,
            contributions: c.commits,
        }
    }
}
