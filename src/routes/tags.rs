//! Porcelain tag views: lightweight and annotated tags with their target
//! commit summaries.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::error::{ApiError, Result};
use crate::git::GitRepository;
use crate::git::revision;
use crate::git::store::{ObjectKind, ObjectStore};
use crate::models::{ApiUrls, ObjectLink, PorcelainCommitDto, TagDetailDto, TagDto, TagSummaryDto};
use crate::routes::{AppState, blocking};

const TAG_REF_PREFIX: &str = "refs/tags/";

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/tags/", get(list_tags))
        .route("/repos/{repo}/tags/{tag}/", get(get_tag))
        .with_state(state)
}

async fn list_tags(
    State(state): State<AppState>,
    Path(repo): Path<String>,
) -> Result<Json<Vec<TagSummaryDto>>> {
    let tags = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        let mut tags = Vec::new();
        for reference in store.refs()? {
            let Some(name) = reference.name.strip_prefix(TAG_REF_PREFIX) else {
                continue;
            };
            let commit_id = revision::peel_to_commit(&store, &reference.target)?;
            tags.push(TagSummaryDto {
                name: name.to_string(),
                commit: ObjectLink {
                    sha: commit_id.to_string(),
                    url: urls.porcelain_commit(commit_id.as_str()),
                },
                url: urls.tag_name(name),
            });
        }
        Ok(tags)
    })
    .await?;
    Ok(Json(tags))
}

async fn get_tag(
    State(state): State<AppState>,
    Path((repo, tag)): Path<(String, String)>,
) -> Result<Json<TagDetailDto>> {
    let result = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let reference = store
            .find_ref(&format!("{}{}", TAG_REF_PREFIX, tag))?
            .ok_or_else(|| ApiError::NotFound(format!("tag {}", tag)))?;
        let commit_id = revision::peel_to_commit(&store, &reference.target)?;
        let commit = store.commit(&commit_id)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        // Annotated tags additionally expose the tag object itself.
        let tag_object = if store.kind(&reference.target)? == ObjectKind::Tag {
            Some(TagDto::new(&urls, &store.tag(&reference.target)?))
        } else {
            None
        };
        Ok(TagDetailDto {
            name: tag.clone(),
            commit: PorcelainCommitDto::new(&urls, &commit),
            url: urls.tag_name(&tag),
            tag: tag_object,
        })
    })
    .await?;
    Ok(Json(result))
}
