//! Branch listing and lookup (read-only porcelain views).

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::error::{ApiError, Result};
use crate::git::GitRepository;
use crate::git::store::ObjectStore;
use crate::models::{ApiUrls, BranchDto, BranchSummaryDto, ObjectLink, PorcelainCommitDto};
use crate::routes::{AppState, blocking};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/branches/", get(list_branches))
        .route("/repos/{repo}/branches/{branch}/", get(get_branch))
        .with_state(state)
}

async fn list_branches(
    State(state): State<AppState>,
    Path(repo): Path<String>,
) -> Result<Json<Vec<BranchSummaryDto>>> {
    let branches = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        let mut branches = Vec::new();
        for reference in store.refs()? {
            let Some(name) = reference.name.strip_prefix(BRANCH_REF_PREFIX) else {
                continue;
            };
            branches.push(BranchSummaryDto {
                name: name.to_string(),
                commit: ObjectLink {
                    sha: reference.target.to_string(),
                    url: urls.porcelain_commit(reference.target.as_str()),
                },
            });
        }
        Ok(branches)
    })
    .await?;
    Ok(Json(branches))
}

async fn get_branch(
    State(state): State<AppState>,
    Path((repo, branch)): Path<(String, String)>,
) -> Result<Json<BranchDto>> {
    let result = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let reference = store
            .find_ref(&format!("{}{}", BRANCH_REF_PREFIX, branch))?
            .ok_or_else(|| ApiError::NotFound(format!("branch {}", branch)))?;
        let commit = store.commit(&reference.target)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        Ok(BranchDto::new(
            &urls,
            &branch,
            PorcelainCommitDto::new(&urls, &commit),
        ))
    })
    .await?;
    Ok(Json(result))
}
