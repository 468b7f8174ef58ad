use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::git::history::{HistoryWalk, merge_base};
use crate::git::revision;
use crate::git::store::ObjectStore;
use crate::git::GitRepository;
use crate::models::{ApiUrls, CommitDto};
use crate::routes::{AppState, blocking};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/git/commits/", get(list_commits))
        .route("/repos/{repo}/git/commits/{sha}/", get(get_commit))
        .route(
            "/repos/{repo}/git/commits/{left}/merge-base/{right}/",
            get(get_merge_base),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CommitListQuery {
    ref_name: Option<String>,
    start_sha: Option<String>,
    limit: Option<i64>,
}

async fn list_commits(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    Query(query): Query<CommitListQuery>,
) -> Result<Json<Vec<CommitDto>>> {
    let commits = blocking(move || {
        let limit = match query.limit {
            None => state.default_limit,
            Some(l) if l < 0 => {
                return Err(ApiError::InvalidArgument(format!("limit {}", l)));
            }
            Some(l) => l as usize,
        };
        let store = GitRepository::open(&state.root, &repo)?;
        let start = match &query.start_sha {
            Some(sha) => revision::resolve(&store, sha)?,
            None => {
                let ref_name = query.ref_name.as_deref().unwrap_or("HEAD");
                revision::resolve(&store, ref_name)?
            }
        };
        let urls = ApiUrls::new(&state.base_url, &repo);
        let mut commits = Vec::new();
        for commit in HistoryWalk::new(&store, &start)?.take(limit) {
            commits.push(CommitDto::new(&urls, &commit?));
        }
        Ok(commits)
    })
    .await?;
    Ok(Json(commits))
}

async fn get_commit(
    State(state): State<AppState>,
    Path((repo, sha)): Path<(String, String)>,
) -> Result<Json<CommitDto>> {
    let commit = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let id = revision::resolve_object(&store, &sha)?;
        let commit = store.commit(&id)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        Ok(CommitDto::new(&urls, &commit))
    })
    .await?;
    Ok(Json(commit))
}

async fn get_merge_base(
    State(state): State<AppState>,
    Path((repo, left, right)): Path<(String, String, String)>,
) -> Result<Json<Option<CommitDto>>> {
    let base = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let left = revision::resolve(&store, &left)?;
        let right = revision::resolve(&store, &right)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        match merge_base(&store, &left, &right)? {
            Some(id) => Ok(Some(CommitDto::new(&urls, &store.commit(&id)?))),
            None => Ok(None),
        }
    })
    .await?;
    Ok(Json(base))
}
