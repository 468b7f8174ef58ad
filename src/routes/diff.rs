//! Porcelain diff endpoints: a commit's changes against its first parent,
//! raw `.diff` downloads, and two-revision compare with caller-controlled
//! context lines.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::git::GitRepository;
use crate::git::diff::{DiffOptions, FileChange, diff_commit, diff_trees, render_patch_document, totals};
use crate::git::revision;
use crate::git::store::{Commit, ObjectStore};
use crate::models::{ApiUrls, CompareDto, FileChangeDto, ObjectLink, PorcelainCommitDto};
use crate::routes::{AppState, blocking};

const DIFF_MIME: &str = "text/x-diff";

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/commits/{refspec}/", get(get_commit_with_diff))
        .route("/repos/{repo}/commit/{spec}", get(get_commit_diff_text))
        .route("/repos/{repo}/compare/{spec}", get(compare))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CompareQuery {
    context: Option<i64>,
}

fn file_dtos(urls: &ApiUrls<'_>, changes: &[FileChange], commit: &Commit) -> Vec<FileChangeDto> {
    let parent = commit.parents.first().map(|p| p.to_string());
    changes
        .iter()
        .map(|c| FileChangeDto::new(urls, c, commit.id.as_str(), parent.as_deref()))
        .collect()
}

async fn get_commit_with_diff(
    State(state): State<AppState>,
    Path((repo, refspec)): Path<(String, String)>,
) -> Result<Json<PorcelainCommitDto>> {
    let result = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let id = revision::resolve(&store, &refspec)?;
        let commit = store.commit(&id)?;
        let changes = diff_commit(&store, &commit, &DiffOptions::default())?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        let files = file_dtos(&urls, &changes, &commit);
        Ok(PorcelainCommitDto::new(&urls, &commit)
            .with_diff(totals(&changes).into(), files))
    })
    .await?;
    Ok(Json(result))
}

async fn get_commit_diff_text(
    State(state): State<AppState>,
    Path((repo, spec)): Path<(String, String)>,
) -> Result<Response> {
    let Some(refspec) = spec.strip_suffix(".diff").map(str::to_string) else {
        return Err(ApiError::NotFound(format!("commit/{}", spec)));
    };
    let text = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let id = revision::resolve(&store, &refspec)?;
        let commit = store.commit(&id)?;
        let changes = diff_commit(&store, &commit, &DiffOptions::default())?;
        Ok(render_patch_document(&changes))
    })
    .await?;
    Ok(([(header::CONTENT_TYPE, DIFF_MIME)], text).into_response())
}

async fn compare(
    State(state): State<AppState>,
    Path((repo, spec)): Path<(String, String)>,
    Query(query): Query<CompareQuery>,
) -> Result<Response> {
    let (spec, raw) = match spec.strip_suffix(".diff") {
        Some(stripped) => (stripped.to_string(), true),
        None => (spec, false),
    };
    let Some((old_spec, new_spec)) = spec.split_once("...") else {
        return Err(ApiError::InvalidArgument(format!(
            "compare spec {} (expected old...new)",
            spec
        )));
    };
    let context = match query.context {
        None => 3,
        Some(c) if c < 0 => {
            return Err(ApiError::InvalidArgument(format!("context {}", c)));
        }
        Some(c) => c as usize,
    };
    let (old_spec, new_spec) = (old_spec.to_string(), new_spec.to_string());

    let base_url = state.base_url.clone();
    let repo_name = repo.clone();
    let (old_commit, new_commit, changes) = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let old_id = revision::resolve(&store, &old_spec)?;
        let new_id = revision::resolve(&store, &new_spec)?;
        let old_commit = store.commit(&old_id)?;
        let new_commit = store.commit(&new_id)?;
        let changes = diff_trees(
            &store,
            Some(&old_commit.tree),
            Some(&new_commit.tree),
            &DiffOptions { context },
        )?;
        Ok((old_commit, new_commit, changes))
    })
    .await?;

    if raw {
        let text = render_patch_document(&changes);
        return Ok(([(header::CONTENT_TYPE, DIFF_MIME)], text).into_response());
    }

    let urls = ApiUrls::new(&base_url, &repo_name);
    let files = changes
        .iter()
        .map(|c| {
            FileChangeDto::new(
                &urls,
                c,
                new_commit.id.as_str(),
                Some(old_commit.id.as_str()),
            )
        })
        .collect();
    let document = CompareDto {
        base: ObjectLink {
            sha: old_commit.id.to_string(),
            url: urls.porcelain_commit(old_commit.id.as_str()),
        },
        head: ObjectLink {
            sha: new_commit.id.to_string(),
            url: urls.porcelain_commit(new_commit.id.as_str()),
        },
        stats: totals(&changes).into(),
        files,
    };
    Ok(Json(document).into_response())
}
