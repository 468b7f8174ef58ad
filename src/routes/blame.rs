//! Blame endpoint.
//!
//! GET /repos/{repo}/blame/{refspec}/{path}?firstLine=&lastLine=&oldest=
//!
//! Returns per-line attribution for a file at a revision: each line's
//! introducing commit sha plus a deduplicated map of the commits involved.
//! `oldest` bounds the backward walk; lines older than the bound are
//! attributed to it.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::git::GitRepository;
use crate::git::blame::blame;
use crate::git::revision;
use crate::models::{ApiUrls, BlameDto};
use crate::routes::{AppState, blocking};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/blame/{refspec}/{*path}", get(get_blame))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct BlameQuery {
    #[serde(rename = "firstLine")]
    first_line: Option<i64>,
    #[serde(rename = "lastLine")]
    last_line: Option<i64>,
    oldest: Option<String>,
}

fn positive(value: Option<i64>, what: &str) -> Result<Option<usize>> {
    match value {
        None => Ok(None),
        Some(v) if v < 1 => Err(ApiError::InvalidArgument(format!("{} {}", what, v))),
        Some(v) => Ok(Some(v as usize)),
    }
}

async fn get_blame(
    State(state): State<AppState>,
    Path((repo, refspec, path)): Path<(String, String, String)>,
    Query(query): Query<BlameQuery>,
) -> Result<Json<BlameDto>> {
    let first = positive(query.first_line, "firstLine")?;
    let last = positive(query.last_line, "lastLine")?;
    if let (Some(first), Some(last)) = (first, last) {
        if first > last {
            return Err(ApiError::InvalidArgument(format!(
                "firstLine {} is greater than lastLine {}",
                first, last
            )));
        }
    }

    let result = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let target = revision::resolve(&store, &refspec)?;
        let oldest = query
            .oldest
            .as_deref()
            .map(|spec| revision::resolve(&store, spec))
            .transpose()?;
        let outcome = blame(&store, &target, &path, first, last, oldest)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        Ok(BlameDto::new(&urls, &path, outcome))
    })
    .await?;
    Ok(Json(result))
}
