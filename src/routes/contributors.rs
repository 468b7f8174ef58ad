//! Contributors endpoint: commit counts per author identity over the full
//! default-branch history. Linear in history length; documented as slow on
//! very large repositories.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::error::{ApiError, Result};
use crate::git::GitRepository;
use crate::git::history::contributors;
use crate::models::ContributorDto;
use crate::routes::{AppState, blocking};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/contributors/", get(list_contributors))
        .with_state(state)
}

async fn list_contributors(
    State(state): State<AppState>,
    Path(repo): Path<String>,
) -> Result<Json<Vec<ContributorDto>>> {
    let result = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let head = match store.head_commit() {
            Ok(head) => head,
            // An unborn HEAD has no history and therefore no contributors.
            Err(ApiError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(contributors(&store, &head)?
            .into_iter()
            .map(ContributorDto::from)
            .collect())
    })
    .await?;
    Ok(Json(result))
}
