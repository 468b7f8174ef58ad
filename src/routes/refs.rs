use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::error::{ApiError, Result};
use crate::git::GitRepository;
use crate::git::store::ObjectStore;
use crate::models::{ApiUrls, RefDto};
use crate::routes::{AppState, blocking};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/git/refs/", get(list_refs))
        .route("/repos/{repo}/git/refs/{*ref_path}", get(get_refs))
        .with_state(state)
}

async fn list_refs(
    State(state): State<AppState>,
    Path(repo): Path<String>,
) -> Result<Json<serde_json::Value>> {
    refs_response(state, repo, String::new()).await
}

async fn get_refs(
    State(state): State<AppState>,
    Path((repo, ref_path)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>> {
    refs_response(state, repo, format!("refs/{}", ref_path)).await
}

/// Prefix listing over the non-symbolic refs. An exact single match
/// collapses to one object instead of a one-element array.
async fn refs_response(
    state: AppState,
    repo: String,
    prefix: String,
) -> Result<Json<serde_json::Value>> {
    let value = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        let mut matches = Vec::new();
        for reference in store.refs()? {
            if !reference.name.starts_with(&prefix) {
                continue;
            }
            let kind = store.kind(&reference.target)?;
            matches.push(RefDto::new(&urls, &reference, kind));
        }
        let value = if matches.len() == 1 && matches[0].ref_name == prefix {
            serde_json::to_value(&matches[0])
        } else {
            serde_json::to_value(&matches)
        };
        value.map_err(|e| ApiError::Internal(format!("serializing refs: {}", e)))
    })
    .await?;
    Ok(Json(value))
}
