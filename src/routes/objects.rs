use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::error::Result;
use crate::git::GitRepository;
use crate::git::revision;
use crate::git::store::ObjectStore;
use crate::git::tree::project;
use crate::models::{ApiUrls, BlobDto, TagDto, TreeDto, TreeEntryDto};
use crate::routes::{AppState, blocking};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/git/trees/{sha}/", get(get_tree))
        .route("/repos/{repo}/git/blobs/{sha}/", get(get_blob))
        .route("/repos/{repo}/git/tags/{sha}/", get(get_tag))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct TreeQuery {
    recursive: Option<String>,
}

async fn get_tree(
    State(state): State<AppState>,
    Path((repo, sha)): Path<(String, String)>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<TreeDto>> {
    let recursive = query.recursive.as_deref() == Some("1");
    let tree = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let id = revision::resolve_object(&store, &sha)?;
        // Commits and tags are accepted and peeled down to their tree.
        let tree_id = revision::peel_to_tree(&store, &id)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        let entries = project(&store, &tree_id, recursive)?
            .iter()
            .map(|e| TreeEntryDto::new(&urls, e))
            .collect();
        Ok(TreeDto {
            sha: tree_id.to_string(),
            url: urls.tree(tree_id.as_str()),
            tree: entries,
        })
    })
    .await?;
    Ok(Json(tree))
}

async fn get_blob(
    State(state): State<AppState>,
    Path((repo, sha)): Path<(String, String)>,
) -> Result<Json<BlobDto>> {
    let blob = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let id = revision::resolve_object(&store, &sha)?;
        let blob = store.blob(&id)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        Ok(BlobDto::new(&urls, &blob))
    })
    .await?;
    Ok(Json(blob))
}

async fn get_tag(
    State(state): State<AppState>,
    Path((repo, sha)): Path<(String, String)>,
) -> Result<Json<TagDto>> {
    let tag = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let id = revision::resolve_object(&store, &sha)?;
        let tag = store.tag(&id)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        Ok(TagDto::new(&urls, &tag))
    })
    .await?;
    Ok(Json(tag))
}
