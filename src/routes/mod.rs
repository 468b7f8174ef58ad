//! API route handlers - maps HTTP endpoints to engine operations.
//!
//! Each submodule covers one feature area:
//! - `repos`: repository listing and metadata
//! - `commits`: plumbing commit list, single commits, merge base
//! - `objects`: plumbing trees, blobs, tag objects
//! - `refs`: ref listing and lookup
//! - `branches` / `tags`: porcelain branch and tag views
//! - `diff`: porcelain commit diff and two-revision compare
//! - `contents`: directory/file contents and raw bytes
//! - `blame`: per-line attribution
//! - `contributors`: commit counts per author
//! - `archives`: tarball and zipball downloads
//!
//! Handlers run the engine inside `spawn_blocking`; every request opens its
//! own repository, so nothing is shared or cached across requests.

pub mod archives;
pub mod blame;
pub mod branches;
pub mod commits;
pub mod contents;
pub mod contributors;
pub mod diff;
pub mod objects;
pub mod refs;
pub mod repos;
pub mod tags;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;

use crate::error::{ApiError, Result};

#[derive(Clone)]
pub struct AppState {
    pub root: Arc<PathBuf>,
    pub base_url: Arc<String>,
    pub default_limit: usize,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(repos::routes(state.clone()))
        .merge(commits::routes(state.clone()))
        .merge(objects::routes(state.clone()))
        .merge(refs::routes(state.clone()))
        .merge(branches::routes(state.clone()))
        .merge(tags::routes(state.clone()))
        .merge(diff::routes(state.clone()))
        .merge(contents::routes(state.clone()))
        .merge(blame::routes(state.clone()))
        .merge(contributors::routes(state.clone()))
        .merge(archives::routes(state))
}

/// Run a synchronous engine call off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task: {}", e)))?
}
