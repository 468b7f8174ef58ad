use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::error::Result;
use crate::git::GitRepository;
use crate::models::{ApiUrls, RepoDto};
use crate::routes::{AppState, blocking};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/", get(list_repos))
        .route("/repos/{repo}/", get(repo_info))
        .with_state(state)
}

async fn list_repos(State(state): State<AppState>) -> Result<Json<Vec<RepoDto>>> {
    let repos = blocking(move || {
        let names = GitRepository::discover(&state.root)?;
        names
            .into_iter()
            .map(|name| {
                let repo = GitRepository::open(&state.root, &name)?;
                let urls = ApiUrls::new(&state.base_url, &name);
                Ok(RepoDto::new(&urls, &name, repo.description(), repo.default_branch()))
            })
            .collect()
    })
    .await?;
    Ok(Json(repos))
}

async fn repo_info(
    State(state): State<AppState>,
    Path(repo): Path<String>,
) -> Result<Json<RepoDto>> {
    let info = blocking(move || {
        let opened = GitRepository::open(&state.root, &repo)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        Ok(RepoDto::new(
            &urls,
            &repo,
            opened.description(),
            opened.default_branch(),
        ))
    })
    .await?;
    Ok(Json(info))
}
