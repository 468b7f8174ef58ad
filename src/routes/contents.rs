//! Directory/file contents by path, and raw file bytes.
//!
//! `GET /repos/{repo}/contents/{path}?ref=` mirrors the hosting-provider
//! contents shape: a directory yields an array of entry summaries, a file
//! yields one record with its content embedded. `GET /repos/{repo}/raw/...`
//! returns the bytes with a sniffed content type.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::git::GitRepository;
use crate::git::revision;
use crate::git::store::{EntryKind, ObjectId, ObjectStore, TreeEntry};
use crate::git::tree::{lookup_path, project};
use crate::models::{ApiUrls, ContentsDto, ContentsEntryDto, SelfLinks};
use crate::routes::{AppState, blocking};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/contents/", get(get_root_contents))
        .route("/repos/{repo}/contents/{*path}", get(get_contents))
        .route("/repos/{repo}/raw/{refspec}/{*path}", get(get_raw))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ContentsQuery {
    r#ref: Option<String>,
}

async fn get_root_contents(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    Query(query): Query<ContentsQuery>,
) -> Result<Json<ContentsDto>> {
    contents_response(state, repo, String::new(), query.r#ref).await
}

async fn get_contents(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
    Query(query): Query<ContentsQuery>,
) -> Result<Json<ContentsDto>> {
    contents_response(state, repo, path, query.r#ref).await
}

async fn contents_response(
    state: AppState,
    repo: String,
    path: String,
    refspec: Option<String>,
) -> Result<Json<ContentsDto>> {
    let contents = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let refspec = refspec
            .or_else(|| store.default_branch())
            .unwrap_or_else(|| "HEAD".to_string());
        let commit = store.commit(&revision::resolve(&store, &refspec)?)?;
        let urls = ApiUrls::new(&state.base_url, &repo);
        let path = path.trim_matches('/');

        let dir_tree: Option<ObjectId> = match lookup_path(&store, &commit.tree, path)? {
            None => Some(commit.tree.clone()),
            Some(entry) if entry.kind == EntryKind::Tree => Some(entry.id.clone()),
            Some(entry) => {
                return Ok(ContentsDto::File(Box::new(file_record(
                    &store, &urls, &refspec, path, &entry, true,
                )?)));
            }
        };

        let tree_id = dir_tree.expect("directory case");
        let mut entries = Vec::new();
        for flat in project(&store, &tree_id, false)? {
            let entry = TreeEntry {
                name: flat.name,
                mode: flat.mode,
                kind: flat.kind,
                id: flat.id,
                size: flat.size,
            };
            let entry_path = if path.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", path, entry.name)
            };
            entries.push(file_record(&store, &urls, &refspec, &entry_path, &entry, false)?);
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ContentsDto::Dir(entries))
    })
    .await?;
    Ok(Json(contents))
}

fn file_record(
    store: &dyn ObjectStore,
    urls: &ApiUrls<'_>,
    refspec: &str,
    path: &str,
    entry: &TreeEntry,
    include_content: bool,
) -> Result<ContentsEntryDto> {
    let (kind, git_url) = match entry.kind {
        EntryKind::Blob => ("file", Some(urls.blob(entry.id.as_str()))),
        EntryKind::Tree => ("dir", Some(urls.tree(entry.id.as_str()))),
        EntryKind::Submodule => ("submodule", None),
    };
    let url = urls.contents(path, refspec);
    let (encoding, content) = if include_content && entry.kind == EntryKind::Blob {
        let blob = store.blob(&entry.id)?;
        match std::str::from_utf8(&blob.content) {
            Ok(text) => (Some("utf-8".to_string()), Some(text.to_string())),
            Err(_) => {
                use base64::Engine as _;
                (
                    Some("base64".to_string()),
                    Some(base64::engine::general_purpose::STANDARD.encode(&blob.content)),
                )
            }
        }
    } else {
        (None, None)
    };
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    Ok(ContentsEntryDto {
        kind,
        sha: entry.id.to_string(),
        name,
        path: path.to_string(),
        size: entry.size.unwrap_or(0),
        url: url.clone(),
        git_url: git_url.clone().unwrap_or_default(),
        encoding,
        content,
        links: SelfLinks {
            self_url: url,
            git: git_url,
        },
    })
}

async fn get_raw(
    State(state): State<AppState>,
    Path((repo, refspec, path)): Path<(String, String, String)>,
) -> Result<Response> {
    let (content, mime) = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let commit = store.commit(&revision::resolve(&store, &refspec)?)?;
        let entry = lookup_path(&store, &commit.tree, &path)?
            .ok_or_else(|| ApiError::NotFound(format!("path {}", path)))?;
        if entry.kind != EntryKind::Blob {
            return Err(ApiError::InvalidArgument(format!("{} is not a file", path)));
        }
        let blob = store.blob(&entry.id)?;
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        Ok((blob.content, mime.to_string()))
    })
    .await?;
    Ok((
        [(header::CONTENT_TYPE, mime)],
        Body::from(content),
    )
        .into_response())
}
