//! Archive downloads.
//!
//! GET /repos/{repo}/tarball/{refspec}/ and /repos/{repo}/zipball/{refspec}/
//!
//! The tarball streams through a bounded channel into the response body, so
//! peak memory stays flat however large the repository is; when the client
//! disconnects the channel closes and the builder stops between entries.
//! Zip needs a seekable sink and is assembled in memory before sending.
//! Without the `compression` feature the tarball is served uncompressed and
//! the zipball endpoint reports itself unavailable.

use std::io::Write;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Result;
use crate::git::GitRepository;
use crate::git::archive::{self, ArchiveFormat};
use crate::git::revision;
use crate::git::store::{Commit, ObjectStore};
use crate::routes::{AppState, blocking};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/repos/{repo}/tarball/{refspec}/", get(get_tarball))
        .route("/repos/{repo}/zipball/{refspec}/", get(get_zipball))
        .with_state(state)
}

#[cfg(feature = "compression")]
const TAR_FORMAT: ArchiveFormat = ArchiveFormat::TarGz;
#[cfg(not(feature = "compression"))]
const TAR_FORMAT: ArchiveFormat = ArchiveFormat::Tar;

#[cfg(feature = "compression")]
fn write_tarball<W: Write>(
    store: &GitRepository,
    commit: &Commit,
    prefix: &str,
    out: W,
) -> Result<W> {
    archive::write_tar_gz(store, commit, prefix, out)
}

#[cfg(not(feature = "compression"))]
fn write_tarball<W: Write>(
    store: &GitRepository,
    commit: &Commit,
    prefix: &str,
    out: W,
) -> Result<W> {
    archive::write_tar(store, commit, prefix, out)
}

struct ChannelWriter {
    tx: tokio::sync::mpsc::Sender<std::io::Result<Bytes>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "client disconnected")
            })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn attachment_headers(mime: &str, filename: &str) -> [(header::HeaderName, String); 2] {
    [
        (header::CONTENT_TYPE, mime.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ]
}

fn archive_filename(repo: &str, refspec: &str, format: ArchiveFormat) -> String {
    format!("{}-{}{}", repo, refspec.replace('/', "-"), format.extension())
}

async fn get_tarball(
    State(state): State<AppState>,
    Path((repo, refspec)): Path<(String, String)>,
) -> Result<Response> {
    // Resolve the revision up front so bad refspecs fail with a proper
    // status instead of a truncated stream.
    let commit = {
        let state = state.clone();
        let repo = repo.clone();
        let refspec = refspec.clone();
        blocking(move || {
            let store = GitRepository::open(&state.root, &repo)?;
            let id = revision::resolve(&store, &refspec)?;
            store.commit(&id)
        })
        .await?
    };

    let filename = archive_filename(&repo, &refspec, TAR_FORMAT);
    let prefix = format!("{}-{}", repo, commit.id);
    let (tx, rx) = tokio::sync::mpsc::channel::<std::io::Result<Bytes>>(16);
    let root = state.root.clone();
    tokio::task::spawn_blocking(move || {
        let writer = ChannelWriter { tx: tx.clone() };
        let result = GitRepository::open(&root, &repo)
            .and_then(|store| write_tarball(&store, &commit, &prefix, writer).map(|_| ()));
        if let Err(e) = result {
            tracing::warn!(repo = %repo, "tarball stream aborted: {}", e);
            let _ = tx.blocking_send(Err(std::io::Error::other(e.to_string())));
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    Ok((attachment_headers(TAR_FORMAT.mime(), &filename), body).into_response())
}

#[cfg(feature = "compression")]
async fn get_zipball(
    State(state): State<AppState>,
    Path((repo, refspec)): Path<(String, String)>,
) -> Result<Response> {
    let filename = archive_filename(&repo, &refspec, ArchiveFormat::Zip);
    let bytes = blocking(move || {
        let store = GitRepository::open(&state.root, &repo)?;
        let id = revision::resolve(&store, &refspec)?;
        let commit = store.commit(&id)?;
        let prefix = format!("{}-{}", repo, commit.id);
        let cursor = archive::write_zip(&store, &commit, &prefix, std::io::Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    })
    .await?;
    Ok((
        attachment_headers(ArchiveFormat::Zip.mime(), &filename),
        Body::from(bytes),
    )
        .into_response())
}

#[cfg(not(feature = "compression"))]
async fn get_zipball(
    State(_state): State<AppState>,
    Path((_repo, _refspec)): Path<(String, String)>,
) -> Result<Response> {
    Err(crate::error::ApiError::Unavailable(
        "zip archives require the compression feature".to_string(),
    ))
}
