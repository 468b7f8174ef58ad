//! Archive construction: tar, gzip-compressed tar, and zip snapshots of a
//! revision's tree.
//!
//! Entries are written in tree-projection order under a `{repo}-{sha}`
//! wrapper directory, with every timestamp pinned to the revision's commit
//! time, so archiving the same revision twice produces identical bytes.
//! Tar output streams through any `Write`; zip needs a seekable sink and is
//! assembled by the caller in memory.

use std::io::Write;

use crate::error::{ApiError, Result};
use crate::git::store::{Commit, EntryKind, ObjectStore};
use crate::git::tree::project;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Tar => ".tar",
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::Zip => ".zip",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "application/x-tar",
            ArchiveFormat::TarGz => "application/gzip",
            ArchiveFormat::Zip => "application/zip",
        }
    }
}

const MODE_SYMLINK: u32 = 0o120000;
const MODE_EXECUTABLE: u32 = 0o100755;

fn io_internal(e: std::io::Error) -> ApiError {
    ApiError::Internal(format!("archive write: {}", e))
}

/// Stream the commit's tree as a tar archive into `out`, returning the
/// writer so compressed wrappers can be finalized by the caller.
pub fn write_tar<W: Write>(
    store: &dyn ObjectStore,
    commit: &Commit,
    prefix: &str,
    out: W,
) -> Result<W> {
    let mtime = commit.committer.time.max(0) as u64;
    let mut builder = tar::Builder::new(out);
    append_dir(&mut builder, &format!("{}/", prefix), mtime)?;
    for entry in project(store, &commit.tree, true)? {
        let path = format!("{}/{}", prefix, entry.path);
        match entry.kind {
            EntryKind::Tree => append_dir(&mut builder, &format!("{}/", path), mtime)?,
            EntryKind::Blob => {
                let blob = store.blob(&entry.id)?;
                let mut header = tar::Header::new_gnu();
                header.set_mtime(mtime);
                if entry.mode == MODE_SYMLINK {
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_size(0);
                    header.set_mode(0o777);
                    let target = String::from_utf8_lossy(&blob.content).into_owned();
                    builder
                        .append_link(&mut header, &path, &target)
                        .map_err(io_internal)?;
                } else {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_size(blob.size());
                    header.set_mode(if entry.mode == MODE_EXECUTABLE { 0o755 } else { 0o644 });
                    builder
                        .append_data(&mut header, &path, blob.content.as_slice())
                        .map_err(io_internal)?;
                }
            }
            EntryKind::Submodule => {}
        }
    }
    builder.into_inner().map_err(io_internal)
}

fn append_dir<W: Write>(builder: &mut tar::Builder<W>, path: &str, mtime: u64) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_size(0);
    // git stores no meaningful directory permissions
    header.set_mode(0o755);
    header.set_mtime(mtime);
    builder
        .append_data(&mut header, path, std::io::empty())
        .map_err(io_internal)
}

#[cfg(feature = "compression")]
pub fn write_tar_gz<W: Write>(
    store: &dyn ObjectStore,
    commit: &Commit,
    prefix: &str,
    out: W,
) -> Result<W> {
    // flate2 leaves the gzip header mtime at zero, keeping output stable.
    let encoder = flate2::write::GzEncoder::new(out, flate2::Compression::default());
    let encoder = write_tar(store, commit, prefix, encoder)?;
    encoder.finish().map_err(io_internal)
}

#[cfg(feature = "compression")]
pub fn write_zip<W: Write + std::io::Seek>(
    store: &dyn ObjectStore,
    commit: &Commit,
    prefix: &str,
    out: W,
) -> Result<W> {
    use zip::write::SimpleFileOptions;

    let timestamp = zip_timestamp(commit.committer.time);
    let base = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(timestamp);
    let zip_internal = |e: zip::result::ZipError| ApiError::Internal(format!("zip write: {}", e));

    let mut zip = zip::ZipWriter::new(out);
    zip.add_directory(format!("{}/", prefix), base).map_err(zip_internal)?;
    for entry in project(store, &commit.tree, true)? {
        let path = format!("{}/{}", prefix, entry.path);
        match entry.kind {
            EntryKind::Tree => {
                zip.add_directory(format!("{}/", path), base).map_err(zip_internal)?;
            }
            EntryKind::Blob => {
                let blob = store.blob(&entry.id)?;
                let perms = if entry.mode == MODE_EXECUTABLE { 0o755 } else { 0o644 };
                zip.start_file(path, base.unix_permissions(perms)).map_err(zip_internal)?;
                zip.write_all(&blob.content).map_err(io_internal)?;
            }
            EntryKind::Submodule => {}
        }
    }
    zip.finish().map_err(zip_internal)
}

/// DOS timestamps can't represent times before 1980; clamp rather than fail
/// on ancient commit dates.
#[cfg(feature = "compression")]
fn zip_timestamp(secs: i64) -> zip::DateTime {
    use chrono::{Datelike, Timelike};

    let Some(dt) = chrono::DateTime::from_timestamp(secs, 0) else {
        return zip::DateTime::default();
    };
    if dt.year() < 1980 {
        return zip::DateTime::default();
    }
    zip::DateTime::from_date_and_time(
        dt.year().min(2107) as u16,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
    )
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::memory::MemoryStore;
    use crate::git::store::ObjectId;

    fn sample(store: &mut MemoryStore) -> ObjectId {
        let tree = store.tree_of(&[("README.md", "hi\n"), ("src/lib.rs", "pub fn x() {}\n")]);
        store.add_commit(tree, vec![], ("ann", "ann@example.com"), 1_700_000_000, "init")
    }

    #[test]
    fn tar_contains_wrapper_dir_and_all_paths() {
        let mut store = MemoryStore::new();
        let id = sample(&mut store);
        let commit = store.commit_obj(&id);

        let bytes = write_tar(&store, &commit, "repo-abc", Vec::new()).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let paths: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            paths,
            vec![
                "repo-abc/",
                "repo-abc/README.md",
                "repo-abc/src/",
                "repo-abc/src/lib.rs",
            ]
        );
    }

    #[test]
    fn tar_output_is_deterministic() {
        let mut store = MemoryStore::new();
        let id = sample(&mut store);
        let commit = store.commit_obj(&id);

        let first = write_tar(&store, &commit, "repo-abc", Vec::new()).unwrap();
        let second = write_tar(&store, &commit, "repo-abc", Vec::new()).unwrap();
        assert_eq!(first, second);
    }

    #[cfg(feature = "compression")]
    #[test]
    fn tar_gz_output_is_deterministic() {
        let mut store = MemoryStore::new();
        let id = sample(&mut store);
        let commit = store.commit_obj(&id);

        let first = write_tar_gz(&store, &commit, "repo-abc", Vec::new()).unwrap();
        let second = write_tar_gz(&store, &commit, "repo-abc", Vec::new()).unwrap();
        assert_eq!(first, second);
        // gzip magic
        assert_eq!(&first[..2], &[0x1f, 0x8b]);
    }

    #[cfg(feature = "compression")]
    #[test]
    fn zip_round_trips_file_contents() {
        use std::io::Read;

        let mut store = MemoryStore::new();
        let id = sample(&mut store);
        let commit = store.commit_obj(&id);

        let cursor = std::io::Cursor::new(Vec::new());
        let cursor = write_zip(&store, &commit, "repo-abc", cursor).unwrap();
        let bytes = cursor.into_inner();

        let reader = std::io::Cursor::new(&bytes);
        let mut zip = zip::ZipArchive::new(reader).unwrap();
        let mut file = zip.by_name("repo-abc/README.md").unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hi\n");

        drop(file);
        let again = write_zip(
            &store,
            &commit,
            "repo-abc",
            std::io::Cursor::new(Vec::new()),
        )
        .unwrap()
        .into_inner();
        assert_eq!(bytes, again);
    }
}
