//! Native filesystem backend.
//!
//! The one fixed capability table consulted for the root segment of every
//! path. OS file I/O (`std::fs`) is the external collaborator here; this
//! module only adapts it to the table contract.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::trace;

use crate::backend::{
    ArchiveRef, ArchiveState, Backend, FileState, IterState, Source, state_of,
};
use crate::error::VfsError;
use crate::path::BoundedPath;
use crate::types::{AccessMode, FileAttributes, FileInfo};

/// Backend serving a real directory tree through `std::fs`.
///
/// Mode mapping for [`open_file`](Backend::open_file): plain `write`
/// creates and truncates; `existing` suppresses both; `append` positions
/// writes at the end without truncating; `create_dirs` creates missing
/// parent directories first.
#[derive(Debug, Default)]
pub struct NativeBackend;

impl NativeBackend {
    /// A new native backend.
    pub fn new() -> Self {
        Self
    }
}

struct NativeArchive {
    root: PathBuf,
}

struct NativeFile {
    file: fs::File,
}

struct NativeIter {
    entries: Vec<FileInfo>,
    pos: usize,
}

fn io_err(operation: &'static str, path: &Path, source: std::io::Error) -> VfsError {
    match source.kind() {
        std::io::ErrorKind::NotFound => VfsError::NotFound {
            path: path.display().to_string(),
        },
        std::io::ErrorKind::PermissionDenied => VfsError::AccessDenied {
            path: path.display().to_string(),
            operation,
        },
        _ => VfsError::Io {
            operation,
            path: path.display().to_string(),
            source,
        },
    }
}

fn full_path(root: &Path, rel: &str) -> PathBuf {
    if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

fn info_from_metadata(verbose: BoundedPath, md: &fs::Metadata) -> FileInfo {
    FileInfo {
        path: verbose,
        size: if md.is_dir() { 0 } else { md.len() },
        modified: md.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        attributes: FileAttributes {
            directory: md.is_dir(),
            readonly: md.permissions().readonly(),
        },
    }
}

impl Backend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn probe(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn open(
        &self,
        source: Option<Source<'_>>,
        path: &str,
        _mode: AccessMode,
    ) -> Result<ArchiveState, VfsError> {
        if source.is_some() {
            // Native archives are roots; nested containers belong to
            // format backends.
            return Err(VfsError::Backend(
                "native backend cannot mount nested archives".into(),
            ));
        }
        let root = PathBuf::from(path);
        if !root.is_dir() {
            return Err(VfsError::NotFound { path: path.into() });
        }
        trace!(root = path, "native root opened");
        Ok(Box::new(NativeArchive { root }))
    }

    fn close(&self, _state: ArchiveState) {}

    fn stat(&self, archive: ArchiveRef<'_>, path: &str) -> Result<FileInfo, VfsError> {
        let ArchiveRef {
            state,
            path: verbose,
            ..
        } = archive;
        let root = &state_of::<NativeArchive>(state, "stat")?.root;
        let target = full_path(root, path);
        let md = fs::metadata(&target).map_err(|e| io_err("stat", &target, e))?;
        Ok(info_from_metadata(BoundedPath::from(verbose).join(path), &md))
    }

    fn begin_iter(&self, archive: ArchiveRef<'_>, path: &str) -> Result<IterState, VfsError> {
        let ArchiveRef {
            state,
            path: verbose,
            ..
        } = archive;
        let root = &state_of::<NativeArchive>(state, "begin_iter")?.root;
        let dir = full_path(root, path);
        let verbose_dir = BoundedPath::from(verbose).join(path);

        let mut entries = Vec::new();
        let read_dir = fs::read_dir(&dir).map_err(|e| io_err("begin_iter", &dir, e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| io_err("begin_iter", &dir, e))?;
            let md = match entry.metadata() {
                Ok(md) => md,
                // Entry vanished between listing and stat; skip it.
                Err(_) => continue,
            };
            let name = entry.file_name();
            let verbose_entry = verbose_dir.join(&name.to_string_lossy());
            entries.push(info_from_metadata(verbose_entry, &md));
        }
        Ok(Box::new(NativeIter { entries, pos: 0 }))
    }

    fn next_iter(&self, _archive: ArchiveRef<'_>, iter: &mut IterState) -> Option<FileInfo> {
        let cursor = iter.downcast_mut::<NativeIter>()?;
        let info = cursor.entries.get(cursor.pos).cloned()?;
        cursor.pos += 1;
        Some(info)
    }

    fn end_iter(&self, _archive: ArchiveRef<'_>, _iter: IterState) {}

    fn open_file(
        &self,
        archive: ArchiveRef<'_>,
        path: &str,
        mode: AccessMode,
    ) -> Result<FileState, VfsError> {
        let ArchiveRef { state, .. } = archive;
        let root = &state_of::<NativeArchive>(state, "open_file")?.root;
        let target = full_path(root, path);

        if mode.write && mode.create_dirs {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| io_err("open_file", parent, e))?;
            }
        }

        let file = fs::OpenOptions::new()
            .read(mode.read)
            .write(mode.write)
            .append(mode.append)
            .create(mode.creates())
            .truncate(mode.write && !mode.existing && !mode.append)
            .open(&target)
            .map_err(|e| io_err("open_file", &target, e))?;
        Ok(Box::new(NativeFile { file }))
    }

    fn close_file(&self, _archive: ArchiveRef<'_>, _file: FileState) {}

    fn read(
        &self,
        _archive: ArchiveRef<'_>,
        file: &mut FileState,
        buf: &mut [u8],
    ) -> Result<usize, VfsError> {
        let f = state_of::<NativeFile>(file, "read")?;
        f.file.read(buf).map_err(VfsError::from)
    }

    fn write(
        &self,
        _archive: ArchiveRef<'_>,
        file: &mut FileState,
        data: &[u8],
    ) -> Result<usize, VfsError> {
        let f = state_of::<NativeFile>(file, "write")?;
        f.file.write(data).map_err(VfsError::from)
    }

    fn seek(
        &self,
        _archive: ArchiveRef<'_>,
        file: &mut FileState,
        pos: SeekFrom,
    ) -> Result<u64, VfsError> {
        let f = state_of::<NativeFile>(file, "seek")?;
        f.file.seek(pos).map_err(VfsError::from)
    }

    fn tell(&self, _archive: ArchiveRef<'_>, file: &mut FileState) -> u64 {
        file.downcast_mut::<NativeFile>()
            .and_then(|f| f.file.stream_position().ok())
            .unwrap_or(0)
    }

    fn size(&self, _archive: ArchiveRef<'_>, file: &mut FileState) -> u64 {
        file.downcast_mut::<NativeFile>()
            .and_then(|f| f.file.metadata().ok())
            .map(|md| md.len())
            .unwrap_or(0)
    }

    fn remove(&self, archive: ArchiveRef<'_>, path: &str) -> Result<(), VfsError> {
        let ArchiveRef { state, .. } = archive;
        let root = &state_of::<NativeArchive>(state, "remove")?.root;
        let target = full_path(root, path);
        let md = fs::metadata(&target).map_err(|e| io_err("remove", &target, e))?;
        if md.is_dir() {
            fs::remove_dir(&target).map_err(|e| io_err("remove", &target, e))
        } else {
            fs::remove_file(&target).map_err(|e| io_err("remove", &target, e))
        }
    }

    fn rename(&self, archive: ArchiveRef<'_>, from: &str, to: &str) -> Result<(), VfsError> {
        let ArchiveRef { state, .. } = archive;
        let root = &state_of::<NativeArchive>(state, "rename")?.root;
        let src = full_path(root, from);
        let dst = full_path(root, to);
        fs::rename(&src, &dst).map_err(|e| io_err("rename", &src, e))
    }

    fn create_dir(&self, archive: ArchiveRef<'_>, path: &str) -> Result<(), VfsError> {
        let ArchiveRef { state, .. } = archive;
        let root = &state_of::<NativeArchive>(state, "create_dir")?.root;
        let target = full_path(root, path);
        // Missing parents are created too; the passthrough contract is
        // "make this directory exist".
        fs::create_dir_all(&target).map_err(|e| io_err("create_dir", &target, e))
    }

    fn copy(&self, archive: ArchiveRef<'_>, from: &str, to: &str) -> Result<(), VfsError> {
        let ArchiveRef { state, .. } = archive;
        let root = &state_of::<NativeArchive>(state, "copy")?.root;
        let src = full_path(root, from);
        let dst = full_path(root, to);
        fs::copy(&src, &dst)
            .map(|_| ())
            .map_err(|e| io_err("copy", &src, e))
    }
}
