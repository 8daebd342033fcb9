//! # Archive/File Object Model
//!
//! The runtime objects produced by path resolution and their
//! ownership-chain lifecycle.
//!
//! ## The chain
//!
//! An [`Archive`] opened inside another archive owns its parent through a
//! `Box` link, together with the backing file (opened *in* the parent) that
//! supplies its bytes:
//!
//! ```text
//! File ──▶ leaf Archive ──parent──▶ Archive ──parent──▶ native root Archive
//!                │                    │
//!              backing              backing
//!              OpenFile             OpenFile
//! ```
//!
//! Every resolution builds a fresh, exclusively-owned chain; nothing is
//! reference-counted or shared. Closing the leaf (dropping the [`File`] or
//! [`DirIter`], or dropping a transient `Archive`) tears the chain down
//! leaf first: the backend file state, then each archive state and its
//! backing file, up to the root. Because no handle is ever shared, a
//! use-after-close across handles cannot be constructed; the cost is that
//! two opens of the same nested path decode the same containers twice.

use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;

use crate::backend::{ArchiveRef, ArchiveState, Backend, FileState, IterState, Source};
use crate::error::VfsError;
use crate::path::BoundedPath;
use crate::types::{AccessMode, FileInfo};

/// One opened storage container: a native directory or a mounted archive
/// file.
///
/// Archives are created by the resolution engine and are usually transient;
/// callers only hold one indirectly through a [`File`] or [`DirIter`].
pub struct Archive {
    table: Arc<dyn Backend>,
    state: Option<ArchiveState>,
    parent: Option<Box<Archive>>,
    backing: Option<OpenFile>,
    path: BoundedPath,
}

impl Archive {
    /// A root archive served by the native table: no parent, no backing
    /// file.
    pub(crate) fn root(table: Arc<dyn Backend>, state: ArchiveState, path: BoundedPath) -> Self {
        Self {
            table,
            state: Some(state),
            parent: None,
            backing: None,
            path,
        }
    }

    /// An archive mounted from `backing`, which was opened inside `parent`.
    pub(crate) fn nested(
        table: Arc<dyn Backend>,
        state: ArchiveState,
        parent: Box<Archive>,
        backing: OpenFile,
        path: BoundedPath,
    ) -> Self {
        Self {
            table,
            state: Some(state),
            parent: Some(parent),
            backing: Some(backing),
            path,
        }
    }

    /// Absolute (verbose) path of this archive's root.
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Name of the backend serving this archive.
    pub fn backend_name(&self) -> &'static str {
        self.table.name()
    }

    /// The parent archive, or `None` for a native root.
    pub fn parent(&self) -> Option<&Archive> {
        self.parent.as_deref()
    }

    pub(crate) fn table(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.table)
    }

    /// The capability-table view of this archive.
    pub(crate) fn parts(&mut self, operation: &'static str) -> Result<ArchiveRef<'_>, VfsError> {
        let Self {
            state,
            parent,
            backing,
            path,
            ..
        } = self;
        let state = state.as_mut().ok_or(VfsError::InvalidHandle { operation })?;
        let source = match (parent.as_deref_mut(), backing.as_mut()) {
            (Some(archive), Some(file)) => Some(Source { archive, file }),
            _ => None,
        };
        Ok(ArchiveRef {
            state,
            source,
            path: path.as_str(),
        })
    }

    pub(crate) fn stat(&mut self, rel: &str) -> Result<FileInfo, VfsError> {
        let table = self.table();
        table.stat(self.parts("stat")?, rel)
    }

    pub(crate) fn open_file(&mut self, rel: &str, mode: AccessMode) -> Result<OpenFile, VfsError> {
        let table = self.table();
        let path = self.path.join(rel);
        let state = table.open_file(self.parts("open_file")?, rel, mode)?;
        Ok(OpenFile {
            state: Some(state),
            mode,
            path,
        })
    }

    pub(crate) fn close_file(&mut self, file: &mut OpenFile) {
        if let Some(state) = file.state.take() {
            let table = self.table();
            if let Ok(parts) = self.parts("close_file") {
                table.close_file(parts, state);
            }
        }
    }

    pub(crate) fn begin_iter(&mut self, rel: &str) -> Result<IterState, VfsError> {
        let table = self.table();
        table.begin_iter(self.parts("begin_iter")?, rel)
    }

    /// Drain the directory at `rel` into a vector, releasing the cursor.
    ///
    /// The resolution engine uses this for the default strategy's sibling
    /// scan: entries must outlive the cursor because each candidate mount
    /// re-enters the backend.
    pub(crate) fn list_dir(&mut self, rel: &str) -> Result<Vec<FileInfo>, VfsError> {
        let table = self.table();
        let mut iter = self.begin_iter(rel)?;
        let mut entries = Vec::new();
        loop {
            let parts = self.parts("next_iter")?;
            match table.next_iter(parts, &mut iter) {
                Some(info) => entries.push(info),
                None => break,
            }
        }
        if let Ok(parts) = self.parts("end_iter") {
            table.end_iter(parts, iter);
        }
        Ok(entries)
    }

    /// Close this archive and its backing file, handing back the parent.
    ///
    /// Used by the resolution engine to unwind one failed mount while
    /// keeping the rest of the chain alive for further candidates.
    pub(crate) fn unmount(mut self: Box<Self>) -> Option<Box<Archive>> {
        if let Some(state) = self.state.take() {
            self.table.close(state);
        }
        let mut parent = self.parent.take();
        if let (Some(p), Some(mut backing)) = (parent.as_deref_mut(), self.backing.take()) {
            p.close_file(&mut backing);
        }
        parent
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.table.close(state);
        }
        // Close the backing file through the parent; the parent Box itself
        // drops right after, continuing the teardown toward the root.
        if let (Some(parent), Some(backing)) = (self.parent.as_deref_mut(), self.backing.as_mut())
        {
            if let Some(state) = backing.state.take() {
                let table = parent.table();
                if let Ok(parts) = parent.parts("close_file") {
                    table.close_file(parts, state);
                }
            }
        }
    }
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("backend", &self.table.name())
            .field("path", &self.path)
            .field("nested", &self.parent.is_some())
            .finish()
    }
}

/// Per-open file state without a back-reference to its archive.
///
/// Ownership runs leaf-to-root through [`Archive`], so the handle itself
/// only carries the backend state, the mode, and the verbose path.
pub(crate) struct OpenFile {
    pub(crate) state: Option<FileState>,
    pub(crate) mode: AccessMode,
    pub(crate) path: BoundedPath,
}

impl OpenFile {
    pub(crate) fn state_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut FileState, VfsError> {
        self.state
            .as_mut()
            .ok_or(VfsError::InvalidHandle { operation })
    }
}

/// Size in bytes of the per-file user-extension buffer.
pub const FILE_USER_DATA: usize = 64;

/// An open file handle, owning the entire archive chain it was resolved
/// through.
///
/// The chain stays alive until the `File` is dropped (or [`close`](Self::close)d),
/// at which point the backend's file state and every archive link are
/// released leaf first. `File` also implements [`std::io::Read`],
/// [`std::io::Write`] and [`std::io::Seek`] for interop with generic I/O
/// code.
pub struct File {
    archive: Box<Archive>,
    inner: OpenFile,
    user_data: [u8; FILE_USER_DATA],
}

impl File {
    pub(crate) fn new(archive: Box<Archive>, inner: OpenFile) -> Self {
        Self {
            archive,
            inner,
            user_data: [0; FILE_USER_DATA],
        }
    }

    /// Absolute (verbose) path this file was opened at.
    pub fn path(&self) -> &str {
        self.inner.path.as_str()
    }

    /// The mode the file was opened with.
    pub fn mode(&self) -> AccessMode {
        self.inner.mode
    }

    /// The archive this file was opened in (the leaf of the chain).
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Fixed-size scratch buffer for host-application bookkeeping.
    ///
    /// The engine and backends never touch it.
    pub fn user_data(&self) -> &[u8; FILE_USER_DATA] {
        &self.user_data
    }

    /// Mutable access to the user-extension buffer.
    pub fn user_data_mut(&mut self) -> &mut [u8; FILE_USER_DATA] {
        &mut self.user_data
    }

    /// Read at the current position, returning the byte count (0 at EOF).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, VfsError> {
        let Self { archive, inner, .. } = self;
        let table = archive.table();
        let state = inner.state_mut("read")?;
        table.read(archive.parts("read")?, state, buf)
    }

    /// Write at the current position, returning the byte count.
    ///
    /// # Errors
    ///
    /// - [`VfsError::AccessDenied`] if the file was not opened for writing
    ///   or the backend's format is read-only.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, VfsError> {
        let Self { archive, inner, .. } = self;
        let table = archive.table();
        let state = inner.state_mut("write")?;
        table.write(archive.parts("write")?, state, data)
    }

    /// Reposition the cursor.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, VfsError> {
        let Self { archive, inner, .. } = self;
        let table = archive.table();
        let state = inner.state_mut("seek")?;
        table.seek(archive.parts("seek")?, state, pos)
    }

    /// Current cursor position.
    pub fn tell(&mut self) -> u64 {
        let Self { archive, inner, .. } = self;
        let table = archive.table();
        let Ok(state) = inner.state_mut("tell") else {
            return 0;
        };
        let Ok(parts) = archive.parts("tell") else {
            return 0;
        };
        table.tell(parts, state)
    }

    /// Total size in bytes.
    pub fn size(&mut self) -> u64 {
        let Self { archive, inner, .. } = self;
        let table = archive.table();
        let Ok(state) = inner.state_mut("size") else {
            return 0;
        };
        let Ok(parts) = archive.parts("size") else {
            return 0;
        };
        table.size(parts, state)
    }

    /// Read from the current position to EOF into `buf`.
    pub fn read_to_end(&mut self, buf: &mut Vec<u8>) -> Result<usize, VfsError> {
        let mut total = 0;
        let mut chunk = [0u8; 8192];
        loop {
            let n = self.read(&mut chunk)?;
            if n == 0 {
                return Ok(total);
            }
            buf.extend_from_slice(&chunk[..n]);
            total += n;
        }
    }

    /// Close the file, releasing the whole archive chain.
    ///
    /// Equivalent to dropping; provided for call sites where the close is
    /// the point.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for File {
    fn drop(&mut self) {
        let Self { archive, inner, .. } = self;
        archive.close_file(inner);
        // The archive chain unwinds in Archive::drop.
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("path", &self.inner.path)
            .field("backend", &self.archive.backend_name())
            .finish()
    }
}

fn to_io(err: VfsError) -> std::io::Error {
    match &err {
        VfsError::NotFound { .. } => {
            std::io::Error::new(std::io::ErrorKind::NotFound, err.to_string())
        }
        VfsError::AccessDenied { .. } => {
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, err.to_string())
        }
        _ => std::io::Error::other(err.to_string()),
    }
}

impl std::io::Read for File {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        File::read(self, buf).map_err(to_io)
    }
}

impl std::io::Write for File {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        File::write(self, data).map_err(to_io)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::io::Seek for File {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        File::seek(self, pos).map_err(to_io)
    }
}

/// Cursor over one directory listing, owning the archive chain it was
/// resolved through (mirroring [`File`]).
///
/// Ends the backend iteration and closes the chain on drop (or
/// [`close`](Self::close)).
pub struct DirIter {
    archive: Box<Archive>,
    state: Option<IterState>,
    path: BoundedPath,
}

impl DirIter {
    pub(crate) fn new(archive: Box<Archive>, state: IterState, path: BoundedPath) -> Self {
        Self {
            archive,
            state: Some(state),
            path,
        }
    }

    /// Absolute (verbose) path of the directory being listed.
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// End the iteration, releasing the whole archive chain.
    pub fn close(self) {
        drop(self);
    }
}

impl Iterator for DirIter {
    type Item = FileInfo;

    fn next(&mut self) -> Option<FileInfo> {
        let Self { archive, state, .. } = self;
        let table = archive.table();
        let cursor = state.as_mut()?;
        let parts = archive.parts("next_iter").ok()?;
        table.next_iter(parts, cursor)
    }
}

impl Drop for DirIter {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            let table = self.archive.table();
            if let Ok(parts) = self.archive.parts("end_iter") {
                table.end_iter(parts, state);
            }
        }
    }
}

impl fmt::Debug for DirIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirIter")
            .field("path", &self.path)
            .field("backend", &self.archive.backend_name())
            .finish()
    }
}
