//! # Backend Capability Table
//!
//! The fixed contract every storage format implements to participate in the
//! virtual filesystem: probing, archive open/close, stat, iteration, and
//! file I/O. The engine never inspects a format's bytes itself — it only
//! dispatches through this trait.
//!
//! ## Opaque state
//!
//! A backend is stateless at the table level. All per-archive, per-file, and
//! per-iteration state lives in type-erased boxes ([`ArchiveState`],
//! [`FileState`], [`IterState`]) that the backend creates in
//! `open`/`open_file`/`begin_iter` and downcasts back in every other call.
//! The engine stores and returns these boxes without ever looking inside.
//!
//! ## Reading through the parent
//!
//! A non-native archive's own bytes live *inside* its parent archive. The
//! engine hands such backends a [`Source`]: a read/seek view of the backing
//! file that dispatches through the parent's capability table, however deep
//! the nesting goes.
//!
//! ## Thread Safety
//!
//! All backends must be `Send + Sync`; methods take `&self`. Mutable state
//! travels in the opaque boxes, which the engine owns exclusively, so a
//! backend needs no locking of its own.

use std::any::Any;
use std::io::SeekFrom;

use crate::archive::{Archive, OpenFile};
use crate::error::VfsError;
use crate::types::{AccessMode, FileInfo};

/// Opaque per-archive backend state, created by [`Backend::open`].
pub type ArchiveState = Box<dyn Any + Send>;

/// Opaque per-open-file backend state, created by [`Backend::open_file`].
pub type FileState = Box<dyn Any + Send>;

/// Opaque directory-cursor state, created by [`Backend::begin_iter`].
pub type IterState = Box<dyn Any + Send>;

/// Downcast an opaque state box to the backend's concrete type.
///
/// Fails only if the box was produced by a different backend, which would
/// mean the engine mixed up handles — surfaced as a backend error rather
/// than a panic.
pub fn state_of<'a, T: 'static>(
    state: &'a mut Box<dyn Any + Send>,
    operation: &'static str,
) -> Result<&'a mut T, VfsError> {
    state
        .downcast_mut::<T>()
        .ok_or_else(|| VfsError::Backend(format!("{operation}: foreign backend state")))
}

/// Mutable view of one archive, as passed to every capability-table call.
///
/// Bundles the backend's own [`ArchiveState`] with the optional [`Source`]
/// for streaming bytes through the parent chain, plus the archive's
/// absolute root path for error context.
pub struct ArchiveRef<'a> {
    /// The backend's opaque state for this archive.
    pub state: &'a mut ArchiveState,
    /// Byte source inside the parent archive; `None` for native archives.
    pub source: Option<Source<'a>>,
    /// Absolute (verbose) path of this archive's root.
    pub path: &'a str,
}

impl ArchiveRef<'_> {
    /// Downcast [`state`](Self::state) to the backend's concrete type.
    pub fn state_as<T: 'static>(&mut self, operation: &'static str) -> Result<&mut T, VfsError> {
        state_of::<T>(self.state, operation)
    }
}

/// Read/seek access to an archive's backing file, dispatched through the
/// parent archive's capability table.
///
/// Handed to [`Backend::open`] (and available from [`ArchiveRef::source`]
/// afterwards) so a format backend can parse and stream its container
/// without knowing whether the bytes live on disk or inside another
/// archive.
pub struct Source<'a> {
    pub(crate) archive: &'a mut Archive,
    pub(crate) file: &'a mut OpenFile,
}

impl Source<'_> {
    /// Read into `buf` at the current position, returning the byte count.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, VfsError> {
        let table = self.archive.table();
        let state = self.file.state_mut("read")?;
        table.read(self.archive.parts("read")?, state, buf)
    }

    /// Reposition the read cursor.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, VfsError> {
        let table = self.archive.table();
        let state = self.file.state_mut("seek")?;
        table.seek(self.archive.parts("seek")?, state, pos)
    }

    /// Current position of the read cursor.
    pub fn tell(&mut self) -> u64 {
        let table = self.archive.table();
        let Ok(state) = self.file.state_mut("tell") else {
            return 0;
        };
        let Ok(archive) = self.archive.parts("tell") else {
            return 0;
        };
        table.tell(archive, state)
    }

    /// Total size of the backing file in bytes.
    pub fn size(&mut self) -> u64 {
        let table = self.archive.table();
        let Ok(state) = self.file.state_mut("size") else {
            return 0;
        };
        let Ok(archive) = self.archive.parts("size") else {
            return 0;
        };
        table.size(archive, state)
    }

    /// Read the remaining bytes of the backing file into `buf`.
    ///
    /// Convenience for backends that parse their whole container up front
    /// (the usual shape — resolution re-parses on every mount by design).
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
}

/// The Backend Capability Table: one storage format's full set of
/// operations.
///
/// Exactly one *native* backend (the real filesystem) is fixed per
/// [`Context`](crate::Context); any number of format backends (ZIP, PAK,
/// ...) are registered after it and probed in registration order when the
/// engine considers mounting a file as a nested archive.
///
/// # Object Safety
///
/// The trait is object-safe; the engine holds backends as
/// `Arc<dyn Backend>`.
pub trait Backend: Send + Sync {
    /// Short stable name, used in log events and error context.
    fn name(&self) -> &'static str;

    /// Cheap check whether this backend could plausibly open `path`.
    ///
    /// Typically an extension or filename test; must not perform I/O. The
    /// first registered backend whose probe accepts a candidate gets the
    /// [`open`](Self::open) call — probing is how registration order
    /// becomes format priority.
    fn probe(&self, path: &str) -> bool;

    /// Open an archive.
    ///
    /// For the native backend `source` is `None` and `path` is the root
    /// directory to serve. For format backends `source` is the backing
    /// file inside the parent and `path` is the archive file's absolute
    /// path.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if the root does not exist (native)
    /// - [`VfsError::Backend`] if the container fails to parse
    /// - [`VfsError::AccessDenied`] if `mode` requests write access the
    ///   format cannot provide
    fn open(
        &self,
        source: Option<Source<'_>>,
        path: &str,
        mode: AccessMode,
    ) -> Result<ArchiveState, VfsError>;

    /// Release an archive's state. The engine closes the backing file
    /// afterwards; the backend only disposes of what `open` created.
    fn close(&self, state: ArchiveState);

    /// Metadata for `path`, relative to the archive root.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if the entry does not exist
    fn stat(&self, archive: ArchiveRef<'_>, path: &str) -> Result<FileInfo, VfsError>;

    /// Start iterating the directory at `path` (relative, `""` = root).
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if the directory does not exist
    fn begin_iter(&self, archive: ArchiveRef<'_>, path: &str) -> Result<IterState, VfsError>;

    /// Advance the cursor, returning the next entry or `None` at the end.
    ///
    /// Entry order is backend-defined and not otherwise specified.
    fn next_iter(&self, archive: ArchiveRef<'_>, iter: &mut IterState) -> Option<FileInfo>;

    /// Release a directory cursor.
    fn end_iter(&self, archive: ArchiveRef<'_>, iter: IterState);

    /// Open a file at `path` (relative to the archive root) in `mode`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if the entry does not exist and `mode`
    ///   cannot create it
    /// - [`VfsError::AccessDenied`] if the format rejects the mode
    ///   (archive formats are typically read-only)
    fn open_file(
        &self,
        archive: ArchiveRef<'_>,
        path: &str,
        mode: AccessMode,
    ) -> Result<FileState, VfsError>;

    /// Release a file's state.
    fn close_file(&self, archive: ArchiveRef<'_>, file: FileState);

    /// Read from an open file at its current position.
    fn read(
        &self,
        archive: ArchiveRef<'_>,
        file: &mut FileState,
        buf: &mut [u8],
    ) -> Result<usize, VfsError>;

    /// Write to an open file at its current position.
    ///
    /// # Errors
    ///
    /// - [`VfsError::AccessDenied`] if the file was not opened for writing
    fn write(
        &self,
        archive: ArchiveRef<'_>,
        file: &mut FileState,
        data: &[u8],
    ) -> Result<usize, VfsError>;

    /// Reposition an open file's cursor.
    fn seek(
        &self,
        archive: ArchiveRef<'_>,
        file: &mut FileState,
        pos: SeekFrom,
    ) -> Result<u64, VfsError>;

    /// Current cursor position.
    fn tell(&self, archive: ArchiveRef<'_>, file: &mut FileState) -> u64;

    /// Total file size in bytes.
    fn size(&self, archive: ArchiveRef<'_>, file: &mut FileState) -> u64;

    /// Remove the entry at `path`. Optional; defaults to unsupported.
    fn remove(&self, archive: ArchiveRef<'_>, path: &str) -> Result<(), VfsError> {
        let _ = (archive, path);
        Err(VfsError::NotSupported {
            operation: "remove",
        })
    }

    /// Rename `from` to `to` within this archive. Optional.
    fn rename(&self, archive: ArchiveRef<'_>, from: &str, to: &str) -> Result<(), VfsError> {
        let _ = (archive, from, to);
        Err(VfsError::NotSupported {
            operation: "rename",
        })
    }

    /// Create the directory at `path`. Optional.
    fn create_dir(&self, archive: ArchiveRef<'_>, path: &str) -> Result<(), VfsError> {
        let _ = (archive, path);
        Err(VfsError::NotSupported {
            operation: "create_dir",
        })
    }

    /// Copy `from` to `to` within this archive. Optional.
    fn copy(&self, archive: ArchiveRef<'_>, from: &str, to: &str) -> Result<(), VfsError> {
        let _ = (archive, from, to);
        Err(VfsError::NotSupported { operation: "copy" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubBackend;

    impl Backend for StubBackend {
        fn name(&self) -> &'static str {
            "stub"
        }
        fn probe(&self, _path: &str) -> bool {
            false
        }
        fn open(
            &self,
            _source: Option<Source<'_>>,
            _path: &str,
            _mode: AccessMode,
        ) -> Result<ArchiveState, VfsError> {
            Ok(Box::new(()))
        }
        fn close(&self, _state: ArchiveState) {}
        fn stat(&self, _archive: ArchiveRef<'_>, path: &str) -> Result<FileInfo, VfsError> {
            Err(VfsError::NotFound { path: path.into() })
        }
        fn begin_iter(
            &self,
            _archive: ArchiveRef<'_>,
            path: &str,
        ) -> Result<IterState, VfsError> {
            Err(VfsError::NotFound { path: path.into() })
        }
        fn next_iter(&self, _archive: ArchiveRef<'_>, _iter: &mut IterState) -> Option<FileInfo> {
            None
        }
        fn end_iter(&self, _archive: ArchiveRef<'_>, _iter: IterState) {}
        fn open_file(
            &self,
            _archive: ArchiveRef<'_>,
            path: &str,
            _mode: AccessMode,
        ) -> Result<FileState, VfsError> {
            Err(VfsError::NotFound { path: path.into() })
        }
        fn close_file(&self, _archive: ArchiveRef<'_>, _file: FileState) {}
        fn read(
            &self,
            _archive: ArchiveRef<'_>,
            _file: &mut FileState,
            _buf: &mut [u8],
        ) -> Result<usize, VfsError> {
            Ok(0)
        }
        fn write(
            &self,
            _archive: ArchiveRef<'_>,
            _file: &mut FileState,
            _data: &[u8],
        ) -> Result<usize, VfsError> {
            Ok(0)
        }
        fn seek(
            &self,
            _archive: ArchiveRef<'_>,
            _file: &mut FileState,
            _pos: SeekFrom,
        ) -> Result<u64, VfsError> {
            Ok(0)
        }
        fn tell(&self, _archive: ArchiveRef<'_>, _file: &mut FileState) -> u64 {
            0
        }
        fn size(&self, _archive: ArchiveRef<'_>, _file: &mut FileState) -> u64 {
            0
        }
    }

    fn archive_ref<'a>(state: &'a mut ArchiveState, path: &'a str) -> ArchiveRef<'a> {
        ArchiveRef {
            state,
            source: None,
            path,
        }
    }

    #[test]
    fn backend_is_object_safe() {
        fn _check(_: &dyn Backend) {}
    }

    #[test]
    fn optional_operations_default_to_not_supported() {
        let backend = StubBackend;
        let mut state: ArchiveState = Box::new(());

        let result = backend.remove(archive_ref(&mut state, "/a"), "x");
        assert!(matches!(
            result,
            Err(VfsError::NotSupported { operation: "remove" })
        ));

        let result = backend.rename(archive_ref(&mut state, "/a"), "x", "y");
        assert!(matches!(
            result,
            Err(VfsError::NotSupported { operation: "rename" })
        ));

        let result = backend.create_dir(archive_ref(&mut state, "/a"), "x");
        assert!(matches!(
            result,
            Err(VfsError::NotSupported {
                operation: "create_dir"
            })
        ));

        let result = backend.copy(archive_ref(&mut state, "/a"), "x", "y");
        assert!(matches!(
            result,
            Err(VfsError::NotSupported { operation: "copy" })
        ));
    }

    #[test]
    fn state_of_rejects_foreign_state() {
        let mut state: ArchiveState = Box::new(42u32);
        assert!(state_of::<u32>(&mut state, "test").is_ok());
        assert!(matches!(
            state_of::<String>(&mut state, "test"),
            Err(VfsError::Backend(_))
        ));
    }

    #[test]
    fn archive_ref_state_as_downcasts() {
        let mut state: ArchiveState = Box::new(7u8);
        let mut archive = archive_ref(&mut state, "/");
        assert_eq!(*archive.state_as::<u8>("test").unwrap(), 7);
    }
}
