//! Error types for the nestfs virtual filesystem engine.

/// Error type for resolution, backend dispatch, and base-list operations.
///
/// All variants carry the context (path, operation) a caller needs to act on
/// the failure. Uses `#[non_exhaustive]` for forward compatibility.
///
/// # Examples
///
/// ```rust
/// use nestfs::VfsError;
///
/// let err = VfsError::NotFound { path: "/missing".into() };
/// assert!(err.to_string().contains("/missing"));
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    // Resolution errors
    /// No backend and no archive nesting accounts for the path.
    #[error("not found: {path}")]
    NotFound {
        /// The path that could not be resolved.
        path: String,
    },

    /// A mount was attempted and every registered backend's probe rejected
    /// the candidate file.
    #[error("not an archive: {path}")]
    NotAnArchive {
        /// The candidate file that no backend recognized.
        path: String,
    },

    /// A backend's probe accepted the file but its `open` failed
    /// (e.g. a corrupt archive).
    #[error("backend '{backend}' failed to open {path}: {source}")]
    BackendOpenFailed {
        /// The archive file that failed to open.
        path: String,
        /// Name of the backend whose probe accepted the file.
        backend: &'static str,
        /// The backend's underlying failure.
        #[source]
        source: Box<VfsError>,
    },

    // Base directory list errors
    /// A base-directory-list operation was given an out-of-range index.
    #[error("invalid index {index} (list holds {count} entries)")]
    InvalidIndex {
        /// The rejected index.
        index: usize,
        /// Number of entries in the list at the time of the call.
        count: usize,
    },

    // Path errors
    /// A caller-supplied path exceeded [`MAX_PATH`](crate::MAX_PATH).
    ///
    /// Internal path accumulation truncates silently; paths handed to the
    /// [`Context`](crate::Context) API are rejected instead, since a
    /// truncated lookup path could only resolve the wrong entry.
    #[error("path exceeds MAX_PATH: {path}")]
    Truncated {
        /// The over-long path, as supplied.
        path: String,
    },

    // Access errors
    /// The backend rejected the requested access mode
    /// (e.g. a write mode on a read-only archive format).
    #[error("{operation}: access denied: {path}")]
    AccessDenied {
        /// The path access was denied to.
        path: String,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// The backend does not implement an optional operation.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// An operation was dispatched against a handle whose backend state is
    /// already gone.
    #[error("{operation}: handle already closed")]
    InvalidHandle {
        /// The operation that was attempted.
        operation: &'static str,
    },

    // Backend errors
    /// Format-specific backend failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error with context, from the native backend.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for VfsError {
    fn from(error: std::io::Error) -> Self {
        // Map common io::ErrorKind values to the specific variants
        match error.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound {
                path: String::new(),
            },
            std::io::ErrorKind::PermissionDenied => VfsError::AccessDenied {
                path: String::new(),
                operation: "io",
            },
            _ => VfsError::Io {
                operation: "io",
                path: String::new(),
                source: error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = VfsError::NotFound {
            path: "/missing".into(),
        };
        assert_eq!(err.to_string(), "not found: /missing");
    }

    #[test]
    fn not_an_archive_display() {
        let err = VfsError::NotAnArchive {
            path: "/data/readme.txt".into(),
        };
        assert_eq!(err.to_string(), "not an archive: /data/readme.txt");
    }

    #[test]
    fn backend_open_failed_chains_source() {
        let err = VfsError::BackendOpenFailed {
            path: "/mods/broken.pak".into(),
            backend: "pak",
            source: Box::new(VfsError::Backend("bad directory table".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("pak"));
        assert!(msg.contains("/mods/broken.pak"));
        assert!(msg.contains("bad directory table"));
    }

    #[test]
    fn invalid_index_display() {
        let err = VfsError::InvalidIndex { index: 7, count: 2 };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn access_denied_display() {
        let err = VfsError::AccessDenied {
            path: "bundle.pak/readme".into(),
            operation: "open_file",
        };
        assert_eq!(
            err.to_string(),
            "open_file: access denied: bundle.pak/readme"
        );
    }

    #[test]
    fn from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        assert!(matches!(VfsError::from(io_err), VfsError::NotFound { .. }));
    }

    #[test]
    fn from_io_permission_denied() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        assert!(matches!(
            VfsError::from(io_err),
            VfsError::AccessDenied { .. }
        ));
    }

    #[test]
    fn from_io_other() {
        let io_err = std::io::Error::other("test");
        assert!(matches!(VfsError::from(io_err), VfsError::Io { .. }));
    }
}
