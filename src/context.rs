//! The process-facing façade composing the registry, the base directory
//! list, and the resolution engine.

use std::sync::Arc;

use tracing::trace;

use crate::archive::{DirIter, File};
use crate::backend::Backend;
use crate::bases::BaseDirList;
use crate::error::VfsError;
use crate::native::NativeBackend;
use crate::path::{BoundedPath, MAX_PATH};
use crate::registry::BackendRegistry;
use crate::resolve::{Resolved, resolve};
use crate::types::{AccessMode, FileInfo};

/// The virtual filesystem: one logical path namespace over native
/// directories and transparently mounted archives.
///
/// A `Context` is built in a single-threaded setup phase — construct it
/// with its native table, [`register`](Self::register) format backends,
/// populate the base directory list — and then serves operations through
/// `&self`. Setup methods take `&mut self`, so mutating the registry or
/// base list while resolutions are in flight is a compile error rather
/// than undefined behavior.
///
/// Every operation resolves its path from scratch and builds an
/// exclusively-owned archive chain; nothing is cached or shared between
/// operations (see [`File`] for the lifecycle).
///
/// # Examples
///
/// ```rust,no_run
/// use nestfs::{AccessMode, Context};
///
/// let mut vfs = Context::default();
/// vfs.bases_mut().append("/game/data");
/// vfs.bases_mut().append("/game/mods");
///
/// // Resolves from /game/data first, falling back to /game/mods, looking
/// // inside any archive either directory contains.
/// let bytes = vfs.read("textures/hud.png")?;
/// # Ok::<(), nestfs::VfsError>(())
/// ```
pub struct Context {
    registry: BackendRegistry,
    bases: BaseDirList,
}

impl Context {
    /// A context with the given native table and no format backends.
    pub fn new(native: Arc<dyn Backend>) -> Self {
        Self {
            registry: BackendRegistry::new(native),
            bases: BaseDirList::new(),
        }
    }

    /// Register a format backend at the lowest probe priority.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.registry.register(backend);
    }

    /// The base directory list.
    pub fn bases(&self) -> &BaseDirList {
        &self.bases
    }

    /// Mutable access to the base directory list (setup phase).
    pub fn bases_mut(&mut self) -> &mut BaseDirList {
        &mut self.bases
    }

    /// Number of registered format backends.
    pub fn backend_count(&self) -> usize {
        self.registry.count()
    }

    fn check(path: &str) -> Result<(), VfsError> {
        if path.len() > MAX_PATH - 1 {
            return Err(VfsError::Truncated { path: path.into() });
        }
        Ok(())
    }

    /// Open the file at `path` in `mode`.
    ///
    /// The returned [`File`] keeps its whole archive chain alive until it
    /// is dropped or closed.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if resolution fails
    /// - [`VfsError::AccessDenied`] if the leaf backend rejects `mode`
    ///   (archive formats typically reject any write mode)
    /// - [`VfsError::Truncated`] if `path` exceeds the `MAX_PATH` bound
    pub fn open(&self, path: &str, mode: AccessMode) -> Result<File, VfsError> {
        Self::check(path)?;
        let Resolved { mut archive, rest } = resolve(&self.registry, &self.bases, path, mode)?;
        match archive.open_file(rest.as_str(), mode) {
            Ok(inner) => Ok(File::new(archive, inner)),
            // Dropping the archive unwinds the chain before we report.
            Err(err) => Err(err),
        }
    }

    /// Metadata for the entry at `path`.
    ///
    /// The resolved chain is closed again before this returns, success or
    /// not — `stat` never leaves archives open.
    pub fn stat(&self, path: &str) -> Result<FileInfo, VfsError> {
        Self::check(path)?;
        let Resolved { mut archive, rest } =
            resolve(&self.registry, &self.bases, path, AccessMode::READ)?;
        archive.stat(rest.as_str())
    }

    /// Returns whether `path` resolves to an existing entry.
    ///
    /// Resolution failures other than [`VfsError::NotFound`] are reported,
    /// not swallowed.
    pub fn exists(&self, path: &str) -> Result<bool, VfsError> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(VfsError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Iterate the directory at `path`.
    ///
    /// The returned [`DirIter`] keeps its archive chain alive until it is
    /// dropped or closed, mirroring [`open`](Self::open).
    pub fn read_dir(&self, path: &str) -> Result<DirIter, VfsError> {
        Self::check(path)?;
        let Resolved { mut archive, rest } =
            resolve(&self.registry, &self.bases, path, AccessMode::READ)?;
        let verbose = BoundedPath::from(archive.path()).join(rest.as_str());
        match archive.begin_iter(rest.as_str()) {
            Ok(state) => Ok(DirIter::new(archive, state, verbose)),
            Err(err) => Err(err),
        }
    }

    /// Remove the entry at `path` (passthrough to the leaf backend).
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotSupported`] if the leaf backend has no remove
    pub fn remove(&self, path: &str) -> Result<(), VfsError> {
        Self::check(path)?;
        let mode = AccessMode {
            existing: true,
            ..AccessMode::WRITE
        };
        let Resolved { mut archive, rest } = resolve(&self.registry, &self.bases, path, mode)?;
        let table = archive.table();
        table.remove(archive.parts("remove")?, rest.as_str())
    }

    /// Rename `from` to `to`.
    ///
    /// `to` is interpreted relative to the leaf archive `from` resolved
    /// into; the capability table cannot express a cross-archive rename.
    pub fn rename(&self, from: &str, to: &str) -> Result<(), VfsError> {
        Self::check(from)?;
        Self::check(to)?;
        let mode = AccessMode {
            existing: true,
            ..AccessMode::WRITE
        };
        let Resolved { mut archive, rest } = resolve(&self.registry, &self.bases, from, mode)?;
        let table = archive.table();
        table.rename(archive.parts("rename")?, rest.as_str(), to)
    }

    /// Create the directory at `path` (passthrough to the leaf backend).
    pub fn create_dir(&self, path: &str) -> Result<(), VfsError> {
        Self::check(path)?;
        let mode = AccessMode {
            create_dirs: true,
            ..AccessMode::WRITE
        };
        let Resolved { mut archive, rest } = resolve(&self.registry, &self.bases, path, mode)?;
        let table = archive.table();
        table.create_dir(archive.parts("create_dir")?, rest.as_str())
    }

    /// Copy `from` to `to` within the leaf archive `from` resolves into.
    pub fn copy(&self, from: &str, to: &str) -> Result<(), VfsError> {
        Self::check(from)?;
        Self::check(to)?;
        let Resolved { mut archive, rest } =
            resolve(&self.registry, &self.bases, from, AccessMode::READ)?;
        let table = archive.table();
        table.copy(archive.parts("copy")?, rest.as_str(), to)
    }

    /// Read the whole file at `path`.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        let mut file = self.open(path, AccessMode::READ)?;
        let mut out = Vec::new();
        file.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Read the whole file at `path` as UTF-8.
    pub fn read_to_string(&self, path: &str) -> Result<String, VfsError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|_| VfsError::Backend(format!("{path}: not valid UTF-8")))
    }

    /// Write `data` to `path`, creating or truncating it.
    pub fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        let mut file = self.open(path, AccessMode::WRITE)?;
        let mut written = 0;
        while written < data.len() {
            let n = file.write(&data[written..])?;
            if n == 0 {
                return Err(VfsError::Backend(format!("{path}: short write")));
            }
            written += n;
        }
        trace!(path, bytes = data.len(), "wrote file");
        Ok(())
    }

    /// Read and deserialize the JSON file at `path`.
    #[cfg(feature = "serde")]
    pub fn read_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, VfsError> {
        let bytes = self.read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| VfsError::Backend(format!("{path}: invalid JSON: {e}")))
    }

    /// Serialize `value` as JSON and write it to `path`.
    #[cfg(feature = "serde")]
    pub fn write_json<T: serde::Serialize>(&self, path: &str, value: &T) -> Result<(), VfsError> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| VfsError::Backend(format!("{path}: serialization failed: {e}")))?;
        self.write(path, &bytes)
    }
}

impl Default for Context {
    /// A context backed by the real filesystem ([`NativeBackend`]).
    fn default() -> Self {
        Self::new(Arc::new(NativeBackend::new()))
    }
}
