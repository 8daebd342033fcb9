//! # Archive Resolution Engine
//!
//! Turns a logical path into an open [`Archive`] chain positioned so the
//! target exists directly inside the leaf, consulting the base directory
//! list and the backend registry.
//!
//! Two strategies cooperate, chosen by path shape:
//!
//! - **Verbose** (absolute paths): every path component is assumed to be a
//!   real entry or to sit precisely on an archive boundary. A component
//!   that is neither the target nor a mountable archive fails the
//!   resolution.
//! - **Default** (relative paths, per base directory): the caller's path
//!   may not align with archive boundaries at all. Where the verbose walk
//!   would give up, this strategy additionally scans the reached directory
//!   level and tries to mount *every* non-directory sibling, retrying the
//!   entire remaining path inside each — transparent mounting: an archive's
//!   contents behave as if merged into its directory's namespace, without
//!   the caller ever naming the archive file.
//!
//! Failed attempts unwind completely: every archive opened on the way is
//! closed before the failure (or the next candidate) is tried, so callers
//! never observe a half-open chain.
//!
//! `.` and `..` segments are not interpreted; callers pre-normalize.

use tracing::{debug, trace};

use crate::archive::Archive;
use crate::backend::Source;
use crate::bases::BaseDirList;
use crate::error::VfsError;
use crate::path::{BoundedPath, Segments};
use crate::registry::BackendRegistry;
use crate::types::AccessMode;

/// Maximum archive nesting depth per resolution.
///
/// The brute-force sibling scan has no other cycle guard (an archive whose
/// contents lead back into itself would otherwise recurse without bound);
/// attempts needing more than this many nested mounts fail with
/// [`VfsError::NotFound`].
pub const MAX_MOUNT_DEPTH: usize = 16;

/// A successful resolution: the leaf archive (owning its whole parent
/// chain) and the target's path relative to that leaf's root.
pub(crate) struct Resolved {
    pub(crate) archive: Box<Archive>,
    pub(crate) rest: BoundedPath,
}

/// Walk failure, distinguishing whether the entered archive survived.
enum WalkError {
    /// The attempt failed; the archive the walk was entered with is handed
    /// back (all deeper mounts already closed) for the caller to reuse or
    /// drop.
    Recoverable(Box<Archive>, VfsError),
    /// The attempt failed and the chain is already gone.
    Fatal(VfsError),
}

impl WalkError {
    /// Discard any surviving archive (dropping closes it) and keep the
    /// error.
    fn into_error(self) -> VfsError {
        match self {
            WalkError::Recoverable(archive, err) => {
                drop(archive);
                err
            }
            WalkError::Fatal(err) => err,
        }
    }
}

type WalkResult = Result<Resolved, WalkError>;

/// Resolve `path` against the base directory list and registry.
pub(crate) fn resolve(
    registry: &BackendRegistry,
    bases: &BaseDirList,
    path: &str,
    mode: AccessMode,
) -> Result<Resolved, VfsError> {
    if let Some(tail) = path.strip_prefix('/') {
        let root = open_root(registry, "/")?;
        return verbose_walk(registry, root, tail, mode, 0).map_err(WalkError::into_error);
    }

    for base in bases.iter() {
        let root = match open_root(registry, base) {
            Ok(root) => root,
            Err(err) => {
                trace!(base, %err, "base directory skipped");
                continue;
            }
        };
        match default_walk(registry, root, path, mode, 0) {
            Ok(resolved) => {
                trace!(base, path, "resolved");
                return Ok(resolved);
            }
            Err(err) => {
                // Closes whatever survived; only the next base matters.
                let _ = err.into_error();
            }
        }
    }
    Err(VfsError::NotFound { path: path.into() })
}

/// Open a base directory (or `/`) as a native root archive.
fn open_root(registry: &BackendRegistry, dir: &str) -> Result<Box<Archive>, VfsError> {
    let native = registry.native();
    let state = native.open(None, dir, AccessMode::READ)?;
    Ok(Box::new(Archive::root(
        native,
        state,
        BoundedPath::from(dir),
    )))
}

fn not_found(archive: &Archive, rel: &str) -> VfsError {
    VfsError::NotFound {
        path: BoundedPath::from(archive.path())
            .join(rel)
            .as_str()
            .into(),
    }
}

/// Verbose strategy: trust the caller's segmentation.
fn verbose_walk(
    registry: &BackendRegistry,
    mut archive: Box<Archive>,
    path: &str,
    mode: AccessMode,
    depth: usize,
) -> WalkResult {
    if depth >= MAX_MOUNT_DEPTH {
        let err = not_found(&archive, path);
        return Err(WalkError::Recoverable(archive, err));
    }

    if archive.stat(path).is_ok() {
        return Ok(Resolved {
            archive,
            rest: BoundedPath::from(path),
        });
    }

    let ranges: Vec<(usize, usize)> = Segments::new(path).collect();
    for (i, (_, end)) in ranges.iter().copied().enumerate() {
        let prefix = &path[..end];
        let is_last = i + 1 == ranges.len();
        match archive.stat(prefix) {
            Ok(info) if info.is_dir() => continue,
            Ok(_) if is_last => {
                return Ok(Resolved {
                    archive,
                    rest: BoundedPath::from(path),
                });
            }
            Ok(_) => {
                // A non-directory mid-path: it must be an archive boundary.
                let tail = &path[ranges[i + 1].0..];
                return match try_mount(registry, archive, prefix) {
                    Ok(child) => verbose_walk(registry, child, tail, mode, depth + 1),
                    Err((archive, err)) => Err(WalkError::Recoverable(archive, err)),
                };
            }
            Err(_) => {
                if mode.creates() && (is_last || mode.create_dirs) {
                    return Ok(Resolved {
                        archive,
                        rest: BoundedPath::from(path),
                    });
                }
                let err = not_found(&archive, path);
                return Err(WalkError::Recoverable(archive, err));
            }
        }
    }

    // No segments (root itself).
    Ok(Resolved {
        archive,
        rest: BoundedPath::from(path),
    })
}

/// Default strategy: verbose walking plus the transparent-mount sibling
/// scan.
fn default_walk(
    registry: &BackendRegistry,
    mut archive: Box<Archive>,
    path: &str,
    mode: AccessMode,
    depth: usize,
) -> WalkResult {
    if depth >= MAX_MOUNT_DEPTH {
        let err = not_found(&archive, path);
        return Err(WalkError::Recoverable(archive, err));
    }

    if archive.stat(path).is_ok() {
        return Ok(Resolved {
            archive,
            rest: BoundedPath::from(path),
        });
    }

    let ranges: Vec<(usize, usize)> = Segments::new(path).collect();
    for (i, (start, end)) in ranges.iter().copied().enumerate() {
        let prefix = &path[..end];
        let is_last = i + 1 == ranges.len();
        let level = if i == 0 { "" } else { &path[..ranges[i - 1].1] };
        let remaining = &path[start..];
        match archive.stat(prefix) {
            Ok(info) if info.is_dir() => continue,
            Ok(_) if is_last => {
                return Ok(Resolved {
                    archive,
                    rest: BoundedPath::from(path),
                });
            }
            Ok(_) => {
                // (a) an existing non-directory entry mid-path: mount it
                // and walk the tail inside.
                let tail = &path[ranges[i + 1].0..];
                match try_mount(registry, archive, prefix) {
                    Ok(child) => match default_walk(registry, child, tail, mode, depth + 1) {
                        Ok(resolved) => return Ok(resolved),
                        Err(WalkError::Fatal(err)) => return Err(WalkError::Fatal(err)),
                        Err(WalkError::Recoverable(child, err)) => match child.unmount() {
                            Some(parent) => archive = parent,
                            None => return Err(WalkError::Fatal(err)),
                        },
                    },
                    Err((returned, err)) => {
                        trace!(entry = prefix, %err, "named mount failed");
                        archive = returned;
                    }
                }
                // (b) fall through to the sibling scan at this level.
                return sibling_scan(registry, archive, level, remaining, path, false, mode, depth);
            }
            Err(_) => {
                let last_missing = is_last;
                return sibling_scan(
                    registry,
                    archive,
                    level,
                    remaining,
                    path,
                    last_missing,
                    mode,
                    depth,
                );
            }
        }
    }

    Ok(Resolved {
        archive,
        rest: BoundedPath::from(path),
    })
}

/// Brute-force transparent mounting: try every non-directory entry of the
/// reached directory level as a potential archive and retry the entire
/// remaining path inside each, in directory-iteration order.
#[allow(clippy::too_many_arguments)]
fn sibling_scan(
    registry: &BackendRegistry,
    mut archive: Box<Archive>,
    level: &str,
    remaining: &str,
    full_path: &str,
    last_missing: bool,
    mode: AccessMode,
    depth: usize,
) -> WalkResult {
    // The level itself was just walked as directories, so iteration
    // failures mean "no candidates", not a broken chain.
    let entries = archive.list_dir(level).unwrap_or_default();
    for entry in entries.iter().filter(|e| !e.is_dir()) {
        let candidate = BoundedPath::from(level).join(entry.name());
        match try_mount(registry, archive, candidate.as_str()) {
            Ok(child) => {
                trace!(candidate = %candidate, remaining, "retrying inside sibling mount");
                match default_walk(registry, child, remaining, mode, depth + 1) {
                    Ok(resolved) => return Ok(resolved),
                    Err(WalkError::Fatal(err)) => return Err(WalkError::Fatal(err)),
                    Err(WalkError::Recoverable(child, _)) => match child.unmount() {
                        Some(parent) => archive = parent,
                        None => {
                            return Err(WalkError::Fatal(not_found_path(full_path)));
                        }
                    },
                }
            }
            Err((returned, _)) => archive = returned,
        }
    }

    // No sibling accounts for the path; a creating mode may still claim
    // the leaf here (the walked parent chain exists in this archive).
    if mode.creates() && (last_missing || mode.create_dirs) {
        return Ok(Resolved {
            archive,
            rest: BoundedPath::from(full_path),
        });
    }

    let err = not_found(&archive, full_path);
    Err(WalkError::Recoverable(archive, err))
}

fn not_found_path(path: &str) -> VfsError {
    VfsError::NotFound { path: path.into() }
}

/// Attempt to mount `entry` (relative to `parent`) as a nested archive.
///
/// Probes the registered format backends in order — never the native table,
/// which only serves path roots — and opens the first accepter through a
/// backing file inside `parent`. On failure the parent is handed back with
/// the backing file closed, so the caller can keep walking.
fn try_mount(
    registry: &BackendRegistry,
    mut parent: Box<Archive>,
    entry: &str,
) -> Result<Box<Archive>, (Box<Archive>, VfsError)> {
    let abs = BoundedPath::from(parent.path()).join(entry);

    let Some(backend) = registry.find(abs.as_str()) else {
        let err = VfsError::NotAnArchive {
            path: abs.as_str().into(),
        };
        return Err((parent, err));
    };

    let mut backing = match parent.open_file(entry, AccessMode::READ) {
        Ok(file) => file,
        Err(err) => return Err((parent, err)),
    };

    let opened = {
        let source = Source {
            archive: &mut parent,
            file: &mut backing,
        };
        backend.open(Some(source), abs.as_str(), AccessMode::READ)
    };

    match opened {
        Ok(state) => {
            debug!(backend = backend.name(), path = %abs, "archive mounted");
            Ok(Box::new(Archive::nested(
                backend, state, parent, backing, abs,
            )))
        }
        Err(err) => {
            parent.close_file(&mut backing);
            let err = VfsError::BackendOpenFailed {
                path: abs.as_str().into(),
                backend: backend.name(),
                source: Box::new(err),
            };
            Err((parent, err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ArchiveRef, ArchiveState, Backend, FileState, IterState, state_of};
    use crate::native::NativeBackend;
    use crate::types::{FileAttributes, FileInfo};
    use std::collections::BTreeSet;
    use std::io::SeekFrom;
    use std::sync::Arc;
    use std::time::SystemTime;

    // ------------------------------------------------------------------
    // A minimal container format for tests: repeated `name:len\n` headers,
    // each followed by `len` raw bytes. Nested archives are just entries
    // whose bytes are another container.
    // ------------------------------------------------------------------

    fn pak(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, data) in entries {
            out.extend_from_slice(format!("{name}:{}\n", data.len()).as_bytes());
            out.extend_from_slice(data);
        }
        out
    }

    fn parse_pak(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>, VfsError> {
        let mut entries = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let line_end = bytes[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .ok_or_else(|| VfsError::Backend("missing header terminator".into()))?;
            let header = std::str::from_utf8(&bytes[pos..pos + line_end])
                .map_err(|_| VfsError::Backend("bad header".into()))?;
            let (name, len) = header
                .rsplit_once(':')
                .ok_or_else(|| VfsError::Backend("bad header".into()))?;
            let len: usize = len
                .parse()
                .map_err(|_| VfsError::Backend("bad length".into()))?;
            pos += line_end + 1;
            if pos + len > bytes.len() {
                return Err(VfsError::Backend("truncated entry".into()));
            }
            entries.push((name.to_string(), bytes[pos..pos + len].to_vec()));
            pos += len;
        }
        Ok(entries)
    }

    struct PakArchive {
        entries: Vec<(String, Vec<u8>)>,
    }

    struct PakFile {
        data: Vec<u8>,
        pos: usize,
    }

    struct PakIter {
        names: Vec<FileInfo>,
        pos: usize,
    }

    struct PakBackend;

    impl PakBackend {
        fn lookup<'a>(archive: &'a PakArchive, path: &str) -> Option<&'a [u8]> {
            archive
                .entries
                .iter()
                .find(|(name, _)| name == path)
                .map(|(_, data)| data.as_slice())
        }

        fn is_dir(archive: &PakArchive, path: &str) -> bool {
            path.is_empty()
                || archive
                    .entries
                    .iter()
                    .any(|(name, _)| name.starts_with(&format!("{path}/")))
        }
    }

    impl Backend for PakBackend {
        fn name(&self) -> &'static str {
            "pak"
        }
        fn probe(&self, path: &str) -> bool {
            path.ends_with(".pak")
        }
        fn open(
            &self,
            source: Option<Source<'_>>,
            path: &str,
            mode: AccessMode,
        ) -> Result<ArchiveState, VfsError> {
            if mode.write {
                return Err(VfsError::AccessDenied {
                    path: path.into(),
                    operation: "open",
                });
            }
            let mut source = source.ok_or_else(|| VfsError::Backend("pak needs a source".into()))?;
            let mut bytes = Vec::new();
            source.read_to_end(&mut bytes)?;
            let entries = parse_pak(&bytes)?;
            Ok(Box::new(PakArchive { entries }))
        }
        fn close(&self, _state: ArchiveState) {}
        fn stat(&self, archive: ArchiveRef<'_>, path: &str) -> Result<FileInfo, VfsError> {
            let ArchiveRef {
                state,
                path: verbose,
                ..
            } = archive;
            let pak = state_of::<PakArchive>(state, "stat")?;
            if let Some(data) = Self::lookup(pak, path) {
                return Ok(FileInfo {
                    path: BoundedPath::from(verbose).join(path),
                    size: data.len() as u64,
                    modified: SystemTime::UNIX_EPOCH,
                    attributes: FileAttributes {
                        directory: false,
                        readonly: true,
                    },
                });
            }
            if Self::is_dir(pak, path) {
                return Ok(FileInfo {
                    path: BoundedPath::from(verbose).join(path),
                    size: 0,
                    modified: SystemTime::UNIX_EPOCH,
                    attributes: FileAttributes {
                        directory: true,
                        readonly: true,
                    },
                });
            }
            Err(VfsError::NotFound { path: path.into() })
        }
        fn begin_iter(&self, archive: ArchiveRef<'_>, path: &str) -> Result<IterState, VfsError> {
            let ArchiveRef {
                state,
                path: verbose,
                ..
            } = archive;
            let pak = state_of::<PakArchive>(state, "begin_iter")?;
            if !Self::is_dir(pak, path) {
                return Err(VfsError::NotFound { path: path.into() });
            }
            let prefix = if path.is_empty() {
                String::new()
            } else {
                format!("{path}/")
            };
            let mut files = Vec::new();
            let mut dirs = BTreeSet::new();
            for (name, data) in &pak.entries {
                let Some(rest) = name.strip_prefix(&prefix) else {
                    continue;
                };
                match rest.split_once('/') {
                    Some((dir, _)) => {
                        dirs.insert(dir.to_string());
                    }
                    None => files.push(FileInfo {
                        path: BoundedPath::from(verbose).join(name),
                        size: data.len() as u64,
                        modified: SystemTime::UNIX_EPOCH,
                        attributes: FileAttributes {
                            directory: false,
                            readonly: true,
                        },
                    }),
                }
            }
            for dir in dirs {
                files.push(FileInfo {
                    path: BoundedPath::from(verbose).join(&prefix).join(&dir),
                    size: 0,
                    modified: SystemTime::UNIX_EPOCH,
                    attributes: FileAttributes {
                        directory: true,
                        readonly: true,
                    },
                });
            }
            Ok(Box::new(PakIter {
                names: files,
                pos: 0,
            }))
        }
        fn next_iter(&self, _archive: ArchiveRef<'_>, iter: &mut IterState) -> Option<FileInfo> {
            let cursor = iter.downcast_mut::<PakIter>()?;
            let info = cursor.names.get(cursor.pos).cloned()?;
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
            if mode.write {
                return Err(VfsError::AccessDenied {
                    path: path.into(),
                    operation: "open_file",
                });
            }
            let ArchiveRef { state, .. } = archive;
            let pak = state_of::<PakArchive>(state, "open_file")?;
            let data = Self::lookup(pak, path)
                .ok_or_else(|| VfsError::NotFound { path: path.into() })?
                .to_vec();
            Ok(Box::new(PakFile { data, pos: 0 }))
        }
        fn close_file(&self, _archive: ArchiveRef<'_>, _file: FileState) {}
        fn read(
            &self,
            _archive: ArchiveRef<'_>,
            file: &mut FileState,
            buf: &mut [u8],
        ) -> Result<usize, VfsError> {
            let f = state_of::<PakFile>(file, "read")?;
            let n = buf.len().min(f.data.len() - f.pos.min(f.data.len()));
            buf[..n].copy_from_slice(&f.data[f.pos..f.pos + n]);
            f.pos += n;
            Ok(n)
        }
        fn write(
            &self,
            _archive: ArchiveRef<'_>,
            _file: &mut FileState,
            _data: &[u8],
        ) -> Result<usize, VfsError> {
            Err(VfsError::AccessDenied {
                path: String::new(),
                operation: "write",
            })
        }
        fn seek(
            &self,
            _archive: ArchiveRef<'_>,
            file: &mut FileState,
            pos: SeekFrom,
        ) -> Result<u64, VfsError> {
            let f = state_of::<PakFile>(file, "seek")?;
            let len = f.data.len() as i64;
            let target = match pos {
                SeekFrom::Start(n) => n as i64,
                SeekFrom::Current(n) => f.pos as i64 + n,
                SeekFrom::End(n) => len + n,
            };
            if target < 0 {
                return Err(VfsError::Backend("seek before start".into()));
            }
            f.pos = target as usize;
            Ok(f.pos as u64)
        }
        fn tell(&self, _archive: ArchiveRef<'_>, file: &mut FileState) -> u64 {
            file.downcast_mut::<PakFile>().map(|f| f.pos as u64).unwrap_or(0)
        }
        fn size(&self, _archive: ArchiveRef<'_>, file: &mut FileState) -> u64 {
            file.downcast_mut::<PakFile>()
                .map(|f| f.data.len() as u64)
                .unwrap_or(0)
        }
    }

    fn registry() -> BackendRegistry {
        let mut registry = BackendRegistry::new(Arc::new(NativeBackend::new()));
        registry.register(Arc::new(PakBackend));
        registry
    }

    fn read_all(resolved: &mut Resolved) -> Vec<u8> {
        let rest = resolved.rest.as_str().to_string();
        let mut file = resolved
            .archive
            .open_file(&rest, AccessMode::READ)
            .unwrap();
        let mut out = Vec::new();
        let table = resolved.archive.table();
        let mut chunk = [0u8; 64];
        loop {
            let state = file.state_mut("read").unwrap();
            let n = table
                .read(resolved.archive.parts("read").unwrap(), state, &mut chunk)
                .unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        resolved.archive.close_file(&mut file);
        out
    }

    #[test]
    fn relative_path_resolves_directly_in_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain.txt"), b"native bytes").unwrap();

        let mut bases = BaseDirList::new();
        bases.append(&dir.path().to_string_lossy());

        let mut resolved =
            resolve(&registry(), &bases, "plain.txt", AccessMode::READ).unwrap();
        assert_eq!(resolved.rest, "plain.txt");
        assert_eq!(resolved.archive.backend_name(), "native");
        assert_eq!(read_all(&mut resolved), b"native bytes");
    }

    #[test]
    fn verbose_path_crosses_a_named_archive_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let blob = pak(&[("hud/icon.png", b"PNGDATA")]);
        std::fs::write(dir.path().join("textures.pak"), &blob).unwrap();

        let bases = BaseDirList::new();
        let path = format!("{}/textures.pak/hud/icon.png", dir.path().display());
        let mut resolved = resolve(&registry(), &bases, &path, AccessMode::READ).unwrap();
        assert_eq!(resolved.archive.backend_name(), "pak");
        assert_eq!(resolved.rest, "hud/icon.png");
        assert_eq!(read_all(&mut resolved), b"PNGDATA");
    }

    #[test]
    fn default_strategy_mounts_siblings_transparently() {
        let dir = tempfile::tempdir().unwrap();
        let blob = pak(&[("inner.txt", b"mounted")]);
        std::fs::write(dir.path().join("bundle.pak"), &blob).unwrap();
        std::fs::write(dir.path().join("unrelated.bin"), b"noise").unwrap();

        let mut bases = BaseDirList::new();
        bases.append(&dir.path().to_string_lossy());

        // The caller never names bundle.pak.
        let mut resolved = resolve(&registry(), &bases, "inner.txt", AccessMode::READ).unwrap();
        assert_eq!(resolved.archive.backend_name(), "pak");
        assert_eq!(read_all(&mut resolved), b"mounted");
    }

    #[test]
    fn default_strategy_recurses_through_nested_archives() {
        let dir = tempfile::tempdir().unwrap();
        let inner = pak(&[("deep/leaf.txt", b"bottom")]);
        let outer = pak(&[("nested.pak", &inner)]);
        std::fs::write(dir.path().join("outer.pak"), &outer).unwrap();

        let mut bases = BaseDirList::new();
        bases.append(&dir.path().to_string_lossy());

        let mut resolved =
            resolve(&registry(), &bases, "deep/leaf.txt", AccessMode::READ).unwrap();
        assert_eq!(read_all(&mut resolved), b"bottom");
        // Chain: native root -> outer.pak -> nested.pak
        let leaf = &resolved.archive;
        assert_eq!(leaf.backend_name(), "pak");
        assert!(leaf.parent().is_some());
    }

    #[test]
    fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut bases = BaseDirList::new();
        bases.append(&dir.path().to_string_lossy());

        let result = resolve(&registry(), &bases, "no/such/file", AccessMode::READ);
        assert!(matches!(result, Err(VfsError::NotFound { .. })));
    }

    #[test]
    fn verbose_strategy_fails_on_unmountable_component() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.bin"), b"not an archive").unwrap();

        let bases = BaseDirList::new();
        let path = format!("{}/data.bin/sub.txt", dir.path().display());
        let result = resolve(&registry(), &bases, &path, AccessMode::READ);
        assert!(matches!(result, Err(VfsError::NotAnArchive { .. })));
    }

    #[test]
    fn corrupt_archive_reports_backend_open_failed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pak"), b"no header here").unwrap();

        let bases = BaseDirList::new();
        let path = format!("{}/broken.pak/entry.txt", dir.path().display());
        let result = resolve(&registry(), &bases, &path, AccessMode::READ);
        assert!(matches!(result, Err(VfsError::BackendOpenFailed { .. })));
    }

    #[test]
    fn write_mode_accepts_a_creatable_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let mut bases = BaseDirList::new();
        bases.append(&dir.path().to_string_lossy());

        let resolved = resolve(&registry(), &bases, "new.bin", AccessMode::WRITE).unwrap();
        assert_eq!(resolved.archive.backend_name(), "native");
        assert_eq!(resolved.rest, "new.bin");
    }

    #[test]
    fn write_mode_requires_parent_unless_create_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut bases = BaseDirList::new();
        bases.append(&dir.path().to_string_lossy());

        let result = resolve(&registry(), &bases, "missing/new.bin", AccessMode::WRITE);
        assert!(matches!(result, Err(VfsError::NotFound { .. })));

        let mode = AccessMode {
            create_dirs: true,
            ..AccessMode::WRITE
        };
        let resolved = resolve(&registry(), &bases, "missing/new.bin", mode).unwrap();
        assert_eq!(resolved.rest, "missing/new.bin");
    }

    #[test]
    fn existing_mode_never_claims_a_creatable_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let mut bases = BaseDirList::new();
        bases.append(&dir.path().to_string_lossy());

        let mode = AccessMode {
            existing: true,
            ..AccessMode::WRITE
        };
        let result = resolve(&registry(), &bases, "absent.bin", mode);
        assert!(matches!(result, Err(VfsError::NotFound { .. })));
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let dir = tempfile::tempdir().unwrap();

        let build = |levels: usize| {
            let mut blob = pak(&[("leaf.txt", b"deep")]);
            let mut path = String::from("leaf.txt");
            for _ in 0..levels {
                blob = pak(&[("inner.pak", &blob)]);
                path = format!("inner.pak/{path}");
            }
            (blob, path)
        };

        // Well within the bound.
        let (blob, path) = build(4);
        std::fs::write(dir.path().join("ok.pak"), &blob).unwrap();
        let mut bases = BaseDirList::new();
        bases.append(&dir.path().to_string_lossy());
        let full = format!("ok.pak/{path}");
        assert!(resolve(&registry(), &bases, &full, AccessMode::READ).is_ok());

        // Past the bound.
        let deep_dir = tempfile::tempdir().unwrap();
        let (blob, path) = build(MAX_MOUNT_DEPTH + 4);
        std::fs::write(deep_dir.path().join("deep.pak"), &blob).unwrap();
        let mut bases = BaseDirList::new();
        bases.append(&deep_dir.path().to_string_lossy());
        let full = format!("deep.pak/{path}");
        let result = resolve(&registry(), &bases, &full, AccessMode::READ);
        assert!(matches!(result, Err(VfsError::NotFound { .. })));
    }

    #[test]
    fn absolute_root_resolves_to_itself() {
        let bases = BaseDirList::new();
        let resolved = resolve(&registry(), &bases, "/", AccessMode::READ).unwrap();
        assert_eq!(resolved.rest, "");
        assert!(resolved.archive.parent().is_none());
    }
}
