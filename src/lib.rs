//! # nestfs
//!
//! A **virtual filesystem engine with transparent archive mounting**: one
//! logical path namespace over native directories, archive files, and
//! archives nested inside other archives.
//!
//! The engine itself decodes no formats. Storage formats are pluggable
//! **backends** implementing the [`Backend`] capability table; the crate
//! ships only the [`NativeBackend`] for real directories. Register a ZIP
//! or PAK backend and its archives become part of the directory namespace
//! — callers address `textures/hud.png` the same way whether the bytes
//! live on disk, in `textures.pak`, or in a PAK inside a ZIP.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nestfs::{AccessMode, Context};
//!
//! let mut vfs = Context::default();
//! vfs.bases_mut().append("/game/data");
//! vfs.bases_mut().append("/game/mods");
//! // vfs.register(Arc::new(PakBackend::new()));
//!
//! // Searches /game/data then /game/mods, transparently looking inside
//! // any archive file either directory contains.
//! let mut file = vfs.open("textures/hud.png", AccessMode::READ)?;
//! let info = vfs.stat("maps/level1.dat")?;
//! for entry in vfs.read_dir("sounds")? {
//!     println!("{}", entry.name());
//! }
//! # Ok::<(), nestfs::VfsError>(())
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Context`] | The façade: open, stat, iterate, and passthrough operations |
//! | [`Backend`] | Capability table a storage format implements |
//! | [`BaseDirList`] | Priority-ordered search roots for relative paths |
//! | [`Archive`] | One opened container; links form the ownership chain |
//! | [`File`] / [`DirIter`] | Caller-held handles that keep their chain alive |
//! | [`FileInfo`] / [`AccessMode`] | Value types crossing the backend boundary |
//! | [`BoundedPath`] | Fixed-capacity path string ([`MAX_PATH`] bytes, truncating) |
//! | [`VfsError`] | Error taxonomy with path/operation context |
//!
//! ---
//!
//! ## Path Resolution
//!
//! Two strategies, chosen by path shape:
//!
//! - **Absolute paths** (`/mods/textures.pak/hud/icon.png`) use the
//!   *verbose* strategy: each component must be a real entry or sit
//!   exactly on an archive boundary.
//! - **Relative paths** (`hud/icon.png`) are tried against each base
//!   directory in priority order with the *default* strategy, which
//!   additionally probes every sibling file as a potential archive mount —
//!   the caller never needs to know `textures.pak` exists.
//!
//! Resolution depth is bounded by [`MAX_MOUNT_DEPTH`]. `.` and `..`
//! segments are not normalized; callers pre-normalize.
//!
//! ---
//!
//! ## Ownership & Concurrency
//!
//! Every operation builds a fresh, exclusively-owned archive chain and
//! closes it when done — a [`File`] or [`DirIter`] returned to the caller
//! keeps its chain alive until dropped. There is no sharing and no
//! reference counting: two concurrent opens of the same path each carry
//! their own chain, so cross-handle use-after-close cannot be constructed,
//! at the cost of re-decoding containers per resolution.
//!
//! The engine is synchronous and keeps no state between operations;
//! [`Context`] setup (backend registration, base list mutation) takes
//! `&mut self` and is meant for a single-threaded setup phase.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`FileInfo`], [`AccessMode`], etc., plus JSON helpers on [`Context`] |

// Private modules
mod archive;
mod backend;
mod bases;
mod context;
mod error;
mod native;
mod path;
mod registry;
mod resolve;
mod types;

// Public re-exports - error type
pub use error::VfsError;

// Public re-exports - core value types
pub use path::{BoundedPath, MAX_PATH};
pub use types::{AccessMode, FileAttributes, FileInfo};

// Public re-exports - backend contract
pub use backend::{ArchiveRef, ArchiveState, Backend, FileState, IterState, Source, state_of};

// Public re-exports - object model
pub use archive::{Archive, DirIter, FILE_USER_DATA, File};

// Public re-exports - composition
pub use bases::BaseDirList;
pub use context::Context;
pub use native::NativeBackend;
pub use registry::BackendRegistry;
pub use resolve::MAX_MOUNT_DEPTH;
