//! Base directory list: the ordered search roots for relative paths.

use crate::error::VfsError;
use crate::path::BoundedPath;

/// Ordered (priority) list of absolute root paths searched when a caller
/// supplies a relative path.
///
/// Index 0 is the highest priority: the first base directory under which a
/// relative path resolves wins, and later entries are not tried. The list
/// is mutated during the single-threaded setup phase; resolution only
/// reads it.
///
/// Entries longer than [`MAX_PATH`](crate::MAX_PATH)` - 1` bytes are
/// truncated on insert — a documented constraint of the engine, not
/// corrected here.
///
/// # Examples
///
/// ```rust
/// use nestfs::BaseDirList;
///
/// let mut bases = BaseDirList::new();
/// bases.append("/data");
/// bases.insert("/mods", 0).unwrap();
/// assert_eq!(bases.get(0), Some("/mods"));
/// assert_eq!(bases.count(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct BaseDirList {
    entries: Vec<BoundedPath>,
}

impl BaseDirList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `path` at `index`, shifting later entries down in priority.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidIndex`] if `index > count()`. The list is left
    ///   unchanged; the operation never panics.
    pub fn insert(&mut self, path: &str, index: usize) -> Result<(), VfsError> {
        if index > self.entries.len() {
            return Err(VfsError::InvalidIndex {
                index,
                count: self.entries.len(),
            });
        }
        self.entries.insert(index, BoundedPath::from(path));
        Ok(())
    }

    /// Append `path` at the lowest priority.
    pub fn append(&mut self, path: &str) {
        self.entries.push(BoundedPath::from(path));
    }

    /// Remove every entry equal to `path`.
    ///
    /// Comparison is against the stored (possibly truncated) content, so a
    /// path that was truncated on insert is removed by passing the same
    /// over-long path again.
    pub fn remove(&mut self, path: &str) {
        let target = BoundedPath::from(path);
        self.entries.retain(|e| *e != target);
    }

    /// Remove the entry at `index`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidIndex`] if `index >= count()`.
    pub fn remove_at(&mut self, index: usize) -> Result<(), VfsError> {
        if index >= self.entries.len() {
            return Err(VfsError::InvalidIndex {
                index,
                count: self.entries.len(),
            });
        }
        self.entries.remove(index);
        Ok(())
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The entry at `index`, or `None` if out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(BoundedPath::as_str)
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Iterate entries in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(BoundedPath::as_str)
    }
}
