//! Core value types for the nestfs engine.

use std::time::SystemTime;

use crate::path::BoundedPath;

/// Access mode for opening archives and files.
///
/// Plain `WRITE` creates the file if missing and truncates it if present;
/// the `existing` and `append` fields refine that behavior, and
/// `create_dirs` lets `open` create missing parent directories on the way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessMode {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// The target must already exist; never create, never truncate.
    pub existing: bool,
    /// Writes go to the end of the file.
    pub append: bool,
    /// Create missing parent directories when opening for write.
    pub create_dirs: bool,
}

impl AccessMode {
    /// Read-only access.
    pub const READ: Self = Self {
        read: true,
        write: false,
        existing: false,
        append: false,
        create_dirs: false,
    };

    /// Write access with create and truncate.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        existing: false,
        append: false,
        create_dirs: false,
    };

    /// Append mode - writes go to the end, file is created if missing.
    pub const APPEND: Self = Self {
        read: false,
        write: true,
        existing: false,
        append: true,
        create_dirs: false,
    };

    /// Returns `true` if this mode may create a file that does not exist.
    #[inline]
    pub const fn creates(&self) -> bool {
        self.write && !self.existing
    }
}

/// Attribute bitset for a filesystem entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileAttributes {
    /// The entry is a directory.
    pub directory: bool,
    /// The entry cannot be written through its backend.
    pub readonly: bool,
}

impl FileAttributes {
    /// Attributes of a plain writable file.
    pub const FILE: Self = Self {
        directory: false,
        readonly: false,
    };

    /// Attributes of a directory.
    pub const DIRECTORY: Self = Self {
        directory: true,
        readonly: false,
    };
}

/// Metadata for one entry, as reported by a backend's `stat` or iteration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileInfo {
    /// Absolute (verbose) path of the entry, truncated at the
    /// [`MAX_PATH`](crate::MAX_PATH) bound.
    pub path: BoundedPath,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub modified: SystemTime,
    /// Attribute bitset.
    pub attributes: FileAttributes,
}

impl FileInfo {
    /// Returns `true` if this entry is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.attributes.directory
    }

    /// Returns `true` if this entry cannot be written.
    #[inline]
    pub fn readonly(&self) -> bool {
        self.attributes.readonly
    }

    /// The final path segment (the entry's name).
    pub fn name(&self) -> &str {
        let s = self.path.as_str();
        s.rsplit('/').next().unwrap_or(s)
    }
}

impl Default for FileInfo {
    fn default() -> Self {
        Self {
            path: BoundedPath::new(),
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            attributes: FileAttributes::FILE,
        }
    }
}

/// Serde support for SystemTime (when the serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_mode_constants() {
        assert!(AccessMode::READ.read);
        assert!(!AccessMode::READ.write);

        assert!(AccessMode::WRITE.write);
        assert!(!AccessMode::WRITE.existing);
        assert!(AccessMode::WRITE.creates());

        assert!(AccessMode::APPEND.write);
        assert!(AccessMode::APPEND.append);
    }

    #[test]
    fn existing_mode_never_creates() {
        let update = AccessMode {
            existing: true,
            ..AccessMode::WRITE
        };
        assert!(!update.creates());
    }

    #[test]
    fn file_info_is_dir() {
        let info = FileInfo {
            attributes: FileAttributes::DIRECTORY,
            ..Default::default()
        };
        assert!(info.is_dir());
        assert!(!info.readonly());
    }

    #[test]
    fn file_info_name_is_last_segment() {
        let info = FileInfo {
            path: BoundedPath::from("/mods/textures.pak/hud/icon.png"),
            ..Default::default()
        };
        assert_eq!(info.name(), "icon.png");

        let bare = FileInfo {
            path: BoundedPath::from("icon.png"),
            ..Default::default()
        };
        assert_eq!(bare.name(), "icon.png");
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AccessMode>();
        assert_send_sync::<FileAttributes>();
        assert_send_sync::<FileInfo>();
    }
}
