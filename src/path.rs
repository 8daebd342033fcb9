//! Fixed-capacity path strings.
//!
//! The engine stores every path in a fixed [`MAX_PATH`]-byte inline buffer,
//! mirroring the original layered-storage design: paths are truncated at the
//! bound, never reallocated. Truncation is a documented constraint of the
//! engine, not a failure — see [`BoundedPath::truncated`].

use std::fmt;

/// Maximum path length in bytes, including the terminator slot.
///
/// A [`BoundedPath`] therefore holds at most `MAX_PATH - 1` bytes of content.
/// Longer input is truncated at a UTF-8 character boundary.
pub const MAX_PATH: usize = 1024;

/// A path string stored inline in a fixed `MAX_PATH`-byte buffer.
///
/// Construction and joins never fail and never allocate; content beyond the
/// capacity is dropped and the [`truncated`](Self::truncated) flag is set.
/// Equality and display operate on the stored (possibly truncated) content.
///
/// # Examples
///
/// ```rust
/// use nestfs::BoundedPath;
///
/// let base = BoundedPath::from("/data");
/// let full = base.join("textures/hud.png");
/// assert_eq!(full.as_str(), "/data/textures/hud.png");
/// assert!(!full.truncated());
/// ```
#[derive(Clone)]
pub struct BoundedPath {
    buf: [u8; MAX_PATH],
    len: usize,
    truncated: bool,
}

impl BoundedPath {
    /// An empty path.
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_PATH],
            len: 0,
            truncated: false,
        }
    }

    /// The stored content as a string slice.
    pub fn as_str(&self) -> &str {
        // Only whole UTF-8 characters are ever copied in.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    /// Length of the stored content in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no content is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if any input byte was dropped to fit the buffer.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Append a path segment, inserting a `/` separator when needed.
    ///
    /// Appending an empty segment is a no-op. Content that does not fit is
    /// dropped and the truncation flag is set.
    pub fn push_segment(&mut self, segment: &str) {
        if segment.is_empty() {
            return;
        }
        if self.len > 0
            && self.buf[self.len - 1] != b'/'
            && !segment.starts_with('/')
        {
            self.push_bytes("/");
        }
        self.push_bytes(segment);
    }

    /// A copy of this path with `segment` appended.
    pub fn join(&self, segment: &str) -> Self {
        let mut out = self.clone();
        out.push_segment(segment);
        out
    }

    fn push_bytes(&mut self, s: &str) {
        let room = MAX_PATH - 1 - self.len;
        if s.len() <= room {
            self.buf[self.len..self.len + s.len()].copy_from_slice(s.as_bytes());
            self.len += s.len();
        } else {
            let mut end = room;
            while end > 0 && !s.is_char_boundary(end) {
                end -= 1;
            }
            self.buf[self.len..self.len + end].copy_from_slice(s[..end].as_bytes());
            self.len += end;
            self.truncated = true;
        }
    }
}

impl Default for BoundedPath {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for BoundedPath {
    fn from(s: &str) -> Self {
        let mut out = Self::new();
        out.push_bytes(s);
        out
    }
}

impl fmt::Display for BoundedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for BoundedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl PartialEq for BoundedPath {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for BoundedPath {}

impl PartialEq<&str> for BoundedPath {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for BoundedPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for BoundedPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize<'de>>::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Iterator over the non-empty `/`-separated segments of a path, as byte
/// ranges into the original string.
///
/// Yielding ranges (rather than slices) lets the resolution engine recover
/// the walked prefix (`&path[..end]`) and the remaining tail
/// (`&path[start..]`) without re-splitting.
pub(crate) struct Segments<'a> {
    path: &'a str,
    pos: usize,
}

impl<'a> Segments<'a> {
    pub(crate) fn new(path: &'a str) -> Self {
        Self { path, pos: 0 }
    }
}

impl Iterator for Segments<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        let bytes = self.path.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] == b'/' {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }
        let start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos] != b'/' {
            self.pos += 1;
        }
        Some((start, self.pos))
    }
}
