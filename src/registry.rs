//! Backend registry: the native table plus the ordered format tables.

use std::sync::Arc;

use tracing::trace;

use crate::backend::Backend;

/// Ordered set of format backends around one fixed native backend.
///
/// The native table is set at construction and never replaced; it is used
/// only to open the root segment of a path (a base directory or `/`), never
/// probed for nested mounts. Format backends are probed in registration
/// order and the first accepting probe wins, so registration order is
/// format priority. Registration is not de-duplicated: registering the same
/// format twice probes it twice, wasting probe calls but not correctness.
pub struct BackendRegistry {
    native: Arc<dyn Backend>,
    formats: Vec<Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// A registry with the given native table and no format backends.
    pub fn new(native: Arc<dyn Backend>) -> Self {
        Self {
            native,
            formats: Vec::new(),
        }
    }

    /// Append a format backend at the lowest probe priority.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.formats.push(backend);
    }

    /// The fixed native table.
    pub fn native(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.native)
    }

    /// Number of registered format backends.
    pub fn count(&self) -> usize {
        self.formats.len()
    }

    /// First registered format backend whose probe accepts `path`.
    pub(crate) fn find(&self, path: &str) -> Option<Arc<dyn Backend>> {
        for backend in &self.formats {
            if backend.probe(path) {
                trace!(backend = backend.name(), path, "probe accepted");
                return Some(Arc::clone(backend));
            }
            trace!(backend = backend.name(), path, "probe rejected");
        }
        None
    }
}
