//! Cache invalidation signal
//!
//! Mutating operations tell the hosting framework that a rendered route is
//! stale. The call is fire-and-forget: it returns nothing and never fails the
//! operation that triggered it.

use std::sync::Mutex;

/// Receives "this path is stale" notifications.
pub trait Revalidate: Send + Sync {
    fn revalidate(&self, path: &str);
}

/// Logs invalidations at debug level and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRevalidator;

impl Revalidate for TracingRevalidator {
    fn revalidate(&self, path: &str) {
        tracing::debug!(path, "revalidate");
    }
}

/// Discards every invalidation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRevalidator;

impl Revalidate for NoopRevalidator {
    fn revalidate(&self, _path: &str) {}
}

/// Collects invalidated paths in call order.
#[derive(Debug, Default)]
pub struct RecordingRevalidator {
    paths: Mutex<Vec<String>>,
}

impl RecordingRevalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths recorded so far.
    pub fn paths(&self) -> Vec<String> {
        self.paths
            .lock()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }

    /// Remove and return the recorded paths.
    pub fn drain(&self) -> Vec<String> {
        self.paths
            .lock()
            .map(|mut paths| std::mem::take(&mut *paths))
            .unwrap_or_default()
    }
}

impl Revalidate for RecordingRevalidator {
    fn revalidate(&self, path: &str) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path.to_owned());
        }
    }
}

/// Forward to `revalidator` unless `path` is blank.
pub(crate) fn signal(revalidator: &dyn Revalidate, path: &str) {
    if path.trim().is_empty() {
        tracing::trace!("skipping revalidation of blank path");
        return;
    }
    revalidator.revalidate(path);
}
