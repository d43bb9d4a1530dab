//! Session configuration.

use crate::ids::AuthorId;

/// Default capacity of the undo and redo stacks.
pub const DEFAULT_UNDO_LIMIT: usize = 100;

/// Configuration of a [`crate::DocumentSession`].
///
/// ```rust
/// use document_core::SessionConfig;
///
/// let config = SessionConfig::default().with_undo_limit(20).with_track_changes(true);
/// assert_eq!(config.undo_limit, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Capacity of each of the undo and redo stacks. Older entries are dropped silently.
    pub undo_limit: usize,
    /// Record insertions/deletions as tracked changes instead of applying deletions.
    pub track_changes: bool,
    /// Author stamped on tracked changes.
    pub author: AuthorId,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
            track_changes: false,
            author: AuthorId::default(),
        }
    }
}

impl SessionConfig {
    /// Set the undo/redo stack capacity.
    pub fn with_undo_limit(mut self, limit: usize) -> Self {
        self.undo_limit = limit;
        self
    }

    /// Enable or disable change tracking.
    pub fn with_track_changes(mut self, enabled: bool) -> Self {
        self.track_changes = enabled;
        self
    }

    /// Set the author used for tracked changes.
    pub fn with_author(mut self, author: AuthorId) -> Self {
        self.author = author;
        self
    }
}
