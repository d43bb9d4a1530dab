//! Per-character change tracking records.

use crate::ids::AuthorId;

/// What happened to a character under change tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Part of the accepted text.
    #[default]
    Unchanged,
    /// Inserted while tracking; removed by a reject.
    Inserted,
    /// Deleted while tracking; removed by an accept.
    Deleted,
}

/// Change record attached to one character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Change {
    /// Kind of change.
    pub kind: ChangeKind,
    /// Who made it. Meaningless for [`ChangeKind::Unchanged`].
    pub author: AuthorId,
}

impl Change {
    /// An untracked character.
    pub const UNCHANGED: Self = Self {
        kind: ChangeKind::Unchanged,
        author: AuthorId(0),
    };

    /// A tracked insertion by `author`.
    pub fn inserted(author: AuthorId) -> Self {
        Self {
            kind: ChangeKind::Inserted,
            author,
        }
    }

    /// A tracked deletion by `author`.
    pub fn deleted(author: AuthorId) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            author,
        }
    }

    /// Returns `true` for [`ChangeKind::Unchanged`].
    pub fn is_unchanged(&self) -> bool {
        self.kind == ChangeKind::Unchanged
    }
}
