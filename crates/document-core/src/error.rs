//! Error types.
//!
//! Every precondition on list positions and document positions is checked and reported as a
//! [`DocumentError`] instead of corrupting state. "Nothing to undo" is not an error; see
//! [`crate::DocumentSession::undo`].

use crate::ids::{ListId, ParagraphId};
use crate::search::SearchError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by the document model.
pub enum DocumentError {
    #[error("position belongs to {found}, not {expected}")]
    /// A list position was used with a list that does not own it.
    WrongContainer {
        /// The list the operation was invoked on.
        expected: ListId,
        /// The list the position was taken from.
        found: ListId,
    },

    #[error("position refers to a paragraph that no longer exists")]
    /// A position survived a mutation that removed its paragraph (or its list).
    StaleIterator,

    #[error("cannot dereference an end position")]
    /// An `end()` position was dereferenced.
    EndDereference,

    #[error("paragraph index {index} out of range (len {len})")]
    /// Paragraph index past the end of a list.
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current list length.
        len: usize,
    },

    #[error("character offset {pos} out of range (paragraph size {size})")]
    /// Character offset past the end of a paragraph.
    PositionOutOfRange {
        /// Requested offset.
        pos: usize,
        /// Paragraph size in characters.
        size: usize,
    },

    #[error("no inset at character offset {pos}")]
    /// Descent requested at a position that does not hold an inset.
    NotAnInset {
        /// Character offset.
        pos: usize,
    },

    #[error("inset has no cell {cell} ({cells} cells)")]
    /// Descent requested into a cell the inset does not have.
    NoSuchCell {
        /// Requested cell.
        cell: usize,
        /// Number of cells of the inset.
        cells: usize,
    },

    #[error("paragraph {0} is already in this list")]
    /// Inserting would place the same paragraph id twice in one list.
    DuplicateParagraph(ParagraphId),

    #[error("invalid range: {first}..{last}")]
    /// A range whose start lies after its end.
    InvalidRange {
        /// Resolved start index.
        first: usize,
        /// Resolved end index.
        last: usize,
    },

    #[error("undo entry {first}..len-{after} does not fit a document of {len} paragraphs")]
    /// An undo/redo entry no longer fits the document it was recorded for.
    UndoRangeMismatch {
        /// Offset of the first captured paragraph from the list begin.
        first: usize,
        /// Number of paragraphs after the captured range.
        after: usize,
        /// Current top-level paragraph count.
        len: usize,
    },

    #[error("document has no paragraphs")]
    /// Cursor operation on an empty document.
    EmptyDocument,

    #[error(transparent)]
    /// Search failed.
    Search(#[from] SearchError),
}
