#![warn(missing_docs)]
//! Document Core - Paragraph Model, Position Iteration and Undo for Structured Documents
//!
//! # Overview
//!
//! `document-core` is the headless core of a word processor. A document is an ordered list of
//! paragraphs; a paragraph may embed insets (footnotes, notes, tables, ...) that own nested
//! paragraph lists of their own. The crate provides the container, a cursor that walks every
//! position of the recursive structure in document order, and paragraph-snapshot undo/redo.
//! Rendering, file formats and command dispatch live elsewhere.
//!
//! # Core Features
//!
//! - **Stable identities**: paragraphs, insets and lists carry process-unique ids
//! - **Checked positions**: list positions are validated against their list and re-derived
//!   by paragraph id after structural mutation
//! - **Recursive traversal**: forward and backward stepping through nested texts
//! - **Coarse undo**: snapshots of outermost paragraphs, coalescing, bounded history
//! - **Change tracking**: per-character insert/delete records with accept and reject
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  DocumentSession (cursor, editing commands) │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  UndoState / LimitedStack                   │  ← History
//! ├─────────────────────────────────────────────┤
//! │  PosIterator / ParIterator / search         │  ← Traversal
//! ├─────────────────────────────────────────────┤
//! │  ParagraphList (ids, generation)            │  ← Container
//! ├─────────────────────────────────────────────┤
//! │  Paragraph / Inset (Rope-backed text)       │  ← Content
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use document_core::{DocumentSession, Inset, InsetKind, ParagraphList, SessionConfig};
//!
//! let doc = ParagraphList::from_texts(&["Intro", "Body text", "Conclusion"]);
//! let mut session = DocumentSession::new(doc, SessionConfig::default());
//!
//! session.set_cursor_at(1, 4).unwrap();
//! session.insert_inset(Inset::new(InsetKind::Footnote)).unwrap();
//! assert!(session.move_backward()); // into the footnote
//! session.insert_text("see appendix").unwrap();
//! assert_eq!(session.cursor().depth(), 2);
//!
//! assert!(session.undo().unwrap());
//! assert!(session.undo().unwrap());
//! assert_eq!(session.paragraphs().at(1).unwrap().text(), "Body text");
//! ```
//!
//! # Module Description
//!
//! - [`paragraph_list`] - Ordered paragraph container and checked list positions
//! - [`pos_iterator`] - Document positions and the recursive position iterator
//! - [`par_iterator`] - Pre-order walk over all paragraphs
//! - [`undo`] - Undo entries, coalescing and restoration
//! - [`session`] - Editing session owning document, cursor and history
//! - [`search`] - Plain and regex search across nested texts
//! - [`text_cache`] - Layout cache keyed by document and width

pub mod change;
pub mod config;
pub mod error;
pub mod ids;
pub mod inset;
pub mod limited_stack;
pub mod par_iterator;
pub mod paragraph;
pub mod paragraph_list;
pub mod pos_iterator;
pub mod search;
pub mod session;
pub mod text_cache;
pub mod undo;

pub use change::{Change, ChangeKind};
pub use config::{DEFAULT_UNDO_LIMIT, SessionConfig};
pub use error::{DocumentError, Result};
pub use ids::{AuthorId, DocumentId, InsetId, ListId, ParagraphId};
pub use inset::{Inset, InsetKind};
pub use limited_stack::LimitedStack;
pub use par_iterator::{ParIterator, ParVisit};
pub use paragraph::{
    Alignment, CopyIds, InsetEntry, META_INSET, Paragraph, ParagraphParams, Spacing,
};
pub use paragraph_list::{ListPos, ParagraphList};
pub use pos_iterator::{DocPosition, Frame, PosIterator, Positions};
pub use search::{DocMatch, SearchError, SearchOptions};
pub use session::{DocumentSession, RebreakRequest};
pub use text_cache::TextCache;
pub use undo::{
    Applied, Boundary, CursorAnchor, Direction, RecordOutcome, UndoEntry, UndoKind, UndoState,
};
