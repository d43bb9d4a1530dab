//! Undo / redo by outermost-paragraph snapshots.
//!
//! # Overview
//!
//! Before a command mutates the document it records the range of top-level paragraphs it is
//! about to touch. [`UndoState::record`] deep-copies that range (keeping every id) together
//! with the cursor, and stores the range as two offsets: `first` counted from the begin of
//! the top-level list and `after` counted from its end. Applying an entry erases
//! `[first, len - after)` from the live document, splices the snapshot back in and pushes
//! the erased paragraphs to the opposite stack, so undo and redo are the same operation.
//!
//! Consecutive non-atomic records of the same kind over the same offsets coalesce into one
//! entry until [`UndoState::finish`] marks a boundary. While frozen, records are ignored.

use crate::error::{DocumentError, Result};
use crate::ids::InsetId;
use crate::limited_stack::LimitedStack;
use crate::paragraph::CopyIds;
use crate::paragraph_list::ParagraphList;
use std::ops::Range;
use tracing::{debug, trace};

/// What kind of edit an entry was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UndoKind {
    /// Never coalesces.
    Atomic,
    /// Text insertion; coalesces with the previous insertion over the same range.
    Insert,
    /// Text deletion; coalesces with the previous deletion over the same range.
    Delete,
}

/// Cursor saved with an undo entry, relative to the text holding it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CursorAnchor {
    /// Inset whose text held the cursor; `None` for the top-level text.
    pub inset: Option<InsetId>,
    /// Cell of that inset.
    pub cell: usize,
    /// Paragraph index in the text holding the cursor.
    pub par: usize,
    /// Character offset in that paragraph.
    pub pos: usize,
}

/// One undo (or redo) step.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    kind: UndoKind,
    first: usize,
    after: usize,
    cursor: CursorAnchor,
    pars: ParagraphList,
}

impl UndoEntry {
    /// Kind of edit.
    pub fn kind(&self) -> UndoKind {
        self.kind
    }

    /// Index of the first captured paragraph.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Number of top-level paragraphs after the captured range.
    pub fn after(&self) -> usize {
        self.after
    }

    /// Cursor to restore.
    pub fn cursor(&self) -> CursorAnchor {
        self.cursor
    }

    /// Captured paragraphs.
    pub fn paragraphs(&self) -> &ParagraphList {
        &self.pars
    }
}

/// Coalescing state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Boundary {
    /// The last record may absorb the next one.
    Open,
    /// The next record starts a new entry.
    #[default]
    Finished,
}

/// Outcome of [`UndoState::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new entry was pushed.
    Pushed,
    /// The record was absorbed by the previous entry.
    Coalesced,
    /// Recording is frozen; nothing happened.
    Frozen,
}

/// Which stack to apply from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Pop from the undo stack, push to the redo stack.
    Undo,
    /// Pop from the redo stack, push to the undo stack.
    Redo,
}

impl Direction {
    fn opposite(self) -> Self {
        match self {
            Direction::Undo => Direction::Redo,
            Direction::Redo => Direction::Undo,
        }
    }
}

/// Result of a successful [`UndoState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Cursor saved with the applied entry.
    pub cursor: CursorAnchor,
    /// Top-level paragraph indices now holding the restored snapshot.
    pub paragraphs: Range<usize>,
}

/// Undo and redo stacks with coalescing and freezing.
#[derive(Debug, Clone)]
pub struct UndoState {
    undo: LimitedStack<UndoEntry>,
    redo: LimitedStack<UndoEntry>,
    boundary: Boundary,
    frozen: usize,
}

impl UndoState {
    /// Empty state whose stacks hold at most `limit` entries each.
    pub fn new(limit: usize) -> Self {
        Self {
            undo: LimitedStack::new(limit),
            redo: LimitedStack::new(limit),
            boundary: Boundary::Finished,
            frozen: 0,
        }
    }

    /// Snapshot top-level paragraphs `[first, last]` (inclusive) of `root` before an edit.
    ///
    /// A reversed range is swapped. Fails with [`DocumentError::IndexOutOfRange`] when the
    /// range does not lie inside `root`.
    pub fn record(
        &mut self,
        kind: UndoKind,
        root: &ParagraphList,
        first: usize,
        last: usize,
        cursor: CursorAnchor,
    ) -> Result<RecordOutcome> {
        if self.is_frozen() {
            trace!(?kind, first, last, "undo record skipped while frozen");
            return Ok(RecordOutcome::Frozen);
        }
        let (first, last) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        if last >= root.len() {
            return Err(DocumentError::IndexOutOfRange {
                index: last,
                len: root.len(),
            });
        }
        let after = root.len() - 1 - last;

        let coalesce = kind != UndoKind::Atomic
            && self.boundary == Boundary::Open
            && self
                .undo
                .top()
                .is_some_and(|top| top.kind == kind && top.first == first && top.after == after);
        if coalesce {
            trace!(?kind, first, after, "undo record coalesced");
            return Ok(RecordOutcome::Coalesced);
        }

        let mut pars = ParagraphList::new();
        pars.assign(
            root,
            root.pos_at(first)?,
            root.pos_at(last + 1)?,
            CopyIds::Preserve,
        )?;
        let entry = UndoEntry {
            kind,
            first,
            after,
            cursor,
            pars,
        };
        if let Some(evicted) = self.undo.push(entry) {
            debug!(
                first = evicted.first,
                after = evicted.after,
                limit = self.undo.limit(),
                "oldest undo entry evicted"
            );
        }
        if !self.redo.is_empty() {
            debug!(depth = self.redo.len(), "redo stack cleared");
            self.redo.clear();
        }
        self.boundary = match kind {
            UndoKind::Atomic => Boundary::Finished,
            UndoKind::Insert | UndoKind::Delete => Boundary::Open,
        };
        debug!(?kind, first, after, depth = self.undo.len(), "undo entry pushed");
        Ok(RecordOutcome::Pushed)
    }

    /// Pop the top entry of `direction`'s stack and restore it into `root`.
    ///
    /// The paragraphs it replaces are pushed to the opposite stack together with `cursor`.
    /// Returns `Ok(None)` when there is nothing to apply. On error the entry stays on its
    /// stack and `root` is untouched.
    pub fn apply(
        &mut self,
        direction: Direction,
        root: &mut ParagraphList,
        cursor: CursorAnchor,
    ) -> Result<Option<Applied>> {
        let Some(entry) = self.stack_mut(direction).pop() else {
            trace!(?direction, "nothing to apply");
            return Ok(None);
        };
        if let Err(err) = check_fits(&entry, root) {
            self.stack_mut(direction).push(entry);
            return Err(err);
        }

        let first = entry.first;
        let end = root.len() - entry.after;
        self.freeze();
        let restored = restore(root, first..end, entry.pars);
        self.unfreeze();
        let erased = restored?;

        let count = root.len() - first - entry.after;
        let opposite = UndoEntry {
            kind: entry.kind,
            first,
            after: entry.after,
            cursor,
            pars: erased,
        };
        if let Some(evicted) = self.stack_mut(direction.opposite()).push(opposite) {
            debug!(
                ?direction,
                first = evicted.first,
                "oldest entry evicted from opposite stack"
            );
        }
        self.boundary = Boundary::Finished;
        debug!(
            ?direction,
            first,
            after = entry.after,
            undo_depth = self.undo.len(),
            redo_depth = self.redo.len(),
            "undo entry applied"
        );
        Ok(Some(Applied {
            cursor: entry.cursor,
            paragraphs: first..first + count,
        }))
    }

    /// Mark an undo boundary: the next record starts a new entry.
    pub fn finish(&mut self) {
        self.boundary = Boundary::Finished;
    }

    /// Ignore records until the matching [`UndoState::unfreeze`]. Nests.
    pub fn freeze(&mut self) {
        self.frozen += 1;
        trace!(level = self.frozen, "undo frozen");
    }

    /// Undo one [`UndoState::freeze`].
    pub fn unfreeze(&mut self) {
        self.frozen = self.frozen.saturating_sub(1);
        trace!(level = self.frozen, "undo unfrozen");
    }

    /// Returns `true` while records are ignored.
    pub fn is_frozen(&self) -> bool {
        self.frozen > 0
    }

    /// Current coalescing state.
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Returns `true` if an undo entry is available.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Returns `true` if a redo entry is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo entries.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo entries.
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Newest undo entry.
    pub fn last_undo(&self) -> Option<&UndoEntry> {
        self.undo.top()
    }

    /// Drop both stacks and reset the boundary.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.boundary = Boundary::Finished;
    }

    /// Change the capacity of both stacks.
    pub fn set_limit(&mut self, limit: usize) {
        self.undo.set_limit(limit);
        self.redo.set_limit(limit);
    }

    fn stack_mut(&mut self, direction: Direction) -> &mut LimitedStack<UndoEntry> {
        match direction {
            Direction::Undo => &mut self.undo,
            Direction::Redo => &mut self.redo,
        }
    }
}

/// Check that `entry` can replace a range of `root` without clobbering or duplicating.
fn check_fits(entry: &UndoEntry, root: &ParagraphList) -> Result<()> {
    let len = root.len();
    if entry.first + entry.after > len {
        return Err(DocumentError::UndoRangeMismatch {
            first: entry.first,
            after: entry.after,
            len,
        });
    }
    let replaced = entry.first..len - entry.after;
    for id in entry.pars.ids() {
        if root.index_of(id).is_some_and(|index| !replaced.contains(&index)) {
            return Err(DocumentError::DuplicateParagraph(id));
        }
    }
    Ok(())
}

/// Swap `range` of `root` for `snapshot`, returning the paragraphs taken out.
fn restore(
    root: &mut ParagraphList,
    range: Range<usize>,
    mut snapshot: ParagraphList,
) -> Result<ParagraphList> {
    let first = range.start;
    let erased = root.drain_range(range)?;
    root.splice(root.pos_at(first)?, &mut snapshot)?;
    Ok(erased)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paragraph::Paragraph;

    fn anchor(par: usize, pos: usize) -> CursorAnchor {
        CursorAnchor {
            par,
            pos,
            ..CursorAnchor::default()
        }
    }

    #[test]
    fn test_record_offsets() {
        let doc = ParagraphList::from_texts(&["a", "b", "c", "d"]);
        let mut undo = UndoState::new(10);
        undo.record(UndoKind::Atomic, &doc, 2, 1, anchor(1, 0))
            .unwrap();
        let entry = undo.last_undo().unwrap();
        assert_eq!(entry.first(), 1);
        assert_eq!(entry.after(), 1);
        assert_eq!(entry.paragraphs().texts(), ["b", "c"]);
        assert_eq!(entry.paragraphs().ids(), doc.ids()[1..3]);
        assert_eq!(undo.boundary(), Boundary::Finished);
    }

    #[test]
    fn test_record_out_of_range() {
        let doc = ParagraphList::from_texts(&["a"]);
        let mut undo = UndoState::new(10);
        assert_eq!(
            undo.record(UndoKind::Insert, &doc, 0, 1, anchor(0, 0)),
            Err(DocumentError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert!(!undo.can_undo());
    }

    #[test]
    fn test_coalescing_and_boundary() {
        let doc = ParagraphList::from_texts(&["a"]);
        let mut undo = UndoState::new(10);
        let record = |undo: &mut UndoState, kind| undo.record(kind, &doc, 0, 0, anchor(0, 0));

        assert_eq!(
            record(&mut undo, UndoKind::Insert),
            Ok(RecordOutcome::Pushed)
        );
        assert_eq!(undo.boundary(), Boundary::Open);
        assert_eq!(
            record(&mut undo, UndoKind::Insert),
            Ok(RecordOutcome::Coalesced)
        );
        assert_eq!(
            record(&mut undo, UndoKind::Delete),
            Ok(RecordOutcome::Pushed)
        );
        undo.finish();
        assert_eq!(
            record(&mut undo, UndoKind::Delete),
            Ok(RecordOutcome::Pushed)
        );
        assert_eq!(
            record(&mut undo, UndoKind::Atomic),
            Ok(RecordOutcome::Pushed)
        );
        assert_eq!(
            record(&mut undo, UndoKind::Atomic),
            Ok(RecordOutcome::Pushed)
        );
        assert_eq!(undo.undo_depth(), 5);
    }

    #[test]
    fn test_frozen_records_nothing() {
        let doc = ParagraphList::from_texts(&["a"]);
        let mut undo = UndoState::new(10);
        undo.freeze();
        undo.freeze();
        undo.unfreeze();
        assert_eq!(
            undo.record(UndoKind::Atomic, &doc, 0, 0, anchor(0, 0)),
            Ok(RecordOutcome::Frozen)
        );
        undo.unfreeze();
        assert!(!undo.is_frozen());
        assert!(!undo.can_undo());
    }

    #[test]
    fn test_apply_round_trip() {
        let mut doc = ParagraphList::from_texts(&["a", "b"]);
        let original = doc.ids();
        let mut undo = UndoState::new(10);
        undo.record(UndoKind::Atomic, &doc, 1, 1, anchor(1, 1))
            .unwrap();
        doc.at_mut(1).unwrap().insert_str(1, "!", Default::default()).unwrap();
        doc.push(Paragraph::from_text("c")).unwrap();

        let applied = undo
            .apply(Direction::Undo, &mut doc, anchor(2, 1))
            .unwrap()
            .unwrap();
        assert_eq!(doc.texts(), ["a", "b"]);
        assert_eq!(doc.ids(), original);
        assert_eq!(applied.cursor, anchor(1, 1));
        assert_eq!(applied.paragraphs, 1..2);
        assert!(undo.can_redo());

        let applied = undo
            .apply(Direction::Redo, &mut doc, anchor(1, 1))
            .unwrap()
            .unwrap();
        assert_eq!(doc.texts(), ["a", "b!", "c"]);
        assert_eq!(applied.cursor, anchor(2, 1));
        assert_eq!(applied.paragraphs, 1..3);
        assert!(undo.apply(Direction::Redo, &mut doc, anchor(0, 0)).unwrap().is_none());
    }

    #[test]
    fn test_apply_mismatch_keeps_entry() {
        let mut doc = ParagraphList::from_texts(&["a", "b", "c"]);
        let mut undo = UndoState::new(10);
        undo.record(UndoKind::Atomic, &doc, 1, 1, anchor(0, 0))
            .unwrap();
        doc.clear();
        assert_eq!(
            undo.apply(Direction::Undo, &mut doc, anchor(0, 0)),
            Err(DocumentError::UndoRangeMismatch {
                first: 1,
                after: 1,
                len: 0
            })
        );
        assert_eq!(undo.undo_depth(), 1);
    }

    #[test]
    fn test_new_record_clears_redo() {
        let mut doc = ParagraphList::from_texts(&["a"]);
        let mut undo = UndoState::new(10);
        undo.record(UndoKind::Atomic, &doc, 0, 0, anchor(0, 0))
            .unwrap();
        undo.apply(Direction::Undo, &mut doc, anchor(0, 0)).unwrap();
        assert_eq!(undo.redo_depth(), 1);
        undo.record(UndoKind::Atomic, &doc, 0, 0, anchor(0, 0))
            .unwrap();
        assert_eq!(undo.redo_depth(), 0);
    }
}
