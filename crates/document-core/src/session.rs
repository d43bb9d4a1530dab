//! Editing session: one document, its cursor and its undo history.
//!
//! # Overview
//!
//! [`DocumentSession`] is the context every editing command runs in. Commands follow one
//! protocol:
//!
//! 1. re-attach the cursor to the current document;
//! 2. record undo for the top-level paragraphs about to change;
//! 3. mutate through [`ParagraphList`] / [`Paragraph`];
//! 4. move the cursor and publish a [`RebreakRequest`] for the layout side.
//!
//! Cursor moves finish the undo boundary, so typing, moving and typing again yields two
//! undo steps.
//!
//! # Example
//!
//! ```rust
//! use document_core::{DocumentSession, ParagraphList, SessionConfig};
//!
//! let mut session = DocumentSession::new(ParagraphList::new(), SessionConfig::default());
//! session.insert_text("Hello").unwrap();
//! session.break_paragraph().unwrap();
//! session.insert_text("World").unwrap();
//! assert_eq!(session.paragraphs().texts(), ["Hello", "World"]);
//!
//! assert!(session.undo().unwrap());
//! assert!(session.undo().unwrap());
//! assert_eq!(session.paragraphs().texts(), ["Hello"]);
//! assert!(session.redo().unwrap());
//! assert_eq!(session.paragraphs().texts(), ["Hello", ""]);
//! ```

use crate::change::{Change, ChangeKind};
use crate::config::SessionConfig;
use crate::error::{DocumentError, Result};
use crate::ids::{DocumentId, InsetId, ParagraphId};
use crate::inset::Inset;
use crate::par_iterator::ParIterator;
use crate::paragraph::Paragraph;
use crate::paragraph_list::ParagraphList;
use crate::pos_iterator::{DocPosition, Frame, PosIterator};
use crate::undo::{CursorAnchor, Direction, RecordOutcome, UndoKind, UndoState};
use std::ops::Range;
use tracing::{debug, trace, warn};

/// Paragraphs whose line breaks must be recomputed after an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebreakRequest {
    /// Inset holding the cursor when the edit happened; `None` for the top-level text.
    pub inset: Option<InsetId>,
    /// Affected top-level paragraph indices.
    pub paragraphs: Range<usize>,
}

/// A document being edited.
#[derive(Debug)]
pub struct DocumentSession {
    id: DocumentId,
    config: SessionConfig,
    paragraphs: ParagraphList,
    /// Never rests at the document end while the document has paragraphs.
    cursor: DocPosition,
    undo: UndoState,
    rebreak: Option<RebreakRequest>,
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new(ParagraphList::new(), SessionConfig::default())
    }
}

impl DocumentSession {
    /// Open a session on `paragraphs`. An empty list gets one empty paragraph.
    pub fn new(paragraphs: ParagraphList, config: SessionConfig) -> Self {
        let paragraphs = if paragraphs.is_empty() {
            ParagraphList::with_empty_paragraph()
        } else {
            paragraphs
        };
        let cursor = PosIterator::begin(&paragraphs).to_position();
        let id = DocumentId::next();
        debug!(document = %id, paragraphs = paragraphs.len(), "session opened");
        Self {
            id,
            undo: UndoState::new(config.undo_limit),
            config,
            paragraphs,
            cursor,
            rebreak: None,
        }
    }

    /// Identity of this document.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Top-level paragraphs.
    pub fn paragraphs(&self) -> &ParagraphList {
        &self.paragraphs
    }

    /// Mutable top-level paragraphs.
    ///
    /// Nothing is recorded for undo; callers that want undo record it first with
    /// [`DocumentSession::record_undo_pars`]. The cursor is re-validated lazily.
    pub fn paragraphs_mut(&mut self) -> &mut ParagraphList {
        &mut self.paragraphs
    }

    /// First position of the document.
    pub fn begin(&self) -> PosIterator<'_> {
        PosIterator::begin(&self.paragraphs)
    }

    /// The document end.
    pub fn end(&self) -> PosIterator<'_> {
        PosIterator::end(&self.paragraphs)
    }

    /// Cursor as stored.
    pub fn cursor(&self) -> &DocPosition {
        &self.cursor
    }

    /// Cursor attached to the current document, clamped if its path no longer exists.
    pub fn cursor_iter(&self) -> PosIterator<'_> {
        let mut it = match self.cursor.attach(&self.paragraphs) {
            Ok(it) => it,
            Err(err) => {
                trace!(document = %self.id, %err, "cursor clamped");
                PosIterator::from_frames_clamped(&self.paragraphs, &self.cursor.frames())
            }
        };
        if it.at_end() {
            it.step_backward();
        }
        it
    }

    /// Move the cursor to `pos`. The document end is rejected.
    pub fn set_cursor(&mut self, pos: &DocPosition) -> Result<()> {
        let next = {
            let it = pos.attach(&self.paragraphs)?;
            if it.at_end() {
                return Err(DocumentError::EndDereference);
            }
            it.to_position()
        };
        self.cursor = next;
        self.undo.finish();
        Ok(())
    }

    /// Move the cursor to offset `pos` of top-level paragraph `par`.
    pub fn set_cursor_at(&mut self, par: usize, pos: usize) -> Result<()> {
        let next = PosIterator::at(&self.paragraphs, par, pos)?.to_position();
        self.set_cursor(&next)
    }

    /// Step the cursor forward. Returns `false` at the last position.
    pub fn move_forward(&mut self) -> bool {
        let next = {
            let mut it = self.cursor_iter();
            if !it.step_forward() || it.at_end() {
                return false;
            }
            it.to_position()
        };
        self.cursor = next;
        self.undo.finish();
        true
    }

    /// Step the cursor backward. Returns `false` at the first position.
    pub fn move_backward(&mut self) -> bool {
        let next = {
            let mut it = self.cursor_iter();
            if !it.step_backward() {
                return false;
            }
            it.to_position()
        };
        self.cursor = next;
        self.undo.finish();
        true
    }

    /// Record undo for the top-level paragraphs containing `first` and `last`.
    pub fn record_undo(
        &mut self,
        kind: UndoKind,
        first: &DocPosition,
        last: &DocPosition,
    ) -> Result<RecordOutcome> {
        let first = self.outermost_par(first)?;
        let last = self.outermost_par(last)?;
        self.record_undo_pars(kind, first, last)
    }

    /// Record undo for top-level paragraphs `[first, last]`.
    pub fn record_undo_pars(
        &mut self,
        kind: UndoKind,
        first: usize,
        last: usize,
    ) -> Result<RecordOutcome> {
        let cursor = self.cursor_anchor();
        self.undo.record(kind, &self.paragraphs, first, last, cursor)
    }

    /// Mark an undo boundary.
    pub fn finish_undo(&mut self) {
        self.undo.finish();
    }

    /// Ignore undo records until [`DocumentSession::unfreeze_undo`].
    pub fn freeze_undo(&mut self) {
        self.undo.freeze();
    }

    /// Undo one [`DocumentSession::freeze_undo`].
    pub fn unfreeze_undo(&mut self) {
        self.undo.unfreeze();
    }

    /// Drop the undo and redo history.
    pub fn clear_undo(&mut self) {
        self.undo.clear();
    }

    /// Undo the last step. Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        self.apply(Direction::Undo)
    }

    /// Redo the last undone step. Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        self.apply(Direction::Redo)
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Number of undo steps.
    pub fn undo_depth(&self) -> usize {
        self.undo.undo_depth()
    }

    /// Number of redo steps.
    pub fn redo_depth(&self) -> usize {
        self.undo.redo_depth()
    }

    /// Undo history.
    pub fn undo_state(&self) -> &UndoState {
        &self.undo
    }

    /// Take the pending layout request, if any.
    pub fn take_rebreak_request(&mut self) -> Option<RebreakRequest> {
        self.rebreak.take()
    }

    /// Position at the start of the paragraph with `id`, at any depth.
    pub fn find_paragraph(&self, id: ParagraphId) -> Option<DocPosition> {
        let visit = ParIterator::new(&self.paragraphs).find(|visit| visit.paragraph.id() == id)?;
        PosIterator::from_frames(&self.paragraphs, &visit.frames)
            .ok()
            .map(|it| it.to_position())
    }

    /// Position of the inset with `id`, at any depth.
    pub fn find_inset(&self, id: InsetId) -> Option<DocPosition> {
        ParIterator::new(&self.paragraphs).find_map(|visit| {
            let entry = visit
                .paragraph
                .insets()
                .iter()
                .find(|entry| entry.inset.id() == id)?;
            let mut frames = visit.frames;
            let last = frames.last_mut()?;
            last.pos = entry.pos;
            PosIterator::from_frames(&self.paragraphs, &frames)
                .ok()
                .map(|it| it.to_position())
        })
    }

    /// Insert `text` at the cursor and move the cursor after it.
    pub fn insert_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.sync_cursor()?;
        let outer = self.cursor.outermost().pit;
        self.record_undo_pars(UndoKind::Insert, outer, outer)?;

        let change = self.insert_change();
        let top = self.cursor.top();
        let count = self
            .cursor
            .text_mut(&mut self.paragraphs)?
            .at_mut(top.pit)?
            .insert_str(top.pos, text, change)?;
        self.cursor.set_top_pos(top.pos + count);
        self.request_rebreak(outer..outer + 1);
        Ok(())
    }

    /// Insert `inset` at the cursor and move the cursor after it.
    pub fn insert_inset(&mut self, inset: Inset) -> Result<()> {
        self.sync_cursor()?;
        let outer = self.cursor.outermost().pit;
        self.record_undo_pars(UndoKind::Atomic, outer, outer)?;

        let change = self.insert_change();
        let top = self.cursor.top();
        self.cursor
            .text_mut(&mut self.paragraphs)?
            .at_mut(top.pit)?
            .insert_inset(top.pos, inset, change)?;
        self.cursor.set_top_pos(top.pos + 1);
        self.request_rebreak(outer..outer + 1);
        Ok(())
    }

    /// Split the paragraph at the cursor; the cursor moves to the start of the new one.
    pub fn break_paragraph(&mut self) -> Result<()> {
        self.sync_cursor()?;
        let outer = self.cursor.outermost().pit;
        self.record_undo_pars(UndoKind::Atomic, outer, outer)?;

        let top = self.cursor.top();
        let list = self.cursor.text_mut(&mut self.paragraphs)?;
        let tail = list.at_mut(top.pit)?.split_off(top.pos)?;
        let at = list.pos_at(top.pit + 1)?;
        list.insert(at, tail)?;

        self.move_top_to(Frame::new(top.pit + 1, 0))?;
        let end = if self.cursor.depth() == 1 {
            outer + 2
        } else {
            outer + 1
        };
        self.request_rebreak(outer..end);
        Ok(())
    }

    /// Delete the character before the cursor, or merge with the previous paragraph at a
    /// paragraph start. Returns `Ok(false)` at the start of a text.
    ///
    /// With change tracking on, characters not inserted under tracking are marked deleted
    /// instead of being removed.
    pub fn delete_backward(&mut self) -> Result<bool> {
        self.sync_cursor()?;
        let top = self.cursor.top();
        let outer = self.cursor.outermost().pit;
        if top.pos > 0 {
            self.record_undo_pars(UndoKind::Delete, outer, outer)?;
            self.delete_char(top.pit, top.pos - 1)?;
            self.cursor.set_top_pos(top.pos - 1);
            self.request_rebreak(outer..outer + 1);
            return Ok(true);
        }
        if top.pit == 0 {
            return Ok(false);
        }
        let first = if self.cursor.depth() == 1 {
            outer - 1
        } else {
            outer
        };
        self.record_undo_pars(UndoKind::Atomic, first, outer)?;
        let join = self.merge_into_previous(top.pit)?;
        self.move_top_to(Frame::new(top.pit - 1, join))?;
        self.request_rebreak(first..first + 1);
        Ok(true)
    }

    /// Delete the character after the cursor, or merge the next paragraph into this one at a
    /// paragraph end. Returns `Ok(false)` at the end of a text.
    pub fn delete_forward(&mut self) -> Result<bool> {
        self.sync_cursor()?;
        let top = self.cursor.top();
        let outer = self.cursor.outermost().pit;
        let (size, len) = {
            let it = self.cursor_iter();
            (it.paragraph()?.size(), it.text().len())
        };
        if top.pos < size {
            self.record_undo_pars(UndoKind::Delete, outer, outer)?;
            if !self.delete_char(top.pit, top.pos)? {
                // Marked deleted: step over it.
                self.cursor.set_top_pos(top.pos + 1);
            }
            self.request_rebreak(outer..outer + 1);
            return Ok(true);
        }
        if top.pit + 1 >= len {
            return Ok(false);
        }
        let last = if self.cursor.depth() == 1 {
            outer + 1
        } else {
            outer
        };
        self.record_undo_pars(UndoKind::Atomic, outer, last)?;
        self.merge_into_previous(top.pit + 1)?;
        self.move_top_to(top)?;
        self.request_rebreak(outer..outer + 1);
        Ok(true)
    }

    /// Insert `par` at top-level index `index`, recording undo for its neighbour.
    pub fn insert_paragraph(&mut self, index: usize, par: Paragraph) -> Result<()> {
        let len = self.paragraphs.len();
        if index > len {
            return Err(DocumentError::IndexOutOfRange { index, len });
        }
        if self.paragraphs.contains(par.id()) {
            return Err(DocumentError::DuplicateParagraph(par.id()));
        }
        if len > 0 {
            let anchor = index.saturating_sub(1);
            self.record_undo_pars(UndoKind::Atomic, anchor, anchor)?;
        }
        let at = self.paragraphs.pos_at(index)?;
        self.paragraphs.insert(at, par)?;
        self.sync_cursor()?;
        self.request_rebreak(index..index + 1);
        Ok(())
    }

    /// Remove top-level paragraph `index`. The last paragraph cannot be removed.
    pub fn erase_paragraph(&mut self, index: usize) -> Result<Paragraph> {
        let len = self.paragraphs.len();
        if index >= len {
            return Err(DocumentError::IndexOutOfRange { index, len });
        }
        if len == 1 {
            return Err(DocumentError::EmptyDocument);
        }
        self.record_undo_pars(UndoKind::Atomic, index, index)?;
        let cursor_par = self.cursor_iter().outermost().pit;
        let removed = self.paragraphs.remove(index)?;
        if cursor_par == index {
            let pit = index.min(self.paragraphs.len() - 1);
            self.cursor = PosIterator::at(&self.paragraphs, pit, 0)?.to_position();
        } else {
            self.sync_cursor()?;
        }
        let at = index.min(self.paragraphs.len() - 1);
        self.request_rebreak(at..at + 1);
        Ok(removed)
    }

    /// Set the layout of the paragraph holding the cursor.
    pub fn set_layout(&mut self, layout: &str) -> Result<()> {
        self.sync_cursor()?;
        let outer = self.cursor.outermost().pit;
        self.record_undo_pars(UndoKind::Atomic, outer, outer)?;
        let top = self.cursor.top();
        self.cursor
            .text_mut(&mut self.paragraphs)?
            .at_mut(top.pit)?
            .params_mut()
            .layout = layout.to_string();
        self.request_rebreak(outer..outer + 1);
        Ok(())
    }

    /// Accept every tracked change in the document.
    pub fn accept_all_changes(&mut self) -> Result<()> {
        self.resolve_all_changes(Paragraph::accept_changes)
    }

    /// Reject every tracked change in the document.
    pub fn reject_all_changes(&mut self) -> Result<()> {
        self.resolve_all_changes(Paragraph::reject_changes)
    }

    fn resolve_all_changes(&mut self, resolve: fn(&mut Paragraph)) -> Result<()> {
        if !self.paragraphs.iter().any(Paragraph::has_changes) {
            return Ok(());
        }
        let last = self.paragraphs.len() - 1;
        self.record_undo_pars(UndoKind::Atomic, 0, last)?;
        self.paragraphs.iter_mut().for_each(resolve);
        self.sync_cursor()?;
        self.request_rebreak(0..last + 1);
        Ok(())
    }

    fn apply(&mut self, direction: Direction) -> Result<bool> {
        let current = self.cursor_anchor();
        let Some(applied) = self.undo.apply(direction, &mut self.paragraphs, current)? else {
            return Ok(false);
        };
        self.relocate_cursor(applied.cursor, applied.paragraphs.start);
        self.rebreak = Some(RebreakRequest {
            inset: applied.cursor.inset,
            paragraphs: applied.paragraphs,
        });
        Ok(true)
    }

    /// Put the cursor back where `anchor` says, clamped to the current document.
    fn relocate_cursor(&mut self, anchor: CursorAnchor, fallback_par: usize) {
        let frames = match anchor.inset {
            None => vec![Frame::new(anchor.par, anchor.pos)],
            Some(inset) => match self.find_inset(inset) {
                Some(at) => {
                    let mut frames = at.frames();
                    if let Some(last) = frames.last_mut() {
                        last.index = anchor.cell + 1;
                    }
                    frames.push(Frame::new(anchor.par, anchor.pos));
                    frames
                }
                None => {
                    warn!(
                        document = %self.id,
                        %inset,
                        "inset of the saved cursor is gone, cursor moved to the top level"
                    );
                    vec![Frame::new(fallback_par, 0)]
                }
            },
        };
        self.cursor = PosIterator::from_frames_clamped(&self.paragraphs, &frames).to_position();
    }

    fn cursor_anchor(&self) -> CursorAnchor {
        let it = self.cursor_iter();
        let top = it.top();
        CursorAnchor {
            inset: it.inset().map(Inset::id),
            cell: it.cell().unwrap_or(0),
            par: top.pit,
            pos: top.pos,
        }
    }

    fn outermost_par(&self, pos: &DocPosition) -> Result<usize> {
        let pit = pos.attach(&self.paragraphs)?.outermost().pit;
        Ok(pit.min(self.paragraphs.len().saturating_sub(1)))
    }

    /// Re-attach the stored cursor so its frames match the current document.
    fn sync_cursor(&mut self) -> Result<()> {
        if self.paragraphs.is_empty() {
            return Err(DocumentError::EmptyDocument);
        }
        self.cursor = self.cursor_iter().to_position();
        Ok(())
    }

    /// Replace the innermost frame of the cursor, keeping its ancestors.
    fn move_top_to(&mut self, top: Frame) -> Result<()> {
        let mut frames = self.cursor.frames();
        if let Some(last) = frames.last_mut() {
            *last = top;
        }
        self.cursor = PosIterator::from_frames(&self.paragraphs, &frames)?.to_position();
        Ok(())
    }

    fn insert_change(&self) -> Change {
        if self.config.track_changes {
            Change::inserted(self.config.author)
        } else {
            Change::UNCHANGED
        }
    }

    /// Delete or mark deleted the character at `pos` of paragraph `pit` of the cursor's
    /// text. Returns `true` if the character was removed.
    fn delete_char(&mut self, pit: usize, pos: usize) -> Result<bool> {
        let track = self.config.track_changes;
        let author = self.config.author;
        let par = self.cursor.text_mut(&mut self.paragraphs)?.at_mut(pit)?;
        let kind = par.change_at(pos).map(|change| change.kind);
        if !track || kind == Some(ChangeKind::Inserted) {
            par.erase(pos)?;
            return Ok(true);
        }
        if kind != Some(ChangeKind::Deleted) {
            par.set_change(pos..pos + 1, Change::deleted(author))?;
        }
        Ok(false)
    }

    /// Append paragraph `pit` of the cursor's text to paragraph `pit - 1`. Returns the
    /// offset where the two joined.
    fn merge_into_previous(&mut self, pit: usize) -> Result<usize> {
        let list = self.cursor.text_mut(&mut self.paragraphs)?;
        let removed = list.remove(pit)?;
        let prev = list.at_mut(pit - 1)?;
        let join = prev.size();
        prev.append(removed);
        Ok(join)
    }

    fn request_rebreak(&mut self, paragraphs: Range<usize>) {
        let inset = self.cursor_iter().inset().map(Inset::id);
        self.rebreak = Some(RebreakRequest { inset, paragraphs });
    }
}
