//! Position iteration over the recursive document tree.
//!
//! # Overview
//!
//! A document position is a stack of [`Frame`]s, outermost first. Each frame names a
//! paragraph (`pit`) and a character offset (`pos`) in one [`ParagraphList`]; `index` records
//! which cell of the inset at `pos` is entered next. The list of frame *k + 1* is always the
//! text of cell `index - 1` of the inset at frame *k*'s `(pit, pos)`.
//!
//! [`PosIterator`] borrows the document, so it can never observe a mutation. To keep a
//! position across mutations, detach it with [`PosIterator::to_position`] and re-attach the
//! resulting [`DocPosition`] later; attaching validates every level by list identity and
//! re-derives paragraph indices from paragraph ids.
//!
//! # Order
//!
//! Every paragraph contributes one position per character plus its end position. When the
//! character at a position is an inset, the positions of its non-empty cells follow it, cell
//! by cell, before the next character. Stepping forward from the last position of the
//! document reaches `end()`; [`PosIterator::step_backward`] visits the same sequence in
//! reverse.
//!
//! ```rust
//! use document_core::{Change, Inset, InsetKind, ParagraphList, PosIterator};
//!
//! let mut doc = ParagraphList::from_texts(&["ab"]);
//! let note = Inset::with_text(InsetKind::Note, ParagraphList::from_texts(&["x"]));
//! doc.at_mut(0).unwrap().insert_inset(1, note, Change::UNCHANGED).unwrap();
//!
//! let mut it = PosIterator::begin(&doc);
//! let mut steps = 0;
//! while it.step_forward() {
//!     steps += 1;
//! }
//! assert!(it.at_end());
//! assert_eq!(steps, doc.position_count());
//! ```

use crate::error::{DocumentError, Result};
use crate::ids::{ListId, ParagraphId};
use crate::inset::Inset;
use crate::paragraph::Paragraph;
use crate::paragraph_list::ParagraphList;
use std::fmt;

/// One level of a document position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Paragraph index in the level's list (`len()` only for the outermost `end()`).
    pub pit: usize,
    /// Character offset in the paragraph.
    pub pos: usize,
    /// One past the inset cell entered last from this frame; 0 when none.
    pub index: usize,
}

impl Frame {
    /// Frame at `(pit, pos)` with no cell entered.
    pub fn new(pit: usize, pos: usize) -> Self {
        Self { pit, pos, index: 0 }
    }
}

#[derive(Clone)]
struct Level<'a> {
    list: &'a ParagraphList,
    frame: Frame,
}

/// Cursor over every position of a document, entering and leaving insets transparently.
#[derive(Clone)]
pub struct PosIterator<'a> {
    /// Never empty: the root level is never popped.
    stack: Vec<Level<'a>>,
}

impl fmt::Debug for PosIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.stack
                    .iter()
                    .map(|level| (level.list.id(), level.frame)),
            )
            .finish()
    }
}

impl PartialEq for PosIterator<'_> {
    /// Same top list and paragraph, and either both at that list's end or at the same offset.
    fn eq(&self, other: &Self) -> bool {
        let a = self.top_level();
        let b = other.top_level();
        a.list.id() == b.list.id()
            && a.frame.pit == b.frame.pit
            && (a.frame.pit >= a.list.len() || a.frame.pos == b.frame.pos)
    }
}

impl<'a> PosIterator<'a> {
    /// First position of the document (`end()` for an empty document).
    pub fn begin(root: &'a ParagraphList) -> Self {
        Self::root(root, Frame::default())
    }

    /// The document end: one past the last paragraph of the outermost list.
    pub fn end(root: &'a ParagraphList) -> Self {
        Self::root(root, Frame::new(root.len(), 0))
    }

    /// Position `pos` of top-level paragraph `pit`.
    pub fn at(root: &'a ParagraphList, pit: usize, pos: usize) -> Result<Self> {
        Self::from_frames(root, &[Frame::new(pit, pos)])
    }

    /// Position described by `frames`, validated level by level.
    pub fn from_frames(root: &'a ParagraphList, frames: &[Frame]) -> Result<Self> {
        let Some((last, ancestors)) = frames.split_last() else {
            return Ok(Self::begin(root));
        };
        let mut stack = Vec::with_capacity(frames.len());
        let mut list = root;
        for frame in ancestors {
            check_frame(list, *frame, false)?;
            stack.push(Level {
                list,
                frame: *frame,
            });
            list = descend(list, *frame)?;
        }
        check_frame(list, *last, stack.is_empty())?;
        stack.push(Level { list, frame: *last });
        Ok(Self { stack })
    }

    /// Position described by `frames`, clamped to the current document.
    ///
    /// Paragraph indices and offsets past the end are pulled back to the last valid value;
    /// a level that no longer leads into an inset cell ends the path there.
    pub fn from_frames_clamped(root: &'a ParagraphList, frames: &[Frame]) -> Self {
        if root.is_empty() {
            return Self::begin(root);
        }
        let mut stack: Vec<Level<'a>> = Vec::with_capacity(frames.len().max(1));
        let mut list = root;
        for (k, wanted) in frames.iter().enumerate() {
            let pit = wanted.pit.min(list.len() - 1);
            let size = list.at(pit).map(Paragraph::size).unwrap_or(0);
            let frame = Frame {
                pit,
                pos: wanted.pos.min(size),
                index: wanted.index,
            };
            let is_last = k + 1 == frames.len();
            let child = if is_last {
                None
            } else {
                descend(list, frame).ok().filter(|text| !text.is_empty())
            };
            match child {
                Some(text) => {
                    stack.push(Level { list, frame });
                    list = text;
                }
                None => {
                    stack.push(Level {
                        list,
                        frame: Frame { index: 0, ..frame },
                    });
                    return Self { stack };
                }
            }
        }
        if stack.is_empty() {
            return Self::begin(root);
        }
        Self { stack }
    }

    fn root(root: &'a ParagraphList, frame: Frame) -> Self {
        Self {
            stack: vec![Level { list: root, frame }],
        }
    }

    /// Step to the next position. Returns `false` (and stays put) at the document end.
    pub fn step_forward(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        // Each pass either returns or pops one nested level. The root level never pops, so
        // the loop runs at most `depth()` times.
        loop {
            let depth = self.stack.len();
            let level = self.top_level_mut();
            let list = level.list;
            let frame = &mut level.frame;
            let Ok(par) = list.at(frame.pit) else {
                return false;
            };

            if frame.pos < par.size() {
                if let Some((cell, text)) = par
                    .inset_at(frame.pos)
                    .and_then(|inset| next_cell(inset, frame.index))
                {
                    frame.index = cell + 1;
                    self.stack.push(Level {
                        list: text,
                        frame: Frame::default(),
                    });
                    return true;
                }
                frame.index = 0;
                frame.pos += 1;
            } else {
                frame.pit += 1;
                frame.pos = 0;
                frame.index = 0;
            }

            if frame.pit < list.len() || depth == 1 {
                return true;
            }
            // Nested text exhausted: resume at the inset position in the parent.
            self.stack.pop();
        }
    }

    /// Step to the previous position. Returns `false` (and stays put) at the document start.
    pub fn step_backward(&mut self) -> bool {
        let depth = self.stack.len();
        let level = self.top_level_mut();
        let list = level.list;
        let frame = &mut level.frame;

        if frame.pit >= list.len() {
            let Some(last) = list.back() else {
                return false;
            };
            *frame = Frame::new(list.len() - 1, last.size());
            return true;
        }

        if frame.pos > 0 {
            frame.pos -= 1;
            frame.index = 0;
            let entered = list
                .at(frame.pit)
                .ok()
                .and_then(|par| par.inset_at(frame.pos))
                .and_then(|inset| prev_cell(inset, inset.num_cells()));
            if let Some((cell, text)) = entered {
                frame.index = cell + 1;
                self.push_end_of(text);
            }
            return true;
        }

        if frame.pit > 0 {
            frame.pit -= 1;
            frame.index = 0;
            frame.pos = list.at(frame.pit).map(Paragraph::size).unwrap_or(0);
            return true;
        }

        if depth == 1 {
            return false;
        }

        // Start of a nested text: back out to the inset, entering the previous cell if any.
        self.stack.pop();
        let parent = self.top_level_mut();
        let list = parent.list;
        let Frame { pit, pos, index } = parent.frame;
        let previous = list
            .at(pit)
            .ok()
            .and_then(|par| par.inset_at(pos))
            .and_then(|inset| prev_cell(inset, index.saturating_sub(1)));
        match previous {
            Some((cell, text)) => {
                parent.frame.index = cell + 1;
                self.push_end_of(text);
            }
            None => parent.frame.index = 0,
        }
        true
    }

    fn push_end_of(&mut self, text: &'a ParagraphList) {
        let pit = text.len().saturating_sub(1);
        let pos = text.at(pit).map(Paragraph::size).unwrap_or(0);
        self.stack.push(Level {
            list: text,
            frame: Frame::new(pit, pos),
        });
    }

    /// Move to another offset of the current paragraph without visiting the positions in
    /// between. No cell of the current position counts as entered afterwards.
    pub(crate) fn seek_pos(&mut self, pos: usize) {
        let frame = &mut self.top_level_mut().frame;
        frame.pos = pos;
        frame.index = 0;
    }

    /// Number of frames (inset nesting depth + 1).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Innermost frame.
    pub fn top(&self) -> Frame {
        self.top_level().frame
    }

    /// Outermost frame.
    pub fn outermost(&self) -> Frame {
        self.stack.first().map(|level| level.frame).unwrap_or_default()
    }

    /// All frames, outermost first.
    pub fn frames(&self) -> Vec<Frame> {
        self.stack.iter().map(|level| level.frame).collect()
    }

    /// The list the innermost frame walks.
    pub fn text(&self) -> &'a ParagraphList {
        self.top_level().list
    }

    /// Paragraph index in [`PosIterator::text`].
    pub fn par_index(&self) -> usize {
        self.top().pit
    }

    /// Character offset in the current paragraph.
    pub fn pos(&self) -> usize {
        self.top().pos
    }

    /// Current paragraph. Fails with [`DocumentError::EndDereference`] at the document end.
    pub fn paragraph(&self) -> Result<&'a Paragraph> {
        let level = self.top_level();
        level
            .list
            .at(level.frame.pit)
            .map_err(|_| DocumentError::EndDereference)
    }

    /// Character at the current position, `None` at a paragraph end.
    pub fn char_at(&self) -> Option<char> {
        self.paragraph().ok()?.char_at(self.pos())
    }

    /// Inset placed at the current position.
    pub fn current_inset(&self) -> Option<&'a Inset> {
        self.paragraph().ok()?.inset_at(self.pos())
    }

    /// Inset whose text the iterator is currently inside; `None` at depth 1.
    pub fn inset(&self) -> Option<&'a Inset> {
        let parent = self.stack.len().checked_sub(2).map(|k| &self.stack[k])?;
        parent.list.at(parent.frame.pit).ok()?.inset_at(parent.frame.pos)
    }

    /// Cell of [`PosIterator::inset`] the iterator is inside.
    pub fn cell(&self) -> Option<usize> {
        let parent = self.stack.len().checked_sub(2).map(|k| &self.stack[k])?;
        parent.frame.index.checked_sub(1)
    }

    /// Returns `true` at the document end.
    pub fn at_end(&self) -> bool {
        self.stack.len() == 1 && self.top().pit >= self.top_level().list.len()
    }

    /// Returns `true` at the first position of the document.
    pub fn at_start(&self) -> bool {
        let top = self.top();
        self.stack.len() == 1 && top.pit == 0 && (top.pos == 0 || self.text().is_empty())
    }

    /// Detach into a storable [`DocPosition`].
    pub fn to_position(&self) -> DocPosition {
        DocPosition {
            levels: self
                .stack
                .iter()
                .map(|level| SavedLevel {
                    list: level.list.id(),
                    generation: level.list.generation(),
                    par: level.list.at(level.frame.pit).ok().map(Paragraph::id),
                    frame: level.frame,
                })
                .collect(),
        }
    }

    /// Iterator over the detached positions from here up to (excluding) the document end.
    pub fn positions(self) -> Positions<'a> {
        Positions { iter: self }
    }

    fn top_level(&self) -> &Level<'a> {
        &self.stack[self.stack.len() - 1]
    }

    fn top_level_mut(&mut self) -> &mut Level<'a> {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }
}

/// Iterator adaptor returned by [`PosIterator::positions`].
#[derive(Debug, Clone)]
pub struct Positions<'a> {
    iter: PosIterator<'a>,
}

impl Iterator for Positions<'_> {
    type Item = DocPosition;

    fn next(&mut self) -> Option<DocPosition> {
        if self.iter.at_end() {
            return None;
        }
        let current = self.iter.to_position();
        self.iter.step_forward();
        Some(current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedLevel {
    list: ListId,
    generation: u64,
    par: Option<ParagraphId>,
    frame: Frame,
}

/// A document position detached from the document borrow.
///
/// Each level remembers the list it walked, that list's generation and the id of its
/// paragraph, so [`DocPosition::attach`] can tell a moved paragraph from a removed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPosition {
    levels: Vec<SavedLevel>,
}

impl DocPosition {
    /// Number of frames.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Frames as saved, outermost first.
    pub fn frames(&self) -> Vec<Frame> {
        self.levels.iter().map(|level| level.frame).collect()
    }

    /// Innermost frame as saved.
    pub fn top(&self) -> Frame {
        self.levels.last().map(|level| level.frame).unwrap_or_default()
    }

    /// Outermost frame as saved.
    pub fn outermost(&self) -> Frame {
        self.levels.first().map(|level| level.frame).unwrap_or_default()
    }

    /// Id of the paragraph of the innermost frame (`None` at the document end).
    pub fn paragraph_id(&self) -> Option<ParagraphId> {
        self.levels.last().and_then(|level| level.par)
    }

    /// Re-attach to `root`, validating every level.
    ///
    /// Fails with [`DocumentError::StaleIterator`] when a list on the path was replaced or a
    /// paragraph on the path was removed.
    pub fn attach<'a>(&self, root: &'a ParagraphList) -> Result<PosIterator<'a>> {
        let mut stack = Vec::with_capacity(self.levels.len());
        let mut list = root;
        for (k, saved) in self.levels.iter().enumerate() {
            let frame = saved.resolve(list, k == 0 && k + 1 == self.levels.len())?;
            stack.push(Level { list, frame });
            if k + 1 < self.levels.len() {
                list = descend(list, frame)?;
            }
        }
        if stack.is_empty() {
            return Ok(PosIterator::begin(root));
        }
        Ok(PosIterator { stack })
    }

    /// Resolve the list of the innermost frame mutably.
    pub fn text_mut<'a>(&self, root: &'a mut ParagraphList) -> Result<&'a mut ParagraphList> {
        let mut list = root;
        let Some((_, ancestors)) = self.levels.split_last() else {
            return Ok(list);
        };
        for saved in ancestors {
            let frame = saved.resolve(list, false)?;
            let cell = cell_of(frame)?;
            let par = list.at_mut(frame.pit)?;
            let inset = par
                .inset_at_mut(frame.pos)
                .ok_or(DocumentError::NotAnInset { pos: frame.pos })?;
            let cells = inset.num_cells();
            list = inset
                .text_mut(cell)
                .ok_or(DocumentError::NoSuchCell { cell, cells })?;
        }
        Ok(list)
    }

    pub(crate) fn set_top_pos(&mut self, pos: usize) {
        if let Some(level) = self.levels.last_mut() {
            level.frame.pos = pos;
            level.frame.index = 0;
        }
    }
}

impl SavedLevel {
    fn resolve(&self, list: &ParagraphList, may_be_end: bool) -> Result<Frame> {
        if list.id() != self.list {
            return Err(DocumentError::StaleIterator);
        }
        let pit = if list.generation() == self.generation {
            self.frame.pit
        } else {
            match self.par {
                Some(id) => list.index_of(id).ok_or(DocumentError::StaleIterator)?,
                None => list.len(),
            }
        };
        let frame = Frame { pit, ..self.frame };
        check_frame(list, frame, may_be_end)?;
        Ok(frame)
    }
}

fn check_frame(list: &ParagraphList, frame: Frame, may_be_end: bool) -> Result<()> {
    if frame.pit == list.len() && may_be_end {
        if frame.pos != 0 {
            return Err(DocumentError::PositionOutOfRange {
                pos: frame.pos,
                size: 0,
            });
        }
        return Ok(());
    }
    let par = list.at(frame.pit)?;
    if frame.pos > par.size() {
        return Err(DocumentError::PositionOutOfRange {
            pos: frame.pos,
            size: par.size(),
        });
    }
    Ok(())
}

fn cell_of(frame: Frame) -> Result<usize> {
    frame
        .index
        .checked_sub(1)
        .ok_or(DocumentError::NoSuchCell { cell: 0, cells: 0 })
}

/// Text of the cell a non-innermost frame has entered.
fn descend(list: &ParagraphList, frame: Frame) -> Result<&ParagraphList> {
    let cell = cell_of(frame)?;
    let inset = list
        .at(frame.pit)?
        .inset_at(frame.pos)
        .ok_or(DocumentError::NotAnInset { pos: frame.pos })?;
    inset.text(cell).ok_or(DocumentError::NoSuchCell {
        cell,
        cells: inset.num_cells(),
    })
}

/// First non-empty cell at or after `from`.
fn next_cell(inset: &Inset, from: usize) -> Option<(usize, &ParagraphList)> {
    (from..inset.num_cells())
        .filter_map(|cell| inset.text(cell).map(|text| (cell, text)))
        .find(|(_, text)| !text.is_empty())
}

/// Last non-empty cell before `until`.
fn prev_cell(inset: &Inset, until: usize) -> Option<(usize, &ParagraphList)> {
    (0..until.min(inset.num_cells()))
        .rev()
        .filter_map(|cell| inset.text(cell).map(|text| (cell, text)))
        .find(|(_, text)| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Change;
    use crate::inset::InsetKind;

    fn doc_with_note() -> ParagraphList {
        let mut doc = ParagraphList::from_texts(&["ab", "cd"]);
        let note = Inset::with_text(InsetKind::Note, ParagraphList::from_texts(&["x"]));
        doc.at_mut(0)
            .unwrap()
            .insert_inset(1, note, Change::UNCHANGED)
            .unwrap();
        doc
    }

    #[test]
    fn test_forward_sequence() {
        let doc = doc_with_note();
        let mut it = PosIterator::begin(&doc);
        let mut seen = vec![(it.depth(), it.par_index(), it.pos())];
        while it.step_forward() {
            seen.push((it.depth(), it.par_index(), it.pos()));
        }
        assert_eq!(
            seen,
            vec![
                (1, 0, 0),
                (1, 0, 1), // the inset
                (2, 0, 0),
                (2, 0, 1),
                (1, 0, 2),
                (1, 0, 3),
                (1, 1, 0),
                (1, 1, 1),
                (1, 1, 2),
                (1, 2, 0), // end
            ]
        );
        assert_eq!(seen.len() - 1, doc.position_count());
    }

    #[test]
    fn test_backward_mirrors_forward() {
        let doc = doc_with_note();
        let mut forward = Vec::new();
        let mut it = PosIterator::begin(&doc);
        loop {
            forward.push(it.frames());
            if !it.step_forward() {
                break;
            }
        }
        let mut backward = Vec::new();
        loop {
            backward.push(it.frames());
            if !it.step_backward() {
                break;
            }
        }
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_boundaries_are_noops() {
        let doc = ParagraphList::from_texts(&["a"]);
        let mut it = PosIterator::begin(&doc);
        assert!(it.at_start());
        assert!(!it.step_backward());
        assert!(it.at_start());

        let mut end = PosIterator::end(&doc);
        assert!(!end.step_forward());
        assert!(end.at_end());
        assert_eq!(end.paragraph().unwrap_err(), DocumentError::EndDereference);
    }

    #[test]
    fn test_empty_document() {
        let doc = ParagraphList::new();
        let mut it = PosIterator::begin(&doc);
        assert!(it.at_end());
        assert!(!it.step_forward());
        assert!(!it.step_backward());
        assert_eq!(it, PosIterator::end(&doc));
    }

    #[test]
    fn test_inset_accessors() {
        let doc = doc_with_note();
        let mut it = PosIterator::at(&doc, 0, 1).unwrap();
        assert!(it.current_inset().is_some());
        assert!(it.inset().is_none());
        it.step_forward();
        assert_eq!(it.depth(), 2);
        assert_eq!(it.cell(), Some(0));
        assert_eq!(it.inset().map(Inset::kind), Some(&InsetKind::Note));
        assert_eq!(it.char_at(), Some('x'));
    }

    #[test]
    fn test_from_frames_validates() {
        let doc = doc_with_note();
        assert_eq!(
            PosIterator::from_frames(&doc, &[Frame::new(0, 0), Frame::new(0, 0)]).unwrap_err(),
            DocumentError::NoSuchCell { cell: 0, cells: 0 }
        );
        assert_eq!(
            PosIterator::from_frames(
                &doc,
                &[
                    Frame {
                        pit: 0,
                        pos: 0,
                        index: 1
                    },
                    Frame::new(0, 0)
                ]
            )
            .unwrap_err(),
            DocumentError::NotAnInset { pos: 0 }
        );
        assert_eq!(
            PosIterator::at(&doc, 0, 9).unwrap_err(),
            DocumentError::PositionOutOfRange { pos: 9, size: 3 }
        );
        assert!(PosIterator::at(&doc, 2, 0).unwrap().at_end());
    }

    #[test]
    fn test_clamped_frames() {
        let doc = doc_with_note();
        let it = PosIterator::from_frames_clamped(
            &doc,
            &[
                Frame {
                    pit: 0,
                    pos: 1,
                    index: 1,
                },
                Frame::new(5, 50),
            ],
        );
        assert_eq!(it.depth(), 2);
        assert_eq!(it.top(), Frame::new(0, 1));

        let it = PosIterator::from_frames_clamped(
            &doc,
            &[
                Frame {
                    pit: 1,
                    pos: 0,
                    index: 1,
                },
                Frame::new(0, 0),
            ],
        );
        assert_eq!(it.depth(), 1);
        assert_eq!(it.top(), Frame::new(1, 0));
    }

    #[test]
    fn test_detached_position_survives_insertions() {
        let mut doc = ParagraphList::from_texts(&["a", "b"]);
        let saved = PosIterator::at(&doc, 1, 1).unwrap().to_position();
        doc.insert(doc.begin(), crate::Paragraph::from_text("z"))
            .unwrap();
        let it = saved.attach(&doc).unwrap();
        assert_eq!(it.par_index(), 2);
        assert_eq!(it.pos(), 1);

        doc.erase(doc.pos_at(2).unwrap()).unwrap();
        assert_eq!(saved.attach(&doc).unwrap_err(), DocumentError::StaleIterator);
    }

    #[test]
    fn test_replaced_nested_list_is_stale() {
        let mut doc = doc_with_note();
        let mut it = PosIterator::at(&doc, 0, 1).unwrap();
        it.step_forward();
        let saved = it.to_position();

        let copy = doc.at(0).unwrap().clone();
        doc.erase(doc.begin()).unwrap();
        doc.insert(doc.begin(), copy).unwrap();
        assert_eq!(saved.attach(&doc).unwrap_err(), DocumentError::StaleIterator);
    }
}
