//! Owning, ordered paragraph container.
//!
//! # Overview
//!
//! [`ParagraphList`] stores paragraphs contiguously in document order, keeps an id→index
//! table, and counts structural mutations in a generation number. A [`ListPos`] (the list's
//! iterator type) remembers the list it came from, the generation it was taken at, an index
//! and the id of the paragraph it points to:
//!
//! - a position from another list is rejected with [`DocumentError::WrongContainer`];
//! - a position from an older generation is re-derived from its paragraph id, so positions
//!   of untouched paragraphs stay valid across insertions and erasures elsewhere;
//! - a position whose paragraph was erased fails with [`DocumentError::StaleIterator`];
//! - `end()` carries no paragraph, always re-resolves to the current end and can never be
//!   dereferenced.
//!
//! # Complexity
//!
//! `len()` is O(1). Appending is amortized O(k) for k paragraphs; insertion, erasure and
//! splicing at an interior position are O(n) because the tail shifts and is re-indexed.
//!
//! # Example
//!
//! ```rust
//! use document_core::{Paragraph, ParagraphList};
//!
//! let mut doc = ParagraphList::from_texts(&["Intro", "Conclusion"]);
//! let mut extra = ParagraphList::from_texts(&["Body"]);
//! let at = doc.pos_at(1).unwrap();
//! doc.splice(at, &mut extra).unwrap();
//! assert!(extra.is_empty());
//! assert_eq!(doc.at(1).unwrap().text(), "Body");
//! ```

use crate::error::{DocumentError, Result};
use crate::ids::{ListId, ParagraphId};
use crate::paragraph::{CopyIds, Paragraph};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// A position in one [`ParagraphList`]: a paragraph or the `end()` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListPos {
    owner: ListId,
    generation: u64,
    index: usize,
    par: Option<ParagraphId>,
}

impl ListPos {
    /// List this position belongs to.
    pub fn owner(&self) -> ListId {
        self.owner
    }

    /// Paragraph this position points to; `None` for `end()`.
    pub fn paragraph_id(&self) -> Option<ParagraphId> {
        self.par
    }

    /// Returns `true` for the `end()` sentinel.
    pub fn is_end(&self) -> bool {
        self.par.is_none()
    }
}

/// Ordered, owning paragraph container.
#[derive(Debug)]
pub struct ParagraphList {
    id: ListId,
    generation: u64,
    pars: Vec<Paragraph>,
    index: HashMap<ParagraphId, usize>,
}

impl Default for ParagraphList {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ParagraphList {
    /// Exact copy of the paragraphs (ids preserved) under a new list identity.
    fn clone(&self) -> Self {
        Self {
            id: ListId::next(),
            generation: 0,
            pars: self.pars.clone(),
            index: self.index.clone(),
        }
    }
}

impl PartialEq for ParagraphList {
    /// Lists are equal when their paragraphs are; list identity is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.pars == other.pars
    }
}

impl FromIterator<Paragraph> for ParagraphList {
    /// Collect paragraphs; a paragraph whose id is already present gets a fresh id.
    fn from_iter<I: IntoIterator<Item = Paragraph>>(iter: I) -> Self {
        let mut list = Self::new();
        for mut par in iter {
            if list.index.contains_key(&par.id()) {
                par.renumber();
            }
            list.index.insert(par.id(), list.pars.len());
            list.pars.push(par);
        }
        list
    }
}

impl<'a> IntoIterator for &'a ParagraphList {
    type Item = &'a Paragraph;
    type IntoIter = std::slice::Iter<'a, Paragraph>;

    fn into_iter(self) -> Self::IntoIter {
        self.pars.iter()
    }
}

impl ParagraphList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            id: ListId::next(),
            generation: 0,
            pars: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a list holding one empty paragraph (the state of a fresh text).
    pub fn with_empty_paragraph() -> Self {
        std::iter::once(Paragraph::new()).collect()
    }

    /// Create a list with one paragraph per string.
    pub fn from_texts(texts: &[&str]) -> Self {
        texts.iter().map(|text| Paragraph::from_text(text)).collect()
    }

    /// Create a list from paragraphs, rejecting duplicate ids.
    pub fn from_paragraphs(pars: Vec<Paragraph>) -> Result<Self> {
        let mut list = Self::new();
        for par in pars {
            list.push(par)?;
        }
        Ok(list)
    }

    /// Identity of this list instance.
    pub fn id(&self) -> ListId {
        self.id
    }

    /// Structural mutation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of paragraphs. O(1).
    pub fn len(&self) -> usize {
        self.pars.len()
    }

    /// Returns `true` if the list has no paragraphs.
    pub fn is_empty(&self) -> bool {
        self.pars.is_empty()
    }

    /// Position of the first paragraph (`end()` when empty).
    pub fn begin(&self) -> ListPos {
        self.make_pos(0)
    }

    /// The `end()` sentinel.
    pub fn end(&self) -> ListPos {
        self.make_pos(self.pars.len())
    }

    /// Position of the paragraph at `index`; `index == len()` yields `end()`.
    pub fn pos_at(&self, index: usize) -> Result<ListPos> {
        if index > self.pars.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.make_pos(index))
    }

    /// First paragraph.
    pub fn front(&self) -> Option<&Paragraph> {
        self.pars.first()
    }

    /// Last paragraph.
    pub fn back(&self) -> Option<&Paragraph> {
        self.pars.last()
    }

    /// Current index of the paragraph with `id`.
    pub fn index_of(&self, id: ParagraphId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Returns `true` if a paragraph with `id` is in this list.
    pub fn contains(&self, id: ParagraphId) -> bool {
        self.index.contains_key(&id)
    }

    /// Resolve `pos` to a current index (`len()` for `end()`).
    pub fn position(&self, pos: ListPos) -> Result<usize> {
        if pos.owner != self.id {
            return Err(DocumentError::WrongContainer {
                expected: self.id,
                found: pos.owner,
            });
        }
        if pos.generation == self.generation {
            return Ok(pos.index);
        }
        match pos.par {
            None => Ok(self.pars.len()),
            Some(id) => {
                let index = self.index_of(id).ok_or(DocumentError::StaleIterator)?;
                tracing::trace!(list = %self.id, par = %id, index, "list position re-derived");
                Ok(index)
            }
        }
    }

    /// Paragraph at `pos`.
    pub fn get(&self, pos: ListPos) -> Result<&Paragraph> {
        let index = self.position(pos)?;
        self.pars.get(index).ok_or(DocumentError::EndDereference)
    }

    /// Mutable paragraph at `pos`.
    pub fn get_mut(&mut self, pos: ListPos) -> Result<&mut Paragraph> {
        let index = self.position(pos)?;
        self.pars.get_mut(index).ok_or(DocumentError::EndDereference)
    }

    /// Paragraph at `index`.
    pub fn at(&self, index: usize) -> Result<&Paragraph> {
        self.pars.get(index).ok_or(self.out_of_range(index))
    }

    /// Mutable paragraph at `index`.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut Paragraph> {
        let err = self.out_of_range(index);
        self.pars.get_mut(index).ok_or(err)
    }

    /// Position after `pos`. Advancing `end()` is an error.
    pub fn next(&self, pos: ListPos) -> Result<ListPos> {
        let index = self.position(pos)?;
        if index >= self.pars.len() {
            return Err(DocumentError::EndDereference);
        }
        Ok(self.make_pos(index + 1))
    }

    /// Position before `pos`. Stepping back from `begin()` is an error.
    pub fn prev(&self, pos: ListPos) -> Result<ListPos> {
        let index = self.position(pos)?;
        match index.checked_sub(1) {
            Some(prev) => Ok(self.make_pos(prev)),
            None => Err(self.out_of_range(0)),
        }
    }

    /// Paragraphs in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Paragraph> {
        self.pars.iter()
    }

    /// Mutable paragraphs in order. Content changes do not affect positions.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Paragraph> {
        self.pars.iter_mut()
    }

    /// Paragraphs as a slice.
    pub fn as_slice(&self) -> &[Paragraph] {
        &self.pars
    }

    /// Paragraph ids in order.
    pub fn ids(&self) -> Vec<ParagraphId> {
        self.pars.iter().map(Paragraph::id).collect()
    }

    /// Text of each paragraph, in order.
    pub fn texts(&self) -> Vec<String> {
        self.pars.iter().map(Paragraph::text).collect()
    }

    /// Insert `par` before `pos` (at the tail for `end()`). Returns its position.
    pub fn insert(&mut self, pos: ListPos, par: Paragraph) -> Result<ListPos> {
        let index = self.position(pos)?;
        self.check_absent(std::iter::once(par.id()))?;
        self.pars.insert(index, par);
        self.structure_changed(index);
        Ok(self.make_pos(index))
    }

    /// Append `par`. Returns its position.
    pub fn push(&mut self, par: Paragraph) -> Result<ListPos> {
        self.insert(self.end(), par)
    }

    /// Insert deep copies of `[first, last)` of `source` before `pos`.
    ///
    /// Returns the position of the first copy (or the resolved `pos` when the range is empty).
    pub fn insert_copies(
        &mut self,
        pos: ListPos,
        source: &ParagraphList,
        first: ListPos,
        last: ListPos,
        ids: CopyIds,
    ) -> Result<ListPos> {
        let range = source.range(first, last)?;
        let index = self.position(pos)?;
        let copies: Vec<Paragraph> = source.pars[range]
            .iter()
            .map(|par| par.copy_with(ids))
            .collect();
        self.check_absent(copies.iter().map(Paragraph::id))?;
        self.pars.splice(index..index, copies);
        self.structure_changed(index);
        Ok(self.make_pos(index))
    }

    /// Erase the paragraph at `pos`. Returns the position that follows it.
    pub fn erase(&mut self, pos: ListPos) -> Result<ListPos> {
        let index = self.position(pos)?;
        if index >= self.pars.len() {
            return Err(DocumentError::EndDereference);
        }
        let removed = self.pars.remove(index);
        self.index.remove(&removed.id());
        self.structure_changed(index);
        Ok(self.make_pos(index))
    }

    /// Take the paragraph at `index` out of the list.
    pub fn remove(&mut self, index: usize) -> Result<Paragraph> {
        if index >= self.pars.len() {
            return Err(self.out_of_range(index));
        }
        let removed = self.pars.remove(index);
        self.index.remove(&removed.id());
        self.structure_changed(index);
        Ok(removed)
    }

    /// Erase `[first, last)`. Returns the position that follows the erased range.
    pub fn erase_range(&mut self, first: ListPos, last: ListPos) -> Result<ListPos> {
        let range = self.range(first, last)?;
        let start = range.start;
        self.drain_range(range)?;
        Ok(self.make_pos(start))
    }

    /// Remove the paragraphs of `range` (indices) and return them as a new list.
    pub fn drain_range(&mut self, range: Range<usize>) -> Result<ParagraphList> {
        if range.start > range.end {
            return Err(DocumentError::InvalidRange {
                first: range.start,
                last: range.end,
            });
        }
        if range.end > self.pars.len() {
            return Err(self.out_of_range(range.end));
        }
        let start = range.start;
        let removed: ParagraphList = self.pars.drain(range).collect();
        for id in removed.index.keys() {
            self.index.remove(id);
        }
        self.structure_changed(start);
        Ok(removed)
    }

    /// Move every paragraph of `other` before `pos`, leaving `other` empty.
    ///
    /// No paragraph is copied and no id changes. Works for `end()` (append), `begin()`
    /// (prepend) and interior positions alike. Returns the position of the first moved
    /// paragraph, or the resolved `pos` when `other` was empty.
    pub fn splice(&mut self, pos: ListPos, other: &mut ParagraphList) -> Result<ListPos> {
        let index = self.position(pos)?;
        self.check_absent(other.pars.iter().map(Paragraph::id))?;
        let moved = std::mem::take(&mut other.pars);
        other.index.clear();
        other.structure_changed(0);
        self.pars.splice(index..index, moved);
        self.structure_changed(index);
        Ok(self.make_pos(index))
    }

    /// Replace the contents with deep copies of `[first, last)` of `source`.
    pub fn assign(
        &mut self,
        source: &ParagraphList,
        first: ListPos,
        last: ListPos,
        ids: CopyIds,
    ) -> Result<()> {
        let range = source.range(first, last)?;
        self.pars = source.pars[range]
            .iter()
            .map(|par| par.copy_with(ids))
            .collect();
        self.index.clear();
        self.structure_changed(0);
        Ok(())
    }

    /// Split the list at `index`: paragraphs from `index` on move into the returned list.
    pub fn split_off(&mut self, index: usize) -> Result<ParagraphList> {
        let len = self.pars.len();
        self.drain_range(index..len)
    }

    /// Remove every paragraph.
    pub fn clear(&mut self) {
        self.pars.clear();
        self.index.clear();
        self.structure_changed(0);
    }

    /// Number of positions a [`crate::PosIterator`] visits in this list, nested texts included.
    pub fn position_count(&self) -> usize {
        self.pars.iter().map(Paragraph::position_count).sum()
    }

    /// Number of paragraphs at all nesting depths.
    pub fn paragraph_count(&self) -> usize {
        self.pars
            .iter()
            .map(|par| {
                1 + par
                    .insets()
                    .iter()
                    .flat_map(|entry| entry.inset.cells())
                    .map(ParagraphList::paragraph_count)
                    .sum::<usize>()
            })
            .sum()
    }

    pub(crate) fn renumber(&mut self) {
        for par in &mut self.pars {
            par.renumber();
        }
        self.index.clear();
        self.structure_changed(0);
    }

    fn range(&self, first: ListPos, last: ListPos) -> Result<Range<usize>> {
        let start = self.position(first)?;
        let end = self.position(last)?;
        if start > end {
            return Err(DocumentError::InvalidRange {
                first: start,
                last: end,
            });
        }
        Ok(start..end)
    }

    fn make_pos(&self, index: usize) -> ListPos {
        ListPos {
            owner: self.id,
            generation: self.generation,
            index,
            par: self.pars.get(index).map(Paragraph::id),
        }
    }

    fn check_absent(&self, ids: impl IntoIterator<Item = ParagraphId>) -> Result<()> {
        let mut seen = HashSet::new();
        for id in ids {
            if self.index.contains_key(&id) || !seen.insert(id) {
                return Err(DocumentError::DuplicateParagraph(id));
            }
        }
        Ok(())
    }

    /// Bump the generation and re-index everything from `from` on.
    fn structure_changed(&mut self, from: usize) {
        self.generation = self.generation.wrapping_add(1);
        for (offset, par) in self.pars[from.min(self.pars.len())..].iter().enumerate() {
            self.index.insert(par.id(), from + offset);
        }
    }

    fn out_of_range(&self, index: usize) -> DocumentError {
        DocumentError::IndexOutOfRange {
            index,
            len: self.pars.len(),
        }
    }
}
