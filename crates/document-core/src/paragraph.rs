//! Paragraph storage.
//!
//! A [`Paragraph`] holds its characters in a [`ropey::Rope`], one [`Change`] record per
//! character, the insets placed inside it and its layout parameters. An inset occupies exactly
//! one character position, filled with [`META_INSET`] in the text.

use crate::change::{Change, ChangeKind};
use crate::error::{DocumentError, Result};
use crate::ids::ParagraphId;
use crate::inset::Inset;
use ropey::Rope;
use std::ops::Range;

/// Placeholder character stored in the text at every inset position.
pub const META_INSET: char = '\u{FFFC}';

/// Substitute for a literal [`META_INSET`] in inserted text.
const REPLACEMENT: char = '\u{FFFD}';

/// Whether deep copies keep the ids of the copied paragraphs and insets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyIds {
    /// Keep every id (exact copy, used by undo snapshots).
    Preserve,
    /// Allocate fresh ids for the paragraph, its insets and everything nested in them.
    Fresh,
}

/// Horizontal alignment of a paragraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Whatever the layout prescribes.
    #[default]
    Layout,
    /// Justified.
    Block,
    /// Flush left.
    Left,
    /// Flush right.
    Right,
    /// Centered.
    Center,
}

/// Line spacing of a paragraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Spacing {
    /// Single spacing.
    #[default]
    Single,
    /// One and a half.
    Onehalf,
    /// Double spacing.
    Double,
    /// Custom spacing in percent of single spacing.
    Other(u16),
}

/// Layout parameters of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParagraphParams {
    /// Name of the paragraph layout (style), e.g. `"Standard"` or `"Section"`.
    pub layout: String,
    /// Alignment.
    pub align: Alignment,
    /// Nesting depth (environment depth, not inset depth).
    pub depth: u8,
    /// Line spacing.
    pub spacing: Spacing,
}

impl Default for ParagraphParams {
    fn default() -> Self {
        Self {
            layout: "Standard".to_string(),
            align: Alignment::default(),
            depth: 0,
            spacing: Spacing::default(),
        }
    }
}

/// An inset together with the character position it occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct InsetEntry {
    /// Character offset of the inset in its paragraph.
    pub pos: usize,
    /// The inset.
    pub inset: Inset,
}

/// A paragraph: characters, change records, insets and layout parameters.
///
/// `Clone` is an exact copy and keeps every id; use [`Paragraph::copy_with`] with
/// [`CopyIds::Fresh`] to duplicate content under new identities.
///
/// # Example
///
/// ```rust
/// use document_core::{Change, Paragraph};
///
/// let mut par = Paragraph::from_text("Hllo");
/// par.insert_char(1, 'e', Change::UNCHANGED).unwrap();
/// assert_eq!(par.text(), "Hello");
/// assert_eq!(par.size(), 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    id: ParagraphId,
    text: Rope,
    /// One record per character, aligned with `text`.
    changes: Vec<Change>,
    /// Sorted by `pos`; every `pos` holds [`META_INSET`] in `text`.
    insets: Vec<InsetEntry>,
    params: ParagraphParams,
}

impl Default for Paragraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Paragraph {
    /// Create an empty paragraph with the default layout.
    pub fn new() -> Self {
        Self {
            id: ParagraphId::next(),
            text: Rope::new(),
            changes: Vec::new(),
            insets: Vec::new(),
            params: ParagraphParams::default(),
        }
    }

    /// Create a paragraph holding `text` as unchanged characters.
    pub fn from_text(text: &str) -> Self {
        let clean: String = text.chars().map(sanitize).collect();
        let len = clean.chars().count();
        Self {
            text: Rope::from_str(&clean),
            changes: vec![Change::UNCHANGED; len],
            ..Self::new()
        }
    }

    /// Set the layout name.
    pub fn with_layout(mut self, layout: &str) -> Self {
        self.params.layout = layout.to_string();
        self
    }

    /// Identity of this paragraph.
    pub fn id(&self) -> ParagraphId {
        self.id
    }

    /// Number of characters, insets included.
    pub fn size(&self) -> usize {
        self.text.len_chars()
    }

    /// Returns `true` if the paragraph has no characters.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Text content; every inset shows up as [`META_INSET`].
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// Text of a character range.
    pub fn slice(&self, range: Range<usize>) -> Result<String> {
        self.check_range(&range)?;
        Ok(self.text.slice(range).to_string())
    }

    /// Character at `pos`, if any.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        (pos < self.size()).then(|| self.text.char(pos))
    }

    /// Layout parameters.
    pub fn params(&self) -> &ParagraphParams {
        &self.params
    }

    /// Mutable layout parameters.
    pub fn params_mut(&mut self) -> &mut ParagraphParams {
        &mut self.params
    }

    /// Insert one character before `pos` (`pos == size()` appends).
    ///
    /// A literal [`META_INSET`] is stored as U+FFFD; use [`Paragraph::insert_inset`] instead.
    pub fn insert_char(&mut self, pos: usize, ch: char, change: Change) -> Result<()> {
        self.check_insert_pos(pos)?;
        self.raw_insert(pos, sanitize(ch), change);
        Ok(())
    }

    /// Insert a string before `pos`. Returns the number of characters inserted.
    pub fn insert_str(&mut self, pos: usize, text: &str, change: Change) -> Result<usize> {
        self.check_insert_pos(pos)?;
        let clean: String = text.chars().map(sanitize).collect();
        let count = clean.chars().count();
        if count == 0 {
            return Ok(0);
        }
        self.text.insert(pos, &clean);
        self.changes
            .splice(pos..pos, std::iter::repeat_n(change, count));
        self.shift_insets(pos, count as isize);
        Ok(count)
    }

    /// Place `inset` at `pos`, shifting the following characters right.
    pub fn insert_inset(&mut self, pos: usize, inset: Inset, change: Change) -> Result<()> {
        self.check_insert_pos(pos)?;
        self.raw_insert(pos, META_INSET, change);
        let slot = self.insets.partition_point(|entry| entry.pos < pos);
        self.insets.insert(slot, InsetEntry { pos, inset });
        Ok(())
    }

    /// Erase the character at `pos`. Erasing an inset placeholder destroys the inset.
    pub fn erase(&mut self, pos: usize) -> Result<()> {
        self.erase_range(pos..pos + 1)
    }

    /// Erase a range of characters together with the insets it covers.
    pub fn erase_range(&mut self, range: Range<usize>) -> Result<()> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }
        let count = range.len();
        self.insets
            .retain(|entry| !(range.start <= entry.pos && entry.pos < range.end));
        self.text.remove(range.clone());
        self.changes.drain(range.clone());
        self.shift_insets(range.end, -(count as isize));
        Ok(())
    }

    /// Returns `true` if an inset sits at `pos`.
    pub fn is_inset(&self, pos: usize) -> bool {
        self.inset_slot(pos).is_some()
    }

    /// Inset placed at `pos`.
    pub fn inset_at(&self, pos: usize) -> Option<&Inset> {
        self.inset_slot(pos).map(|slot| &self.insets[slot].inset)
    }

    /// Mutable inset placed at `pos`.
    pub fn inset_at_mut(&mut self, pos: usize) -> Option<&mut Inset> {
        self.inset_slot(pos)
            .map(move |slot| &mut self.insets[slot].inset)
    }

    /// Insets in position order.
    pub fn insets(&self) -> &[InsetEntry] {
        &self.insets
    }

    /// Mutable access to every inset with its position.
    pub fn insets_mut(&mut self) -> impl Iterator<Item = (usize, &mut Inset)> {
        self.insets
            .iter_mut()
            .map(|entry| (entry.pos, &mut entry.inset))
    }

    /// Position of the first inset at or after `pos`.
    pub fn next_inset_from(&self, pos: usize) -> Option<usize> {
        let slot = self.insets.partition_point(|entry| entry.pos < pos);
        self.insets.get(slot).map(|entry| entry.pos)
    }

    /// Break the paragraph at `pos`: everything from `pos` on moves into a new paragraph,
    /// which gets a fresh id and the same layout parameters.
    pub fn split_off(&mut self, pos: usize) -> Result<Paragraph> {
        self.check_insert_pos(pos)?;
        let text = self.text.split_off(pos);
        let changes = self.changes.split_off(pos);
        let slot = self.insets.partition_point(|entry| entry.pos < pos);
        let mut insets = self.insets.split_off(slot);
        for entry in &mut insets {
            entry.pos -= pos;
        }
        Ok(Paragraph {
            id: ParagraphId::next(),
            text,
            changes,
            insets,
            params: self.params.clone(),
        })
    }

    /// Append `other` to the end of this paragraph (paragraph merge). `other`'s id is dropped.
    pub fn append(&mut self, other: Paragraph) {
        let offset = self.size();
        self.text.append(other.text);
        self.changes.extend(other.changes);
        self.insets
            .extend(other.insets.into_iter().map(|mut entry| {
                entry.pos += offset;
                entry
            }));
    }

    /// Change record of the character at `pos`.
    pub fn change_at(&self, pos: usize) -> Option<Change> {
        self.changes.get(pos).copied()
    }

    /// Overwrite the change records of a character range.
    pub fn set_change(&mut self, range: Range<usize>, change: Change) -> Result<()> {
        self.check_range(&range)?;
        self.changes[range].fill(change);
        Ok(())
    }

    /// Returns `true` if this paragraph or anything nested in it carries tracked changes.
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|change| !change.is_unchanged())
            || self.insets.iter().any(|entry| {
                entry
                    .inset
                    .cells()
                    .iter()
                    .any(|cell| cell.iter().any(Paragraph::has_changes))
            })
    }

    /// Accept all tracked changes: deletions are applied, insertions become plain text.
    /// Nested texts are processed as well.
    pub fn accept_changes(&mut self) {
        self.resolve_changes(ChangeKind::Deleted);
    }

    /// Reject all tracked changes: insertions are removed, deletions are restored.
    /// Nested texts are processed as well.
    pub fn reject_changes(&mut self) {
        self.resolve_changes(ChangeKind::Inserted);
    }

    /// Number of positions a [`crate::PosIterator`] visits in this paragraph, nested texts
    /// included: one per character plus the end-of-paragraph position.
    pub fn position_count(&self) -> usize {
        self.size()
            + 1
            + self
                .insets
                .iter()
                .map(|entry| entry.inset.position_count())
                .sum::<usize>()
    }

    /// Deep copy with the requested id policy.
    pub fn copy_with(&self, ids: CopyIds) -> Paragraph {
        let mut copy = self.clone();
        if ids == CopyIds::Fresh {
            copy.renumber();
        }
        copy
    }

    pub(crate) fn renumber(&mut self) {
        self.id = ParagraphId::next();
        for entry in &mut self.insets {
            entry.inset.renumber();
        }
    }

    fn resolve_changes(&mut self, remove: ChangeKind) {
        for pos in (0..self.size()).rev() {
            match self.changes[pos].kind {
                ChangeKind::Unchanged => {}
                kind if kind == remove => {
                    self.insets.retain(|entry| entry.pos != pos);
                    self.text.remove(pos..pos + 1);
                    self.changes.remove(pos);
                    self.shift_insets(pos + 1, -1);
                }
                _ => self.changes[pos] = Change::UNCHANGED,
            }
        }
        for (_, inset) in self.insets_mut() {
            for cell in inset.cells_mut() {
                for par in cell.iter_mut() {
                    par.resolve_changes(remove);
                }
            }
        }
    }

    fn raw_insert(&mut self, pos: usize, ch: char, change: Change) {
        self.text.insert_char(pos, ch);
        self.changes.insert(pos, change);
        self.shift_insets(pos, 1);
    }

    /// Move every inset at or after `from` by `delta` positions.
    fn shift_insets(&mut self, from: usize, delta: isize) {
        for entry in self.insets.iter_mut().filter(|entry| entry.pos >= from) {
            entry.pos = entry.pos.saturating_add_signed(delta);
        }
    }

    fn inset_slot(&self, pos: usize) -> Option<usize> {
        self.insets
            .binary_search_by_key(&pos, |entry| entry.pos)
            .ok()
    }

    fn check_insert_pos(&self, pos: usize) -> Result<()> {
        if pos > self.size() {
            return Err(DocumentError::PositionOutOfRange {
                pos,
                size: self.size(),
            });
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<()> {
        if range.start > range.end {
            return Err(DocumentError::InvalidRange {
                first: range.start,
                last: range.end,
            });
        }
        if range.end > self.size() {
            return Err(DocumentError::PositionOutOfRange {
                pos: range.end,
                size: self.size(),
            });
        }
        Ok(())
    }
}

fn sanitize(ch: char) -> char {
    if ch == META_INSET { REPLACEMENT } else { ch }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AuthorId;
    use crate::inset::InsetKind;

    #[test]
    fn test_from_text() {
        let par = Paragraph::from_text("Hello");
        assert_eq!(par.text(), "Hello");
        assert_eq!(par.size(), 5);
        assert_eq!(par.change_at(4), Some(Change::UNCHANGED));
        assert_eq!(par.change_at(5), None);
    }

    #[test]
    fn test_insert_and_erase() {
        let mut par = Paragraph::from_text("Hlo");
        par.insert_str(1, "el", Change::UNCHANGED).unwrap();
        assert_eq!(par.text(), "Hello");
        par.erase(0).unwrap();
        assert_eq!(par.text(), "ello");
        par.erase_range(1..3).unwrap();
        assert_eq!(par.text(), "eo");
    }

    #[test]
    fn test_out_of_range() {
        let mut par = Paragraph::from_text("abc");
        assert_eq!(
            par.insert_char(4, 'x', Change::UNCHANGED),
            Err(DocumentError::PositionOutOfRange { pos: 4, size: 3 })
        );
        assert_eq!(
            par.erase(3),
            Err(DocumentError::PositionOutOfRange { pos: 4, size: 3 })
        );
    }

    #[test]
    fn test_inset_positions_shift() {
        let mut par = Paragraph::from_text("abcd");
        par.insert_inset(2, Inset::new(InsetKind::Footnote), Change::UNCHANGED)
            .unwrap();
        assert_eq!(par.char_at(2), Some(META_INSET));
        assert!(par.is_inset(2));

        par.insert_char(0, 'x', Change::UNCHANGED).unwrap();
        assert!(par.is_inset(3));
        assert!(!par.is_inset(2));

        par.erase(0).unwrap();
        assert!(par.is_inset(2));

        par.erase(2).unwrap();
        assert!(par.insets().is_empty());
        assert_eq!(par.text(), "abcd");
    }

    #[test]
    fn test_literal_meta_char_is_replaced() {
        let mut par = Paragraph::new();
        par.insert_char(0, META_INSET, Change::UNCHANGED).unwrap();
        assert!(!par.is_inset(0));
        assert_eq!(par.char_at(0), Some(REPLACEMENT));
    }

    #[test]
    fn test_split_off_and_append() {
        let mut par = Paragraph::from_text("Hello World").with_layout("Section");
        par.insert_inset(8, Inset::new(InsetKind::Note), Change::UNCHANGED)
            .unwrap();
        let tail = par.split_off(6).unwrap();

        assert_eq!(par.text(), "Hello ");
        assert_eq!(tail.size(), 6);
        assert!(tail.is_inset(2));
        assert_ne!(tail.id(), par.id());
        assert_eq!(tail.params().layout, "Section");

        let id = par.id();
        par.append(tail);
        assert_eq!(par.id(), id);
        assert_eq!(par.size(), 12);
        assert!(par.is_inset(8));
    }

    #[test]
    fn test_copy_with_ids() {
        let mut par = Paragraph::from_text("x");
        par.insert_inset(0, Inset::new(InsetKind::Footnote), Change::UNCHANGED)
            .unwrap();

        let same = par.copy_with(CopyIds::Preserve);
        assert_eq!(same, par);

        let fresh = par.copy_with(CopyIds::Fresh);
        assert_ne!(fresh.id(), par.id());
        assert_eq!(fresh.text(), par.text());
        let old_inset = par.inset_at(0).unwrap();
        let new_inset = fresh.inset_at(0).unwrap();
        assert_ne!(old_inset.id(), new_inset.id());
        assert_ne!(
            old_inset.text(0).unwrap().ids(),
            new_inset.text(0).unwrap().ids()
        );
    }

    #[test]
    fn test_accept_and_reject() {
        let author = AuthorId(7);
        let mut par = Paragraph::from_text("abc");
        par.insert_str(3, "XY", Change::inserted(author)).unwrap();
        par.set_change(0..1, Change::deleted(author)).unwrap();
        assert!(par.has_changes());

        let mut accepted = par.clone();
        accepted.accept_changes();
        assert_eq!(accepted.text(), "bcXY");
        assert!(!accepted.has_changes());

        par.reject_changes();
        assert_eq!(par.text(), "abc");
        assert!(!par.has_changes());
    }

    #[test]
    fn test_position_count_includes_nested_text() {
        let mut par = Paragraph::from_text("ab");
        assert_eq!(par.position_count(), 3);
        par.insert_inset(1, Inset::new(InsetKind::Footnote), Change::UNCHANGED)
            .unwrap();
        // 3 characters + end, plus one empty nested paragraph (its end position).
        assert_eq!(par.position_count(), 5);
    }
}
