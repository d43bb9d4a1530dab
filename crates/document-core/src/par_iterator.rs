//! Paragraph-granular walk over the whole document tree.
//!
//! [`ParIterator`] visits every paragraph once, in pre-order: a paragraph first, then the
//! paragraphs of each inset it contains (cell by cell, insets in position order), then the
//! next paragraph of the same list. Each visit carries the frames needed to build a
//! [`crate::PosIterator`] at the start of the visited paragraph.

use crate::inset::Inset;
use crate::paragraph::Paragraph;
use crate::paragraph_list::ParagraphList;
use crate::pos_iterator::{Frame, PosIterator};

/// One paragraph reached by [`ParIterator`].
#[derive(Debug, Clone)]
pub struct ParVisit<'a> {
    /// Nesting depth; top-level paragraphs have depth 1.
    pub depth: usize,
    /// The paragraph.
    pub paragraph: &'a Paragraph,
    /// Frames addressing the start of the paragraph, outermost first.
    pub frames: Vec<Frame>,
}

impl<'a> ParVisit<'a> {
    /// Position iterator at the start of the visited paragraph.
    pub fn to_pos_iterator(&self, root: &'a ParagraphList) -> PosIterator<'a> {
        PosIterator::from_frames_clamped(root, &self.frames)
    }
}

#[derive(Debug)]
struct ParLevel<'a> {
    list: &'a ParagraphList,
    pit: usize,
    /// Next inset entry of the current paragraph to descend into.
    entry: usize,
    /// Next cell of that inset.
    cell: usize,
    /// Whether the current paragraph was already yielded.
    visited: bool,
}

impl<'a> ParLevel<'a> {
    fn new(list: &'a ParagraphList) -> Self {
        Self {
            list,
            pit: 0,
            entry: 0,
            cell: 0,
            visited: false,
        }
    }
}

/// Pre-order iterator over all paragraphs of a document.
///
/// # Example
///
/// ```rust
/// use document_core::{Change, Inset, InsetKind, ParIterator, ParagraphList};
///
/// let mut doc = ParagraphList::from_texts(&["one", "two"]);
/// let note = Inset::with_text(InsetKind::Footnote, ParagraphList::from_texts(&["inner"]));
/// doc.at_mut(0).unwrap().insert_inset(3, note, Change::UNCHANGED).unwrap();
///
/// let depths: Vec<usize> = ParIterator::new(&doc).map(|visit| visit.depth).collect();
/// assert_eq!(depths, [1, 2, 1]);
/// ```
#[derive(Debug)]
pub struct ParIterator<'a> {
    stack: Vec<ParLevel<'a>>,
}

impl<'a> ParIterator<'a> {
    /// Walk every paragraph of `root`.
    pub fn new(root: &'a ParagraphList) -> Self {
        Self {
            stack: vec![ParLevel::new(root)],
        }
    }

    /// Frames of the ancestors of the current level (each pointing at the entered inset).
    fn ancestor_frames(&self) -> Vec<Frame> {
        let ancestors = &self.stack[..self.stack.len().saturating_sub(1)];
        ancestors
            .iter()
            .map(|level| {
                let pos = level
                    .list
                    .at(level.pit)
                    .ok()
                    .and_then(|par| par.insets().get(level.entry))
                    .map(|entry| entry.pos)
                    .unwrap_or(0);
                Frame {
                    pit: level.pit,
                    pos,
                    // `cell` was already advanced past the entered cell.
                    index: level.cell,
                }
            })
            .collect()
    }
}

impl<'a> Iterator for ParIterator<'a> {
    type Item = ParVisit<'a>;

    fn next(&mut self) -> Option<ParVisit<'a>> {
        loop {
            let depth = self.stack.len();
            let level = self.stack.last_mut()?;
            let list = level.list;

            let Ok(par) = list.at(level.pit) else {
                // List exhausted; the parent resumes after the cell it entered.
                self.stack.pop();
                continue;
            };

            if !level.visited {
                level.visited = true;
                let pit = level.pit;
                let mut frames = self.ancestor_frames();
                frames.push(Frame::new(pit, 0));
                return Some(ParVisit {
                    depth,
                    paragraph: par,
                    frames,
                });
            }

            match next_cell_text(par, level.entry, level.cell) {
                Some((entry, cell, text)) => {
                    level.entry = entry;
                    level.cell = cell + 1;
                    self.stack.push(ParLevel::new(text));
                }
                None => {
                    level.pit += 1;
                    level.entry = 0;
                    level.cell = 0;
                    level.visited = false;
                }
            }
        }
    }
}

/// Next non-empty cell text at or after `(entry, cell)` among `par`'s insets.
fn next_cell_text(
    par: &Paragraph,
    entry: usize,
    cell: usize,
) -> Option<(usize, usize, &ParagraphList)> {
    par.insets()
        .iter()
        .enumerate()
        .skip(entry)
        .find_map(|(k, slot)| {
            let from = if k == entry { cell } else { 0 };
            first_text_from(&slot.inset, from).map(|(cell, text)| (k, cell, text))
        })
}

fn first_text_from(inset: &Inset, from: usize) -> Option<(usize, &ParagraphList)> {
    inset
        .cells()
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, text)| !text.is_empty())
}
