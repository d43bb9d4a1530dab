//! Insets: objects embedded at a character position that may own nested texts.

use crate::ids::InsetId;
use crate::paragraph_list::ParagraphList;

/// What kind of object an inset is. Determines how many cells it starts with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InsetKind {
    /// Footnote with one text.
    Footnote,
    /// Margin note with one text.
    Margin,
    /// Editor note with one text.
    Note,
    /// Float caption with one text.
    Caption,
    /// Table with one text per cell, row-major.
    Table {
        /// Row count.
        rows: usize,
        /// Column count.
        columns: usize,
    },
    /// Math box with one text.
    Math,
    /// Label without any text.
    Label(String),
}

impl InsetKind {
    /// Number of cells a new inset of this kind gets.
    pub fn default_cells(&self) -> usize {
        match self {
            InsetKind::Table { rows, columns } => rows * columns,
            InsetKind::Label(_) => 0,
            _ => 1,
        }
    }
}

/// An inset: identity, kind and its nested texts ("cells").
#[derive(Debug, Clone, PartialEq)]
pub struct Inset {
    id: InsetId,
    kind: InsetKind,
    cells: Vec<ParagraphList>,
}

impl Inset {
    /// Create an inset whose cells each hold one empty paragraph.
    pub fn new(kind: InsetKind) -> Self {
        let cells = (0..kind.default_cells())
            .map(|_| ParagraphList::with_empty_paragraph())
            .collect();
        Self {
            id: InsetId::next(),
            kind,
            cells,
        }
    }

    /// Create an inset with the given cells.
    pub fn with_cells(kind: InsetKind, cells: Vec<ParagraphList>) -> Self {
        Self {
            id: InsetId::next(),
            kind,
            cells,
        }
    }

    /// Create a single-cell inset holding `text`.
    pub fn with_text(kind: InsetKind, text: ParagraphList) -> Self {
        Self::with_cells(kind, vec![text])
    }

    /// Identity of this inset.
    pub fn id(&self) -> InsetId {
        self.id
    }

    /// Kind of this inset.
    pub fn kind(&self) -> &InsetKind {
        &self.kind
    }

    /// Number of nested texts.
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Nested text of `cell`.
    pub fn text(&self, cell: usize) -> Option<&ParagraphList> {
        self.cells.get(cell)
    }

    /// Mutable nested text of `cell`.
    pub fn text_mut(&mut self, cell: usize) -> Option<&mut ParagraphList> {
        self.cells.get_mut(cell)
    }

    /// All nested texts.
    pub fn cells(&self) -> &[ParagraphList] {
        &self.cells
    }

    /// All nested texts, mutably.
    pub fn cells_mut(&mut self) -> &mut [ParagraphList] {
        &mut self.cells
    }

    /// Iterator positions inside all cells.
    pub fn position_count(&self) -> usize {
        self.cells.iter().map(ParagraphList::position_count).sum()
    }

    pub(crate) fn renumber(&mut self) {
        self.id = InsetId::next();
        for cell in &mut self.cells {
            cell.renumber();
        }
    }
}
