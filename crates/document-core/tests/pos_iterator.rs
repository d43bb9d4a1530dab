use document_core::{
    Change, DocumentError, Frame, Inset, InsetKind, Paragraph, ParagraphList, PosIterator,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Three paragraphs; paragraph 2 holds a one-cell inset at offset 5 whose text is
/// "Note text".
fn note_document() -> ParagraphList {
    let mut doc = ParagraphList::from_texts(&["First", "Second", "Third paragraph"]);
    let note = Inset::with_text(InsetKind::Note, ParagraphList::from_texts(&["Note text"]));
    doc.at_mut(2)
        .unwrap()
        .insert_inset(5, note, Change::UNCHANGED)
        .unwrap();
    doc
}

fn random_text(rng: &mut StdRng) -> String {
    let len = rng.gen_range(0..6);
    (0..len)
        .map(|_| char::from(b'a' + rng.gen_range(0..26u8)))
        .collect()
}

fn random_list(rng: &mut StdRng, depth: usize) -> ParagraphList {
    let count = rng.gen_range(if depth == 0 { 1 } else { 0 }..4);
    (0..count).map(|_| random_paragraph(rng, depth)).collect()
}

fn random_paragraph(rng: &mut StdRng, depth: usize) -> Paragraph {
    let mut par = Paragraph::from_text(&random_text(rng));
    if depth < 3 {
        for _ in 0..rng.gen_range(0..3) {
            let pos = rng.gen_range(0..=par.size());
            let inset = if rng.gen_bool(0.3) {
                let cells = (0..rng.gen_range(1..4))
                    .map(|_| random_list(rng, depth + 1))
                    .collect();
                Inset::with_cells(
                    InsetKind::Table {
                        rows: 1,
                        columns: 3,
                    },
                    cells,
                )
            } else {
                Inset::with_text(InsetKind::Footnote, random_list(rng, depth + 1))
            };
            par.insert_inset(pos, inset, Change::UNCHANGED).unwrap();
        }
    }
    par
}

#[test]
fn test_nested_note_traversal() {
    let doc = note_document();
    let mut it = PosIterator::at(&doc, 2, 5).unwrap();
    assert!(it.current_inset().is_some());

    assert!(it.step_forward());
    assert_eq!(it.depth(), 2);
    assert_eq!(it.top(), Frame::new(0, 0));
    assert_eq!(it.text().texts(), ["Note text"]);

    // "Note text" has 9 characters plus its end position.
    for _ in 0.."Note text".len() {
        assert!(it.step_forward());
        assert_eq!(it.depth(), 2);
    }
    assert_eq!(it.top(), Frame::new(0, 9));

    assert!(it.step_forward());
    assert_eq!(it.depth(), 1);
    assert_eq!(it.top(), Frame::new(2, 6));
}

#[test]
fn test_step_inverse_everywhere() {
    let doc = note_document();
    let mut it = PosIterator::begin(&doc);
    while !it.at_end() {
        let here = it.clone();
        assert!(it.step_forward());
        let mut back = it.clone();
        assert!(back.step_backward());
        assert_eq!(back.frames(), here.frames());

        if !here.at_start() {
            let mut prev = here.clone();
            assert!(prev.step_backward());
            assert!(prev.step_forward());
            assert_eq!(prev.frames(), here.frames());
        }
    }
}

#[test]
fn test_traversal_counts_match() {
    let doc = note_document();
    let forward = PosIterator::begin(&doc).positions().count();
    assert_eq!(forward, doc.position_count());

    let mut it = PosIterator::end(&doc);
    let mut backward = 0;
    while it.step_backward() {
        backward += 1;
    }
    assert_eq!(backward, doc.position_count());
    assert!(it.at_start());
}

#[test]
fn test_table_cells_in_order_and_empty_cells_skipped() {
    let mut doc = ParagraphList::from_texts(&["t"]);
    let table = Inset::with_cells(
        InsetKind::Table {
            rows: 2,
            columns: 2,
        },
        vec![
            ParagraphList::from_texts(&["a"]),
            ParagraphList::new(),
            ParagraphList::from_texts(&["b"]),
            ParagraphList::from_texts(&["c"]),
        ],
    );
    doc.at_mut(0)
        .unwrap()
        .insert_inset(1, table, Change::UNCHANGED)
        .unwrap();

    let chars: String = PosIterator::begin(&doc)
        .positions()
        .filter_map(|pos| pos.attach(&doc).ok()?.char_at())
        .collect();
    assert_eq!(chars, "t\u{FFFC}abc");

    let cells: Vec<Option<usize>> = PosIterator::begin(&doc)
        .positions()
        .map(|pos| pos.attach(&doc).unwrap().cell())
        .collect();
    assert_eq!(
        cells,
        [
            None,
            None,
            Some(0),
            Some(0),
            Some(2),
            Some(2),
            Some(3),
            Some(3),
            None
        ]
    );
}

#[test]
fn test_random_documents_round_trip() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..50 {
        let doc = random_list(&mut rng, 0);

        let mut it = PosIterator::begin(&doc);
        let mut forward = Vec::new();
        loop {
            forward.push(it.frames());
            if !it.step_forward() {
                break;
            }
        }
        assert_eq!(forward.len(), doc.position_count() + 1);

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
}

#[test]
fn test_detached_positions_validate_on_attach() {
    let mut doc = note_document();
    let mut it = PosIterator::at(&doc, 2, 5).unwrap();
    it.step_forward();
    it.step_forward();
    let inside = it.to_position();
    let before = PosIterator::at(&doc, 1, 3).unwrap().to_position();

    doc.insert(doc.begin(), Paragraph::from_text("Preface"))
        .unwrap();
    let it = inside.attach(&doc).unwrap();
    assert_eq!(it.outermost().pit, 3);
    assert_eq!(it.top(), Frame::new(0, 1));
    assert_eq!(it.char_at(), Some('o'));
    assert_eq!(before.attach(&doc).unwrap().par_index(), 2);

    // Shrink the paragraph under a stored position.
    doc.at_mut(2).unwrap().erase_range(0..6).unwrap();
    assert_eq!(
        before.attach(&doc).unwrap_err(),
        DocumentError::PositionOutOfRange { pos: 3, size: 0 }
    );
}

#[test]
fn test_text_mut_reaches_nested_list() {
    let mut doc = note_document();
    let mut it = PosIterator::at(&doc, 2, 5).unwrap();
    it.step_forward();
    let inside = it.to_position();

    inside
        .text_mut(&mut doc)
        .unwrap()
        .push(Paragraph::from_text("more"))
        .unwrap();
    let inset = doc.at(2).unwrap().inset_at(5).unwrap();
    assert_eq!(inset.text(0).unwrap().texts(), ["Note text", "more"]);
}
