use document_core::{
    Change, DocumentError, DocumentSession, Frame, Inset, InsetKind, Paragraph, ParagraphList,
    RebreakRequest, SessionConfig, UndoKind,
};
use pretty_assertions::assert_eq;

fn session_with_footnote() -> (DocumentSession, document_core::InsetId) {
    let mut doc = ParagraphList::from_texts(&["Hello world", "Second"]);
    let footnote = Inset::with_text(InsetKind::Footnote, ParagraphList::from_texts(&["fn"]));
    let id = footnote.id();
    doc.at_mut(0)
        .unwrap()
        .insert_inset(5, footnote, Change::UNCHANGED)
        .unwrap();
    (DocumentSession::new(doc, SessionConfig::default()), id)
}

#[test]
fn test_walk_whole_document_with_cursor() {
    let (mut session, _) = session_with_footnote();
    let mut forward = 1;
    while session.move_forward() {
        forward += 1;
    }
    // The cursor visits every position but never the end.
    assert_eq!(forward, session.paragraphs().position_count());
    assert_eq!(session.cursor().frames(), [Frame::new(1, 6)]);

    let mut backward = 0;
    while session.move_backward() {
        backward += 1;
    }
    assert_eq!(backward + 1, forward);
    assert!(session.cursor_iter().at_start());
}

#[test]
fn test_break_paragraph_inside_inset() {
    let (mut session, inset) = session_with_footnote();
    let at = session.find_inset(inset).unwrap();
    session.set_cursor(&at).unwrap();
    assert!(session.move_forward());
    assert!(session.move_forward());
    assert_eq!(session.cursor().top(), Frame::new(0, 1));

    session.break_paragraph().unwrap();
    assert_eq!(session.cursor().depth(), 2);
    assert_eq!(session.cursor().top(), Frame::new(1, 0));
    let nested = session
        .paragraphs()
        .at(0)
        .unwrap()
        .inset_at(5)
        .unwrap()
        .text(0)
        .unwrap();
    assert_eq!(nested.texts(), ["f", "n"]);
    assert_eq!(
        session.take_rebreak_request(),
        Some(RebreakRequest {
            inset: Some(inset),
            paragraphs: 0..1,
        })
    );

    // Merging back inside the inset.
    assert!(session.delete_backward().unwrap());
    assert_eq!(session.cursor().top(), Frame::new(0, 1));
    assert!(session.can_undo());
    assert!(session.undo().unwrap());
    assert_eq!(session.cursor().depth(), 2);
    assert_eq!(session.cursor().top(), Frame::new(1, 0));
}

#[test]
fn test_delete_inset_and_undo_restores_it() {
    let (mut session, inset) = session_with_footnote();
    session.set_cursor_at(0, 6).unwrap();
    assert!(session.delete_backward().unwrap());
    assert!(session.find_inset(inset).is_none());
    assert_eq!(session.paragraphs().at(0).unwrap().text(), "Hello world");

    assert!(session.undo().unwrap());
    let at = session.find_inset(inset).unwrap();
    assert_eq!(at.frames(), [Frame::new(0, 5)]);
    assert_eq!(session.cursor().frames(), [Frame::new(0, 6)]);
}

#[test]
fn test_undo_into_vanished_inset_falls_back_to_top_level() {
    let (mut session, inset) = session_with_footnote();
    let at = session.find_inset(inset).unwrap();
    session.set_cursor(&at).unwrap();
    assert!(session.move_forward());

    session.record_undo_pars(UndoKind::Atomic, 1, 1).unwrap();
    session
        .paragraphs_mut()
        .at_mut(1)
        .unwrap()
        .insert_str(0, "New ", Change::UNCHANGED)
        .unwrap();
    // Remove the footnote holding the saved cursor, without undo.
    session
        .paragraphs_mut()
        .at_mut(0)
        .unwrap()
        .erase(5)
        .unwrap();

    assert!(session.undo().unwrap());
    assert_eq!(session.paragraphs().texts(), ["Hello world", "Second"]);
    assert_eq!(session.cursor().frames(), [Frame::new(1, 0)]);
}

#[test]
fn test_set_layout_and_undo() {
    let mut session = DocumentSession::new(
        ParagraphList::from_texts(&["Title", "Body"]),
        SessionConfig::default(),
    );
    session.set_layout("Section").unwrap();
    assert_eq!(session.paragraphs().at(0).unwrap().params().layout, "Section");
    assert!(session.undo().unwrap());
    assert_eq!(
        session.paragraphs().at(0).unwrap().params().layout,
        "Standard"
    );
}

#[test]
fn test_erase_paragraph_moves_cursor() {
    let mut session = DocumentSession::new(
        ParagraphList::from_texts(&["a", "b", "c"]),
        SessionConfig::default(),
    );
    session.set_cursor_at(2, 1).unwrap();
    let removed = session.erase_paragraph(2).unwrap();
    assert_eq!(removed.text(), "c");
    assert_eq!(session.cursor().frames(), [Frame::new(1, 0)]);

    session.set_cursor_at(1, 1).unwrap();
    session.erase_paragraph(0).unwrap();
    assert_eq!(session.cursor().frames(), [Frame::new(0, 1)]);

    assert!(session.undo().unwrap());
    assert!(session.undo().unwrap());
    assert_eq!(session.paragraphs().texts(), ["a", "b", "c"]);
}

#[test]
fn test_find_paragraph_at_depth() {
    let (session, _) = session_with_footnote();
    let inner = session
        .paragraphs()
        .at(0)
        .unwrap()
        .inset_at(5)
        .unwrap()
        .text(0)
        .unwrap()
        .at(0)
        .unwrap()
        .id();
    let at = session.find_paragraph(inner).unwrap();
    assert_eq!(at.depth(), 2);
    assert_eq!(at.paragraph_id(), Some(inner));

    let stray = Paragraph::new();
    assert!(session.find_paragraph(stray.id()).is_none());
}

#[test]
fn test_insert_paragraph_errors() {
    let mut session = DocumentSession::default();
    assert_eq!(
        session
            .insert_paragraph(5, Paragraph::new())
            .unwrap_err(),
        DocumentError::IndexOutOfRange { index: 5, len: 1 }
    );
    let existing = session.paragraphs().at(0).unwrap().clone();
    assert_eq!(
        session.insert_paragraph(1, existing.clone()).unwrap_err(),
        DocumentError::DuplicateParagraph(existing.id())
    );
    assert!(!session.can_undo());
}

#[test]
fn test_empty_document_after_external_clear() {
    let mut session = DocumentSession::default();
    session.paragraphs_mut().clear();
    assert_eq!(
        session.insert_text("x").unwrap_err(),
        DocumentError::EmptyDocument
    );
}
