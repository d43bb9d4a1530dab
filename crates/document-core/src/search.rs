//! Text search across the whole document tree.
//!
//! Searching walks the document with a [`PosIterator`], so nested texts are searched in
//! iteration order: the text of an inset is searched right after the characters before it.
//! Within a paragraph the text is cut at every inset placeholder and each run is matched on
//! its own, so a match never spans an inset. All offsets are character offsets.

use crate::error::Result;
use crate::paragraph::Paragraph;
use crate::paragraph_list::ParagraphList;
use crate::pos_iterator::{DocPosition, PosIterator};
use regex::{Regex, RegexBuilder};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, a match must start and end on Unicode word boundaries.
    pub whole_word: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// Search errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("invalid regex: {0}")]
    /// The provided regex pattern failed to compile.
    InvalidRegex(String),
}

/// A match: where it starts and how many characters it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMatch {
    /// Position of the first matched character.
    pub start: DocPosition,
    /// Length in characters.
    pub len: usize,
}

/// Find the first match of `query` at or after `from`.
///
/// Returns `Ok(None)` when nothing matches (or `query` is empty).
///
/// ```rust
/// use document_core::{search, ParagraphList, PosIterator, SearchOptions};
///
/// let doc = ParagraphList::from_texts(&["alpha beta", "gamma beta"]);
/// let from = PosIterator::at(&doc, 0, 1).unwrap().to_position();
/// let hit = search::find_next(&doc, &from, "beta", SearchOptions::default())
///     .unwrap()
///     .unwrap();
/// assert_eq!(hit.start.top().pit, 0);
/// assert_eq!(hit.start.top().pos, 6);
/// assert_eq!(hit.len, 4);
/// ```
pub fn find_next(
    root: &ParagraphList,
    from: &DocPosition,
    query: &str,
    options: SearchOptions,
) -> Result<Option<DocMatch>> {
    if query.is_empty() {
        return Ok(None);
    }
    let re = compile_search_regex(query, options)?;
    let it = from.attach(root)?;
    Ok(search_from(it, &re, options))
}

/// Every match in the document, in document order. Matches do not overlap.
pub fn find_all(
    root: &ParagraphList,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<DocMatch>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let re = compile_search_regex(query, options)?;
    let mut matches = Vec::new();
    let mut it = PosIterator::begin(root);
    while let Some(found) = search_from(it.clone(), &re, options) {
        it = found.start.attach(root)?;
        let end = it.pos() + found.len;
        it.seek_pos(end);
        matches.push(found);
    }
    Ok(matches)
}

fn search_from(mut it: PosIterator<'_>, re: &Regex, options: SearchOptions) -> Option<DocMatch> {
    while !it.at_end() {
        let Ok(par) = it.paragraph() else {
            break;
        };
        let pos = it.pos();
        let (run_start, run_end) = run_around(par, pos);
        if pos < run_end {
            let run: String = par.slice(run_start..run_end).ok()?;
            if let Some((start, len)) = match_in_run(&run, pos - run_start, re, options) {
                it.seek_pos(run_start + start);
                return Some(DocMatch {
                    start: it.to_position(),
                    len,
                });
            }
        }
        // Continue at the inset (or paragraph end) closing this run.
        it.seek_pos(run_end);
        it.step_forward();
    }
    None
}

/// Character range of the inset-free run containing `pos`.
fn run_around(par: &Paragraph, pos: usize) -> (usize, usize) {
    let start = par
        .insets()
        .iter()
        .rev()
        .map(|entry| entry.pos)
        .find(|&inset| inset < pos)
        .map_or(0, |inset| inset + 1);
    let end = par.next_inset_from(pos).unwrap_or(par.size());
    (start, end)
}

/// First acceptable match in `run` starting at or after character `from`.
fn match_in_run(
    run: &str,
    from: usize,
    re: &Regex,
    options: SearchOptions,
) -> Option<(usize, usize)> {
    let mut byte = char_to_byte(run, from);
    while byte <= run.len() {
        let m = re.find_at(run, byte)?;
        if m.is_empty() {
            byte = next_char_boundary(run, m.end())?;
            continue;
        }
        if options.whole_word && !is_whole_word(run, m.start(), m.end()) {
            byte = next_char_boundary(run, m.start())?;
            continue;
        }
        let start = run[..m.start()].chars().count();
        let len = m.as_str().chars().count();
        return Some((start, len));
    }
    None
}

fn compile_search_regex(query: &str, options: SearchOptions) -> Result<Regex> {
    let pattern = if options.regex {
        query.to_string()
    } else {
        regex::escape(query)
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .build()
        .map_err(|err| SearchError::InvalidRegex(err.to_string()).into())
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let mut start_ok = false;
    let mut end_ok = end == text.len();
    for (boundary, _) in text.split_word_bound_indices() {
        start_ok |= boundary == start;
        end_ok |= boundary == end;
    }
    start_ok && end_ok
}

fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(byte, _)| byte)
}

fn next_char_boundary(text: &str, byte: usize) -> Option<usize> {
    let ch = text.get(byte..)?.chars().next()?;
    Some(byte + ch.len_utf8())
}
