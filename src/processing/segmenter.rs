//! Paragraph and sentence segmentation.
//!
//! Segmentation is pure and deterministic:
//!
//! - Paragraphs: split on blank lines (`\n\s*\n`) after normalizing `\r\n`. When that yields a
//!   single segment longer than 200 characters, the text is re-split on single newlines so
//!   documents written without blank-line separation still get paragraph structure.
//! - Sentences: runs of non-terminal characters closed by one or more of `.`, `!`, `?`, accepted
//!   only when followed by whitespace and an ASCII uppercase letter, or by the end of the
//!   paragraph. Text outside an accepted run is not emitted. When nothing is accepted the whole
//!   paragraph is the sentence.
//!
//! The sentence heuristic splits after abbreviations followed by a capitalized word
//! (`"Dr. Smith"` becomes `"Dr."` and `"Smith ..."`). Downstream consumers rely on the current
//! boundaries, so the heuristic is kept as is.

use super::types::{ParsedDocument, ParsedParagraph, ParsedSentence, ParsingError};
use regex::Regex;
use std::sync::LazyLock;

/// Single-segment length (in characters) above which single newlines become paragraph breaks.
pub const PARAGRAPH_FALLBACK_THRESHOLD: usize = 200;

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank-line pattern compiles"));

/// Split raw text into trimmed, non-empty paragraphs in reading order.
pub fn segment_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut candidates: Vec<&str> = BLANK_LINE.split(&normalized).collect();

    if candidates.len() == 1 && candidates[0].chars().count() > PARAGRAPH_FALLBACK_THRESHOLD {
        tracing::trace!("No blank-line paragraphs found; splitting on single newlines");
        candidates = normalized.split('\n').collect();
    }

    candidates
        .into_iter()
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a paragraph into trimmed, non-empty sentences.
///
/// Falls back to the whole (trimmed) paragraph when no sentence boundary is accepted.
pub fn segment_sentences(paragraph: &str) -> Vec<String> {
    let sentences: Vec<String> = sentence_spans(paragraph)
        .into_iter()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(str::to_string)
        .collect();

    if !sentences.is_empty() {
        return sentences;
    }

    let whole = paragraph.trim();
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole.to_string()]
    }
}

/// Segment a document into positioned paragraphs and sentences.
pub fn segment_document(text: &str) -> Result<ParsedDocument, ParsingError> {
    let paragraphs: Vec<ParsedParagraph> = segment_paragraphs(text)
        .into_iter()
        .enumerate()
        .map(|(position, content)| {
            let sentences = segment_sentences(&content)
                .into_iter()
                .enumerate()
                .map(|(position, content)| ParsedSentence { content, position })
                .collect();
            ParsedParagraph {
                content,
                position,
                sentences,
            }
        })
        .collect();

    let total_sentences = paragraphs
        .iter()
        .map(|paragraph| paragraph.sentences.len())
        .sum();
    let document = ParsedDocument {
        total_paragraphs: paragraphs.len(),
        total_sentences,
        paragraphs,
    };
    document.validate()?;
    Ok(document)
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Accepted sentence candidates, untrimmed, in order.
///
/// A candidate starting anywhere inside a rejected run ends at the same terminal run and is
/// rejected too, so scanning resumes after that run.
fn sentence_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    while cursor < text.len() {
        let rest = &text[cursor..];
        let body_len = rest.find(is_terminal).unwrap_or(rest.len());
        if body_len == 0 {
            cursor += rest
                .find(|c: char| !is_terminal(c))
                .unwrap_or(rest.len());
            continue;
        }
        if body_len == rest.len() {
            break;
        }

        let terminators = &rest[body_len..];
        let terminal_len = terminators
            .find(|c: char| !is_terminal(c))
            .unwrap_or(terminators.len());
        let end = cursor + body_len + terminal_len;

        if boundary_follows(&text[end..]) {
            spans.push(&text[cursor..end]);
        }
        cursor = end;
    }

    spans
}

fn boundary_follows(rest: &str) -> bool {
    if rest.is_empty() {
        return true;
    }
    let after_space = rest.trim_start();
    after_space.len() < rest.len()
        && after_space
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
}
