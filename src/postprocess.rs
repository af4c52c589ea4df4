//! Best-effort cleanup of summary replies.
//!
//! Replies to "write N paragraphs" prompts often open with a generic sentence
//! about what follows. When a section has more paragraphs than
//! [`PARAGRAPH_THRESHOLD`], its first paragraph is dropped. This is a
//! heuristic: a useful opening paragraph can be lost, and a boilerplate one can
//! survive in shorter replies.

use crate::{section::SectionSet, summarizer::SectionKind};

/// Sections with more paragraphs than this lose their first one.
pub const PARAGRAPH_THRESHOLD: usize = 2;

/// Splits text into blank-line-delimited paragraphs.
#[must_use]
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        out.push(current.join("\n"));
    }

    out
}

/// Counts blank-line-delimited paragraphs.
#[must_use]
pub fn paragraph_count(text: &str) -> usize {
    paragraphs(text).len()
}

/// Drops the first paragraph and the blank lines after it when the text has
/// more than [`PARAGRAPH_THRESHOLD`] paragraphs; otherwise returns it unchanged.
#[must_use]
pub fn drop_leading_paragraph(text: &str) -> String {
    if paragraph_count(text) <= PARAGRAPH_THRESHOLD {
        return text.to_string();
    }

    text.lines()
        .skip_while(|line| line.trim().is_empty())
        .skip_while(|line| !line.trim().is_empty())
        .skip_while(|line| line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Applies the leading-paragraph cleanup to the sections that ask for it.
#[must_use]
pub fn tidy(mut sections: SectionSet) -> SectionSet {
    for kind in SectionKind::ALL {
        if kind.trims_leading_paragraph() {
            sections.update(kind.title(), drop_leading_paragraph);
        }
    }
    sections
}
