use crate::prompt::Perspective;
use std::collections::HashMap;

/// Reply lines collected per perspective, in model output order.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    lines: HashMap<Perspective, Vec<String>>,
}

impl Accumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every non-blank line of `reply` to the perspective's sequence.
    ///
    /// Blankness is checked on the trimmed line; the stored value is the
    /// original line.
    pub fn append(&mut self, perspective: Perspective, reply: &str) {
        let lines = self.lines.entry(perspective).or_default();
        lines.extend(
            reply
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_owned),
        );
    }

    /// Returns the stored lines of a perspective.
    #[must_use]
    pub fn lines(&self, perspective: Perspective) -> &[String] {
        self.lines
            .get(&perspective)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns how many lines a perspective holds.
    #[must_use]
    pub fn line_count(&self, perspective: Perspective) -> usize {
        self.lines(perspective).len()
    }

    /// Returns the most recent line of a perspective, trimmed.
    #[must_use]
    pub fn last_line(&self, perspective: Perspective) -> Option<&str> {
        self.lines(perspective).last().map(|line| line.trim())
    }

    /// Joins all lines of a perspective with newlines.
    #[must_use]
    pub fn snapshot(&self, perspective: Perspective) -> String {
        self.lines(perspective).join("\n")
    }

    /// Joins at most the first `limit` lines of a perspective.
    #[must_use]
    pub fn truncated(&self, perspective: Perspective, limit: usize) -> String {
        let lines = self.lines(perspective);
        lines[..lines.len().min(limit)].join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_skips_blank_lines() {
        let mut acc = Accumulator::new();
        acc.append(Perspective::Purpose, "a\n\n b \n");

        assert_eq!(acc.lines(Perspective::Purpose), ["a", " b "]);
    }

    #[test]
    fn test_whitespace_only_lines_dropped() {
        let mut acc = Accumulator::new();
        acc.append(Perspective::Plain, "  \n\t\n- one\r\n   \n- two");

        assert_eq!(acc.line_count(Perspective::Plain), 2);
        assert_eq!(acc.snapshot(Perspective::Plain), "- one\n- two");
    }

    #[test]
    fn test_perspectives_are_independent() {
        let mut acc = Accumulator::new();
        acc.append(Perspective::Purpose, "- purpose");
        acc.append(Perspective::Technical, "- technical 1\n- technical 2");

        assert_eq!(acc.line_count(Perspective::Purpose), 1);
        assert_eq!(acc.line_count(Perspective::Plain), 0);
        assert_eq!(acc.line_count(Perspective::Technical), 2);
        assert_eq!(acc.snapshot(Perspective::Plain), "");
    }

    #[test]
    fn test_append_preserves_order() {
        let mut acc = Accumulator::new();
        acc.append(Perspective::Purpose, "- first\n- second");
        acc.append(Perspective::Purpose, "- third");

        assert_eq!(acc.snapshot(Perspective::Purpose), "- first\n- second\n- third");
        assert_eq!(acc.last_line(Perspective::Purpose), Some("- third"));
    }

    #[test]
    fn test_last_line_trimmed() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.last_line(Perspective::Plain), None);

        acc.append(Perspective::Plain, "  - indented  ");
        assert_eq!(acc.last_line(Perspective::Plain), Some("- indented"));
    }

    #[test]
    fn test_truncated() {
        let mut acc = Accumulator::new();
        acc.append(Perspective::Technical, "1\n2\n3\n4");

        assert_eq!(acc.truncated(Perspective::Technical, 2), "1\n2");
        assert_eq!(acc.truncated(Perspective::Technical, 10), "1\n2\n3\n4");
    }
}
