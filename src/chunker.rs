use crate::error::{Error, Result};
use std::fmt;
use std::iter::FusedIterator;

/// Half-open line range `[start, end)` over a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First line index (0-based, inclusive)
    pub start: usize,

    /// Last line index (0-based, exclusive)
    pub end: usize,
}

impl Window {
    /// Returns the number of lines in this window.
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    /// Returns true if the window holds no lines.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// Returns true if this is the window starting at line 0.
    #[must_use]
    pub const fn is_first(self) -> bool {
        self.start == 0
    }

    /// First line number, 1-based.
    #[must_use]
    pub const fn first_line(self) -> usize {
        self.start + 1
    }

    /// Last line number, 1-based and inclusive.
    #[must_use]
    pub const fn last_line(self) -> usize {
        self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lines {}-{}", self.first_line(), self.last_line())
    }
}

/// Splits a line count into overlapping windows.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    window_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Creates a chunker.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `window_size` is zero or `overlap`
    /// isn't smaller than `window_size`.
    pub fn new(window_size: usize, overlap: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::validation("window_size must be greater than 0"));
        }

        if overlap >= window_size {
            return Err(Error::validation(format!(
                "overlap ({overlap}) must be less than window_size ({window_size})"
            )));
        }

        Ok(Self {
            window_size,
            overlap,
        })
    }

    /// Distance between the starts of consecutive windows.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.window_size - self.overlap
    }

    /// Returns the windows covering `[0, line_count)`.
    ///
    /// # Algorithm
    ///
    /// 1. The first window starts at line 0
    /// 2. Each next window starts `window_size - overlap` lines after the previous one
    /// 3. Ends are clamped to `line_count`
    /// 4. Iteration stops after the window that reaches `line_count`
    #[must_use]
    pub fn windows(&self, line_count: usize) -> Windows {
        Windows {
            line_count,
            window_size: self.window_size,
            step: self.step(),
            next_start: (line_count > 0).then_some(0),
        }
    }
}

/// Lazy iterator over the windows of a document.
#[derive(Debug)]
pub struct Windows {
    line_count: usize,
    window_size: usize,
    step: usize,
    next_start: Option<usize>,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let start = self.next_start?;
        let end = start.saturating_add(self.window_size).min(self.line_count);

        self.next_start = if end >= self.line_count {
            None
        } else {
            Some(start + self.step)
        };

        Some(Window { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next_start {
            None => 0,
            Some(start) => {
                let end = start.saturating_add(self.window_size);
                if end >= self.line_count {
                    1
                } else {
                    1 + (self.line_count - end).div_ceil(self.step)
                }
            }
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows {}

impl FusedIterator for Windows {}
