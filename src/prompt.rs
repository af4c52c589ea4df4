//! Role-played prompts sent for every window.
//!
//! Prompts are built as ordered lists of named sections and only rendered to
//! text when they reach the chat client, so the structure can be inspected
//! without matching whole strings.

use crate::chunker::Window;
use std::fmt;

/// System message sent with every request.
pub const SYSTEM_INSTRUCTION: &str =
    "You are a senior software developer who explains code to junior developers clearly and accurately.";

/// One of the commentary angles accumulated independently for every window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Perspective {
    /// Why the code exists
    Purpose,
    /// What the code does, in plain language
    Plain,
    /// How the code works
    Technical,
}

impl Perspective {
    /// Every perspective, in the order they are requested for a window.
    pub const ALL: [Self; 3] = [Self::Purpose, Self::Plain, Self::Technical];

    /// Short tag used in intermediate file names.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Purpose => "purpose",
            Self::Plain => "plain",
            Self::Technical => "technical",
        }
    }

    /// Audience and tone instruction.
    #[must_use]
    pub const fn role(self) -> &'static str {
        match self {
            Self::Purpose => {
                "Pretend you are a senior developer explaining to a junior developer \
                 what this code is for. Focus on the purpose of each part and why it \
                 exists, in a friendly and encouraging tone."
            }
            Self::Plain => {
                "Pretend you are a senior developer explaining to a junior developer \
                 who has never seen this language before. Describe what the code does \
                 in plain, simple language and avoid jargon."
            }
            Self::Technical => {
                "Pretend you are a senior developer walking a junior developer through \
                 the technical details of this code. Cover the data structures, control \
                 flow, library calls and edge cases precisely."
            }
        }
    }

    /// Illustrative line showing the expected reply format.
    #[must_use]
    pub const fn example(self) -> &'static str {
        match self {
            Self::Purpose => "- Lines 1-4: Bring in the modules needed to read the configuration file.",
            Self::Plain => "- Lines 1-4: Get the tools the program needs to open a file.",
            Self::Technical => {
                "- Lines 1-4: Import `fs` and `path` so `read_config` can resolve and read the file synchronously."
            }
        }
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Named part of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSection {
    /// Section name
    pub name: &'static str,

    /// Section text
    pub body: String,
}

/// A prompt as an ordered list of named sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    sections: Vec<PromptSection>,
}

impl Prompt {
    /// Creates an empty prompt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a section.
    #[must_use]
    pub fn with(mut self, name: &'static str, body: impl Into<String>) -> Self {
        self.sections.push(PromptSection {
            name,
            body: body.into(),
        });
        self
    }

    /// Returns the sections in order.
    #[must_use]
    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    /// Returns the section names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.sections.iter().map(|s| s.name).collect()
    }

    /// Returns the body of the first section with the given name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.body.as_str())
    }

    /// Renders the prompt text, sections separated by a blank line.
    #[must_use]
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.body.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Builds the prompt for one window and one perspective.
///
/// Section order is fixed: framing, role, format, continue (windows after the
/// first, when a fragment exists), format reminder, code. The example line is
/// shown twice so replies stay in the parseable dash-list form.
#[must_use]
pub fn window_prompt(
    file_name: &str,
    window: Window,
    perspective: Perspective,
    continuation: Option<&str>,
    numbered_code: &str,
) -> Prompt {
    let mut prompt = Prompt::new()
        .with(
            "framing",
            format!(
                "The following code is lines {} to {} of the source file `{}`.",
                window.first_line(),
                window.last_line(),
                file_name
            ),
        )
        .with("role", perspective.role())
        .with(
            "format",
            format!(
                "Reply only with a list. Start every line with a dash and mention the \
                 line numbers it refers to. For example:\n{}",
                perspective.example()
            ),
        );

    if let Some(fragment) = continuation.filter(|_| !window.is_first()) {
        prompt = prompt.with(
            "continue",
            format!(
                "This continues an explanation of the earlier lines. Carry on from where \
                 it left off, which was:\n\"{}\"",
                fragment.trim()
            ),
        );
    }

    prompt
        .with(
            "format_reminder",
            format!(
                "Remember, every line of your reply must look like this:\n{}",
                perspective.example()
            ),
        )
        .with("code", format!("```\n{numbered_code}\n```"))
}
