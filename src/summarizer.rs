use crate::{
    accumulator::Accumulator,
    client::{ChatClient, ChatReply, ChatRequest, RetryPolicy, complete_with_retry_notify},
    config::Config,
    error::{Error, Result},
    prompt::{Perspective, Prompt},
    section::SectionSet,
};
use std::{fmt, thread, time::Duration};
use tracing::debug;

/// Requested prose length, chosen from the amount of accumulated notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthTier {
    /// Up to 30 lines of notes
    Short,
    /// 31 to 50 lines of notes
    Medium,
    /// More than 50 lines of notes
    Long,
}

impl LengthTier {
    /// Maps a line count onto a tier.
    #[must_use]
    pub const fn for_lines(lines: usize) -> Self {
        match lines {
            0..=30 => Self::Short,
            31..=50 => Self::Medium,
            _ => Self::Long,
        }
    }

    /// Paragraph count phrase embedded in the prompt.
    #[must_use]
    pub const fn paragraphs(self) -> &'static str {
        match self {
            Self::Short => "one paragraph",
            Self::Medium => "two paragraphs",
            Self::Long => "three to four paragraphs",
        }
    }
}

impl fmt::Display for LengthTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.paragraphs())
    }
}

/// Sections of the final document, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// What the file is for
    Introduction,
    /// What the file does, in plain language
    Summary,
    /// How the file works
    TechnicalDetails,
}

impl SectionKind {
    /// Every section, in output order.
    pub const ALL: [Self; 3] = [Self::Introduction, Self::Summary, Self::TechnicalDetails];

    /// Title used in the output document.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Introduction => "Introduction",
            Self::Summary => "Summary",
            Self::TechnicalDetails => "Technical Details",
        }
    }

    /// Perspective whose notes feed this section.
    #[must_use]
    pub const fn source(self) -> Perspective {
        match self {
            Self::Introduction => Perspective::Purpose,
            Self::Summary => Perspective::Plain,
            Self::TechnicalDetails => Perspective::Technical,
        }
    }

    /// Whether a leading boilerplate paragraph is stripped from this section.
    #[must_use]
    pub const fn trims_leading_paragraph(self) -> bool {
        matches!(self, Self::Summary | Self::TechnicalDetails)
    }

    fn instruction(self, file_name: &str) -> String {
        match self {
            Self::Introduction => format!(
                "Write the introduction to the documentation of `{file_name}`. \
                 Explain to a junior developer what the file is for and where it fits."
            ),
            Self::Summary => format!(
                "Write a summary of what `{file_name}` does in plain, friendly language \
                 that someone new to programming can follow."
            ),
            Self::TechnicalDetails => format!(
                "Write the technical details section of the documentation of `{file_name}`. \
                 Describe how it works, naming the important functions, data structures \
                 and line numbers."
            ),
        }
    }
}

/// Builds the second-round prompt for one section.
#[must_use]
pub fn summary_prompt(kind: SectionKind, file_name: &str, notes: &str, tier: LengthTier) -> Prompt {
    Prompt::new()
        .with(
            "framing",
            format!(
                "Below are line-by-line notes a senior developer wrote while reading `{file_name}`."
            ),
        )
        .with("role", kind.instruction(file_name))
        .with(
            "length",
            format!(
                "Write {tier} of prose separated by blank lines. Do not use lists, \
                 headings or code blocks."
            ),
        )
        .with("notes", notes)
}

/// Turns the accumulated notes into the final sections.
#[derive(Debug, Clone)]
pub struct Summarizer {
    model: String,
    temperature: f32,
    retry: RetryPolicy,
    request_delay: Duration,
    line_limit: usize,
}

impl Summarizer {
    /// Creates a summarizer from configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            retry: RetryPolicy::from_config(config),
            request_delay: config.request_delay,
            line_limit: config.summary_line_limit,
        }
    }

    /// Builds the request for one section, with at most `line_limit` lines of notes.
    #[must_use]
    pub fn request(&self, kind: SectionKind, file_name: &str, notes: &Accumulator) -> ChatRequest {
        let perspective = kind.source();
        let lines = notes.line_count(perspective).min(self.line_limit);
        let tier = LengthTier::for_lines(lines);

        debug!(
            "{}: {} note lines, requesting {}",
            kind.title(),
            lines,
            tier
        );

        let prompt = summary_prompt(
            kind,
            file_name,
            &notes.truncated(perspective, self.line_limit),
            tier,
        );
        ChatRequest::new(&self.model, self.temperature, &prompt)
    }

    /// Requests every section in order, pausing `request_delay` between requests.
    ///
    /// `on_reply` sees each reply as it arrives and `on_failure` each failed
    /// attempt, as `(attempt, max_attempts, error)`.
    ///
    /// # Errors
    ///
    /// Returns the first completion failure; no partial set is returned.
    pub fn summarize<C, F, G>(
        &self,
        client: &C,
        file_name: &str,
        notes: &Accumulator,
        mut on_reply: F,
        mut on_failure: G,
    ) -> Result<SectionSet>
    where
        C: ChatClient + ?Sized,
        F: FnMut(SectionKind, &ChatReply),
        G: FnMut(u32, u32, &Error),
    {
        let mut sections = SectionSet::new();

        for (index, kind) in SectionKind::ALL.into_iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                thread::sleep(self.request_delay);
            }

            let request = self.request(kind, file_name, notes);
            let reply = complete_with_retry_notify(client, &request, self.retry, &mut on_failure)?;
            on_reply(kind, &reply);
            sections.insert(kind.title(), reply.text.trim());
        }

        Ok(sections)
    }
}
