//! # bimbus
//!
//! Documents a source file with a chat-completion LLM.
//!
//! ## Features
//!
//! - Overlapping line windows with continuation context between them
//! - Three commentary perspectives: purpose, plain language, technical
//! - Length-aware summary prompts per document section
//! - Bounded retries with an explicit failure type
//! - Markdown, HTML, plain text and `.docx` output
//!
//! ## Quick Start
//!
//! ```no_run
//! use bimbus::{Config, OutputFormat, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .token("sk-...")
//!     .input("./src/main.rs")
//!     .output_dir("./docs")
//!     .format(OutputFormat::Html)
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Chunker**: Splits the file into overlapping line windows
//! 2. **Prompt Builder**: Role-plays each window once per perspective
//! 3. **Accumulator**: Collects the dash-list replies per perspective
//! 4. **Summarizer**: Condenses each perspective into a document section
//! 5. **Writer**: Renders and persists the document

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod accumulator;
mod chunker;
mod client;
mod config;
mod document;
mod error;
mod pipeline;
mod postprocess;
mod progress;
mod prompt;
mod section;
mod summarizer;
mod template;
mod writer;

pub use accumulator::Accumulator;
pub use chunker::{Chunker, Window, Windows};
pub use client::{
    ChatClient, ChatReply, ChatRequest, OpenAiClient, RetryPolicy, TokenUsage, complete_with_retry,
    complete_with_retry_notify,
};
pub use config::{Config, ConfigBuilder, OutputFormat};
pub use document::{Document, sanitize_name};
pub use error::{API_ERROR_CODES_URL, Error, Result};
pub use pipeline::{Pipeline, PipelineStats};
pub use postprocess::{PARAGRAPH_THRESHOLD, drop_leading_paragraph, paragraph_count, paragraphs, tidy};
pub use prompt::{Perspective, Prompt, PromptSection, SYSTEM_INSTRUCTION, window_prompt};
pub use section::{Section, SectionSet};
pub use summarizer::{LengthTier, SectionKind, Summarizer, summary_prompt};
pub use writer::{Renderer, Writer};

/// Runs the complete documentation pipeline with the given configuration.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The input file can't be read or is empty
/// - A chat completion fails after all retries
/// - Output files can't be written
///
/// # Examples
///
/// ```no_run
/// use bimbus::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .token("sk-...")
///     .input("main.rs")
///     .build()?;
///
/// let stats = run(config)?;
/// println!("Wrote {}", stats.output_path.display());
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
