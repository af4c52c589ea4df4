use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TEMPERATURE: f32 = 0.5;
const DEFAULT_WINDOW_SIZE: usize = 100;
const DEFAULT_OVERLAP: usize = 20;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_SUMMARY_LINE_LIMIT: usize = 400;
const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Output format for the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Markdown with `#`/`##` headers
    Markdown,
    /// Standalone HTML page
    Html,
    /// Plain text with bare headers
    Text,
    /// Word-processor document (.docx)
    Docx,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Text => "txt",
            Self::Docx => "docx",
        }
    }

    /// Returns the name used on the command line and for built-in templates.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Text => "text",
            Self::Docx => "docx",
        }
    }

    /// Returns all supported formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Markdown, Self::Html, Self::Text, Self::Docx]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::validation(format!(
                    "Invalid file type '{s}'. Expected one of: markdown, html, text, docx"
                ))
            })
    }
}

/// Configuration for a documentation run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Clone)]
#[non_exhaustive]
pub struct Config {
    /// API credential for the chat completion endpoint
    pub token: String,

    /// Source file to document
    pub input: PathBuf,

    /// Directory the document is written to
    pub output_dir: PathBuf,

    /// Output format
    pub format: OutputFormat,

    /// Chat model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Lines per window
    pub window_size: usize,

    /// Lines shared by consecutive windows
    pub overlap: usize,

    /// Additional attempts after a failed completion
    pub max_retries: u32,

    /// Pause between retry attempts
    pub retry_delay: Duration,

    /// Pause between successive completion requests
    pub request_delay: Duration,

    /// Accumulated lines per perspective fed into the summary prompts
    pub summary_line_limit: usize,

    /// Base URL of the chat completion API
    pub api_base_url: String,

    /// Timeout for a single HTTP request
    pub request_timeout: Duration,

    /// Persist per-perspective accumulated text
    pub keep_intermediate: bool,

    /// Print resolved configuration and per-call token usage
    pub verbose: bool,

    /// Draw the terminal progress bar
    pub show_progress: bool,

    /// Date stamped into output file names
    pub run_date: NaiveDate,
}

// The token must never end up in logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("input", &self.input)
            .field("output_dir", &self.output_dir)
            .field("format", &self.format)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("window_size", &self.window_size)
            .field("overlap", &self.overlap)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("request_delay", &self.request_delay)
            .field("summary_line_limit", &self.summary_line_limit)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("keep_intermediate", &self.keep_intermediate)
            .field("verbose", &self.verbose)
            .field("show_progress", &self.show_progress)
            .field("run_date", &self.run_date)
            .finish()
    }
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bimbus::Config;
    ///
    /// let config = Config::builder()
    ///     .token("sk-...")
    ///     .input("./src/main.rs")
    ///     .output_dir("./docs")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error if:
    /// - The token or input path is missing
    /// - The input file doesn't exist or isn't a regular file
    /// - The output directory doesn't exist or isn't a directory
    /// - Window or sampling settings are out of range
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::validation(
                "Please specify an Open AI token using -t",
            ));
        }

        if self.input.as_os_str().is_empty() {
            return Err(Error::validation("Please specify an input file using -i"));
        }

        if !self.input.exists() {
            return Err(Error::validation(format!(
                "Input file does not exist: {}",
                self.input.display()
            )));
        }

        if !self.input.is_file() {
            return Err(Error::validation(format!(
                "Input path is not a file: {}",
                self.input.display()
            )));
        }

        if !self.output_dir.exists() {
            return Err(Error::validation(format!(
                "Output directory does not exist: {}",
                self.output_dir.display()
            )));
        }

        if !self.output_dir.is_dir() {
            return Err(Error::validation(format!(
                "Output path is not a directory: {}",
                self.output_dir.display()
            )));
        }

        if self.window_size == 0 {
            return Err(Error::validation("window_size must be greater than 0"));
        }

        if self.overlap >= self.window_size {
            return Err(Error::validation(format!(
                "overlap ({}) must be less than window_size ({})",
                self.overlap, self.window_size
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::validation(format!(
                "temperature ({}) must be between 0 and 2",
                self.temperature
            )));
        }

        if self.summary_line_limit == 0 {
            return Err(Error::validation(
                "summary_line_limit must be greater than 0",
            ));
        }

        if self.model.trim().is_empty() {
            return Err(Error::validation("model must not be empty"));
        }

        Ok(())
    }
}

/// Returns the directory holding the running executable, or `.` when unknown.
fn default_output_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    token: Option<String>,
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    format: Option<OutputFormat>,
    model: Option<String>,
    temperature: Option<f32>,
    window_size: Option<usize>,
    overlap: Option<usize>,
    max_retries: Option<u32>,
    retry_delay: Option<Duration>,
    request_delay: Option<Duration>,
    summary_line_limit: Option<usize>,
    api_base_url: Option<String>,
    request_timeout: Option<Duration>,
    keep_intermediate: bool,
    verbose: bool,
    show_progress: Option<bool>,
    run_date: Option<NaiveDate>,
}

impl ConfigBuilder {
    /// Sets the API credential.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the file to document.
    #[must_use]
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    /// Sets the output directory.
    ///
    /// Defaults to the directory of the running executable.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the number of lines per window.
    #[must_use]
    pub fn window_size(mut self, lines: usize) -> Self {
        self.window_size = Some(lines);
        self
    }

    /// Sets the number of lines shared by consecutive windows.
    #[must_use]
    pub fn overlap(mut self, lines: usize) -> Self {
        self.overlap = Some(lines);
        self
    }

    /// Sets how many times a failed completion is retried.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Sets the pause between retry attempts.
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Sets the pause between successive requests.
    #[must_use]
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    /// Sets how many accumulated lines per perspective reach the summary prompts.
    #[must_use]
    pub fn summary_line_limit(mut self, lines: usize) -> Self {
        self.summary_line_limit = Some(lines);
        self
    }

    /// Sets the base URL of the chat completion API.
    #[must_use]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the timeout for a single HTTP request.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Enables persisting the per-perspective accumulated text.
    #[must_use]
    pub fn keep_intermediate(mut self, enabled: bool) -> Self {
        self.keep_intermediate = enabled;
        self
    }

    /// Enables verbose output.
    #[must_use]
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Enables or disables the terminal progress bar.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = Some(enabled);
        self
    }

    /// Overrides the date stamped into output file names.
    #[must_use]
    pub fn run_date(mut self, date: NaiveDate) -> Self {
        self.run_date = Some(date);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            token: self.token.unwrap_or_default(),
            input: self.input.unwrap_or_default(),
            output_dir: self.output_dir.unwrap_or_else(default_output_dir),
            format: self.format.unwrap_or(OutputFormat::Markdown),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            window_size: self.window_size.unwrap_or(DEFAULT_WINDOW_SIZE),
            overlap: self.overlap.unwrap_or(DEFAULT_OVERLAP),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_delay: self.retry_delay.unwrap_or(Duration::ZERO),
            request_delay: self.request_delay.unwrap_or(Duration::ZERO),
            summary_line_limit: self
                .summary_line_limit
                .unwrap_or(DEFAULT_SUMMARY_LINE_LIMIT),
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            keep_intermediate: self.keep_intermediate,
            verbose: self.verbose,
            show_progress: self.show_progress.unwrap_or(true),
            run_date: self
                .run_date
                .unwrap_or_else(|| chrono::Local::now().date_naive()),
        };

        config.validate()?;
        Ok(config)
    }
}
