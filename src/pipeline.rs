use crate::{
    accumulator::Accumulator,
    chunker::Chunker,
    client::{
        ChatClient, ChatReply, ChatRequest, OpenAiClient, RetryPolicy, complete_with_retry_notify,
    },
    config::Config,
    document::Document,
    error::{Error, Result},
    postprocess,
    progress::Progress,
    prompt::{Perspective, window_prompt},
    summarizer::{SectionKind, Summarizer},
    writer::Writer,
};
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, info, instrument, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Lines in the input file
    pub total_lines: usize,

    /// Windows the file was split into
    pub windows: usize,

    /// Completion requests that succeeded
    pub requests: usize,

    /// Tokens reported by the API across all requests
    pub total_tokens: u64,

    /// Accumulated note lines per perspective
    pub note_lines: Vec<(Perspective, usize)>,

    /// Total execution time
    pub duration: Duration,

    /// Time spent on the per-window requests
    pub explain_duration: Duration,

    /// Time spent on the summary requests
    pub summarize_duration: Duration,

    /// Final document path
    pub output_path: PathBuf,

    /// Intermediate files written with `--keep`
    pub intermediate_files: Vec<PathBuf>,
}

impl PipelineStats {
    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║            Bimbus AI Run Summary                      ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Input Lines:          {:>8}                        ║",
            self.total_lines
        );
        println!(
            "║ Windows:              {:>8}                        ║",
            self.windows
        );
        println!(
            "║ Requests:             {:>8}                        ║",
            self.requests
        );
        println!(
            "║ Tokens Used:          {:>8}                        ║",
            self.total_tokens
        );
        println!("║                                                       ║");
        for (perspective, lines) in &self.note_lines {
            println!(
                "║   - {:<10} notes: {:>8} lines                  ║",
                perspective.tag(),
                lines
            );
        }
        println!("║                                                       ║");
        println!("║ Output:                                               ║");
        println!("║   {}", self.output_path.display());
        for path in &self.intermediate_files {
            println!("║   {}", path.display());
        }
        println!("║                                                       ║");
        println!("║ Timing Breakdown:                                     ║");
        println!(
            "║   - Explaining:       {:>8.2}s                     ║",
            self.explain_duration.as_secs_f64()
        );
        println!(
            "║   - Summarizing:      {:>8.2}s                     ║",
            self.summarize_duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Main pipeline orchestrator: explain every window, summarize, write.
pub struct Pipeline {
    config: Config,
    client: Box<dyn ChatClient>,
    writer: Writer,
}

impl Pipeline {
    /// Creates a new pipeline talking to the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The HTTP client or writer can't be initialized
    pub fn new(config: Config) -> Result<Self> {
        let client = OpenAiClient::new(&config)?;
        Self::with_client(config, Box::new(client))
    }

    /// Creates a pipeline with a custom chat client.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation or writer setup fails.
    pub fn with_client(config: Config, client: Box<dyn ChatClient>) -> Result<Self> {
        config.validate()?;
        let writer = Writer::new(&config)?;

        Ok(Self {
            config,
            client,
            writer,
        })
    }

    /// Executes the complete pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Read**: Loads the input file as lines
    /// 2. **Explain**: Sends every window once per perspective, accumulating replies
    /// 3. **Summarize**: Turns each perspective's notes into a document section
    /// 4. **Write**: Cleans up the sections and writes the document
    ///
    /// Requests are strictly sequential. Any exhausted retry aborts the run and
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the input can't be read, a completion fails after
    /// all retries, or an output file can't be written.
    #[instrument(skip(self), fields(input = %self.config.input.display()))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();

        info!("Running Bimbus AI...");

        let document = Document::read(&self.config.input)?;
        if document.is_empty() {
            return Err(Error::empty_document(&document.path));
        }

        let chunker = Chunker::new(self.config.window_size, self.config.overlap)?;
        let windows = chunker.windows(document.line_count());
        let window_count = windows.len();

        info!(
            "Stage 1/3: Explaining {} lines in {} windows...",
            document.line_count(),
            window_count
        );

        let total_steps = window_count * Perspective::ALL.len() + SectionKind::ALL.len();
        let progress = Progress::new(total_steps as u64, self.config.show_progress);
        let retry = RetryPolicy::from_config(&self.config);

        let mut notes = Accumulator::new();
        let mut requests = 0;
        let mut total_tokens = 0;

        let explain_start = Instant::now();
        for (index, window) in windows.enumerate() {
            let numbered = document.numbered(window);

            for perspective in Perspective::ALL {
                progress.set_message(format!(
                    "window {}/{} ({}) {}",
                    index + 1,
                    window_count,
                    window,
                    perspective
                ));

                let prompt = window_prompt(
                    &document.name,
                    window,
                    perspective,
                    notes.last_line(perspective),
                    &numbered,
                );
                let request = ChatRequest::new(&self.config.model, self.config.temperature, &prompt);

                if requests > 0 && !self.config.request_delay.is_zero() {
                    thread::sleep(self.config.request_delay);
                }

                let reply = complete_with_retry_notify(
                    &self.client,
                    &request,
                    retry,
                    |attempt, attempts, err| warn_retry(&progress, attempt, attempts, err),
                )?;
                requests += 1;
                total_tokens += self.record_usage(&progress, &reply);

                notes.append(perspective, &reply.text);
                progress.advance();
            }

            progress.suspend(|| debug!("Explained {} of {}", window, document.name));
        }
        let explain_duration = explain_start.elapsed();

        progress.suspend(|| {
            info!(
                "✓ Explained {} windows in {:.2}s",
                window_count,
                explain_duration.as_secs_f64()
            );
            info!("Stage 2/3: Summarizing...");
        });
        progress.set_message("summarizing");

        let summarize_start = Instant::now();
        if !self.config.request_delay.is_zero() {
            thread::sleep(self.config.request_delay);
        }
        let sections = Summarizer::new(&self.config).summarize(
            &self.client,
            &document.name,
            &notes,
            |kind, reply| {
                requests += 1;
                total_tokens += self.record_usage(&progress, reply);
                progress.advance();
                progress.suspend(|| debug!("Summarized {}", kind.title()));
            },
            |attempt, attempts, err| warn_retry(&progress, attempt, attempts, err),
        )?;
        let sections = postprocess::tidy(sections);
        let summarize_duration = summarize_start.elapsed();

        progress.finish();
        debug!("Completed {}/{} steps", progress.position(), total_steps);

        info!("Stage 3/3: Writing output files...");

        let output_path = self.writer.write_document(&document.name, &sections)?;

        let mut intermediate_files = Vec::new();
        if self.config.keep_intermediate {
            for perspective in Perspective::ALL {
                intermediate_files.push(self.writer.write_intermediate(
                    &document.name,
                    perspective,
                    &notes.snapshot(perspective),
                )?);
            }
        }

        let duration = start_time.elapsed();
        info!("✓ Done in {:.2}s", duration.as_secs_f64());

        Ok(PipelineStats {
            total_lines: document.line_count(),
            windows: window_count,
            requests,
            total_tokens,
            note_lines: Perspective::ALL
                .iter()
                .map(|&p| (p, notes.line_count(p)))
                .collect(),
            duration,
            explain_duration,
            summarize_duration,
            output_path,
            intermediate_files,
        })
    }

    /// Logs token usage in verbose mode and returns the tokens used.
    fn record_usage(&self, progress: &Progress, reply: &ChatReply) -> u64 {
        let Some(usage) = reply.usage else {
            return 0;
        };

        if self.config.verbose {
            progress.suspend(|| {
                info!(
                    "Tokens used: {} (prompt {}, completion {})",
                    usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
                );
            });
        }

        usage.total_tokens
    }
}

/// Logs a failed completion attempt without tearing the progress bar.
fn warn_retry(progress: &Progress, attempt: u32, attempts: u32, err: &Error) {
    progress.suspend(|| warn!("Completion attempt {attempt}/{attempts} failed: {err}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TokenUsage;
    use crate::config::OutputFormat;
    use assert_fs::prelude::*;
    use chrono::NaiveDate;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Answers window prompts with a dash line and summary prompts with prose.
    #[derive(Clone, Default)]
    struct ScriptedClient {
        prompts: Rc<RefCell<Vec<String>>>,
        times: Rc<RefCell<Vec<Instant>>>,
        fail_after: Option<usize>,
        calls: Rc<Cell<usize>>,
    }

    impl ChatClient for ScriptedClient {
        fn complete(&self, request: &ChatRequest) -> Result<ChatReply> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            self.times.borrow_mut().push(Instant::now());

            if self.fail_after.is_some_and(|limit| call > limit) {
                return Err(Error::request("500 Internal Server Error"));
            }

            self.prompts.borrow_mut().push(request.prompt.clone());

            let text = if request.prompt.contains("```") {
                format!("- Line {call}: reply {call}\n\n")
            } else {
                "This section describes the file.\n\nIt reads input.\n\nIt writes output.".to_string()
            };

            Ok(ChatReply {
                text,
                usage: Some(TokenUsage {
                    prompt_tokens: 7,
                    completion_tokens: 3,
                    total_tokens: 10,
                }),
            })
        }
    }

    fn create_test_config(
        temp: &assert_fs::TempDir,
        lines: usize,
        format: OutputFormat,
        keep: bool,
    ) -> Config {
        let source = (1..=lines)
            .map(|i| format!("let x{i} = {i};"))
            .collect::<Vec<_>>()
            .join("\n");
        let input = temp.child("main.rs");
        input.write_str(&source).unwrap();

        let out = temp.child("out");
        out.create_dir_all().unwrap();

        Config::builder()
            .token("sk-test")
            .input(input.path())
            .output_dir(out.path())
            .format(format)
            .window_size(100)
            .overlap(20)
            .max_retries(1)
            .keep_intermediate(keep)
            .show_progress(false)
            .run_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_pipeline_basic_execution() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = create_test_config(&temp, 250, OutputFormat::Markdown, false);
        let client = ScriptedClient::default();

        let stats = Pipeline::with_client(config, Box::new(client.clone()))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(stats.windows, 3);
        assert_eq!(stats.requests, 3 * 3 + 3);
        assert_eq!(stats.total_tokens, 120);
        assert_eq!(
            stats.output_path,
            temp.path().join("out").join("main-rs--2024-01-02.md")
        );

        let content = std::fs::read_to_string(&stats.output_path).unwrap();
        assert!(content.starts_with("# main.rs"));
        assert!(content.contains("## Introduction"));
        assert!(content.contains("## Technical Details"));
        // leading paragraph trimmed from Summary but not from Introduction
        assert_eq!(content.matches("This section describes the file.").count(), 1);
    }

    #[test]
    fn test_pipeline_carries_continuation() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = create_test_config(&temp, 250, OutputFormat::Markdown, false);
        let client = ScriptedClient::default();

        Pipeline::with_client(config, Box::new(client.clone()))
            .unwrap()
            .run()
            .unwrap();

        let prompts = client.prompts.borrow();
        // window 1: purpose, plain, technical; window 2 starts with purpose
        assert!(!prompts[0].contains("Carry on from"));
        assert!(prompts[3].contains("lines 81 to 180"));
        assert!(prompts[3].contains("\"- Line 1: reply 1\""));
        assert!(prompts[4].contains("\"- Line 2: reply 2\""));
        assert!(prompts[8].contains("lines 161 to 250"));
    }

    #[test]
    fn test_pipeline_keeps_intermediate_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = create_test_config(&temp, 10, OutputFormat::Html, true);

        let stats = Pipeline::with_client(config, Box::new(ScriptedClient::default()))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(stats.windows, 1);
        assert_eq!(stats.intermediate_files.len(), 3);

        let out = temp.child("out");
        out.child("main-rs--2024-01-02.html").assert(predicates::path::exists());
        let purpose = out.child("main-rs--purpose--2024-01-02.txt");
        purpose.assert("- Line 1: reply 1");
        out.child("main-rs--plain--2024-01-02.txt")
            .assert("- Line 2: reply 2");
        out.child("main-rs--technical--2024-01-02.txt")
            .assert("- Line 3: reply 3");
    }

    #[test]
    fn test_pipeline_failure_writes_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = create_test_config(&temp, 250, OutputFormat::Markdown, true);
        let client = ScriptedClient {
            fail_after: Some(4),
            ..ScriptedClient::default()
        };

        let err = Pipeline::with_client(config, Box::new(client))
            .unwrap()
            .run()
            .unwrap_err();

        assert!(err.is_completion());
        let written = std::fs::read_dir(temp.child("out").path()).unwrap().count();
        assert_eq!(written, 0);
    }

    #[test]
    fn test_pipeline_rejects_empty_input() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = create_test_config(&temp, 0, OutputFormat::Markdown, false);

        let err = Pipeline::with_client(config, Box::new(ScriptedClient::default()))
            .unwrap()
            .run()
            .unwrap_err();

        assert!(matches!(err, Error::EmptyDocument { .. }));
    }

    #[test]
    fn test_pipeline_pauses_between_all_requests() {
        let temp = assert_fs::TempDir::new().unwrap();
        let mut config = create_test_config(&temp, 10, OutputFormat::Markdown, false);
        let delay = Duration::from_millis(40);
        config.request_delay = delay;
        let client = ScriptedClient::default();

        Pipeline::with_client(config, Box::new(client.clone()))
            .unwrap()
            .run()
            .unwrap();

        // one window: three explain requests, then three summary requests
        let times = client.times.borrow();
        assert_eq!(times.len(), 6);
        for pair in times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= delay);
        }
    }

    #[test]
    fn test_verbose_usage_is_totalled() {
        let temp = assert_fs::TempDir::new().unwrap();
        let mut config = create_test_config(&temp, 10, OutputFormat::Text, false);
        config.verbose = true;

        let pipeline = Pipeline::with_client(config, Box::new(ScriptedClient::default())).unwrap();
        let progress = Progress::new(1, false);

        let counted = pipeline.record_usage(
            &progress,
            &ChatReply {
                text: "- Line 1: x".to_string(),
                usage: Some(TokenUsage {
                    prompt_tokens: 20,
                    completion_tokens: 5,
                    total_tokens: 25,
                }),
            },
        );
        assert_eq!(counted, 25);
        assert_eq!(pipeline.record_usage(&progress, &ChatReply::from_text("no usage")), 0);

        let stats = pipeline.run().unwrap();
        assert_eq!(stats.requests, 6);
        assert_eq!(stats.total_tokens, 60);
    }

    #[test]
    fn test_document_failure_skips_intermediate_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = create_test_config(&temp, 10, OutputFormat::Markdown, true);

        // a directory where the document should go makes the write fail
        let out = temp.child("out");
        out.child("main-rs--2024-01-02.md").create_dir_all().unwrap();

        let err = Pipeline::with_client(config, Box::new(ScriptedClient::default()))
            .unwrap()
            .run()
            .unwrap_err();

        assert!(err.is_io());
        let names: Vec<_> = std::fs::read_dir(out.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["main-rs--2024-01-02.md"]);
    }
}
