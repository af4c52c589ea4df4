use anyhow::Context;
use bimbus::{Config, OutputFormat, Pipeline};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "bimbus",
    version,
    about = "Document a source file with an LLM",
    long_about = "Document a source file with an LLM.\n\n\
    The file is split into overlapping, line-numbered windows. Each window is explained \
    from three perspectives (purpose, plain language, technical details) and the notes \
    are then summarized into an Introduction, a Summary and a Technical Details section.\n\n\
    USAGE EXAMPLES:\n  \
      # Markdown next to the executable\n  \
      bimbus -t $OPENAI_API_KEY -i ./src/main.rs\n\n  \
      # HTML into ./docs, keeping the raw notes\n  \
      bimbus -t $OPENAI_API_KEY -i ./src/main.rs -o ./docs -f html -k",
    arg_required_else_help = true
)]
struct Cli {
    /// Open AI access token
    #[arg(short, long, value_name = "TOKEN")]
    token: Option<String>,

    /// Source file to document
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory (defaults to the directory of this program)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Output file type: markdown, html, text or docx
    #[arg(short = 'f', long, default_value = "markdown", value_name = "TYPE")]
    filetype: String,

    /// Keep the per-perspective notes next to the document
    #[arg(short, long)]
    keep: bool,

    /// Verbose output (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Chat model
    #[arg(long, default_value = "gpt-3.5-turbo")]
    model: String,

    /// Sampling temperature (0-2)
    #[arg(long, default_value_t = 0.5)]
    temperature: f32,

    /// Lines per window
    #[arg(long, default_value_t = 100)]
    window_size: usize,

    /// Lines shared by consecutive windows
    #[arg(long, default_value_t = 20)]
    overlap: usize,

    /// Retries after a failed request
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Pause between retries, in milliseconds
    #[arg(long, default_value_t = 0, value_name = "MS")]
    retry_delay_ms: u64,

    /// Pause between requests, in milliseconds
    #[arg(long, default_value_t = 0, value_name = "MS")]
    request_delay_ms: u64,

    /// Note lines per perspective sent to the summary prompts
    #[arg(long, default_value_t = 400)]
    summary_lines: usize,

    /// Base URL of the chat completion API
    #[arg(long, default_value = "https://api.openai.com/v1", value_name = "URL")]
    api_base: String,

    /// Timeout for a single request, in seconds
    #[arg(long, default_value_t = 120, value_name = "SECS")]
    timeout_secs: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}\n");
            eprintln!("Run 'bimbus -h' for help");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let format: OutputFormat = cli.filetype.parse()?;

    let mut builder = Config::builder()
        .format(format)
        .model(cli.model)
        .temperature(cli.temperature)
        .window_size(cli.window_size)
        .overlap(cli.overlap)
        .max_retries(cli.retries)
        .retry_delay(Duration::from_millis(cli.retry_delay_ms))
        .request_delay(Duration::from_millis(cli.request_delay_ms))
        .summary_line_limit(cli.summary_lines)
        .api_base_url(cli.api_base)
        .request_timeout(Duration::from_secs(cli.timeout_secs))
        .keep_intermediate(cli.keep)
        .verbose(cli.verbose > 0);

    if let Some(token) = cli.token {
        builder = builder.token(token);
    }

    if let Some(input) = cli.input {
        builder = builder.input(input);
    }

    if let Some(output) = cli.output {
        builder = builder.output_dir(output);
    }

    let config = builder.build()?;

    if config.verbose {
        print_config(&config);
    }

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Documentation run failed")?;

    stats.print_summary();

    Ok(())
}

fn print_config(config: &Config) {
    println!("Open AI Token:    {}", mask(&config.token));
    println!("Input File:       {}", config.input.display());
    println!("Output Directory: {}", config.output_dir.display());
    println!("File Type:        {}", config.format);
    println!("Model:            {}", config.model);
    println!(
        "Windows:          {} lines, {} overlap",
        config.window_size, config.overlap
    );
    println!("Retries:          {}", config.max_retries);
    println!();
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{visible}****")
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("bimbus=info"),
        1 => EnvFilter::new("bimbus=debug"),
        _ => EnvFilter::new("bimbus=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}
