//! CLI binary for resume-review.
//!
//! A thin shim over the library crate: `submit` maps flags to a
//! `PipelineConfig` and runs one submission, `show` prints a stored record.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use resume_review::{
    load_document, load_record, CancellationToken, Feedback, FileKvStore, Pipeline,
    PipelineConfig, RecordState, StatusReporter, SubmissionRecord, SubmissionRequest,
    SubmissionStatus, TipKind,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI status reporter using indicatif ──────────────────────────────────────

/// Shows the current status label next to a spinner and prints a final
/// line once the submission ends.
struct CliStatusReporter {
    bar: ProgressBar,
}

impl CliStatusReporter {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl StatusReporter for CliStatusReporter {
    fn on_status(&self, status: &SubmissionStatus) {
        match status {
            SubmissionStatus::Complete => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", green("✔"), status);
            }
            SubmissionStatus::Failed(_) | SubmissionStatus::Cancelled => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", red("✘"), status);
            }
            _ => self.bar.set_message(status.to_string()),
        }
    }

    fn on_navigate(&self, target: &str) {
        eprintln!("  {} {}", dim("→"), bold(target));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Review a résumé against a job posting
  resume-review submit resume.pdf --company Acme --job-title "Backend Engineer" \
      --job-description-file posting.txt

  # Machine-readable output
  resume-review submit resume.pdf --company Acme --job-title SWE --json

  # Print a stored record
  resume-review show 1b4e28ba-2fa1-11d2-883f-0016d3cca427

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is not set
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (defaults to the system library)
  RESUME_REVIEW_DATA_DIR  Where uploads and records are stored
"#;

/// Get ATS feedback on a résumé from a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "resume-review",
    version,
    about = "Get ATS-style feedback on a résumé for a specific job posting",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding uploaded files and records.
    #[arg(long, global = true, env = "RESUME_REVIEW_DATA_DIR", default_value = "./resume-data")]
    data_dir: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "RESUME_REVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "RESUME_REVIEW_QUIET")]
    quiet: bool,

    /// Print JSON instead of a human-readable summary.
    #[arg(long, global = true, env = "RESUME_REVIEW_JSON")]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a résumé and wait for its feedback.
    Submit(SubmitArgs),
    /// Print a stored record by id.
    Show {
        /// Record id as printed by `submit`.
        id: String,
    },
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Résumé file (PDF).
    file: PathBuf,

    /// Company the application is for.
    #[arg(long, default_value = "")]
    company: String,

    /// Title of the position.
    #[arg(long, default_value = "")]
    job_title: String,

    /// Job description text.
    #[arg(long, conflicts_with = "job_description_file")]
    job_description: Option<String>,

    /// Read the job description from a file.
    #[arg(long)]
    job_description_file: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "RESUME_REVIEW_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Pages of the résumé sent to the model.
    #[arg(long, env = "RESUME_REVIEW_MAX_PAGES", default_value_t = 2)]
    max_pages: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RESUME_REVIEW_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "RESUME_REVIEW_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Analysis timeout in seconds.
    #[arg(long, env = "RESUME_REVIEW_ANALYSIS_TIMEOUT", default_value_t = 120)]
    analysis_timeout: u64,

    /// Disable the spinner.
    #[arg(long, env = "RESUME_REVIEW_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already shows every stage; keep INFO logs out of its way.
    let show_progress = match &cli.command {
        Command::Submit(args) => !cli.quiet && !args.no_progress && !cli.json,
        Command::Show { .. } => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Submit(args) => run_submit(&cli, args, show_progress).await,
        Command::Show { id } => run_show(&cli, id).await,
    }
}

async fn run_submit(cli: &Cli, args: &SubmitArgs, show_progress: bool) -> Result<()> {
    let config = build_config(args, show_progress).await?;
    let pipeline =
        Pipeline::local(&cli.data_dir, config).context("Failed to set up the pipeline")?;

    let job_description = match (&args.job_description, &args.job_description_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job description from {:?}", path))?,
        (None, None) => String::new(),
    };

    let file = load_document(&args.file)
        .await
        .with_context(|| format!("Failed to read {:?}", args.file))?;
    let request = SubmissionRequest::new(&args.company, &args.job_title, job_description, file);

    // Ctrl-C stops the submission at the current stage.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = pipeline
        .submit_with_cancel(request, &cancel)
        .await
        .context("Submission failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome.record)
            .context("Failed to serialise record")?;
        println!("{json}");
    } else if !cli.quiet {
        print_record(&outcome.record);
    }
    Ok(())
}

async fn run_show(cli: &Cli, id: &str) -> Result<()> {
    let store = FileKvStore::new(records_dir(&cli.data_dir));
    let record = load_record(&store, id)
        .await
        .with_context(|| format!("Failed to read record {id}"))?
        .with_context(|| format!("No record with id {id}"))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record).context("Failed to serialise record")?
        );
    } else {
        print_record(&record);
    }
    Ok(())
}

fn records_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("records")
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(args: &SubmitArgs, show_progress: bool) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .max_analysis_pages(args.max_pages)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .analysis_timeout_secs(args.analysis_timeout);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref lib) = args.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if show_progress {
        builder = builder.status_reporter(CliStatusReporter::new());
    }

    builder.build().context("Invalid configuration")
}

fn print_record(record: &SubmissionRecord) {
    println!("Record:       {}", record.id);
    println!("Company:      {}", record.company);
    println!("Job title:    {}", record.job_title);
    println!("Résumé:       {}", record.resume_path);
    println!("Preview:      {}", record.image_path);

    match (record.state(), record.feedback.as_ready()) {
        (RecordState::Complete, Some(feedback)) => print_feedback(feedback),
        _ => println!("Feedback:     {}", cyan("still processing")),
    }
}

fn print_feedback(feedback: &Feedback) {
    println!();
    for (name, score) in feedback.scores() {
        println!("  {:<14} {:>3}/100", bold(name), score);
    }

    let marker = |kind: TipKind| match kind {
        TipKind::Good => green("✓"),
        TipKind::Improve => cyan("•"),
    };

    println!("\n{}", bold("ATS"));
    for tip in &feedback.ats.tips {
        println!("  {} {}", marker(tip.kind), tip.tip);
    }

    let sections = [
        ("Tone & style", &feedback.tone_and_style),
        ("Content", &feedback.content),
        ("Structure", &feedback.structure),
        ("Skills", &feedback.skills),
    ];
    for (title, section) in sections {
        println!("\n{}", bold(title));
        for tip in &section.tips {
            println!("  {} {}", marker(tip.kind), tip.tip);
            if !tip.explanation.is_empty() {
                println!("    {}", dim(&tip.explanation));
            }
        }
    }
}
