//! CLI binary for syllabus-analyzer.
//!
//! `serve` runs the HTTP service; `analyze` runs the same pipeline on a
//! local file. Both are thin shims mapping flags to the library configs.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use syllabus_analyzer::{
    extract_upload, server, AnalysisConfig, AnalysisOutput, AnalysisService, Extractor,
    ServerConfig, SyllabusAnalysis, UploadedDocument,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on the default port (5000)
  syllabus-analyzer serve

  # Production mode behind a proxy, fixed frontend origin
  syllabus-analyzer serve --bind 0.0.0.0:5000 --production \
      --allowed-origin https://syllabus.example.edu --trust-forwarded-for

  # Analyze a local file and print the JSON response
  syllabus-analyzer analyze syllabus.pdf

  # Human-readable summary
  syllabus-analyzer analyze syllabus.docx --summary

  # Extraction only (no API key needed)
  syllabus-analyzer analyze scan.png --text-only

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory containing libpdfium
  TESSERACT_BIN           tesseract executable (default: tesseract on PATH)
  PRODUCTION              Restrict CORS to FRONTEND_URL
  FRONTEND_URL            Allowed CORS origin in production

  Variables may also be set in a .env file in the working directory.
"#;

/// Extract text from syllabus documents and summarise them with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "syllabus-analyzer",
    version,
    about = "Extract text from syllabus documents and summarise them with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SYLLABUS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SYLLABUS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Analyze a local document.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "SYLLABUS_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Restrict CORS to --allowed-origin.
    #[arg(long, env = "PRODUCTION")]
    production: bool,

    /// Frontend origin allowed by CORS in production mode.
    #[arg(long, env = "FRONTEND_URL")]
    allowed_origin: Option<String>,

    /// Requests per client per hour (0 disables).
    #[arg(long, env = "SYLLABUS_HOURLY_LIMIT", default_value_t = 12)]
    hourly_limit: u32,

    /// Requests per client per day (0 disables).
    #[arg(long, env = "SYLLABUS_DAILY_LIMIT", default_value_t = 24)]
    daily_limit: u32,

    /// Key rate limits on the first X-Forwarded-For hop.
    #[arg(long, env = "SYLLABUS_TRUST_FORWARDED_FOR")]
    trust_forwarded_for: bool,

    /// Maximum upload size in bytes.
    #[arg(long, env = "SYLLABUS_MAX_UPLOAD_BYTES", default_value_t = 16 * 1024 * 1024)]
    max_upload_bytes: usize,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Document to analyze (.pdf, .docx, .png, .jpg, or any text file).
    file: PathBuf,

    /// Print extracted text only; the LLM is not called.
    #[arg(long)]
    text_only: bool,

    /// Print a human-readable summary instead of JSON.
    #[arg(long, conflicts_with = "text_only")]
    summary: bool,

    /// Disable the spinner.
    #[arg(long, env = "SYLLABUS_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

/// Flags shared by `serve` and `analyze`.
#[derive(Args, Debug)]
struct PipelineArgs {
    /// LLM model ID (default: gpt-4o-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SYLLABUS_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "SYLLABUS_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SYLLABUS_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Tesseract language(s), e.g. eng or eng+fra.
    #[arg(long, env = "SYLLABUS_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// tesseract executable.
    #[arg(long, env = "TESSERACT_BIN", default_value = "tesseract")]
    tesseract_bin: PathBuf,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Directory for staged uploads (default: OS temp dir).
    #[arg(long, env = "SYLLABUS_TEMP_DIR")]
    temp_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Analyze(args) => run_analyze(args, cli.quiet).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let analysis = build_analysis_config(&args.pipeline).await?;

    let mut builder = ServerConfig::builder()
        .bind(args.bind)
        .production(args.production)
        .hourly_limit(args.hourly_limit)
        .daily_limit(args.daily_limit)
        .trust_forwarded_for(args.trust_forwarded_for)
        .max_upload_bytes(args.max_upload_bytes);
    if let Some(origin) = args.allowed_origin {
        builder = builder.allowed_origin(origin);
    }
    let server_config = builder.build().context("Invalid server configuration")?;

    let service =
        AnalysisService::from_config(&analysis).context("Failed to configure LLM provider")?;

    tracing::info!("Starting syllabus-analyzer v{}", env!("CARGO_PKG_VERSION"));
    server::serve(service, &server_config)
        .await
        .context("Server failed")?;
    Ok(())
}

async fn run_analyze(args: AnalyzeArgs, quiet: bool) -> Result<()> {
    let config = build_analysis_config(&args.pipeline).await?;

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let doc = UploadedDocument::new(filename, bytes);

    let show_progress = !quiet && !args.no_progress && io::stderr().is_terminal();
    let spinner = show_progress.then(|| spinner(&doc.filename));

    // ── Text-only mode ───────────────────────────────────────────────────
    if args.text_only {
        let extractor = Extractor::from_config(&config);
        let text = extract_upload(&extractor, &doc, config.temp_dir.as_deref()).await;
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
        println!("{}", text.context("Extraction failed")?);
        return Ok(());
    }

    let service =
        AnalysisService::from_config(&config).context("Failed to configure LLM provider")?;
    let output = service.analyze_upload(doc).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let output = output.context("Analysis failed")?;

    if args.summary {
        print_summary(&output)?;
    } else {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !quiet {
        eprintln!(
            "{}  {}  {}",
            green("✔"),
            bold(&output.filename),
            dim(&format!("{} characters extracted", output.chars_extracted)),
        );
    }
    Ok(())
}

fn spinner(filename: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Analyzing");
    bar.set_message(filename.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn print_summary(output: &AnalysisOutput) -> Result<()> {
    let a: SyllabusAnalysis = output
        .parsed()
        .context("LLM response does not match the analysis schema")?;

    let code = a.course_info.course_code.as_deref().unwrap_or("");
    let heading = format!("{} {}", code, a.course_info.title);
    println!("{} {}", cyan("◆"), bold(heading.trim()));
    if !a.course_info.description.is_empty() {
        println!("  {}", a.course_info.description);
    }

    if !a.instructor_info.instructors.is_empty() {
        println!("\n{}", bold("Instructors"));
        for p in &a.instructor_info.instructors {
            let contact = [p.email.as_deref(), p.office_hours.as_deref()]
                .into_iter()
                .flatten()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" · ");
            println!("  {}  {}", p.name, dim(&contact));
        }
    }

    if !a.grade_distribution.weights.is_empty() {
        println!("\n{}", bold("Grading"));
        for w in &a.grade_distribution.weights {
            println!("  {:<24} {:>5.1}%", w.category, w.percentage);
        }
        println!("  {}", dim(&format!("total {:.1}%", a.total_weight())));
    }

    if !a.schedule.entries.is_empty() {
        println!("\n{}", bold("Schedule"));
        for e in &a.schedule.entries {
            let when = match (e.week, e.date.as_deref()) {
                (Some(w), _) => format!("Week {w}"),
                (None, Some(d)) if !d.is_empty() => d.to_string(),
                _ => String::new(),
            };
            println!("  {:<12} {}", dim(&when), e.topic);
        }
    }
    Ok(())
}

/// Map CLI flags to `AnalysisConfig`.
async fn build_analysis_config(args: &PipelineArgs) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .ocr_language(args.ocr_lang.clone())
        .tesseract_bin(args.tesseract_bin.clone());

    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = args.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(ref dir) = args.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }
    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
