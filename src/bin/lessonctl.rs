//! CLI binary for pdf-lesson-client.
//!
//! A thin shim over the library crate that maps CLI flags to `ClientConfig`,
//! drives a `SessionController` and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_lesson_client::{
    save_result, ApiClient, ClientConfig, DocumentSource, JobOutcome, PageRange, PngFileSurface,
    PollEvent, RemoteApi, SessionController, SessionError, SessionObserver,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
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

// ── Session events relayed to the command loop ───────────────────────────────

#[derive(Debug)]
enum CliEvent {
    Loaded(u32),
    LoadFailed(String),
    Rendered(u32),
    RenderFailed(u32, String),
}

/// Forwards session events over a channel so commands can await them.
///
/// Events from generations older than the latest started load are dropped.
struct ChannelObserver {
    tx: mpsc::UnboundedSender<CliEvent>,
    latest: AtomicU64,
}

impl ChannelObserver {
    fn new(tx: mpsc::UnboundedSender<CliEvent>) -> Self {
        Self {
            tx,
            latest: AtomicU64::new(0),
        }
    }

    fn send(&self, generation: u64, event: CliEvent) {
        if generation >= self.latest.load(Ordering::SeqCst) {
            let _ = self.tx.send(event);
        }
    }
}

impl SessionObserver for ChannelObserver {
    fn on_load_started(&self, generation: u64, _source: &DocumentSource) {
        self.latest.fetch_max(generation, Ordering::SeqCst);
    }

    fn on_document_loaded(&self, generation: u64, page_count: u32) {
        self.send(generation, CliEvent::Loaded(page_count));
    }

    fn on_load_failed(&self, generation: u64, _source: &DocumentSource, error: &SessionError) {
        self.send(generation, CliEvent::LoadFailed(error.to_string()));
    }

    fn on_page_rendered(&self, generation: u64, page: u32) {
        self.send(generation, CliEvent::Rendered(page));
    }

    fn on_render_failed(&self, generation: u64, page: u32, error: &SessionError) {
        self.send(generation, CliEvent::RenderFailed(page, error.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # List documents stored on the backend
  lessonctl list

  # Preview page 3 of a local PDF
  lessonctl preview --file slides.pdf --page 3 -o page3.png

  # Build a lesson from pages 2-6 and download the bundle
  lessonctl submit --file slides.pdf --from 2 --to 6 --download .

  # Check on / fetch a job later
  lessonctl status 4f1c...
  lessonctl download 4f1c... -o lesson.zip

ENVIRONMENT VARIABLES:
  LESSON_API_URL          API root (default http://localhost:8000/api)
  LESSON_CONTENT_URL      Template for stored document bytes ({base}, {id})
  LESSON_POLL_INTERVAL_MS Delay between job status checks
  LESSON_MAX_POLLS        Status checks before giving up
  PDFIUM_LIB_PATH         pdfium shared library, or the directory containing it
  RUST_LOG                Overrides --verbose / --quiet
"#;

/// Preview PDFs and build lessons from page ranges.
#[derive(Parser, Debug)]
#[command(
    name = "lessonctl",
    version,
    about = "Preview PDFs and build lessons from page ranges",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    conn: ConnectionArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LESSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LESSON_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// API root of the lesson backend.
    #[arg(long, global = true, env = "LESSON_API_URL", default_value = "http://localhost:8000/api")]
    api_url: String,

    /// URL template for stored document bytes.
    #[arg(long, global = true, env = "LESSON_CONTENT_URL")]
    content_url: Option<String>,

    /// Delay between job status checks in milliseconds.
    #[arg(long, global = true, env = "LESSON_POLL_INTERVAL_MS", default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Status checks before giving up.
    #[arg(long, global = true, env = "LESSON_MAX_POLLS", default_value_t = 300)]
    max_polls: u32,

    /// Timeout for JSON API calls in seconds.
    #[arg(long, global = true, env = "LESSON_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// Timeout for uploads and downloads in seconds.
    #[arg(long, global = true, env = "LESSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Longest edge of preview images in pixels.
    #[arg(long, global = true, env = "LESSON_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// pdfium shared library, or the directory containing it.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Local PDF file.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Id of a document stored on the backend.
    #[arg(long)]
    id: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored documents.
    List,
    /// Show the server-side page count of a stored document.
    Info { id: String },
    /// Upload a PDF and print its new id.
    Upload { file: PathBuf },
    /// Render one page of a document to PNG.
    Preview {
        #[command(flatten)]
        source: SourceArgs,
        /// 1-based page to render.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Output PNG path.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Submit a page range, wait for the job and optionally download the result.
    Submit {
        #[command(flatten)]
        source: SourceArgs,
        /// First page (1-based, inclusive).
        #[arg(long)]
        from: i64,
        /// Last page (1-based, inclusive).
        #[arg(long)]
        to: i64,
        /// Download the finished bundle to this file or directory.
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Check a job's status once.
    Status { job_id: String },
    /// Download a finished job's bundle.
    Download {
        job_id: String,
        /// Target file or directory.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli.conn)?;

    match cli.command {
        Command::List => {
            let api = ApiClient::new(&config)?;
            let docs = api.list_documents().await.context("Failed to list documents")?;
            if docs.is_empty() && !cli.quiet {
                eprintln!("{}", dim("no documents stored"));
            }
            for doc in docs {
                println!("{}  {}", doc.pdf_id, dim(&doc.pdf_key));
            }
        }
        Command::Info { id } => {
            let api = ApiClient::new(&config)?;
            let info = api
                .document_info(&id)
                .await
                .with_context(|| format!("Failed to fetch info for '{id}'"))?;
            println!("Document:  {}", info.pdf_id);
            println!("Pages:     {}", info.num_pages);
        }
        Command::Upload { file } => {
            let api = ApiClient::new(&config)?;
            let DocumentSource::File { name, bytes } = DocumentSource::from_path(&file).await?
            else {
                bail!("'{}' is not a local file", file.display());
            };
            let uploaded = api
                .upload_document(&name, bytes)
                .await
                .context("Upload failed")?;
            println!("{}", uploaded.pdf_id);
        }
        Command::Preview {
            source,
            page,
            output,
        } => preview(&config, source, page, &output, cli.quiet).await?,
        Command::Submit {
            source,
            from,
            to,
            download,
        } => {
            submit(
                &config,
                source,
                PageRange::new(from, to),
                download.as_deref(),
                cli.quiet,
            )
            .await?
        }
        Command::Status { job_id } => {
            let api = ApiClient::new(&config)?;
            let status = api
                .job_status(&job_id)
                .await
                .with_context(|| format!("Failed to fetch status of job '{job_id}'"))?;
            println!("{}  {}", status.job_id, bold(status.state.as_str()));
            if let Some(err) = status.error {
                println!("{}", red(&err));
            }
        }
        Command::Download { job_id, output } => {
            let api = ApiClient::new(&config)?;
            let path = save_result(&api, &job_id, &output)
                .await
                .context("Download failed")?;
            if !cli.quiet {
                eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(conn: &ConnectionArgs) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(&conn.api_url)
        .poll_interval_ms(conn.poll_interval_ms)
        .max_poll_attempts(conn.max_polls)
        .request_timeout_secs(conn.api_timeout)
        .download_timeout_secs(conn.download_timeout)
        .max_rendered_pixels(conn.max_pixels);
    if let Some(ref template) = conn.content_url {
        builder = builder.content_url_template(template);
    }
    if let Some(ref path) = conn.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }
    builder.build().context("Invalid configuration")
}

async fn resolve_source(args: SourceArgs) -> Result<DocumentSource> {
    match (args.file, args.id) {
        (Some(path), _) => DocumentSource::from_path(&path)
            .await
            .with_context(|| format!("Failed to read '{}'", path.display())),
        (None, Some(id)) => Ok(DocumentSource::remote(id)),
        (None, None) => bail!("either --file or --id is required"),
    }
}

/// Select `source` and wait for its first page to render; returns the page count.
async fn open(
    controller: &SessionController,
    events: &mut mpsc::UnboundedReceiver<CliEvent>,
    source: DocumentSource,
) -> Result<u32> {
    let label = source.label();
    controller.on_source_selected(source);
    loop {
        match events.recv().await {
            Some(CliEvent::Loaded(pages)) => return Ok(pages),
            Some(CliEvent::LoadFailed(err)) => bail!("Failed to open {label}: {err}"),
            Some(_) => {}
            None => bail!("session stopped before {label} loaded"),
        }
    }
}

async fn preview(
    config: &ClientConfig,
    source: SourceArgs,
    page: u32,
    output: &Path,
    quiet: bool,
) -> Result<()> {
    let (tx, mut events) = mpsc::unbounded_channel();
    let controller = SessionController::new(
        config,
        Box::new(PngFileSurface::new(output)),
        Arc::new(ChannelObserver::new(tx)),
    )?;

    let source = resolve_source(source).await?;
    let pages = open(&controller, &mut events, source).await?;
    if page == 0 || page > pages {
        bail!("page {page} is out of range (document has {pages} pages)");
    }
    for _ in 1..page {
        controller.session().next_page();
    }

    loop {
        match events.recv().await {
            Some(CliEvent::Rendered(p)) if p == page => break,
            Some(CliEvent::RenderFailed(p, err)) if p == page => {
                bail!("Failed to render page {p}: {err}")
            }
            Some(_) => {}
            None => bail!("session stopped before page {page} rendered"),
        }
    }
    controller.on_teardown();

    if !quiet {
        eprintln!(
            "{} page {}/{} → {}",
            green("✔"),
            page,
            pages,
            bold(&output.display().to_string())
        );
    }
    Ok(())
}

async fn submit(
    config: &ClientConfig,
    source: SourceArgs,
    range: PageRange,
    download: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let (tx, mut events) = mpsc::unbounded_channel();
    let preview_path = std::env::temp_dir().join("lessonctl-preview.png");
    let controller = SessionController::new(
        config,
        Box::new(PngFileSurface::new(preview_path)),
        Arc::new(ChannelObserver::new(tx)),
    )?;

    let source = resolve_source(source).await?;
    open(&controller, &mut events, source).await?;

    controller.set_range(range);
    if let Some(msg) = controller.validation() {
        bail!("{msg}");
    }

    let run = controller
        .on_range_submitted(range)
        .await
        .context("Failed to submit job")?;
    let job_id = run.ticket.job_id.clone();

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix(format!("Job {job_id}"));
        bar.set_message("submitted");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    };

    let outcome = run
        .finish(|event| match event {
            PollEvent::Status(status) => bar.set_message(status.state.to_string()),
            PollEvent::TransientError(err) => {
                bar.set_message(format!("retrying ({})", dim(&err.to_string())))
            }
        })
        .await;
    bar.finish_and_clear();

    match outcome.with_context(|| format!("Job {job_id} did not finish"))? {
        JobOutcome::Succeeded(_) => {
            if !quiet {
                eprintln!("{} job {} succeeded", green("✔"), bold(&job_id));
            }
            println!("{job_id}");
        }
        JobOutcome::Failed(status) => {
            let reason = status.error.unwrap_or_else(|| "no reason given".to_string());
            bail!("job {job_id} failed: {reason}");
        }
    }

    if let Some(dest) = download {
        let path = controller
            .download_result(&job_id, dest)
            .await
            .context("Download failed")?;
        if !quiet {
            eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    controller.on_teardown();
    Ok(())
}
