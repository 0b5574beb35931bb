//! CLI binary for convertkit.
//!
//! A thin shim over the library: one subcommand per tool, each mapping its
//! flags to the tool's options, running it through a `ToolSession`, and
//! saving the outputs into `--out-dir`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use convertkit::backend::{LopdfModel, PageRasterizer, PdfiumRasterizer};
use convertkit::pipeline::deliver::{Delivered, Delivery};
use convertkit::pipeline::intake::{self, probe_image, SourceFile, TypeFilter};
use convertkit::tools::image::{height_for_width, width_for_height, DisplaySize, Selection};
use convertkit::tools::{self, text::TextLayout};
use convertkit::{
    BulkOptions, CompressOptions, ConversionProgressCallback, ConversionResult, ConvertError,
    PdfToImageOptions, Preferences, ProgressCallback, RasterFormat, ResizeMode, RotateOptions,
    Theme, ToolSession,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── Palette ──────────────────────────────────────────────────────────────────

/// ANSI colours for the persisted theme.
#[derive(Clone, Copy)]
struct Palette {
    ok: &'static str,
    err: &'static str,
    accent: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                ok: "32",
                err: "31",
                accent: "34",
            },
            Theme::Dark => Self {
                ok: "92",
                err: "91",
                accent: "96",
            },
        }
    }

    fn paint(code: &str, s: &str) -> String {
        format!("\x1b[{code}m{s}\x1b[0m")
    }

    fn ok(&self, s: &str) -> String {
        Self::paint(self.ok, s)
    }

    fn err(&self, s: &str) -> String {
        Self::paint(self.err, s)
    }

    fn accent(&self, s: &str) -> String {
        Self::paint(self.accent, s)
    }

    fn dim(&self, s: &str) -> String {
        Self::paint("2", s)
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress bar for the multi-item tools.
struct CliProgressCallback {
    bar: ProgressBar,
    unit: &'static str,
    palette: Palette,
}

impl CliProgressCallback {
    fn new(unit: &'static str, palette: Palette) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, unit, palette })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total: usize) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {}  {{msg}}",
            self.unit
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
    }

    fn on_item_complete(&self, _index: usize, _total: usize, fraction: f64) {
        self.bar.inc(1);
        self.bar
            .set_message(format!("{}%", (fraction * 100.0).round() as u32));
    }

    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            self.palette.err("✗"),
            index + 1,
            total,
            self.palette.err(error)
        ));
    }

    fn on_conversion_complete(&self, _total: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every page of a PDF as JPEG at 300 DPI
  convertkit pdf-to-image report.pdf --format jpg --dpi 300 -o pages/

  # Merge in the given order
  convertkit merge intro.pdf body.pdf appendix.pdf

  # Keep pages 1 to 3 and 7 / drop them
  convertkit split report.pdf --pages "1-3, 7"
  convertkit delete-pages report.pdf --pages "1-3, 7"

  # Rotate every page a quarter turn counter-clockwise
  convertkit rotate scan.pdf --degrees -90

  # Resize to 800 px wide, keeping the aspect ratio
  convertkit resize photo.png --width 800

  # Convert a folder of images into one zip of WEBPs
  convertkit bulk shots/*.png --format webp

  # Plain text or HTML to PDF
  convertkit txt-to-pdf notes.txt
  convertkit html-to-pdf page.html

  # Switch the colour theme
  convertkit theme

ENVIRONMENT VARIABLES:
  CONVERTKIT_OUT_DIR   Default output directory
  CONVERTKIT_THEME     Theme used before one is saved (light, dark)
  PDFIUM_LIB_PATH      Path to libpdfium, or a directory containing it
  RUST_LOG             Log filter override
"#;

/// Convert PDFs, images, text and HTML locally.
#[derive(Parser, Debug)]
#[command(
    name = "convertkit",
    version,
    about = "Convert PDFs, images, text and HTML files locally",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory that receives the output files.
    #[arg(short, long, global = true, env = "CONVERTKIT_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CONVERTKIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "CONVERTKIT_QUIET")]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "CONVERTKIT_NO_PROGRESS")]
    no_progress: bool,

    /// Print a JSON report of the delivered files.
    #[arg(long, global = true, env = "CONVERTKIT_JSON")]
    json: bool,

    /// HTTP download timeout in seconds, for URL inputs.
    #[arg(long, global = true, env = "CONVERTKIT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every PDF page as an image.
    PdfToImage(PdfToImageArgs),
    /// Combine PDFs into one document, in the given order.
    Merge {
        /// PDF files or URLs (at least two).
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,
    },
    /// Extract the listed pages into a new PDF.
    Split(PageArgs),
    /// Remove the listed pages from a PDF.
    DeletePages(PageArgs),
    /// Rotate every page of a PDF.
    Rotate {
        input: String,
        /// Clockwise degrees; a multiple of 90, negative for counter-clockwise.
        #[arg(long, default_value_t = 90, allow_negative_numbers = true)]
        degrees: i64,
    },
    /// Resize an image by pixel size or percentage.
    Resize(ResizeArgs),
    /// Crop a rectangle out of an image.
    Crop(CropArgs),
    /// Re-encode an image as JPG or WEBP at lower quality.
    Compress {
        input: String,
        /// Target format; JPG unless the source is WEBP.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Quality, 0.1–1.0.
        #[arg(long, default_value_t = 0.8)]
        quality: f32,
    },
    /// Convert many images to one format and pack them into a zip.
    Bulk {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,
        #[arg(long, value_enum, default_value = "png")]
        format: FormatArg,
        /// Encoder quality for JPG, 0.1–1.0.
        #[arg(long, default_value_t = 0.9)]
        quality: f32,
    },
    /// Typeset a plain-text file as PDF.
    TxtToPdf { input: String },
    /// Render an HTML file to PDF through a headless Chrome.
    HtmlToPdf {
        input: String,
        /// Chrome or Chromium binary; auto-detected when omitted.
        #[arg(long, env = "CONVERTKIT_CHROME")]
        chrome: Option<PathBuf>,
        /// Launch the browser without its sandbox.
        #[arg(long)]
        no_sandbox: bool,
    },
    /// Show or change the colour theme.
    Theme {
        /// New theme; toggles when omitted.
        #[arg(value_enum)]
        set: Option<ThemeArg>,
    },
}

#[derive(Args, Debug)]
struct PdfToImageArgs {
    input: String,
    /// Image format; a URL input's `?format=jpg` selects JPG when omitted.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
    /// Rendering DPI (72–600).
    #[arg(long, default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,
    /// JPG quality, (0, 1].
    #[arg(long, default_value_t = 0.92)]
    quality: f32,
    /// Explicit libpdfium path.
    #[arg(long)]
    pdfium: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PageArgs {
    input: String,
    /// Page expression, e.g. "1-3, 5, 8-10".
    #[arg(short, long, default_value = "")]
    pages: String,
}

#[derive(Args, Debug)]
struct ResizeArgs {
    input: String,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Percentage of the natural size, 1–200.
    #[arg(long, conflicts_with_all = ["width", "height"])]
    percent: Option<u32>,
}

#[derive(Args, Debug)]
struct CropArgs {
    input: String,
    #[arg(long, default_value_t = 0.0)]
    x: f64,
    #[arg(long, default_value_t = 0.0)]
    y: f64,
    #[arg(long)]
    width: f64,
    #[arg(long)]
    height: f64,
    /// Width the image was displayed at when the rectangle was chosen.
    #[arg(long, requires = "display_height")]
    display_width: Option<f64>,
    #[arg(long, requires = "display_width")]
    display_height: Option<f64>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpg,
    Webp,
}

impl From<FormatArg> for RasterFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => RasterFormat::Png,
            FormatArg::Jpg => RasterFormat::Jpeg,
            FormatArg::Webp => RasterFormat::Webp,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(v: ThemeArg) -> Self {
        match v {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the feedback; library INFO logs would tear it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let prefs_path = Preferences::default_path();
    let prefs = prefs_path
        .as_deref()
        .map(Preferences::load)
        .unwrap_or_default();
    let app = App {
        palette: Palette::for_theme(prefs.theme),
        delivery: Delivery::new(&cli.out_dir),
        show_progress,
        quiet: cli.quiet,
        json: cli.json,
        timeout: cli.download_timeout,
    };

    if let Err(e) = run(&app, cli.command, prefs, prefs_path).await {
        if cli.verbose {
            eprintln!("{} {:#}", app.palette.err("✗"), e);
        } else {
            eprintln!("{} {}", app.palette.err("✗"), e);
        }
        std::process::exit(1);
    }
}

struct App {
    palette: Palette,
    delivery: Delivery,
    show_progress: bool,
    quiet: bool,
    json: bool,
    timeout: u64,
}

impl App {
    fn progress(&self, unit: &'static str) -> Option<ProgressCallback> {
        self.show_progress
            .then(|| CliProgressCallback::new(unit, self.palette) as ProgressCallback)
    }

    /// Load one input and run it through the tool's type filter.
    async fn select_one(
        &self,
        input: &str,
        filter: TypeFilter,
    ) -> Result<(ToolSession<SourceFile>, Option<String>)> {
        let mut session = ToolSession::new();
        let resolved = intake::load(input, self.timeout).await?;
        let query_format = resolved.query_format();
        match intake::accept_single(vec![resolved.file], filter) {
            Ok(file) => session.select(file),
            Err(e) => {
                session.reject(&e);
                return Err(e.into());
            }
        }
        Ok((session, query_format))
    }

    async fn select_many(
        &self,
        inputs: &[String],
        filter: TypeFilter,
    ) -> Result<ToolSession<Vec<SourceFile>>> {
        let mut session = ToolSession::new();
        let files = intake::load_all(inputs, self.timeout)
            .await?
            .into_iter()
            .map(|r| r.file)
            .collect();
        match intake::accept_many(files, filter) {
            Ok(files) => session.append(files),
            Err(e) => {
                session.reject(&e);
                return Err(e.into());
            }
        }
        Ok(session)
    }

    fn deliver(&self, result: &ConversionResult) -> Result<()> {
        let delivered = self.delivery.deliver_all(result)?;
        self.report(&delivered)
    }

    fn report(&self, delivered: &[Delivered]) -> Result<()> {
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(delivered).context("Failed to serialise report")?
            );
        } else if !self.quiet {
            for d in delivered {
                eprintln!(
                    "{} {}  {}",
                    self.palette.ok("✓"),
                    self.palette.accent(&d.path.display().to_string()),
                    self.palette.dim(&format!("{} bytes", d.bytes)),
                );
            }
        }
        Ok(())
    }
}

async fn run(
    app: &App,
    command: Command,
    mut prefs: Preferences,
    prefs_path: Option<PathBuf>,
) -> Result<()> {
    match command {
        Command::PdfToImage(args) => {
            let (mut session, query_format) = app.select_one(&args.input, TypeFilter::Pdf).await?;
            let format = args
                .format
                .map(RasterFormat::from)
                .unwrap_or_else(|| RasterFormat::from_query(query_format.as_deref()));
            let opts = PdfToImageOptions::builder()
                .dpi(args.dpi)
                .format(format)
                .jpeg_quality(args.quality)
                .build()?;
            let rasterizer: Arc<dyn PageRasterizer> = match args.pdfium {
                Some(path) => Arc::new(PdfiumRasterizer::with_library(path)),
                None => Arc::new(PdfiumRasterizer::new()),
            };

            let flight = session.begin()?;
            let result = tools::pdf_to_image::run_and_deliver(
                rasterizer,
                flight.selection(),
                &opts,
                app.progress("pages"),
                &app.delivery,
            )
            .await;
            let delivered = flight.finish(result)?;
            app.report(&delivered)
        }
        Command::Merge { inputs } => {
            let mut session = app.select_many(&inputs, TypeFilter::Pdf).await?;
            let flight = session.begin()?;
            let result = tools::pdf::merge(&LopdfModel, flight.selection()).await;
            app.deliver(&flight.finish(result)?)
        }
        Command::Split(args) => {
            let (mut session, _) = app.select_one(&args.input, TypeFilter::Pdf).await?;
            let flight = session.begin()?;
            let result = tools::pdf::split(&LopdfModel, flight.selection(), &args.pages).await;
            app.deliver(&flight.finish(result)?)
        }
        Command::DeletePages(args) => {
            let (mut session, _) = app.select_one(&args.input, TypeFilter::Pdf).await?;
            let flight = session.begin()?;
            let result =
                tools::pdf::delete_pages(&LopdfModel, flight.selection(), &args.pages).await;
            app.deliver(&flight.finish(result)?)
        }
        Command::Rotate { input, degrees } => {
            let (mut session, _) = app.select_one(&input, TypeFilter::Pdf).await?;
            let flight = session.begin()?;
            let result =
                tools::pdf::rotate(&LopdfModel, flight.selection(), RotateOptions { degrees })
                    .await;
            app.deliver(&flight.finish(result)?)
        }
        Command::Resize(args) => {
            let (mut session, _) = app.select_one(&args.input, TypeFilter::AnyImage).await?;
            let flight = session.begin()?;
            let result = resize(flight.selection(), &args).await;
            app.deliver(&flight.finish(result)?)
        }
        Command::Crop(args) => {
            let (mut session, _) = app.select_one(&args.input, TypeFilter::AnyImage).await?;
            let flight = session.begin()?;
            let file = flight.selection();
            let selection = Selection {
                x: args.x,
                y: args.y,
                w: args.width,
                h: args.height,
            };
            let result = match (args.display_width, args.display_height) {
                (Some(width), Some(height)) => {
                    tools::image::crop(file, selection, DisplaySize { width, height }).await
                }
                _ => match probe_image(file) {
                    Ok(info) => {
                        tools::image::crop(file, selection, DisplaySize::natural(info)).await
                    }
                    Err(e) => Err(e),
                },
            };
            app.deliver(&flight.finish(result)?)
        }
        Command::Compress {
            input,
            format,
            quality,
        } => {
            let (mut session, _) = app.select_one(&input, TypeFilter::AnyImage).await?;
            let opts = CompressOptions {
                format: format.map(RasterFormat::from),
                quality,
            };
            let flight = session.begin()?;
            let result = tools::image::compress(flight.selection(), opts).await;
            app.deliver(&flight.finish(result)?)
        }
        Command::Bulk {
            inputs,
            format,
            quality,
        } => {
            let mut session = app.select_many(&inputs, TypeFilter::AnyImage).await?;
            let opts = BulkOptions {
                format: format.into(),
                quality,
            };
            let flight = session.begin()?;
            let result = tools::bulk::run(flight.selection(), opts, app.progress("images")).await;
            app.deliver(&flight.finish(result)?)
        }
        Command::TxtToPdf { input } => {
            let (mut session, _) = app.select_one(&input, TypeFilter::Any).await?;
            let flight = session.begin()?;
            let result = tools::text::run(flight.selection(), TextLayout::default()).await;
            app.deliver(&flight.finish(result)?)
        }
        Command::HtmlToPdf {
            input,
            chrome,
            no_sandbox,
        } => html_to_pdf(app, &input, chrome, no_sandbox).await,
        Command::Theme { set } => {
            let theme = match set {
                Some(t) => {
                    prefs.theme = t.into();
                    prefs.theme
                }
                None => prefs.toggle_theme(),
            };
            let path = prefs_path.context("No configuration directory on this platform")?;
            prefs
                .save(&path)
                .context("Failed to save preferences")?;
            if !app.quiet {
                let palette = Palette::for_theme(theme);
                eprintln!("{} theme: {}", palette.ok("✓"), palette.accent(&theme.to_string()));
            }
            Ok(())
        }
    }
}

/// Resolve the resize flags against the image's natural size and run it.
async fn resize(file: &SourceFile, args: &ResizeArgs) -> Result<ConversionResult, ConvertError> {
    let mode = match (args.percent, args.width, args.height) {
        (Some(p), _, _) => ResizeMode::Percentage(p),
        (None, Some(width), Some(height)) => ResizeMode::Dimensions { width, height },
        (None, Some(width), None) => ResizeMode::Dimensions {
            width,
            height: height_for_width(probe_image(file)?, width),
        },
        (None, None, Some(height)) => ResizeMode::Dimensions {
            width: width_for_height(probe_image(file)?, height),
            height,
        },
        (None, None, None) => ResizeMode::default(),
    };
    tools::image::resize(file, mode).await
}

#[cfg(feature = "html")]
async fn html_to_pdf(
    app: &App,
    input: &str,
    chrome: Option<PathBuf>,
    no_sandbox: bool,
) -> Result<()> {
    use convertkit::backend::ChromeRasterizer;

    let (mut session, _) = app.select_one(input, TypeFilter::Any).await?;
    let rasterizer = ChromeRasterizer {
        executable: chrome,
        no_sandbox,
        ..Default::default()
    };
    let flight = session.begin()?;
    let result = tools::html::run(&rasterizer, flight.selection()).await;
    app.deliver(&flight.finish(result)?)
}

#[cfg(not(feature = "html"))]
async fn html_to_pdf(
    _app: &App,
    _input: &str,
    _chrome: Option<PathBuf>,
    _no_sandbox: bool,
) -> Result<()> {
    anyhow::bail!("html-to-pdf needs the `html` feature")
}
