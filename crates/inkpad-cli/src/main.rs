use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use inkpad_editor_core::markdown::{from_markdown, looks_like_markdown};
use inkpad_editor_core::{EditorConfig, EditorSession, ImportReport, ParsedHtml, from_html, to_html};
use miette::{IntoDiagnostic, Result, WrapErr};

#[derive(Parser)]
#[command(version, about = "inkpad - run the rich-text engine over HTML and Markdown files", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Editor config file (.toml or .json)
    #[arg(long, global = true, env = "INKPAD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a file and print the normalized HTML
    Convert {
        file: PathBuf,

        /// Input format
        #[arg(long, value_enum, default_value_t = Format::Auto)]
        from: Format,
    },
    /// Check that an HTML file survives export and re-import unchanged
    Check { file: PathBuf },
    /// List the effective keyboard shortcuts
    Keymap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Markdown,
    /// Pick by file extension, then by content
    Auto,
}

fn main() -> Result<()> {
    init_miette();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let session = EditorSession::new(config, Vec::new())?;

    match cli.command {
        Commands::Convert { file, from } => convert(&session, &file, from),
        Commands::Check { file } => check(&session, &file),
        Commands::Keymap => {
            keymap(&session);
            Ok(())
        }
    }
}

fn read(file: &Path) -> Result<String> {
    std::fs::read_to_string(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", file.display()))
}

fn detect(file: &Path, source: &str) -> Format {
    match file.extension().and_then(|ext| ext.to_str()) {
        Some("html" | "htm") => Format::Html,
        Some("md" | "markdown") => Format::Markdown,
        _ if source.trim_start().starts_with('<') => Format::Html,
        _ if looks_like_markdown(source) => Format::Markdown,
        _ => Format::Html,
    }
}

fn convert(session: &EditorSession, file: &Path, from: Format) -> Result<()> {
    let source = read(file)?;
    let format = match from {
        Format::Auto => detect(file, &source),
        format => format,
    };
    tracing::debug!(file = %file.display(), ?format, "converting");
    let ParsedHtml { doc, report } = match format {
        Format::Markdown => from_markdown(session.schema(), &source)?,
        _ => from_html(session.schema(), &source)?,
    };
    print_report(&report);
    println!("{}", to_html(session.schema(), &doc));
    Ok(())
}

fn check(session: &EditorSession, file: &Path) -> Result<()> {
    let schema = session.schema();
    let source = read(file)?;
    let first = from_html(schema, &source)?;
    print_report(&first.report);

    let exported = to_html(schema, &first.doc);
    let second = from_html(schema, &exported)?;
    if second.doc != first.doc {
        return Err(miette::miette!(
            help = "the exported HTML does not import back to the same document",
            "round trip failed for {}",
            file.display()
        ));
    }
    if to_html(schema, &second.doc) != exported {
        return Err(miette::miette!("export of {} is not stable", file.display()));
    }
    let degraded = first.report.degraded.len();
    println!(
        "{}: round trip ok ({} top-level blocks, {degraded} degraded imports)",
        file.display(),
        first.doc.root().child_count(),
    );
    Ok(())
}

fn keymap(session: &EditorSession) {
    let shortcuts = session.registry().shortcuts();
    let width = shortcuts
        .iter()
        .map(|(combo, _)| combo.to_string().len())
        .max()
        .unwrap_or(0);
    for (combo, binding) in shortcuts {
        println!(
            "{:width$}  {:<18}  {:?}",
            combo.to_string(),
            binding.extension,
            binding.command()
        );
    }
}

fn print_report(report: &ImportReport) {
    for degraded in &report.degraded {
        eprintln!("warning: {degraded}");
    }
}

fn init_miette() {
    let installed = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .context_lines(3)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    if installed.is_err() {
        tracing::debug!("miette hook already installed");
    }
    miette::set_panic_hook();
}
