use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use papertools_core::config_file::{config_path, load_config, store_api_key_at};
use papertools_core::{BatchReport, Config, OpenAiClient, generate_bib_all, rename_all};
use papertools_pdf_mupdf::MupdfBackend;

mod output;
mod prompt;

use output::{ColorMode, Mode};

/// Rename research-paper PDFs from their metadata and generate BibTeX entries
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log resolution decisions and API calls to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rename every PDF not yet starting with '[' to "[] - Surname - Title (Year).pdf"
    Rename {
        /// Folder containing the PDFs
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// OpenAI API key (overrides OPENAI_API_KEY and the config file)
        #[arg(long)]
        api_key: Option<String>,

        /// Chat model used for metadata inference
        #[arg(long)]
        model: Option<String>,

        /// Base URL of the OpenAI-compatible API
        #[arg(long)]
        base_url: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Pages scanned for front matter
        #[arg(long)]
        max_pages: Option<usize>,

        /// Show what would be renamed without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Write a .bib file next to every PDF whose name starts with '['
    Bib {
        /// Folder containing the PDFs
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Show what would be written without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Store an OpenAI API key in the user config file
    Setkey,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Rename {
            path,
            api_key,
            model,
            base_url,
            timeout,
            max_pages,
            dry_run,
            no_color,
        } => {
            let mut config = base_config();
            if let Some(key) = api_key {
                config.api_key = Some(key);
            }
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(url) = base_url {
                config.api_base_url = url;
            }
            if let Some(secs) = timeout {
                config.request_timeout_secs = secs;
            }
            if let Some(pages) = max_pages {
                config.max_pages = pages;
            }
            config.dry_run = dry_run;

            if config.require_api_key().is_err() && std::io::stdin().is_terminal() {
                let key = prompt::read_hidden("OpenAI API key: ")
                    .context("Failed to read API key")?;
                if !key.is_empty() {
                    config.api_key = Some(key);
                }
            }

            rename(&path, &config, ColorMode(!no_color)).await
        }
        Command::Bib {
            path,
            dry_run,
            no_color,
        } => {
            let mut config = base_config();
            config.dry_run = dry_run;
            bib(&path, &config, ColorMode(!no_color))
        }
        Command::Setkey => setkey(),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(
            "warn,papertools_cli=debug,papertools_core=debug,papertools_pdf_mupdf=debug",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults overlaid by the config file cascade, then by environment variables.
/// CLI flags are applied by the caller.
fn base_config() -> Config {
    let mut config = Config::default().with_file(&load_config());

    if let Ok(key) = std::env::var("OPENAI_API_KEY")
        && !key.trim().is_empty()
    {
        config.api_key = Some(key);
    }
    if let Ok(url) = std::env::var("OPENAI_BASE_URL")
        && !url.trim().is_empty()
    {
        config.api_base_url = url;
    }
    if let Ok(model) = std::env::var("PAPERTOOLS_MODEL")
        && !model.trim().is_empty()
    {
        config.model = model;
    }
    if let Ok(raw) = std::env::var("PAPERTOOLS_TIMEOUT") {
        match raw.trim().parse::<u64>() {
            Ok(secs) => config.request_timeout_secs = secs,
            Err(_) => tracing::warn!(value = %raw, "ignoring invalid PAPERTOOLS_TIMEOUT"),
        }
    }

    tracing::debug!(?config, "resolved configuration");
    config
}

async fn rename(folder: &Path, config: &Config, color: ColorMode) -> anyhow::Result<()> {
    // Built first so a missing key aborts before any file is opened.
    let client = OpenAiClient::from_config(config)?;
    let backend = MupdfBackend::new();
    let dry_run = config.dry_run;

    let report = rename_all(folder, config, &backend, &client, |event| {
        let mut out = std::io::stdout().lock();
        let _ = output::print_event(&mut out, &event, Mode::Rename, dry_run, color);
    })
    .await?;

    finish(&report, color)
}

fn bib(folder: &Path, config: &Config, color: ColorMode) -> anyhow::Result<()> {
    let dry_run = config.dry_run;
    let report = generate_bib_all(folder, config, |event| {
        let mut out = std::io::stdout().lock();
        let _ = output::print_event(&mut out, &event, Mode::Bib, dry_run, color);
    })?;

    finish(&report, color)
}

fn finish(report: &BatchReport, color: ColorMode) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    output::print_summary(&mut out, report, color)?;
    out.flush()?;
    Ok(())
}

fn setkey() -> anyhow::Result<()> {
    let key = if std::io::stdin().is_terminal() {
        prompt::read_hidden("OpenAI API key: ").context("Failed to read API key")?
    } else {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read API key from stdin")?;
        line.trim().to_string()
    };

    if key.is_empty() {
        anyhow::bail!("no API key entered; nothing saved");
    }

    let path = config_path().context("Could not determine config directory")?;
    store_api_key_at(&path, &key).map_err(anyhow::Error::msg)?;
    println!("API key saved to {}", path.display());
    Ok(())
}
