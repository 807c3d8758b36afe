//! MarkLens 命令行入口
//!
//! 对保存下来的 GitHub 页面执行与浏览器扩展相同的流程，把修改后的 HTML 写到标准输出或文件。

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use marklens::config::{config_file_exists, ConfigManager};
use marklens::env::core::{LogLevel, NoColor};
use marklens::env::{generate_env_docs, EnvVar};
use marklens::error::helpers::{config_error, validation_error};
use marklens::parsers::{html_to_dom, serialize_document};
use marklens::{Action, ActionOptions, AssistError, Enhancer, RegionId};

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

/// MarkLens CLI.
#[derive(Parser)]
#[command(name = "marklens")]
#[command(about = "Translate and summarize rendered GitHub Markdown with an LLM provider")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PageArgs {
    /// Saved HTML page
    page: PathBuf,

    /// URL the page was saved from
    #[arg(short, long)]
    url: String,

    /// Charset of the saved page
    #[arg(short, long, default_value = "utf-8")]
    encoding: String,

    /// Write the resulting HTML here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find content regions and inject controls
    Scan {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Translate one region
    Translate {
        #[command(flatten)]
        page: PageArgs,

        /// Region index as reported by `scan`
        #[arg(short, long)]
        region: usize,

        /// Target language (defaults to the configured language)
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Summarize one region
    Summarize {
        #[command(flatten)]
        page: PageArgs,

        /// Region index as reported by `scan`
        #[arg(short, long)]
        region: usize,

        /// Maximum number of sentences (1-10, inferred when omitted)
        #[arg(short, long)]
        sentences: Option<usize>,

        /// Output language (defaults to the configured language)
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write an example configuration file to this path
        #[arg(long)]
        init: Option<PathBuf>,

        /// List supported environment variables
        #[arg(long)]
        env: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    if let Err(e) = run(cli).await {
        print_error_message(&e.user_message());
        process::exit(1);
    }
}

fn init_tracing(cli_level: Option<&str>) {
    let level = cli_level
        .map(str::to_string)
        .unwrap_or_else(|| LogLevel::get_or_default("info".to_string()));
    let filter = EnvFilter::try_new(format!("marklens={}", level))
        .unwrap_or_else(|_| EnvFilter::new("marklens=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(!NoColor::get_or_default(false))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ConfigManager, AssistError> {
    match path {
        Some(path) => ConfigManager::from_file(&path.to_string_lossy()),
        None => ConfigManager::new(),
    }
}

fn show_config(path: Option<&Path>, init: Option<&Path>, env: bool) -> Result<(), AssistError> {
    if let Some(target) = init {
        ConfigManager::generate_example_config(&target.to_string_lossy())?;
        eprintln!("wrote example configuration to {}", target.display());
        return Ok(());
    }

    if env {
        print!("{}", generate_env_docs());
        return Ok(());
    }

    if path.is_none() && !config_file_exists() {
        eprintln!("no configuration file found, using defaults");
    }

    let mut settings = load_config(path)?.into_settings();
    if !settings.api_key.is_empty() {
        settings.api_key = "[redacted]".to_string();
    }
    let rendered = toml::to_string_pretty(&settings).map_err(config_error)?;
    print!("{}", rendered);

    Ok(())
}

async fn run(cli: Cli) -> Result<(), AssistError> {
    let (page, action) = match cli.command {
        Commands::Config { init, env } => {
            return show_config(cli.config.as_deref(), init.as_deref(), env);
        }
        Commands::Scan { page } => (page, None),
        Commands::Translate { page, region, lang } => {
            let options = ActionOptions {
                language: lang,
                max_sentences: None,
            };
            (page, Some((Action::Translate, RegionId(region), options)))
        }
        Commands::Summarize {
            page,
            region,
            sentences,
            lang,
        } => {
            let options = ActionOptions {
                language: lang,
                max_sentences: sentences,
            };
            (page, Some((Action::Summarize, RegionId(region), options)))
        }
    };

    let enhancer = Enhancer::new(load_config(cli.config.as_deref())?.into_settings())?;

    let url = Url::parse(&page.url)
        .map_err(|e| validation_error(format!("invalid page URL '{}': {}", page.url, e)))?;
    let data = fs::read(&page.page)?;
    let dom = html_to_dom(&data, &page.encoding);

    if enhancer.navigate(&url).is_none() {
        return Err(validation_error(format!(
            "{} is not a supported page (blob, issue, pull request or wiki view)",
            url
        )));
    }

    let attached = enhancer.scan(&dom);
    for id in &attached {
        let region = enhancer.region(*id)?;
        let preview: String = marklens::pipeline::sanitize_for_model(&region.node)
            .chars()
            .take(60)
            .collect();
        eprintln!("region {}: {}", id.0, preview.replace('\n', " "));
    }

    if let Some((action, id, options)) = action {
        enhancer.run_action_with(&dom, id, action, &options).await?;
    }

    let html = serialize_document(&dom, &page.encoding)?;
    match &page.output {
        Some(path) => fs::write(path, html)?,
        None => io::stdout().write_all(&html)?,
    }

    Ok(())
}

/// Prints an error message to stderr
fn print_error_message(msg: &str) {
    if NoColor::get_or_default(false) {
        eprintln!("{msg}");
    } else {
        eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
    }
}
