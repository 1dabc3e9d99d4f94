//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadscope_core::{Collaborators, IntelligencePipeline, ProgressReporter, RunResult};
use leadscope_shared::{
    AppConfig, IntelligenceRequest, PipelineConfig, RequestId, init_config, load_config,
    load_config_from,
};
use leadscope_storage::JsonFileSink;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// leadscope: business intelligence from a website and a profile URL.
#[derive(Parser)]
#[command(
    name = "leadscope",
    version,
    about = "Collect business intelligence about a person and their company.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.leadscope/leadscope.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the collection pipeline for one person.
    Run {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Company website root.
        #[arg(long)]
        website: Option<String>,

        /// Professional profile URL (linkedin.com/in/<id>).
        #[arg(long)]
        profile_url: Option<String>,

        /// Directory for the output record (overrides config).
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Pretty-print a saved record.
    Show {
        /// Request id printed by `run`.
        request_id: String,

        /// Directory holding output records (overrides config).
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscope=info",
        1 => "leadscope=debug",
        _ => "leadscope=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            first_name,
            last_name,
            website,
            profile_url,
            out,
        } => {
            let request = IntelligenceRequest {
                first_name,
                last_name,
                website,
                profile_url,
            };
            cmd_run(with_output_dir(config, out), &request).await
        }
        Command::Show { request_id, out } => cmd_show(&with_output_dir(config, out), &request_id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

fn resolve_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

fn with_output_dir(mut config: AppConfig, out: Option<String>) -> AppConfig {
    if let Some(dir) = out {
        config.output.output_dir = dir;
    }
    config
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: AppConfig, request: &IntelligenceRequest) -> Result<()> {
    let pipeline_config = PipelineConfig::from(&config);
    let collaborators = Collaborators::from_config(&config)?;
    let pipeline = IntelligencePipeline::new(collaborators, &pipeline_config);

    info!(
        website = request.website.as_deref(),
        profile_url = request.profile_url.as_deref(),
        "collecting intelligence"
    );

    let reporter = CliProgress::new();
    let result = pipeline.run(request, &reporter).await?;
    let output = &result.output;

    let extracted = output
        .website_analysis
        .scraped_content
        .values()
        .filter(|c| c.is_extracted())
        .count();

    println!();
    println!("  Intelligence collected!");
    println!("  ID:         {}", output.request_id);
    println!("  Profile:    {}", output.linkedin_analysis.status.as_str());
    println!("  Discovered: {}", output.website_analysis.discovered_urls.len());
    println!("  Selected:   {}", output.website_analysis.filtered_urls.len());
    println!(
        "  Extracted:  {extracted}/{}",
        output.website_analysis.scraped_content.len()
    );
    match &result.saved_to {
        Some(path) => println!("  Saved:      {path}"),
        None => println!("  Saved:      no (see log for the save error)"),
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_show(config: &AppConfig, request_id: &str) -> Result<()> {
    let id: RequestId = request_id
        .parse()
        .map_err(|e| eyre!("invalid request id '{request_id}': {e}"))?;

    let sink = JsonFileSink::new(&config.output.output_dir, config.output.pretty);
    let output = sink.load(&id).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn url_scraped(&self, url: &str, succeeded: bool, completed: usize, total: usize) {
        let mark = if succeeded { "ok" } else { "failed" };
        self.spinner
            .set_message(format!("Extracting [{completed}/{total}] {url} ({mark})"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}
