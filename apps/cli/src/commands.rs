//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadscout_core::sweep::{ProgressReporter, SweepOptions, SweepReport};
use leadscout_discovery::HttpSearchProvider;
use leadscout_extraction::HttpCompletionClient;
use leadscout_shared::{
    AppConfig, CandidateInput, load_config, resolve_db_path, validate_sweep_secret,
};
use leadscout_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadScout: turn competitor showcase pages into sales-lead candidates.
#[derive(Parser)]
#[command(
    name = "leadscout",
    version,
    about = "Discover competitor achievements and stage them as sales leads.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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
    /// Run the unattended discovery-through-persistence sweep.
    Sweep {
        /// Target region label (defaults to the configured region).
        #[arg(short, long)]
        region: Option<String>,

        /// Shared secret presented by the scheduled trigger.
        #[arg(long, env = "LEADSCOUT_PRESENTED_SECRET")]
        secret: String,
    },

    /// Extract candidates from one URL and stage them for review (no writes).
    Extract {
        /// Works-page URL to extract from.
        url: String,

        /// Source company name override (auto-detected from the page title
        /// when omitted).
        #[arg(short, long)]
        company: Option<String>,
    },

    /// Bulk-commit reviewed candidates from a JSON file.
    Commit {
        /// Path to a JSON array of candidate items.
        file: PathBuf,
    },

    /// Convert a stored achievement into a CRM customer + deal.
    Convert {
        /// Achievement ID.
        id: String,

        /// Caller scope (branch/user) the customer is resolved within.
        #[arg(short, long, default_value = "default")]
        scope: String,
    },

    /// List stored achievement candidates.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
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
        0 => "leadscout=info",
        1 => "leadscout=debug",
        _ => "leadscout=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sweep { region, secret } => cmd_sweep(region.as_deref(), &secret).await,
        Command::Extract { url, company } => cmd_extract(&url, company.as_deref()).await,
        Command::Commit { file } => cmd_commit(&file).await,
        Command::Convert { id, scope } => cmd_convert(&id, &scope).await,
        Command::List => cmd_list().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_sweep(region: Option<&str>, secret: &str) -> Result<()> {
    let config = load_config()?;

    // Credential check runs before any pipeline stage.
    validate_sweep_secret(&config, secret)?;

    let region = region
        .map(String::from)
        .unwrap_or_else(|| config.defaults.region.clone());

    let search = build_search_provider(&config)?;
    let completion = build_completion_client(&config)?;
    let storage = open_storage(&config).await?;

    let options = SweepOptions {
        region: region.clone(),
        result_count: config.sweep.result_count,
        max_tokens: config.completion.max_tokens,
        time_budget: Duration::from_secs(config.sweep.time_budget_secs),
        created_by: Some("sweep".into()),
    };

    info!(%region, "starting sweep");
    let reporter = CliProgress::new();
    let report =
        leadscout_core::run_sweep(&search, &completion, &storage, &options, &reporter).await?;

    println!();
    println!("  Sweep complete ({region})");
    println!("  Origins probed:  {}", report.origins_probed);
    println!("  Items extracted: {}", report.items_extracted);
    println!("  Newly saved:     {}", report.items_saved);
    println!("  Skipped:         {}", report.items_skipped);
    println!("  Time:            {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_extract(url: &str, company: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let completion = build_completion_client(&config)?;

    let staged = leadscout_core::stage_extraction(
        &completion,
        url,
        company,
        config.completion.max_tokens,
    )
    .await?;

    // Staged candidates go to stdout as JSON for review/editing before commit.
    println!("{}", serde_json::to_string_pretty(&staged)?);
    Ok(())
}

async fn cmd_commit(file: &PathBuf) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let content = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read {}: {e}", file.display()))?;
    let items: Vec<CandidateInput> = serde_json::from_str(&content)
        .map_err(|e| eyre!("invalid candidate file {}: {e}", file.display()))?;

    let report = leadscout_core::commit_candidates(&storage, &items).await?;

    println!();
    println!("  Commit complete");
    println!("  Newly saved: {}", report.saved);
    println!("  Updated:     {}", report.updated);
    if !report.errors.is_empty() {
        println!("  Errors:");
        for (company, error) in &report.errors {
            println!("    {company}: {error}");
        }
    }
    println!();

    Ok(())
}

async fn cmd_convert(id: &str, scope: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let result = leadscout_core::convert_achievement(&storage, id, scope).await?;

    println!();
    println!("  Achievement converted");
    println!("  Achievement: {}", result.achievement_id);
    println!("  Customer:    {}", result.customer_id);
    println!("  Deal:        {}", result.deal_id);
    println!();

    Ok(())
}

async fn cmd_list() -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let achievements = storage.list_achievements().await?;
    if achievements.is_empty() {
        println!("No achievement candidates stored yet.");
        return Ok(());
    }

    for a in &achievements {
        let flag = if a.is_processed { "✓" } else { " " };
        println!(
            "[{flag}] {}  {} ← {}  ({} / {})",
            a.id, a.company_name, a.production_company, a.prefecture, a.video_type
        );
    }
    println!("\n{} candidate(s)", achievements.len());

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = leadscout_shared::init_config()?;
    println!("Config file created at {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let toml_str =
        toml::to_string_pretty(&config).map_err(|e| eyre!("serialize config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Collaborator construction
// ---------------------------------------------------------------------------

/// Read a required credential from the env var named in config.
fn require_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(eyre!(
            "required credential missing: set the {var_name} environment variable"
        )),
    }
}

fn build_search_provider(config: &AppConfig) -> Result<HttpSearchProvider> {
    let api_key = require_env(&config.search.api_key_env)?;
    let engine_id = require_env(&config.search.engine_id_env)?;
    Ok(HttpSearchProvider::new(
        &config.search.endpoint,
        &api_key,
        &engine_id,
    )?)
}

fn build_completion_client(config: &AppConfig) -> Result<HttpCompletionClient> {
    let api_key = require_env(&config.completion.api_key_env)?;
    Ok(HttpCompletionClient::new(
        &config.completion.endpoint,
        &api_key,
        &config.completion.model,
    )?)
}

async fn open_storage(config: &AppConfig) -> Result<Storage> {
    let path = resolve_db_path(config)?;
    Ok(Storage::open(&path).await?)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Sweep progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn origin(&self, origin: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {origin}"));
    }

    fn done(&self, _report: &SweepReport) {
        self.spinner.finish_and_clear();
    }
}
