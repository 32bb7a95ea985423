//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use imchef_core::assembler;
use imchef_core::capability::{Capabilities, CapabilityStatus};
use imchef_core::pipeline::{ChefResult, ProgressReporter};
use imchef_shared::{AppConfig, RunConfig, init_config, load_config, resolve_api_key};
use imchef_storage::ResponseCache;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// imchef: build an importable channel from the Illustrative Mathematics content API.
#[derive(Parser)]
#[command(
    name = "imchef",
    version,
    about = "Walk the curriculum content API and write an importable channel tree.",
    long_about = None,
)]
pub(crate) struct Cli {
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
    /// Walk the content API and write the channel.
    Run {
        /// Output directory (defaults to `[defaults].output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Fetch everything live, bypassing the response cache.
        #[arg(long)]
        no_cache: bool,

        /// Curriculum locale to import.
        #[arg(long)]
        locale: Option<String>,

        /// Also fetch unit assessments (no nodes are built from them).
        #[arg(long)]
        assessments: bool,

        /// Import practice problems for K5 sections.
        #[arg(long)]
        practice_problems: bool,
    },

    /// Check a written channel directory against its manifest.
    Validate {
        /// Channel directory (the one holding channel.json).
        path: PathBuf,
    },

    /// Response cache maintenance.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show entry count and age range.
    Stats,
    /// Delete entries older than the configured expiry.
    Purge,
    /// Delete every entry.
    Clear,
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
        0 => "imchef=info",
        1 => "imchef=debug",
        _ => "imchef=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            out,
            no_cache,
            locale,
            assessments,
            practice_problems,
        } => {
            let overrides = RunOverrides {
                out,
                no_cache,
                locale,
                assessments,
                practice_problems,
            };
            cmd_run(overrides).await
        }
        Command::Validate { path } => cmd_validate(&path),
        Command::Cache { action } => cmd_cache(action).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// `run` flags that override the config file.
#[derive(Debug, Default)]
struct RunOverrides {
    out: Option<PathBuf>,
    no_cache: bool,
    locale: Option<String>,
    assessments: bool,
    practice_problems: bool,
}

impl RunOverrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(out) = self.out {
            config.defaults.output_dir = out.to_string_lossy().into_owned();
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        if let Some(locale) = self.locale {
            config.content.locale = locale;
        }
        config.content.assessments |= self.assessments;
        config.content.practice_problems |= self.practice_problems;
    }
}

async fn cmd_run(overrides: RunOverrides) -> Result<()> {
    let mut config = load_config()?;
    overrides.apply(&mut config);

    // Validate API key before doing anything
    let api_key = resolve_api_key(&config)?;
    let run_config = RunConfig::new(&config, api_key)?;

    let capabilities = Capabilities {
        assessments: run_config.assessments,
        practice_problems: run_config.practice_problems,
    };
    for capability in capabilities.enabled() {
        if let CapabilityStatus::Stub { reason } = capability.status() {
            eprintln!("  note: {capability} is fetched but not imported ({reason})");
        }
    }

    info!(
        base_url = %run_config.base_url,
        locale = %run_config.locale,
        out = %run_config.output_dir.display(),
        cache = run_config.cache_path.is_some(),
        "starting run"
    );

    let reporter = CliProgress::new();
    let result = imchef_core::pipeline::run_chef(&run_config, &reporter).await?;

    println!();
    println!("  Channel written successfully!");
    println!("  Channel:   {}", run_config.channel.source_id);
    println!("  Topics:    {}", result.topic_count);
    println!("  Documents: {}", result.document_count);
    println!("  Lessons:   {}", result.report.lessons);
    if result.report.curriculums_skipped > 0 {
        println!(
            "  Skipped:   {} curriculum(s) not in locale '{}'",
            result.report.curriculums_skipped, run_config.locale
        );
    }
    if result.report.resources.links_dropped > 0 {
        println!(
            "  Dropped:   {} unsupported link(s)",
            result.report.resources.links_dropped
        );
    }
    println!(
        "  Requests:  {} network, {} cached",
        result.fetches.network, result.fetches.cache_hits
    );
    println!("  Path:      {}", result.channel_path.display());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

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
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn lesson_done(&self, title: &str, documents: usize, lessons_so_far: usize) {
        self.spinner.set_message(format!(
            "[{lessons_so_far} lessons] {title} ({documents} documents)"
        ));
    }

    fn done(&self, _result: &ChefResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn cmd_validate(path: &std::path::Path) -> Result<()> {
    let manifest = assembler::validate_channel(path)?;
    println!("  Channel directory is valid.");
    println!("  Channel:   {}", manifest.channel_source_id);
    println!("  Topics:    {}", manifest.topic_count);
    println!("  Documents: {}", manifest.document_count);
    println!("  Created:   {}", manifest.created_at.to_rfc3339());
    Ok(())
}

// ---------------------------------------------------------------------------
// cache
// ---------------------------------------------------------------------------

async fn cmd_cache(action: CacheAction) -> Result<()> {
    let config = load_config()?;
    let path = config.cache.resolved_path()?;

    if !path.exists() {
        return Err(eyre!("no response cache at {}", path.display()));
    }
    let cache = ResponseCache::open(&path).await?;

    match action {
        CacheAction::Stats => {
            let stats = cache.stats().await?;
            println!("  Cache:   {}", path.display());
            println!("  Entries: {}", stats.entries);
            if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                println!("  Oldest:  {}", oldest.to_rfc3339());
                println!("  Newest:  {}", newest.to_rfc3339());
            }
        }
        CacheAction::Purge => {
            let max_age = Duration::from_secs(config.cache.expire_after_secs);
            let removed = cache.purge_expired(max_age).await?;
            println!("Removed {removed} expired entries from {}", path.display());
        }
        CacheAction::Clear => {
            let removed = cache.clear().await?;
            println!("Removed {removed} entries from {}", path.display());
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "imchef",
            "-vv",
            "--log-format",
            "json",
            "run",
            "--out",
            "/tmp/out",
            "--no-cache",
            "--locale",
            "es",
            "--practice-problems",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
        match cli.command {
            Command::Run {
                out,
                no_cache,
                locale,
                assessments,
                practice_problems,
            } => {
                assert_eq!(out, Some(PathBuf::from("/tmp/out")));
                assert!(no_cache);
                assert_eq!(locale.as_deref(), Some("es"));
                assert!(!assessments);
                assert!(practice_problems);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = AppConfig::default();
        config.content.assessments = true;

        RunOverrides {
            out: Some(PathBuf::from("/tmp/channels")),
            no_cache: true,
            locale: Some("es".into()),
            assessments: false,
            practice_problems: true,
        }
        .apply(&mut config);

        assert_eq!(config.defaults.output_dir, "/tmp/channels");
        assert!(!config.cache.enabled);
        assert_eq!(config.content.locale, "es");
        assert!(config.content.assessments);
        assert!(config.content.practice_problems);
    }

    #[test]
    fn empty_overrides_keep_config() {
        let mut config = AppConfig::default();
        RunOverrides::default().apply(&mut config);
        assert!(config.cache.enabled);
        assert_eq!(config.content.locale, "en");
    }

    #[test]
    fn cache_subcommands_parse() {
        let cli = Cli::try_parse_from(["imchef", "cache", "purge"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Cache {
                action: CacheAction::Purge
            }
        ));
    }
}
