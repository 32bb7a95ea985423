//! End-to-end `run` pipeline: config → client (+ cache) → walk → assemble.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};

use imchef_client::{ApiClient, ApiSource, FetchStats};
use imchef_shared::{ChannelNode, Result, RunConfig};
use imchef_storage::ResponseCache;

use crate::assembler::{self, AssembleConfig};
use crate::capability::Capabilities;
use crate::walker::{WalkOptions, WalkReport, Walker};

/// Result of a completed run.
#[derive(Debug)]
pub struct ChefResult {
    /// Directory holding `channel.json` and `manifest.json`.
    pub channel_path: PathBuf,
    pub report: WalkReport,
    pub fetches: FetchStats,
    /// Topics and documents in the written tree.
    pub topic_count: usize,
    pub document_count: usize,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase or hierarchy branch.
    fn phase(&self, name: &str);
    /// Called after a lesson's documents were attached.
    fn lesson_done(&self, title: &str, documents: usize, lessons_so_far: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ChefResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn lesson_done(&self, _title: &str, _documents: usize, _lessons_so_far: usize) {}
    fn done(&self, _result: &ChefResult) {}
}

impl From<&RunConfig> for WalkOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            language: config.channel.language.clone(),
            capabilities: Capabilities {
                assessments: config.assessments,
                practice_problems: config.practice_problems,
            },
            ..WalkOptions::default()
        }
    }
}

/// Build the complete channel tree from `source`. Nothing is written.
pub async fn build_channel<S: ApiSource>(
    source: &S,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Result<(ChannelNode, WalkReport)> {
    let options = WalkOptions::from(config);
    let mut channel = ChannelNode::new(config.channel.clone());
    let report = Walker::new(source, &options, progress)
        .walk(&mut channel)
        .await?;
    Ok((channel, report))
}

/// Run the full chef.
///
/// 1. Open the response cache (unless disabled)
/// 2. Walk the content API into a channel tree
/// 3. Write the channel directory
///
/// The output directory is only touched after the walk succeeded.
#[instrument(skip_all, fields(base_url = %config.base_url, locale = %config.locale))]
pub async fn run_chef(config: &RunConfig, progress: &dyn ProgressReporter) -> Result<ChefResult> {
    let start = Instant::now();

    info!(channel = %config.channel.source_id, "starting chef run");

    // --- Phase 1: Client ---
    progress.phase("Preparing API client");
    let mut client = ApiClient::from_config(config)?;
    if let Some(cache_path) = &config.cache_path {
        let cache = ResponseCache::open(cache_path).await?;
        client = client.with_cache(cache, config.cache_expire_after);
        info!(path = %cache_path.display(), "response cache enabled");
    }

    // --- Phase 2: Walk ---
    progress.phase("Walking content hierarchy");
    let (channel, report) = build_channel(&client, config, progress).await?;

    // --- Phase 3: Assemble ---
    progress.phase("Writing channel");
    let assemble_config = AssembleConfig {
        output_root: config.output_dir.clone(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        api_base_url: config.base_url.to_string(),
        locale: config.locale.clone(),
    };
    let assembled = assembler::assemble(&assemble_config, &channel)?;

    let result = ChefResult {
        channel_path: assembled.channel_path,
        report,
        fetches: client.stats(),
        topic_count: assembled.manifest.topic_count,
        document_count: assembled.manifest.document_count,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        path = %result.channel_path.display(),
        topics = result.topic_count,
        documents = result.document_count,
        network = result.fetches.network,
        cache_hits = result.fetches.cache_hits,
        elapsed_ms = result.elapsed.as_millis(),
        "chef run complete"
    );

    Ok(result)
}
