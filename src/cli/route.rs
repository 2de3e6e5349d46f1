//! CLI route: single route table and run context. Dispatches to the batch runner,
//! cascade and ledger, then hands results to presentation.

use crate::batch::{BatchItem, BatchOptions, BatchRunner, DirectoryPublisher};
use crate::cascade::{AttemptOutcome, CascadeController};
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_batch_report, format_check_result, format_status_json, format_status_text, CheckView,
    ProviderRow, StatusView,
};
use crate::config::{ConfigLoader, ScribeConfig};
use crate::context::{open_ledger_store, GenerationContext};
use crate::error::ApiError;
use crate::ledger::{fingerprint, ContentLedger};
use crate::types::{ContentKind, GenerationRequest};
use serde_json::json;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Runtime context for CLI execution: workspace root and resolved configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: ScribeConfig,
    color: bool,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.ensure_valid()?;
        let color = config.logging.color && std::io::stdout().is_terminal();
        Ok(Self {
            workspace_root,
            config,
            color,
        })
    }

    /// Force dry-run mode regardless of configuration.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        if dry_run {
            self.config.run.dry_run = true;
        }
        self
    }

    pub fn config(&self) -> &ScribeConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a command and return its printable output.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Run {
                topics,
                kind,
                locale,
                sequenced,
                out,
                limit,
            } => self.handle_run(
                topics,
                *kind,
                locale.as_deref(),
                *sequenced,
                out.as_deref(),
                *limit,
            ),
            Commands::Generate {
                kind,
                topic,
                locale,
            } => self.handle_generate(*kind, topic, locale.as_deref()),
            Commands::Check {
                kind,
                topic,
                locale,
            } => self.handle_check(*kind, topic, locale.as_deref()),
            Commands::Status { format } => self.handle_status(*format),
        }
    }

    fn request(&self, kind: ContentKind, topic: &str, locale: Option<&str>) -> GenerationRequest {
        let request = GenerationRequest::for_kind(kind, topic)
            .with_min_length(self.config.run.min_length_for(kind));
        match locale {
            Some(locale) => request.with_locale(locale),
            None => request,
        }
    }

    fn handle_run(
        &self,
        topics_path: &Path,
        kind: ContentKind,
        locale: Option<&str>,
        sequenced: bool,
        out: Option<&Path>,
        limit: Option<usize>,
    ) -> Result<String, ApiError> {
        let topics = read_topics(&self.workspace_root.join(topics_path))?;
        let mut config = self.config.clone();
        if let Some(limit) = limit {
            config.run.max_items_per_run = limit;
        }

        let context = Arc::new(GenerationContext::from_config(&config, &self.workspace_root)?);
        let output_dir = match out {
            Some(dir) => self.workspace_root.join(dir),
            None => config.run.resolved_output_dir(&self.workspace_root),
        };
        let sequenced = sequenced || kind == ContentKind::Podcast;
        let items: Vec<BatchItem> = topics
            .iter()
            .map(|topic| {
                let request = self.request(kind, topic, locale);
                if sequenced {
                    BatchItem::sequenced(request)
                } else {
                    BatchItem::new(request)
                }
            })
            .collect();

        info!(
            kind = %kind,
            topics = items.len(),
            output = %output_dir.display(),
            "Starting run"
        );
        let runner = BatchRunner::new(
            context,
            Arc::new(DirectoryPublisher::new(output_dir)),
            BatchOptions::from(&config.run),
        );
        let shutdown = runner.shutdown_signal();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let result = runtime.block_on(async {
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received; finishing in-flight items");
                    shutdown.trigger();
                }
            });
            let result = runner.run(items).await;
            interrupt.abort();
            result
        });

        match result {
            Ok(report) => Ok(format_batch_report(&report, self.color)),
            Err(aborted) => {
                eprintln!("{}", format_batch_report(&aborted.report, self.color));
                Err(aborted.into())
            }
        }
    }

    fn handle_generate(
        &self,
        kind: ContentKind,
        topic: &str,
        locale: Option<&str>,
    ) -> Result<String, ApiError> {
        let mut config = self.config.clone();
        config.run.dry_run = true;
        let context = Arc::new(GenerationContext::from_config(&config, &self.workspace_root)?);
        let request = self.request(kind, topic, locale);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let result = runtime.block_on(CascadeController::new(context).generate_traced(&request));

        let attempts: Vec<_> = result
            .trace
            .attempts
            .iter()
            .map(|attempt| {
                let outcome = match &attempt.outcome {
                    AttemptOutcome::Accepted => "accepted".to_string(),
                    AttemptOutcome::Failed { reason, .. } => format!("failed: {}", reason),
                    AttemptOutcome::Rejected(rejection) => {
                        format!("rejected: {}", rejection.reason_code())
                    }
                    AttemptOutcome::Skipped { reason } => format!("skipped: {}", reason),
                };
                json!({
                    "provider": attempt.provider_id,
                    "outcome": outcome,
                    "elapsed_ms": attempt.elapsed.as_millis() as u64,
                })
            })
            .collect();
        let output = json!({
            "artifact": result.artifact,
            "attempts": attempts,
        });
        serde_json::to_string_pretty(&output)
            .map_err(|e| ApiError::ConfigError(format!("Failed to render artifact: {}", e)))
    }

    /// Read-only view of the ledger: nothing is reserved or persisted.
    fn open_ledger(&self) -> Result<(ContentLedger, String), ApiError> {
        let store = open_ledger_store(&self.config, &self.workspace_root)?;
        let location = store.describe();
        Ok((ContentLedger::open(store, true), location))
    }

    fn handle_check(
        &self,
        kind: ContentKind,
        topic: &str,
        locale: Option<&str>,
    ) -> Result<String, ApiError> {
        let (ledger, _) = self.open_ledger()?;
        let view = CheckView {
            kind,
            topic: topic.to_string(),
            locale: locale.map(str::to_string),
            fingerprint: fingerprint(kind, topic, locale),
            recorded: ledger.is_duplicate(kind, topic, locale),
            next_sequence: ledger.sequence_counter(kind) + 1,
        };
        Ok(format_check_result(&view))
    }

    fn handle_status(&self, format: OutputFormat) -> Result<String, ApiError> {
        let (ledger, location) = self.open_ledger()?;
        let mut providers: Vec<ProviderRow> = self
            .config
            .providers
            .iter()
            .map(|(id, provider)| ProviderRow {
                id: id.clone(),
                provider_type: provider.provider_type.to_string(),
                model: provider.model.clone(),
                priority: provider.priority,
                capabilities: provider.capabilities.clone(),
                enabled: provider.enabled,
                credentials: provider.resolve_api_key().is_some(),
            })
            .collect();
        providers.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

        let view = StatusView {
            ledger: location,
            stats: ledger.stats(),
            providers,
        };
        Ok(match format {
            OutputFormat::Text => format_status_text(&view, self.color),
            OutputFormat::Json => format_status_json(&view),
        })
    }
}

/// Topics file: one topic per line; blank lines and lines starting with '#' are ignored.
pub fn read_topics(path: &Path) -> Result<Vec<String>, ApiError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ApiError::ConfigError(format!("Failed to read topics file {}: {}", path.display(), e))
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
