//! Generation context: everything a cascade needs, built once per process.

use crate::config::{LedgerBackend, ScribeConfig};
use crate::error::ApiError;
use crate::fallback::ProceduralGenerator;
use crate::ledger::{ContentLedger, JsonFileStore, LedgerStore, SledLedgerStore};
use crate::provider::ProviderRegistry;
use crate::telemetry::UsageTelemetry;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Provider registry, ledger handle and telemetry sink, passed explicitly.
pub struct GenerationContext {
    pub registry: Arc<ProviderRegistry>,
    pub ledger: Arc<ContentLedger>,
    pub telemetry: Arc<UsageTelemetry>,
    pub fallback: ProceduralGenerator,
}

impl GenerationContext {
    pub fn new(
        registry: ProviderRegistry,
        ledger: ContentLedger,
        telemetry: UsageTelemetry,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            ledger: Arc::new(ledger),
            telemetry: Arc::new(telemetry),
            fallback: ProceduralGenerator::new(),
        }
    }

    /// Build providers, open the ledger and start a telemetry session.
    pub fn from_config(config: &ScribeConfig, workspace_root: &Path) -> Result<Self, ApiError> {
        config.ensure_valid()?;
        let registry = ProviderRegistry::from_config(&config.providers)?;
        let store = open_ledger_store(config, workspace_root)?;
        let ledger = ContentLedger::open(store, config.run.dry_run);
        let telemetry = UsageTelemetry::new();
        info!(
            session = %telemetry.session(),
            providers = registry.len(),
            dry_run = config.run.dry_run,
            "Generation context ready"
        );
        Ok(Self::new(registry, ledger, telemetry))
    }
}

/// Open the configured ledger backend.
pub fn open_ledger_store(
    config: &ScribeConfig,
    workspace_root: &Path,
) -> Result<Arc<dyn LedgerStore>, ApiError> {
    let path = config.ledger.resolved_path(workspace_root);
    let store: Arc<dyn LedgerStore> = match config.ledger.backend {
        LedgerBackend::Json => Arc::new(JsonFileStore::new(path)),
        LedgerBackend::Sled => Arc::new(SledLedgerStore::open(path)?),
    };
    Ok(store)
}
