//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("ledger.backend", "json")?
        .set_default("ledger.path", "data/content_ledger.json")?
        .set_default("run.max_items_per_run", 10_i64)?
        .set_default("run.parallelism", 4_i64)?
        .set_default("run.dry_run", false)?
        .set_default("run.output_dir", "output")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")
}
