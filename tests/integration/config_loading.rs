//! Layered configuration: workspace files, environment overrides, and context construction.

use scribe::config::{ConfigLoader, LedgerBackend};
use scribe::context::GenerationContext;
use scribe::types::{ContentKind, LengthUnit};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that modify process environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn isolated<R>(config_home: &Path, vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let original_home = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", config_home);
    for (key, value) in vars {
        std::env::set_var(key, value);
    }
    let result = f();
    for (key, _) in vars {
        std::env::remove_var(key);
    }
    match original_home {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    result
}

fn write_workspace_config(workspace: &Path, file: &str, contents: &str) {
    std::fs::create_dir_all(workspace.join("config")).unwrap();
    std::fs::write(workspace.join("config").join(file), contents).unwrap();
}

#[test]
fn test_environment_overrides_workspace_file() {
    let temp_dir = TempDir::new().unwrap();
    write_workspace_config(
        temp_dir.path(),
        "config.toml",
        r#"
[run]
max_items_per_run = 4
parallelism = 2

[run.min_length]
podcast = 800
"#,
    );

    let config = isolated(
        &temp_dir.path().join("xdg"),
        &[("SCRIBE__RUN__MAX_ITEMS_PER_RUN", "7")],
        || ConfigLoader::load(temp_dir.path()),
    )
    .unwrap();

    assert_eq!(config.run.max_items_per_run, 7);
    assert_eq!(config.run.parallelism, 2);
    let podcast = config.run.min_length_for(ContentKind::Podcast);
    assert_eq!(podcast.value, 800);
    assert_eq!(podcast.unit, LengthUnit::Words);
    assert_eq!(config.run.min_length_for(ContentKind::Seo).value, 1500);
}

#[test]
fn test_environment_profile_file_is_layered_over_base() {
    let temp_dir = TempDir::new().unwrap();
    write_workspace_config(
        temp_dir.path(),
        "config.toml",
        "[ledger]\npath = \"data/ledger.json\"\n",
    );
    write_workspace_config(
        temp_dir.path(),
        "production.toml",
        "[ledger]\nbackend = \"sled\"\npath = \"data/ledger.sled\"\n",
    );

    let config = isolated(
        &temp_dir.path().join("xdg"),
        &[("SCRIBE_ENV", "production")],
        || ConfigLoader::load(temp_dir.path()),
    )
    .unwrap();

    assert_eq!(config.ledger.backend, LedgerBackend::Sled);
    assert_eq!(
        config.ledger.resolved_path(temp_dir.path()),
        temp_dir.path().join("data/ledger.sled")
    );
}

#[test]
fn test_invalid_provider_configuration_is_rejected_at_startup() {
    let temp_dir = TempDir::new().unwrap();
    write_workspace_config(
        temp_dir.path(),
        "config.toml",
        r#"
[providers.broken]
provider_type = "openai"
model = "gpt-4o-mini"
endpoint = "ftp://example.invalid"
"#,
    );

    let config = isolated(&temp_dir.path().join("xdg"), &[], || {
        ConfigLoader::load(temp_dir.path())
    })
    .unwrap();

    assert!(config.ensure_valid().is_err());
    assert!(GenerationContext::from_config(&config, temp_dir.path()).is_err());
}

#[test]
fn test_context_from_config_builds_registry_in_priority_order() {
    let temp_dir = TempDir::new().unwrap();
    write_workspace_config(
        temp_dir.path(),
        "config.toml",
        r#"
[providers.zeta]
provider_type = "groq"
model = "llama"
priority = 1

[providers.alpha]
provider_type = "gemini"
model = "gemini-1.5-flash"
priority = 2
capabilities = ["seo"]
"#,
    );

    let config = isolated(&temp_dir.path().join("xdg"), &[], || {
        ConfigLoader::load(temp_dir.path())
    })
    .unwrap();
    let context = GenerationContext::from_config(&config, temp_dir.path()).unwrap();

    let seo: Vec<&str> = context
        .registry
        .providers_for(ContentKind::Seo)
        .iter()
        .map(|p| p.descriptor.id.as_str())
        .collect();
    assert_eq!(seo, vec!["zeta", "alpha"]);
    assert_eq!(context.registry.providers_for(ContentKind::Podcast).len(), 1);
}
