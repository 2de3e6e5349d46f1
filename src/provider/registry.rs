//! Provider Registry
//!
//! Immutable, priority-ordered set of providers. Order is fixed at
//! construction: ascending priority, ties broken by id.

use super::clients::ProviderFactory;
use super::profile::ProviderConfig;
use super::{ContentProvider, ProviderDescriptor};
use crate::error::ApiError;
use crate::types::{ContentKind, PROCEDURAL_SOURCE_ID};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// A descriptor paired with the client that serves it.
#[derive(Clone)]
pub struct RegisteredProvider {
    pub descriptor: ProviderDescriptor,
    pub client: Arc<dyn ContentProvider>,
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    /// Build a registry; fails on duplicate provider ids and on the id
    /// reserved for the procedural fallback.
    pub fn new(mut providers: Vec<RegisteredProvider>) -> Result<Self, ApiError> {
        let mut seen = HashSet::new();
        for provider in &providers {
            if provider.descriptor.id == PROCEDURAL_SOURCE_ID {
                return Err(ApiError::ConfigError(format!(
                    "Provider id '{}' is reserved for the procedural fallback",
                    PROCEDURAL_SOURCE_ID
                )));
            }
            if !seen.insert(provider.descriptor.id.clone()) {
                return Err(ApiError::ConfigError(format!(
                    "Duplicate provider id: {}",
                    provider.descriptor.id
                )));
            }
        }
        providers.sort_by(|a, b| {
            a.descriptor
                .priority
                .cmp(&b.descriptor.priority)
                .then_with(|| a.descriptor.id.cmp(&b.descriptor.id))
        });
        Ok(Self { providers })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build clients for every configured provider.
    pub fn from_config(configs: &BTreeMap<String, ProviderConfig>) -> Result<Self, ApiError> {
        let mut providers = Vec::with_capacity(configs.len());
        for (id, config) in configs {
            config.validate().map_err(|e| {
                ApiError::ConfigError(format!("Provider '{}': {}", id, e))
            })?;
            let client = ProviderFactory::create_client(id, config)?;
            if let Err(e) = client.check_ready() {
                info!(provider = %id, reason = %e, "Provider will be skipped");
            }
            providers.push(RegisteredProvider {
                descriptor: ProviderDescriptor::from_config(id, config),
                client,
            });
        }
        let registry = Self::new(providers)?;
        debug!(providers = registry.len(), "Provider registry built");
        Ok(registry)
    }

    /// Enabled providers advertising `kind`, in cascade order.
    pub fn providers_for(&self, kind: ContentKind) -> Vec<&RegisteredProvider> {
        self.providers
            .iter()
            .filter(|p| p.descriptor.serves(kind))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredProvider> {
        self.providers.iter().find(|p| p.descriptor.id == id)
    }

    pub fn get_or_error(&self, id: &str) -> Result<&RegisteredProvider, ApiError> {
        self.get(id)
            .ok_or_else(|| ApiError::ConfigError(format!("Provider not found: {}", id)))
    }

    pub fn list_all(&self) -> &[RegisteredProvider] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
