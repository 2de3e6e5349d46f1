//! Scribe: Unattended Content Generation
//!
//! Produces content artifacts by cascading through prioritized generation
//! providers, validating each output, and falling back to a deterministic
//! procedural generator when every provider fails. A persistent ledger makes
//! publication idempotent and keeps per-kind sequence numbers gap-free.

pub mod batch;
pub mod cascade;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod fallback;
pub mod ledger;
pub mod logging;
pub mod provider;
pub mod telemetry;
pub mod types;
pub mod validator;
