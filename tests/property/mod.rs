//! Property-based tests for normalization, fallback and sequencing guarantees

mod fallback_validity;
mod ledger_invariants;
