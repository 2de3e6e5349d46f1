//! Integration tests for the scribe content pipeline

mod batch_run;
mod cascade_scenarios;
mod config_loading;
mod http_cascade;
mod ledger_persistence;
mod test_utils;
