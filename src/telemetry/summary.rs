//! End-of-run usage summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Per-provider tallies for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub successes: u64,
    pub failures: u64,
    pub rejects: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failure_reasons: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reject_reasons: BTreeMap<String, u64>,
}

impl UsageCounter {
    pub fn attempts(&self) -> u64 {
        self.successes + self.failures + self.rejects
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub provider_id: String,
    #[serde(flatten)]
    pub counter: UsageCounter,
    /// Share of all requests this provider served.
    pub served_pct: f64,
    /// Share of this provider's attempts that were accepted.
    pub acceptance_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub session: String,
    pub total_requests: u64,
    pub procedural: u64,
    pub procedural_pct: f64,
    pub providers: Vec<ProviderUsage>,
}

impl UsageSummary {
    pub(crate) fn build(
        session: String,
        counters: &BTreeMap<String, UsageCounter>,
        procedural: u64,
    ) -> Self {
        let served: u64 = counters.values().map(|c| c.successes).sum();
        let total_requests = served + procedural;
        let providers = counters
            .iter()
            .map(|(id, counter)| ProviderUsage {
                provider_id: id.clone(),
                served_pct: percentage(counter.successes, total_requests),
                acceptance_pct: percentage(counter.successes, counter.attempts()),
                counter: counter.clone(),
            })
            .collect();
        Self {
            session,
            total_requests,
            procedural,
            procedural_pct: percentage(procedural, total_requests),
            providers,
        }
    }

    pub fn provider(&self, id: &str) -> Option<&ProviderUsage> {
        self.providers.iter().find(|p| p.provider_id == id)
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl fmt::Display for UsageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Usage summary ({})", self.session)?;
        writeln!(f, "  requests: {}", self.total_requests)?;
        for p in &self.providers {
            writeln!(
                f,
                "  {}: {} ok ({:.1}%), {} failed, {} rejected",
                p.provider_id,
                p.counter.successes,
                p.served_pct,
                p.counter.failures,
                p.counter.rejects
            )?;
        }
        write!(
            f,
            "  procedural: {} ({:.1}%)",
            self.procedural, self.procedural_pct
        )
    }
}
