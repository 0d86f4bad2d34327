//! Per-candidate failure bookkeeping.

use std::time::Instant;

use dashmap::DashMap;

use crate::endpoints::EndpointCandidate;

/// Failure streak for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptRecord {
    pub consecutive_failures: u32,
    pub last_tried_at: Option<Instant>,
}

/// Attempt records keyed by candidate URL, created lazily.
#[derive(Debug)]
pub struct AttemptBook {
    records: DashMap<String, AttemptRecord>,
    threshold: u32,
}

impl AttemptBook {
    /// `threshold` consecutive failures take a candidate out of scans.
    pub fn new(threshold: u32) -> Self {
        Self {
            records: DashMap::new(),
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn get(&self, url: &str) -> AttemptRecord {
        self.records.get(url).map(|r| *r.value()).unwrap_or_default()
    }

    pub fn is_exhausted(&self, url: &str) -> bool {
        self.get(url).consecutive_failures >= self.threshold
    }

    /// Note a probe without changing the streak.
    pub fn mark_tried(&self, url: &str) {
        self.records.entry(url.to_string()).or_default().last_tried_at = Some(Instant::now());
    }

    /// Increment the streak; returns the new count.
    pub fn record_failure(&self, url: &str) -> u32 {
        let mut record = self.records.entry(url.to_string()).or_default();
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        record.last_tried_at = Some(Instant::now());
        record.consecutive_failures
    }

    pub fn record_success(&self, url: &str) {
        let mut record = self.records.entry(url.to_string()).or_default();
        record.consecutive_failures = 0;
        record.last_tried_at = Some(Instant::now());
    }

    /// Reset the streak without marking a probe (request success path).
    pub fn reset(&self, url: &str) {
        if let Some(mut record) = self.records.get_mut(url) {
            record.consecutive_failures = 0;
        }
    }

    /// Candidates still eligible for a scan, in order.
    ///
    /// When every candidate is exhausted all streaks are reset and the whole
    /// list is returned, so the client can never lock itself out.
    pub fn eligible(&self, candidates: &[EndpointCandidate]) -> Vec<EndpointCandidate> {
        let eligible: Vec<EndpointCandidate> = candidates
            .iter()
            .filter(|c| !self.is_exhausted(&c.url))
            .cloned()
            .collect();

        if eligible.is_empty() && !candidates.is_empty() {
            tracing::info!(
                candidates = candidates.len(),
                threshold = self.threshold,
                "All endpoints over failure threshold, resetting counters"
            );
            for candidate in candidates {
                self.reset(&candidate.url);
            }
            return candidates.to_vec();
        }
        eligible
    }
}
