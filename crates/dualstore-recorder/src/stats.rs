//! Drift statistics over the diff log

use crate::error::StoreError;
use crate::store::DiffStore;
use chrono::{DateTime, Duration, Utc};
use dualstore_core::{DiffRecord, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default number of endpoints in `top_endpoints`
pub const DEFAULT_TOP_ENDPOINTS: usize = 10;

/// Count per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    pub info: u64,
    pub warning: u64,
    pub error: u64,
}

impl SeverityBreakdown {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Info => self.info += 1,
            Severity::Warning => self.warning += 1,
            Severity::Error => self.error += 1,
        }
    }
}

/// Diff count for one `domain.method`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCount {
    pub endpoint: String,
    pub count: u64,
}

/// Aggregate over a window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub total_diffs: u64,
    pub severity_breakdown: SeverityBreakdown,
    pub top_endpoints: Vec<EndpointCount>,
}

impl DiffStats {
    /// Fold records into stats, keeping the `top_n` busiest endpoints
    #[must_use]
    pub fn from_records(records: &[DiffRecord], top_n: usize) -> Self {
        let mut breakdown = SeverityBreakdown::default();
        let mut per_endpoint: BTreeMap<String, u64> = BTreeMap::new();
        for record in records {
            breakdown.add(record.severity);
            *per_endpoint.entry(record.endpoint()).or_default() += 1;
        }

        let mut top_endpoints: Vec<EndpointCount> = per_endpoint
            .into_iter()
            .map(|(endpoint, count)| EndpointCount { endpoint, count })
            .collect();
        top_endpoints.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.endpoint.cmp(&b.endpoint)));
        top_endpoints.truncate(top_n);

        Self {
            total_diffs: records.len() as u64,
            severity_breakdown: breakdown,
            top_endpoints,
        }
    }
}

/// Time-windowed queries over a [`DiffStore`]
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    store: Arc<dyn DiffStore>,
    top_n: usize,
}

impl StatsAggregator {
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn DiffStore>) -> Self {
        Self {
            store,
            top_n: DEFAULT_TOP_ENDPOINTS,
        }
    }

    /// With endpoint limit
    #[inline]
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Stats for the trailing `window_days * 24h`
    ///
    /// A zero-day window is empty. A window reaching past the earliest
    /// representable time covers the whole log.
    ///
    /// # Errors
    /// Returns the store's error.
    pub async fn stats_for(&self, window_days: u32) -> Result<DiffStats, StoreError> {
        if window_days == 0 {
            return Ok(DiffStats::default());
        }
        let until = Utc::now();
        let since = Duration::try_days(i64::from(window_days))
            .and_then(|window| until.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.stats_between(since, until).await
    }

    /// Stats for an explicit range
    ///
    /// # Errors
    /// Returns the store's error.
    pub async fn stats_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<DiffStats, StoreError> {
        let records = self.store.query_range(since, until).await?;
        let stats = DiffStats::from_records(&records, self.top_n);
        tracing::debug!(%since, %until, total = stats.total_diffs, "diff stats computed");
        Ok(stats)
    }
}

/// Release gate: do not advance a phase while drift exceeds these limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseGate {
    pub window_days: u32,
    pub max_errors: u64,
    /// `None` leaves warnings unbounded
    pub max_warnings: Option<u64>,
}

impl Default for ReleaseGate {
    fn default() -> Self {
        Self {
            window_days: 1,
            max_errors: 0,
            max_warnings: None,
        }
    }
}

/// Gate verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub passed: bool,
    pub violations: Vec<String>,
}

impl ReleaseGate {
    #[must_use]
    pub fn evaluate(&self, stats: &DiffStats) -> GateDecision {
        let mut violations = Vec::new();
        let breakdown = &stats.severity_breakdown;
        if breakdown.error > self.max_errors {
            violations.push(format!(
                "{} error diffs in the last {} day(s), limit {}",
                breakdown.error, self.window_days, self.max_errors
            ));
        }
        if let Some(max) = self.max_warnings {
            if breakdown.warning > max {
                violations.push(format!(
                    "{} warning diffs in the last {} day(s), limit {max}",
                    breakdown.warning, self.window_days
                ));
            }
        }
        GateDecision {
            passed: violations.is_empty(),
            violations,
        }
    }

    /// Evaluate against live stats
    ///
    /// # Errors
    /// Returns the store's error.
    pub async fn check(&self, aggregator: &StatsAggregator) -> Result<GateDecision, StoreError> {
        let stats = aggregator.stats_for(self.window_days).await?;
        Ok(self.evaluate(&stats))
    }
}
