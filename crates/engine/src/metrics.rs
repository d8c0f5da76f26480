//! Attempt metrics and daily rollups
//!
//! Every provider attempt is recorded twice: once through the in-process
//! `metrics` facade (scraped by whatever exporter the surrounding runtime
//! installs) and once as additive deltas merged into a per-day, per-agent
//! key in the shared rollup store. Merges are additive, so concurrent
//! engine processes never clobber each other's counts.

use chrono::Utc;
use metrics::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use voice_orch_store::RollupStore;

/// Operation kind being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Stt,
    Tts,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Stt => "stt",
            OperationKind::Tts => "tts",
        }
    }
}

/// One provider attempt, success or failure
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub agent_id: String,
    pub user_id: String,
    pub operation: OperationKind,
    pub provider: String,
    pub success: bool,
    pub latency: Duration,
    pub request_bytes: usize,
    pub response_bytes: usize,
    /// Rendered error for failed attempts
    pub error: Option<String>,
    /// True when a provider past priority index 0 served the request
    pub fallback_used: bool,
}

/// Per-provider slice of a daily rollup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderStats {
    pub total: i64,
    pub success: i64,
}

/// One day's rollup for one agent
#[derive(Debug, Clone, Default)]
pub struct DailyStats {
    pub total: i64,
    pub success: i64,
    pub latency_ms_total: i64,
    pub fallback_used: i64,
    pub request_bytes: i64,
    pub response_bytes: i64,
    pub providers: HashMap<String, ProviderStats>,
}

impl DailyStats {
    pub fn failed(&self) -> i64 {
        self.total - self.success
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.latency_ms_total as f64 / self.total as f64
        }
    }

    fn from_fields(fields: &HashMap<String, i64>) -> Self {
        let mut stats = DailyStats {
            total: fields.get("total").copied().unwrap_or(0),
            success: fields.get("success").copied().unwrap_or(0),
            latency_ms_total: fields.get("latency_ms").copied().unwrap_or(0),
            fallback_used: fields.get("fallback_used").copied().unwrap_or(0),
            request_bytes: fields.get("bytes_in").copied().unwrap_or(0),
            response_bytes: fields.get("bytes_out").copied().unwrap_or(0),
            providers: HashMap::new(),
        };
        for (field, value) in fields {
            if let Some(rest) = field.strip_prefix("provider:") {
                if let Some((name, kind)) = rest.rsplit_once(':') {
                    let entry = stats.providers.entry(name.to_string()).or_default();
                    match kind {
                        "total" => entry.total = *value,
                        "success" => entry.success = *value,
                        _ => {}
                    }
                }
            }
        }
        stats
    }

    fn merge(&mut self, other: &DailyStats) {
        self.total += other.total;
        self.success += other.success;
        self.latency_ms_total += other.latency_ms_total;
        self.fallback_used += other.fallback_used;
        self.request_bytes += other.request_bytes;
        self.response_bytes += other.response_bytes;
        for (name, stats) in &other.providers {
            let entry = self.providers.entry(name.clone()).or_default();
            entry.total += stats.total;
            entry.success += stats.success;
        }
    }
}

/// Engine-wide aggregate over all agents and days still retained
#[derive(Debug, Clone, Default)]
pub struct SystemMetrics {
    pub totals: DailyStats,
    pub agents: usize,
}

/// Rollup retention; old day buckets age out of the store
const ROLLUP_TTL: Duration = Duration::from_secs(40 * 24 * 3600);

#[derive(Clone)]
pub struct MetricsCollector {
    store: Arc<dyn RollupStore>,
}

impl MetricsCollector {
    pub fn new(store: Arc<dyn RollupStore>) -> Self {
        Self { store }
    }

    fn day_key(agent_id: &str, day: &str) -> String {
        format!("metrics:{}:{}", agent_id, day)
    }

    /// Record one attempt. Never fails the request path: store errors are
    /// logged and dropped.
    pub async fn record_attempt(&self, record: &AttemptRecord) {
        let outcome = if record.success { "success" } else { "failure" };
        counter!(
            "voice_orch_attempts_total",
            "operation" => record.operation.as_str(),
            "provider" => record.provider.clone(),
            "outcome" => outcome,
        )
        .increment(1);
        histogram!(
            "voice_orch_attempt_duration_seconds",
            "operation" => record.operation.as_str(),
            "provider" => record.provider.clone(),
        )
        .record(record.latency.as_secs_f64());
        if record.fallback_used {
            counter!(
                "voice_orch_fallback_total",
                "operation" => record.operation.as_str(),
            )
            .increment(1);
        }

        let success = i64::from(record.success);
        let deltas = vec![
            ("total".to_string(), 1),
            ("success".to_string(), success),
            (
                "latency_ms".to_string(),
                record.latency.as_millis() as i64,
            ),
            (
                "fallback_used".to_string(),
                i64::from(record.fallback_used && record.success),
            ),
            ("bytes_in".to_string(), record.request_bytes as i64),
            ("bytes_out".to_string(), record.response_bytes as i64),
            (format!("provider:{}:total", record.provider), 1),
            (format!("provider:{}:success", record.provider), success),
        ];

        let key = Self::day_key(&record.agent_id, &Utc::now().format("%Y-%m-%d").to_string());
        if let Err(err) = self.store.merge_counters(&key, &deltas, ROLLUP_TTL).await {
            tracing::warn!(error = %err, "metrics rollup write failed, dropping record");
        }

        if let Some(error) = &record.error {
            tracing::debug!(
                agent_id = %record.agent_id,
                provider = %record.provider,
                error,
                "recorded failed attempt"
            );
        }
    }

    /// Per-day stats for one agent, keyed by `YYYY-MM-DD`
    pub async fn agent_stats(
        &self,
        agent_id: &str,
    ) -> Result<HashMap<String, DailyStats>, voice_orch_store::StoreError> {
        let prefix = format!("metrics:{}:", agent_id);
        let mut out = HashMap::new();
        for key in self.store.list_keys(&prefix).await? {
            let day = key.trim_start_matches(&prefix).to_string();
            let fields = self.store.read_counters(&key).await?;
            out.insert(day, DailyStats::from_fields(&fields));
        }
        Ok(out)
    }

    /// Aggregate across every agent and retained day
    pub async fn system_metrics(
        &self,
    ) -> Result<SystemMetrics, voice_orch_store::StoreError> {
        let mut totals = DailyStats::default();
        let mut agents = std::collections::HashSet::new();
        for key in self.store.list_keys("metrics:").await? {
            // metrics:{agent}:{day}
            if let Some(rest) = key.strip_prefix("metrics:") {
                if let Some((agent, _day)) = rest.rsplit_once(':') {
                    agents.insert(agent.to_string());
                }
            }
            let fields = self.store.read_counters(&key).await?;
            totals.merge(&DailyStats::from_fields(&fields));
        }
        Ok(SystemMetrics {
            totals,
            agents: agents.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_orch_store::MemoryStore;

    fn record(agent: &str, provider: &str, success: bool, fallback: bool) -> AttemptRecord {
        AttemptRecord {
            agent_id: agent.into(),
            user_id: "user".into(),
            operation: OperationKind::Stt,
            provider: provider.into(),
            success,
            latency: Duration::from_millis(120),
            request_bytes: 1000,
            response_bytes: 64,
            error: (!success).then(|| "transient provider error: 503".into()),
            fallback_used: fallback,
        }
    }

    #[tokio::test]
    async fn test_rollup_accumulates() {
        let collector = MetricsCollector::new(Arc::new(MemoryStore::new()));
        collector.record_attempt(&record("a1", "yandex", false, false)).await;
        collector.record_attempt(&record("a1", "openai", true, true)).await;

        let stats = collector.agent_stats("a1").await.unwrap();
        assert_eq!(stats.len(), 1);
        let day = stats.values().next().unwrap();
        assert_eq!(day.total, 2);
        assert_eq!(day.success, 1);
        assert_eq!(day.failed(), 1);
        assert_eq!(day.fallback_used, 1);
        assert_eq!(day.providers["yandex"], ProviderStats { total: 1, success: 0 });
        assert_eq!(day.providers["openai"], ProviderStats { total: 1, success: 1 });
        assert!((day.avg_latency_ms() - 120.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_system_metrics_spans_agents() {
        let collector = MetricsCollector::new(Arc::new(MemoryStore::new()));
        collector.record_attempt(&record("a1", "openai", true, false)).await;
        collector.record_attempt(&record("a2", "google", true, false)).await;

        let system = collector.system_metrics().await.unwrap();
        assert_eq!(system.agents, 2);
        assert_eq!(system.totals.total, 2);
        assert_eq!(system.totals.success, 2);
    }

    #[tokio::test]
    async fn test_fallback_only_counted_on_success() {
        let collector = MetricsCollector::new(Arc::new(MemoryStore::new()));
        // A failed attempt on a fallback provider is not "fallback used"
        collector.record_attempt(&record("a1", "openai", false, true)).await;
        let stats = collector.agent_stats("a1").await.unwrap();
        assert_eq!(stats.values().next().unwrap().fallback_used, 0);
    }
}
