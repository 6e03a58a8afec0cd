//! Metric batching.

use crate::dcc::ControlCenter;
use crate::error::DccResult;
use crate::protocol::AddStatsMessage;
use crate::registered::RegisteredMetric;
use tracing::{debug, warn};

/// Drains a metric's backlog into one `add_stats` payload.
///
/// Returns `None` when there is nothing to send. An unbound metric keeps
/// its backlog.
pub fn format_batch(metric: &RegisteredMetric) -> DccResult<Option<String>> {
    let name = &metric.metric().name;
    let Some(parent) = metric.parent() else {
        warn!("Metric {} has no parent, holding {} samples", name, metric.backlog());
        return Ok(None);
    };

    let samples = metric.drain_backlog();
    if samples.is_empty() {
        return Ok(None);
    }

    let (timestamps, data): (Vec<i64>, Vec<f64>) =
        samples.iter().map(|s| (s.timestamp, s.value)).unzip();
    debug!("Batching {} samples of {}", timestamps.len(), name);

    let message = AddStatsMessage::new(parent.entity(), name, timestamps, data);
    Ok(Some(serde_json::to_string(&message)?))
}

impl ControlCenter {
    /// Sends one batch for `metric`. Returns whether anything was sent.
    pub async fn publish(&self, metric: &RegisteredMetric) -> DccResult<bool> {
        match format_batch(metric)? {
            Some(payload) => {
                self.correlator.send_payload(payload).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
