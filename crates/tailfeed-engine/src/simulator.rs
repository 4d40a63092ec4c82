//! Synthetic traffic generator for load/soak testing the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::errors::EngineError;

/// Destination for synthetic comments. The GitHub adapter implements
/// this against the real discussion API; tests record in memory.
#[async_trait]
pub trait CommentSender: Send + Sync {
    async fn send_comment(&self, discussion_id: &str, body: &str) -> anyhow::Result<()>;
}

/// Builds the body for the `seq`-th synthetic comment.
pub type PayloadFactory = Box<dyn Fn(u64) -> String + Send + Sync>;

/// Traffic shape for one generation run.
pub struct TrafficOptions {
    pub discussion_id: String,
    /// Steady-state sends per second.
    pub rate_per_second: f64,
    /// How long to sustain the steady rate.
    pub duration_seconds: u64,
    /// Additional comments fired concurrently after the steady phase.
    pub burst_size: u32,
    /// `None` uses the default JSON envelope payload.
    pub payload_factory: Option<PayloadFactory>,
}

impl TrafficOptions {
    pub fn new(discussion_id: impl Into<String>) -> Self {
        Self {
            discussion_id: discussion_id.into(),
            rate_per_second: 0.0,
            duration_seconds: 0,
            burst_size: 0,
            payload_factory: None,
        }
    }

    /// Reject unusable shapes before anything is sent.
    fn validate(&self) -> Result<(), EngineError> {
        if !self.rate_per_second.is_finite() || self.rate_per_second < 0.0 {
            return Err(EngineError::InvalidArgument(format!(
                "rate per second must be a finite number >= 0, got {}",
                self.rate_per_second
            )));
        }
        if self.duration_seconds > 0 && self.rate_per_second == 0.0 {
            return Err(EngineError::InvalidArgument(
                "rate per second must be positive when duration is non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// What a generation run actually delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficSummary {
    pub steady_sent: u64,
    pub burst_sent: u64,
    /// Individual send failures are logged and counted, never fatal.
    pub send_failures: u64,
}

const COMMAND_POOL: &[&str] = &["rate", "review", "summarize", "ping", "echo"];

fn default_payload(seq: u64) -> String {
    let command = COMMAND_POOL[rand::thread_rng().gen_range(0..COMMAND_POOL.len())];
    serde_json::json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "command": command,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "metadata": { "seq": seq, "synthetic": true },
    })
    .to_string()
}

fn payload_for(options: &TrafficOptions, seq: u64) -> String {
    match &options.payload_factory {
        Some(factory) => factory(seq),
        None => default_payload(seq),
    }
}

/// Send synthetic comments at a steady rate for the configured duration,
/// then fire the optional burst concurrently.
///
/// # Errors
///
/// Returns [`EngineError::InvalidArgument`] before any send when the
/// traffic shape is invalid.
pub async fn simulate_traffic(
    sender: &dyn CommentSender,
    options: &TrafficOptions,
) -> Result<TrafficSummary, EngineError> {
    options.validate()?;

    let mut summary = TrafficSummary::default();
    let steady_total =
        (options.rate_per_second * options.duration_seconds as f64).floor() as u64;

    if steady_total > 0 {
        let interval = Duration::from_secs_f64(1.0 / options.rate_per_second);
        tracing::info!(
            discussion_id = options.discussion_id.as_str(),
            rate = options.rate_per_second,
            duration_seconds = options.duration_seconds,
            total = steady_total,
            "Starting steady traffic phase"
        );
        for seq in 0..steady_total {
            let body = payload_for(options, seq);
            match sender.send_comment(&options.discussion_id, &body).await {
                Ok(()) => summary.steady_sent += 1,
                Err(err) => {
                    summary.send_failures += 1;
                    tracing::warn!(seq, error = %err, "Synthetic comment send failed");
                }
            }
            tokio::time::sleep(interval).await;
        }
    }

    if options.burst_size > 0 {
        tracing::info!(
            discussion_id = options.discussion_id.as_str(),
            burst_size = options.burst_size,
            "Firing burst phase"
        );
        let bodies: Vec<String> = (0..u64::from(options.burst_size))
            .map(|i| payload_for(options, steady_total + i))
            .collect();
        let sends = bodies
            .iter()
            .map(|body| sender.send_comment(&options.discussion_id, body));
        for result in futures::future::join_all(sends).await {
            match result {
                Ok(()) => summary.burst_sent += 1,
                Err(err) => {
                    summary.send_failures += 1;
                    tracing::warn!(error = %err, "Burst comment send failed");
                }
            }
        }
    }

    tracing::info!(
        steady_sent = summary.steady_sent,
        burst_sent = summary.burst_sent,
        send_failures = summary.send_failures,
        "Traffic generation complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl CommentSender for RecordingSender {
        async fn send_comment(&self, discussion_id: &str, body: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("send rejected")
            }
            self.sent
                .lock()
                .unwrap()
                .push((discussion_id.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn zero_rate_with_duration_rejects_before_sending() {
        let sender = RecordingSender::default();
        let options = TrafficOptions {
            rate_per_second: 0.0,
            duration_seconds: 10,
            ..TrafficOptions::new("D_1")
        };
        let result = simulate_traffic(&sender, &options).await;
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn negative_rate_is_rejected() {
        let sender = RecordingSender::default();
        let options = TrafficOptions {
            rate_per_second: -1.0,
            ..TrafficOptions::new("D_1")
        };
        assert!(simulate_traffic(&sender, &options).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn steady_phase_sends_rate_times_duration() {
        let sender = RecordingSender::default();
        let options = TrafficOptions {
            rate_per_second: 2.0,
            duration_seconds: 3,
            ..TrafficOptions::new("D_1")
        };
        let summary = simulate_traffic(&sender, &options).await.unwrap();
        assert_eq!(summary.steady_sent, 6);
        assert_eq!(summary.burst_sent, 0);
        assert_eq!(summary.send_failures, 0);
        assert_eq!(sender.sent.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn burst_only_shape_is_valid() {
        let sender = RecordingSender::default();
        let options = TrafficOptions {
            burst_size: 5,
            ..TrafficOptions::new("D_1")
        };
        let summary = simulate_traffic(&sender, &options).await.unwrap();
        assert_eq!(summary.steady_sent, 0);
        assert_eq!(summary.burst_sent, 5);
    }

    #[tokio::test]
    async fn send_failures_are_counted_not_fatal() {
        let sender = RecordingSender {
            fail: true,
            ..RecordingSender::default()
        };
        let options = TrafficOptions {
            burst_size: 3,
            ..TrafficOptions::new("D_1")
        };
        let summary = simulate_traffic(&sender, &options).await.unwrap();
        assert_eq!(summary.burst_sent, 0);
        assert_eq!(summary.send_failures, 3);
    }

    #[tokio::test]
    async fn custom_payload_factory_is_used() {
        let sender = RecordingSender::default();
        let options = TrafficOptions {
            burst_size: 2,
            payload_factory: Some(Box::new(|seq| format!("payload-{seq}"))),
            ..TrafficOptions::new("D_1")
        };
        simulate_traffic(&sender, &options).await.unwrap();
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[0].1, "payload-0");
        assert_eq!(sent[1].1, "payload-1");
    }

    #[test]
    fn default_payload_is_a_command_envelope() {
        let body = default_payload(7);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(value["id"].as_str().unwrap().len() >= 32);
        assert!(COMMAND_POOL.contains(&value["command"].as_str().unwrap()));
        assert!(value["timestamp"].is_string());
        assert_eq!(value["metadata"]["seq"], 7);
    }
}
