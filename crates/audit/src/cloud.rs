//! Cloud log stream sink.
//!
//! Batches records and writes them to a remote log stream that follows the
//! CloudWatch Logs contract: streams are created before the first write and
//! every put returns the sequence token the next put must present.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use enact_core::{AuditRecord, Auditor, Error, Result};

/// One event in a log stream batch.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Event time in milliseconds since the epoch.
    pub timestamp_ms: i64,

    /// JSON-encoded audit record.
    pub message: String,
}

/// Transport for a sequence-token log stream service.
#[async_trait]
pub trait LogStreamClient: Send + Sync {
    /// Create the stream; succeeds if it already exists.
    async fn create_stream(&self, group: &str, stream: &str) -> Result<()>;

    /// Write a batch, presenting the previous sequence token, and return
    /// the next one.
    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
        sequence_token: Option<&str>,
    ) -> Result<Option<String>>;
}

#[derive(Default)]
struct StreamState {
    initialized: bool,
    sequence_token: Option<String>,
    buffer: Vec<LogEvent>,
}

/// Batched audit sink over a [`LogStreamClient`].
///
/// The stream is auto-created on the first flush. A failed put drops the
/// batch: the sink is best-effort and must not grow without bound.
pub struct CloudLogAuditor {
    client: Arc<dyn LogStreamClient>,
    group: String,
    stream: String,
    batch_size: usize,
    state: Mutex<StreamState>,
}

impl CloudLogAuditor {
    /// Create a sink flushing every record immediately.
    pub fn new(
        client: Arc<dyn LogStreamClient>,
        group: impl Into<String>,
        stream: impl Into<String>,
    ) -> Self {
        Self {
            client,
            group: group.into(),
            stream: stream.into(),
            batch_size: 1,
            state: Mutex::new(StreamState::default()),
        }
    }

    /// Buffer up to `batch_size` records per put. Call [`Self::flush`] to
    /// drain a partial batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Write out any buffered events.
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await
    }

    async fn flush_locked(&self, state: &mut StreamState) -> Result<()> {
        if state.buffer.is_empty() {
            return Ok(());
        }

        if !state.initialized {
            self.client.create_stream(&self.group, &self.stream).await?;
            state.initialized = true;
            tracing::debug!(group = %self.group, stream = %self.stream, "log stream ready");
        }

        let batch = std::mem::take(&mut state.buffer);
        let token = state.sequence_token.clone();
        let next = self
            .client
            .put_events(&self.group, &self.stream, &batch, token.as_deref())
            .await?;
        state.sequence_token = next;
        Ok(())
    }
}

#[async_trait]
impl Auditor for CloudLogAuditor {
    async fn log(&self, record: &AuditRecord) -> Result<()> {
        let event = LogEvent {
            timestamp_ms: record.timestamp.timestamp_millis(),
            message: serde_json::to_string(record)?,
        };

        let mut state = self.state.lock().await;
        state.buffer.push(event);
        if state.buffer.len() >= self.batch_size {
            self.flush_locked(&mut state).await?;
        }
        Ok(())
    }
}

/// [`LogStreamClient`] speaking the CloudWatch Logs JSON protocol over HTTP.
///
/// Request signing is left to a fronting proxy or an agent with ambient
/// credentials; the client only shapes the bodies and threads the token.
pub struct HttpLogStreamClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpLogStreamClient {
    /// Create a client for the given service endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn call(
        &self,
        target: &str,
        body: serde_json::Value,
    ) -> Result<(reqwest::StatusCode, String)> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-amz-target", target)
            .header("content-type", "application/x-amz-json-1.1")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::audit(format!("log stream request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::audit(format!("log stream response unreadable: {e}")))?;
        Ok((status, text))
    }
}

#[async_trait]
impl LogStreamClient for HttpLogStreamClient {
    async fn create_stream(&self, group: &str, stream: &str) -> Result<()> {
        let (status, text) = self
            .call(
                "Logs_20140328.CreateLogStream",
                serde_json::json!({"logGroupName": group, "logStreamName": stream}),
            )
            .await?;

        // An existing stream is fine; anything else is a sink failure.
        if status.is_success() || text.contains("ResourceAlreadyExistsException") {
            Ok(())
        } else {
            Err(Error::audit(format!(
                "create_stream failed with {status}: {text}"
            )))
        }
    }

    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
        sequence_token: Option<&str>,
    ) -> Result<Option<String>> {
        let mut body = serde_json::json!({
            "logGroupName": group,
            "logStreamName": stream,
            "logEvents": events
                .iter()
                .map(|e| serde_json::json!({"timestamp": e.timestamp_ms, "message": e.message}))
                .collect::<Vec<_>>(),
        });
        if let Some(token) = sequence_token {
            body["sequenceToken"] = serde_json::json!(token);
        }

        let (status, text) = self.call("Logs_20140328.PutLogEvents", body).await?;
        if !status.is_success() {
            return Err(Error::audit(format!(
                "put_events failed with {status}: {text}"
            )));
        }

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        Ok(parsed
            .get("nextSequenceToken")
            .and_then(|t| t.as_str())
            .map(str::to_string))
    }
}
