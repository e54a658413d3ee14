//! HTTP audit sink.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use enact_core::{AuditRecord, Auditor, Error, Result};

/// POSTs each audit record as a JSON body.
///
/// Useful for webhooks, log collectors, and monitoring platforms. Non-2xx
/// responses count as sink failures.
pub struct HttpAuditor {
    url: String,
    headers: HashMap<String, String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpAuditor {
    /// Create a sink posting to `url` with a 5 second timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: Duration::from_secs(5),
            client: reqwest::Client::new(),
        }
    }

    /// Add a header sent with every record (e.g. authentication).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Auditor for HttpAuditor {
    async fn log(&self, record: &AuditRecord) -> Result<()> {
        let mut builder = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(record);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        builder
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::audit(format!("failed to deliver audit record: {e}")))?;
        Ok(())
    }
}
