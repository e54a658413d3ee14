//! Syslog audit sink (RFC 5424).

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

use enact_core::{AuditRecord, Auditor, Error, Result};

/// Facility code for local0, the conventional default for application logs.
const FACILITY_LOCAL0: u8 = 16;

/// Severity `informational`.
const SEVERITY_INFO: u8 = 6;

/// Transport used to reach the syslog daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyslogTransport {
    /// One datagram per record.
    Udp,
    /// Octet-counted framing per RFC 6587.
    Tcp,
}

/// Sends audit records to a syslog daemon as RFC 5424 messages.
///
/// The JSON-encoded record travels in the MSG field, so downstream
/// structured-log pipelines can parse it back out.
pub struct SyslogAuditor {
    address: String,
    transport: SyslogTransport,
    facility: u8,
    hostname: String,
    app_name: String,
}

impl SyslogAuditor {
    /// Create a UDP sink targeting `address` (e.g. `"localhost:514"`).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            transport: SyslogTransport::Udp,
            facility: FACILITY_LOCAL0,
            hostname: "-".to_string(),
            app_name: "enact-audit".to_string(),
        }
    }

    /// Select the transport.
    pub fn with_transport(mut self, transport: SyslogTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Set the syslog facility code (default 16, local0).
    pub fn with_facility(mut self, facility: u8) -> Self {
        self.facility = facility;
        self
    }

    /// Set the HOSTNAME field (defaults to the RFC nil value).
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the APP-NAME field.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    fn format(&self, record: &AuditRecord) -> Result<String> {
        let priority = self.facility * 8 + SEVERITY_INFO;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let payload = serde_json::to_string(record)?;
        Ok(format!(
            "<{priority}>1 {timestamp} {hostname} {app} {pid} - - {payload}",
            hostname = self.hostname,
            app = self.app_name,
            pid = std::process::id(),
        ))
    }

    async fn send_udp(&self, message: &str) -> Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| Error::audit(format!("failed to bind UDP socket: {e}")))?;
        socket
            .send_to(message.as_bytes(), &self.address)
            .await
            .map_err(|e| Error::audit(format!("failed to send syslog datagram: {e}")))?;
        Ok(())
    }

    async fn send_tcp(&self, message: &str) -> Result<()> {
        let mut stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| Error::audit(format!("failed to connect to syslog: {e}")))?;
        // Octet counting: "<len> <msg>".
        let frame = format!("{} {message}", message.len());
        stream
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| Error::audit(format!("failed to write syslog frame: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Auditor for SyslogAuditor {
    async fn log(&self, record: &AuditRecord) -> Result<()> {
        let message = self.format(record)?;
        match self.transport {
            SyslogTransport::Udp => self.send_udp(&message).await,
            SyslogTransport::Tcp => self.send_tcp(&message).await,
        }
    }
}
