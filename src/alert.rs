//! Alert sink: best-effort notification dispatch. A failing send
//! is logged but never stops supervision, matching
//! `original_source/email_notification.py`'s fire-and-forget posture.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::credentials::Credentials;
use crate::logging::RotatingFileLog;

/// Outcome of an alert send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertErrorCode {
    Ok,
    Connection,
    Auth,
    Send,
    EnvConfig,
    Other,
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, subject: &str, body: &str) -> AlertErrorCode;
}

/// SMTP-over-TLS sink grounded on `original_source/email_notification.py`'s
/// gmail `SMTP_SSL` flow. Every message carries a trace footer identifying
/// the sending host and module.
pub struct SmtpAlertSink {
    from: Mailbox,
    to: Mailbox,
    transport: SmtpTransport,
    trace_footer: String,
}

impl SmtpAlertSink {
    /// Build a sink from `GMAIL_USERNAME`/`GMAIL_PASSWORD`.
    /// `to` may be the same address as `from` for self-notification, the
    /// common case in the original source.
    pub fn from_credentials(credentials: &Credentials, to_address: &str) -> Result<Self, String> {
        let username = credentials.get("GMAIL_USERNAME").ok_or("GMAIL_USERNAME missing")?;
        let password = credentials.get("GMAIL_PASSWORD").ok_or("GMAIL_PASSWORD missing")?;

        let from: Mailbox = username.parse().map_err(|e| format!("invalid GMAIL_USERNAME: {e}"))?;
        let to: Mailbox = to_address.parse().map_err(|e| format!("invalid recipient address: {e}"))?;

        let transport = SmtpTransport::relay("smtp.gmail.com")
            .map_err(|e| format!("smtp relay setup failed: {e}"))?
            .credentials(SmtpCredentials::new(username.to_string(), password.to_string()))
            .build();

        let hostname = hostname_or_unknown();
        Ok(Self { from, to, transport, trace_footer: format!("\n\n-- sent by thermostat-supervisor on {hostname}") })
    }

    fn classify(err: &lettre::transport::smtp::Error) -> AlertErrorCode {
        if err.is_client() {
            AlertErrorCode::Send
        } else if err.is_transient() || err.is_permanent() {
            AlertErrorCode::Connection
        } else {
            AlertErrorCode::Other
        }
    }
}

fn hostname_or_unknown() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

#[async_trait]
impl AlertSink for SmtpAlertSink {
    async fn send_alert(&self, subject: &str, body: &str) -> AlertErrorCode {
        let full_body = format!("{body}{}", self.trace_footer);
        let message = match Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .body(full_body)
        {
            Ok(m) => m,
            Err(e) => {
                log::error!("failed to build alert message: {e}");
                return AlertErrorCode::EnvConfig;
            }
        };

        match self.transport.send(&message) {
            Ok(_) => AlertErrorCode::Ok,
            Err(e) => {
                log::warn!("alert send failed: {e}");
                Self::classify(&e)
            }
        }
    }
}

/// Discards every alert. Used by tests and `--no-alerts` dry runs — the
/// idiomatic stand-in for the source's `debug=True` no-op path.
#[derive(Debug, Default)]
pub struct NullAlertSink;

#[async_trait]
impl AlertSink for NullAlertSink {
    async fn send_alert(&self, _subject: &str, _body: &str) -> AlertErrorCode {
        AlertErrorCode::Ok
    }
}

/// Wraps another sink and appends every dispatched alert to a
/// [`RotatingFileLog`] before forwarding it, giving alert dispatch and
/// policy-violation notices a durable audit trail, the same persisted-state
/// role `original_source/utilities.py`'s `log_msg` plays. A failure to
/// write the file never stops the wrapped sink from running.
pub struct FileBackedAlertSink {
    inner: Box<dyn AlertSink>,
    file: RotatingFileLog,
}

impl FileBackedAlertSink {
    pub fn new(inner: Box<dyn AlertSink>, file: RotatingFileLog) -> Self {
        Self { inner, file }
    }
}

#[async_trait]
impl AlertSink for FileBackedAlertSink {
    async fn send_alert(&self, subject: &str, body: &str) -> AlertErrorCode {
        let line = format!("{} {subject}: {body}", chrono::Utc::now().to_rfc3339());
        if let Err(e) = self.file.write_line(&line) {
            log::warn!("failed to append alert to durable log: {e}");
        }
        self.inner.send_alert(subject, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_sink_always_reports_ok() {
        let sink = NullAlertSink;
        assert_eq!(sink.send_alert("subject", "body").await, AlertErrorCode::Ok);
    }

    #[test]
    fn smtp_sink_requires_both_credential_keys() {
        let credentials = Credentials::default();
        assert!(SmtpAlertSink::from_credentials(&credentials, "ops@example.com").is_err());
    }

    #[tokio::test]
    async fn file_backed_sink_persists_alert_and_still_forwards() {
        let dir = std::env::temp_dir().join(format!("thermosuper-alert-log-test-{}", std::process::id()));
        let log_path = dir.join("supervisor.log");
        let file = RotatingFileLog::open(&log_path, crate::logging::DEFAULT_MAX_LOG_SIZE_BYTES).unwrap();
        let sink = FileBackedAlertSink::new(Box::new(NullAlertSink), file);

        let code = sink.send_alert("[policy] zone 0 schedule outside limits", "body text").await;
        assert_eq!(code, AlertErrorCode::Ok);

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert!(contents.contains("[policy] zone 0 schedule outside limits"));
        assert!(contents.contains("body text"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
