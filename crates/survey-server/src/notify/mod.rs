//! Best-effort mail notification for committed records
//!
//! Committed records are offered to a bounded queue consumed by a single
//! background task that pipes a plain-text message into a sendmail-compatible
//! binary. The queue is the only coupling to the request path: enqueueing
//! never blocks, a full queue drops the notification, and every delivery
//! failure is logged and swallowed. Notification is strictly a side effect
//! with no return channel, by contract.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use survey_common::types::{Record, IP_ADDRESS_FIELD};

use crate::config::NotifyConfig;

/// Spawns and owns the notification consumer task
pub struct Notifier;

/// Cloneable handle used by request handlers to enqueue notifications
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    tx: Option<mpsc::Sender<Record>>,
}

impl NotifierHandle {
    /// An inert handle that silently discards every notification.
    ///
    /// Used when notification is disabled by configuration, and in tests.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Offer a committed record to the notification queue.
    ///
    /// Never blocks. A full or closed queue drops the record with a warning;
    /// the submission has already been acknowledged at this point.
    pub fn notify(&self, record: Record) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(record) {
            warn!(error = %e, "notification dropped");
        }
    }
}

impl Notifier {
    /// Start the consumer task and return a handle for producers.
    ///
    /// With notification disabled the handle is inert and no task is spawned.
    pub fn spawn(config: NotifyConfig) -> NotifierHandle {
        if !config.enabled {
            debug!("notification disabled");
            return NotifierHandle::disabled();
        }

        let (tx, mut rx) = mpsc::channel::<Record>(config.queue_capacity);

        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = deliver(&config, &record).await {
                    warn!(error = %e, "failed to deliver notification");
                }
            }
        });

        NotifierHandle { tx: Some(tx) }
    }
}

/// Render the outbound mail message for one committed record.
///
/// Plain-text headers plus the record's pretty-printed JSON as the body;
/// the subject carries the derived origin address.
pub fn format_message(from: &str, to: &str, record: &Record) -> String {
    let origin = record.get(IP_ADDRESS_FIELD).unwrap_or("unknown");
    let body = match record.to_json_pretty() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    };

    format!(
        "From: {from}\n\
         To: {to}\n\
         Subject: Survey response from {origin}\n\
         MIME-Version: 1.0\n\
         Content-Type: text/plain; charset=UTF-8\n\
         Content-Transfer-Encoding: 8bit\n\
         \n\
         {body}\n"
    )
}

async fn deliver(config: &NotifyConfig, record: &Record) -> std::io::Result<()> {
    let message = format_message(&config.from, &config.to, record);

    let mut child = Command::new(&config.sendmail_path)
        .arg("-t")
        .arg("-i")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(message.as_bytes()).await?;
        stdin.shutdown().await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(std::io::Error::other(format!(
            "sendmail exited with {status}"
        )));
    }

    debug!("notification delivered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        let mut record = Record::new();
        record.set("gender", "F");
        record.set(IP_ADDRESS_FIELD, "203.0.113.5");
        record
    }

    #[test]
    fn test_format_message_headers_and_body() {
        let message = format_message("survey@example.org", "ops@example.org", &sample_record());

        assert!(message.starts_with("From: survey@example.org\n"));
        assert!(message.contains("To: ops@example.org\n"));
        assert!(message.contains("Subject: Survey response from 203.0.113.5\n"));
        assert!(message.contains("Content-Type: text/plain; charset=UTF-8\n"));
        assert!(message.contains("\"gender\": \"F\""));
    }

    #[test]
    fn test_format_message_without_origin_field() {
        let mut record = Record::new();
        record.set("age", "22");

        let message = format_message("a@example.org", "b@example.org", &record);
        assert!(message.contains("Subject: Survey response from unknown\n"));
    }

    #[test]
    fn test_disabled_handle_discards_silently() {
        let handle = NotifierHandle::disabled();
        handle.notify(sample_record());
    }
}
