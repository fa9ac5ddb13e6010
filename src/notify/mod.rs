//! User-visible notifications.
//!
//! The API pipeline reports every non-cancelled failure through a [`Notifier`]
//! exactly once. How the message is shown is up to the implementation;
//! `notify` must return promptly.

use std::fmt;

use tokio::sync::mpsc;

/// Severity of a user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The "show user message" capability.
///
/// Fire-and-forget: implementations must not block the caller and have no
/// way to report their own failure back to it.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// Writes notifications through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => log::info!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Error => log::error!("{}", message),
        }
    }
}

/// A notification queued for a UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

/// Forwards notifications over an unbounded channel to whatever renders them.
///
/// Sending never waits; if the receiving side is gone the message is dropped
/// with a debug log.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver the UI loop should drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        let notice = Notice {
            severity,
            message: message.to_string(),
        };
        if self.tx.send(notice).is_err() {
            log::debug!("Notification dropped, receiver closed: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::Info.label(), "info");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Error.to_string(), "error");
    }

    #[tokio::test]
    async fn test_channel_notifier_delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify(Severity::Error, "first");
        notifier.notify(Severity::Warning, "second");

        assert_eq!(
            rx.recv().await,
            Some(Notice {
                severity: Severity::Error,
                message: "first".into()
            })
        );
        assert_eq!(rx.recv().await.map(|n| n.message), Some("second".into()));
    }

    #[test]
    fn test_channel_notifier_survives_closed_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        // Must not panic or block
        notifier.notify(Severity::Error, "nobody listening");
    }
}
