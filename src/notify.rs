/// Transient success/error notifications.
///
/// Fire-and-forget: callers never inspect a result.
use std::sync::Mutex;

use console::Style;

pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Prints notifications to stderr, styled when stderr is a terminal.
pub struct ConsoleNotifier {
    ok: Style,
    err: Style,
}

impl ConsoleNotifier {
    #[must_use]
    pub fn new(color: bool) -> Self {
        let base = Style::new().for_stderr();
        let (ok, err) = if color {
            (base.clone().green().bold(), base.red().bold())
        } else {
            (base.clone().force_styling(false), base.force_styling(false))
        };
        Self { ok, err }
    }
}

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        tracing::debug!(message, "success notification");
        eprintln!("{} {message}", self.ok.apply_to("✔"));
    }

    fn error(&self, message: &str) {
        tracing::debug!(message, "error notification");
        eprintln!("{} {message}", self.err.apply_to("✖"));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

/// Keeps every notification in memory. Used by tests.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error(msg) => Some(msg),
                Notification::Success(_) => None,
            })
            .collect()
    }

    fn record(&self, n: Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(n);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.record(Notification::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.record(Notification::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_keeps_order() {
        let n = RecordingNotifier::new();
        n.success("one");
        n.error("two");
        assert_eq!(
            n.notifications(),
            vec![
                Notification::Success("one".into()),
                Notification::Error("two".into()),
            ]
        );
        assert_eq!(n.errors(), vec!["two".to_string()]);
    }
}
