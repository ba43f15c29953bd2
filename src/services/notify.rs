/// Fire-and-forget sink for user-facing notifications (toasts).
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}

/// Notifier for headless use: every notification becomes a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(notification = "success", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(notification = "error", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(notification = "info", "{message}");
    }
}
