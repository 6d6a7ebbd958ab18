//! Best-effort informational messages for a front end.

use tokio::sync::mpsc;

/// One line of progress, or the final outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMessage {
    /// Set on the last message of an operation.
    pub finished: bool,
    pub message: String,
    pub error: Option<String>,
}

impl ProgressMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            finished: false,
            message: message.into(),
            error: None,
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self {
            finished: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            finished: true,
            message: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Sender side of a progress stream. Never blocks: messages are dropped
/// when the receiver is full or gone.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<ProgressMessage>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<ProgressMessage>) -> Self {
        Self { tx }
    }

    /// Bounded sink and its receiver.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn send(&self, message: ProgressMessage) {
        if let Err(err) = self.tx.try_send(message) {
            tracing::trace!(error = %err, "Progress message dropped");
        }
    }
}
