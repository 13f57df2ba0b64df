use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use fsseg::errors::{FssegError, Result};
use fsseg::notify::Notifier;

/// A notifier that records messages, and can be told to fail delivery.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new(sent: Arc<Mutex<Vec<String>>>) -> Self {
        Self { sent, fail: false }
    }

    /// Record the message, then report a delivery error.
    pub fn failing(sent: Arc<Mutex<Vec<String>>>) -> Self {
        Self { sent, fail: true }
    }
}

impl Notifier for RecordingNotifier {
    fn notify<'a>(
        &'a self,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(message.to_string());
            if self.fail {
                return Err(FssegError::Other(anyhow::anyhow!("bot API unreachable")));
            }
            Ok(())
        })
    }
}
