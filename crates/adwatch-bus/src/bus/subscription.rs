//! Live topic subscription handle

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::messages::BusMessage;
use crate::topics::Topic;

/// Receiving end of one topic subscription.
///
/// Dropping the handle cancels the listener; `close` also waits for it to finish.
#[derive(Debug)]
pub struct BusSubscription {
    topic: Topic,
    rx: mpsc::Receiver<BusMessage>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BusSubscription {
    pub(crate) fn new(
        topic: Topic,
        rx: mpsc::Receiver<BusMessage>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            topic,
            rx,
            cancel,
            task: Some(task),
        }
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Next decoded message, or `None` once the listener has stopped
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }

    /// Unsubscribe and wait for the listener to release the topic
    pub async fn close(mut self) {
        self.cancel.cancel();
        self.rx.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(topic = %self.topic, error = %e, "Bus listener task failed");
            }
        }
    }
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
