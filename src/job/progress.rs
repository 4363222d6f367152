//! Ordered, single-subscriber progress stream for one job.
//!
//! The producer half ([`ProgressPublisher`]) is owned by the runner; the consumer
//! half ([`ProgressStream`]) is handed to whatever transport reaches the client.
//! After the first terminal event the publisher refuses further writes and the
//! stream yields `None`.

use crate::utils::{Result, SheetTranslatorError};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress { percent: u8 },
    Completed { access_reference: String },
    Failed { reason: String },
}

impl ProgressEvent {
    pub fn progress(percent: u8) -> Self {
        ProgressEvent::Progress {
            percent: percent.min(100),
        }
    }

    pub fn completed(access_reference: impl Into<String>) -> Self {
        ProgressEvent::Completed {
            access_reference: access_reference.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        ProgressEvent::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress { .. })
    }

    /// Payload of the `data:` field: `<percent>`, `complete|<url>` or `error|<message>`.
    pub fn data(&self) -> String {
        match self {
            ProgressEvent::Progress { percent } => percent.to_string(),
            ProgressEvent::Completed { access_reference } => format!("complete|{}", access_reference),
            ProgressEvent::Failed { reason } => {
                // A newline would split the message across SSE fields.
                format!("error|{}", reason.replace(['\r', '\n'], " "))
            }
        }
    }

    pub fn wire_line(&self) -> String {
        format!("data: {}\n\n", self.data())
    }
}

pub fn progress_channel(capacity: usize) -> (ProgressPublisher, ProgressStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ProgressPublisher { tx: Some(tx) },
        ProgressStream {
            rx,
            finished: false,
        },
    )
}

#[derive(Debug)]
pub struct ProgressPublisher {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressPublisher {
    /// Waits until the subscriber has room for the event.
    ///
    /// Fails with `StreamClosed` after a terminal event and with `SubscriberGone`
    /// once the consumer half has been dropped.
    pub async fn publish(&mut self, event: ProgressEvent) -> Result<()> {
        let terminal = event.is_terminal();
        let tx = self.tx.as_ref().ok_or(SheetTranslatorError::StreamClosed)?;

        let sent = tx.send(event).await;
        if terminal || sent.is_err() {
            self.tx = None;
        }

        sent.map_err(|_| SheetTranslatorError::SubscriberGone)
    }

    pub fn is_terminated(&self) -> bool {
        self.tx.is_none()
    }

    pub fn subscriber_gone(&self) -> bool {
        self.tx.as_ref().map(|tx| tx.is_closed()).unwrap_or(false)
    }
}

#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::Receiver<ProgressEvent>,
    finished: bool,
}

impl ProgressStream {
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }

        let event = self.rx.recv().await;
        match &event {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        event
    }

    /// Drains the stream until it ends.
    pub async fn collect(mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }

    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next().await.map(|event| (event, stream))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(ProgressEvent::progress(33).wire_line(), "data: 33\n\n");
        assert_eq!(
            ProgressEvent::completed("https://x/y").wire_line(),
            "data: complete|https://x/y\n\n"
        );
        assert_eq!(
            ProgressEvent::failed("bad\nfile").wire_line(),
            "data: error|bad file\n\n"
        );
    }

    #[tokio::test]
    async fn no_writes_after_terminal_event() {
        let (mut publisher, stream) = progress_channel(8);

        publisher.publish(ProgressEvent::progress(100)).await.unwrap();
        publisher.publish(ProgressEvent::completed("u")).await.unwrap();
        assert!(publisher.is_terminated());

        let err = publisher.publish(ProgressEvent::failed("late")).await.unwrap_err();
        assert!(matches!(err, SheetTranslatorError::StreamClosed));

        let events = stream.collect().await;
        assert_eq!(
            events,
            vec![ProgressEvent::progress(100), ProgressEvent::completed("u")]
        );
    }

    #[tokio::test]
    async fn dropped_subscriber_is_observed() {
        let (mut publisher, stream) = progress_channel(1);
        assert!(!publisher.subscriber_gone());
        drop(stream);

        assert!(publisher.subscriber_gone());
        let err = publisher.publish(ProgressEvent::progress(1)).await.unwrap_err();
        assert!(matches!(err, SheetTranslatorError::SubscriberGone));
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order_with_single_slot() {
        let (mut publisher, stream) = progress_channel(1);

        let producer = tokio::spawn(async move {
            for p in [10u8, 20, 30] {
                publisher.publish(ProgressEvent::progress(p)).await.unwrap();
            }
            publisher.publish(ProgressEvent::completed("done")).await.unwrap();
        });

        let events = stream.collect().await;
        producer.await.unwrap();

        assert_eq!(events.len(), 4);
        assert_eq!(events[2], ProgressEvent::progress(30));
        assert!(events[3].is_terminal());
    }
}
