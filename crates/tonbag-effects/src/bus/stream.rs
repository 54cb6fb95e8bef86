use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use super::registry::Subscription;

/// Async receiver over one topic.
///
/// Owns its [`Subscription`]; dropping the stream unsubscribes. Payloads
/// published while nobody polls are buffered in order.
#[derive(Debug)]
pub struct TopicStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
    subscription: Subscription,
}

impl<T> TopicStream<T> {
    pub(super) fn new(rx: mpsc::UnboundedReceiver<T>, subscription: Subscription) -> Self {
        Self { rx, subscription }
    }

    /// Wait for the next payload. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take a buffered payload without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Name of the topic this stream listens on.
    pub fn topic_name(&self) -> &'static str {
        self.subscription.topic_name()
    }
}

impl<T> Stream for TopicStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
