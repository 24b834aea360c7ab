//! Scanner feed: a lazy, cancellable stream of decoded scan strings.
//!
//! The camera layer (out of scope here) pushes one string per physical scan
//! into a [`ScanFeed`]; the check-in side consumes them from the paired
//! [`ScanStream`]. Cancelling the feed ends the stream at once; dropping it
//! ends the stream after the buffered scans are delivered.

use std::future;
use std::pin::Pin;

use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};

/// Boxed stream of raw scan strings.
pub type ScanStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Producer half of a scan channel.
#[derive(Debug)]
pub struct ScanFeed {
    sender: mpsc::Sender<String>,
    cancel: Option<oneshot::Sender<()>>,
}

impl ScanFeed {
    /// Pushes one decoded scan. Returns `false` once the stream is gone.
    pub async fn push(&self, raw: impl Into<String>) -> bool {
        self.sender.send(raw.into()).await.is_ok()
    }

    /// Ends the paired stream. Scans still buffered are discarded.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    /// Whether [`ScanFeed::cancel`] has been called.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

/// Creates a scan channel buffering up to `buffer` undelivered scans.
#[must_use]
pub fn scan_channel(buffer: usize) -> (ScanFeed, ScanStream) {
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    let (cancel_tx, cancel_rx) = oneshot::channel();

    // A dropped feed only closes the channel; buffered scans still drain.
    let cancelled = async move {
        if cancel_rx.await.is_err() {
            future::pending::<()>().await;
        }
    };

    let scans = stream::unfold(receiver, |mut receiver| async move {
        let raw = receiver.recv().await?;
        Some((raw, receiver))
    })
    .take_until(cancelled)
    .boxed();

    (
        ScanFeed {
            sender,
            cancel: Some(cancel_tx),
        },
        scans,
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yields_scans_in_order() {
        let (feed, mut scans) = scan_channel(4);
        assert!(feed.push("first").await);
        assert!(feed.push("second").await);
        drop(feed);

        assert_eq!(scans.next().await.as_deref(), Some("first"));
        assert_eq!(scans.next().await.as_deref(), Some("second"));
        assert_eq!(scans.next().await, None);
    }

    #[test]
    fn next_is_pending_until_a_scan_arrives() {
        let (feed, mut scans) = scan_channel(2);
        let mut next = tokio_test::task::spawn(scans.next());
        tokio_test::assert_pending!(next.poll());

        assert!(tokio_test::block_on(feed.push("circl://event/checkin/ABC123")));
        assert!(next.is_woken());
        tokio_test::assert_ready_eq!(
            next.poll(),
            Some("circl://event/checkin/ABC123".to_string())
        );
    }

    #[tokio::test]
    async fn cancel_ends_the_stream() {
        let (mut feed, mut scans) = scan_channel(4);
        feed.cancel();
        assert!(feed.is_cancelled());
        assert_eq!(scans.next().await, None);
    }

    #[tokio::test]
    async fn push_after_stream_dropped_fails() {
        let (feed, scans) = scan_channel(1);
        drop(scans);
        assert!(!feed.push("late").await);
    }
}
