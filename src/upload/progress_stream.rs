use std::pin::Pin;
use std::task::{Context, Poll};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub index: usize,
    pub bytes_sent: u64,
    pub bytes_total: u64,
}

/// Per-task handle into the batch's progress channel
#[derive(Debug, Clone)]
pub struct ProgressSender {
    index: usize,
    bytes_total: u64,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    pub fn new(index: usize, bytes_total: u64, tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            index,
            bytes_total,
            tx,
        }
    }

    /// Sender whose events go nowhere
    pub fn detached(index: usize, bytes_total: u64) -> Self {
        let (tx, _) = mpsc::unbounded_channel();
        Self::new(index, bytes_total, tx)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bytes_total(&self) -> u64 {
        self.bytes_total
    }

    pub fn report(&self, bytes_sent: u64) {
        // receiver gone means the batch no longer listens
        let _ = self.tx.send(ProgressEvent {
            index: self.index,
            bytes_sent,
            bytes_total: self.bytes_total,
        });
    }
}

pin_project! {
    /// Counts body bytes as the HTTP client pulls them
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        progress: ProgressSender,
        bytes_sent: u64,
        finished: bool,
    }
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, progress: ProgressSender) -> Self {
        Self {
            inner,
            progress,
            bytes_sent: 0,
            finished: false,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>>
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    *this.bytes_sent += chunk.len() as u64;
                    this.progress.report(*this.bytes_sent);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                if !*this.finished {
                    *this.finished = true;
                    this.progress.report(*this.bytes_sent);
                }
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.progress.report(*this.bytes_sent);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt};

    #[tokio::test]
    async fn test_reports_running_total() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let chunks = vec![
            Ok(Bytes::from_static(b"abcd")),
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"ef")),
        ];
        let stream = ProgressStream::new(stream::iter(chunks), ProgressSender::new(2, 6, tx));

        let body: Vec<Bytes> = stream.map(|chunk| chunk.unwrap()).collect().await;
        assert_eq!(body.concat(), b"abcdef");

        let mut sent = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.index, 2);
            assert_eq!(event.bytes_total, 6);
            sent.push(event.bytes_sent);
        }
        assert_eq!(sent, vec![4, 6, 6]);
    }

    #[tokio::test]
    async fn test_detached_sender_does_not_fail() {
        let chunks = vec![Ok(Bytes::from_static(b"abc"))];
        let stream = ProgressStream::new(stream::iter(chunks), ProgressSender::detached(0, 3));

        assert_eq!(stream.count().await, 1);
    }
}
