//! Streaming response body that keeps a copy of its first bytes.
//!
//! # Design Decisions
//! - Frames pass through untouched; only the first `limit` bytes are copied
//! - The completion callback fires once, after the last frame
//! - A body that errors or is dropped early never fires the callback, so a
//!   response the client did not fully receive is never reported

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::Bytes;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

type OnComplete = Box<dyn FnOnce(Bytes) + Send>;

pin_project! {
    /// Body wrapper that forwards every frame and copies a bounded prefix.
    pub struct CapturingBody<B> {
        #[pin]
        inner: B,
        limit: usize,
        prefix: Vec<u8>,
        on_complete: Option<OnComplete>,
    }
}

impl<B> CapturingBody<B> {
    pub fn new(inner: B, limit: usize, on_complete: impl FnOnce(Bytes) + Send + 'static) -> Self {
        Self {
            inner,
            limit,
            prefix: Vec::new(),
            on_complete: Some(Box::new(on_complete)),
        }
    }
}

fn finish(prefix: &mut Vec<u8>, on_complete: &mut Option<OnComplete>) {
    if let Some(callback) = on_complete.take() {
        callback(Bytes::from(std::mem::take(prefix)));
    }
}

impl<B> Body for CapturingBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();

        match ready!(this.inner.as_mut().poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    let room = this.limit.saturating_sub(this.prefix.len());
                    this.prefix.extend_from_slice(&data[..data.len().min(room)]);
                }
                // The server may stop polling once the inner body says it is done.
                if this.inner.is_end_stream() {
                    finish(this.prefix, this.on_complete);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => {
                this.on_complete.take();
                Poll::Ready(Some(Err(e)))
            }
            None => {
                finish(this.prefix, this.on_complete);
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.on_complete.is_none() && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::body::Body as AxumBody;
    use futures_util::stream;

    type Seen = Arc<Mutex<Vec<Bytes>>>;

    fn recorder() -> (Seen, impl FnOnce(Bytes) + Send + 'static) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |captured| sink.lock().unwrap().push(captured))
    }

    #[tokio::test]
    async fn test_client_gets_everything_capture_gets_prefix() {
        let (seen, on_complete) = recorder();
        let body = CapturingBody::new(AxumBody::from("0123456789"), 4, on_complete);

        let delivered = axum::body::to_bytes(AxumBody::new(body), usize::MAX).await.unwrap();
        assert_eq!(delivered, Bytes::from_static(b"0123456789"));
        assert_eq!(*seen.lock().unwrap(), vec![Bytes::from_static(b"0123")]);
    }

    #[tokio::test]
    async fn test_prefix_spans_chunks() {
        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
            Ok(Bytes::from_static(b"ef")),
        ];
        let (seen, on_complete) = recorder();
        let body = CapturingBody::new(AxumBody::from_stream(stream::iter(chunks)), 5, on_complete);

        let delivered = axum::body::to_bytes(AxumBody::new(body), usize::MAX).await.unwrap();
        assert_eq!(delivered, Bytes::from_static(b"abcdef"));
        assert_eq!(*seen.lock().unwrap(), vec![Bytes::from_static(b"abcde")]);
    }

    #[tokio::test]
    async fn test_empty_body_still_completes() {
        let (seen, on_complete) = recorder();
        let body = CapturingBody::new(AxumBody::empty(), 255, on_complete);

        let delivered = axum::body::to_bytes(AxumBody::new(body), usize::MAX).await.unwrap();
        assert!(delivered.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![Bytes::new()]);
    }

    #[tokio::test]
    async fn test_failed_stream_never_completes() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("upstream reset")),
        ];
        let (seen, on_complete) = recorder();
        let body = CapturingBody::new(AxumBody::from_stream(stream::iter(chunks)), 255, on_complete);

        assert!(axum::body::to_bytes(AxumBody::new(body), usize::MAX).await.is_err());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_body_never_completes() {
        let (seen, on_complete) = recorder();
        let body = CapturingBody::new(AxumBody::from("unread"), 255, on_complete);
        drop(body);
        assert!(seen.lock().unwrap().is_empty());
    }
}
