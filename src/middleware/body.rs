use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use http_body::{Frame, SizeHint};

/// Response body that counts the data bytes it yields.
///
/// `on_finish` runs once with the byte count, at end of stream or when the
/// body is dropped early (client gone, HEAD request, error frame).
pub(crate) struct CountingBody<F>
where
    F: FnOnce(u64) + Unpin,
{
    inner: Body,
    bytes: u64,
    on_finish: Option<F>,
}

impl<F> CountingBody<F>
where
    F: FnOnce(u64) + Unpin,
{
    pub(crate) fn new(inner: Body, on_finish: F) -> Self {
        Self {
            inner,
            bytes: 0,
            on_finish: Some(on_finish),
        }
    }

    fn finish(&mut self) {
        if let Some(on_finish) = self.on_finish.take() {
            on_finish(self.bytes);
        }
    }
}

impl<F> HttpBody for CountingBody<F>
where
    F: FnOnce(u64) + Unpin,
{
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.bytes += data.len() as u64;
                }
            }
            Poll::Ready(None) => this.finish(),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<F> Drop for CountingBody<F>
where
    F: FnOnce(u64) + Unpin,
{
    fn drop(&mut self) {
        self.finish();
    }
}
