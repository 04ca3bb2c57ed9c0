use super::models::{ListenRequest, ListenResponse};
use super::FirestoreError;
use crate::core::parse_error_response;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream};
use reqwest_middleware::ClientWithMiddleware;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A stream of `ListenResponse` messages.
///
/// The response body is a sequence of JSON objects, either newline-separated or wrapped
/// in a JSON array. Both are decoded incrementally as chunks arrive.
pub struct ListenStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: BytesMut,
}

impl ListenStream {
    pub fn new(inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
        }
    }
}

impl Stream for ListenStream {
    type Item = Result<ListenResponse, FirestoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // 1. Try to parse a complete JSON object from the buffer.
            if let Some((start, end)) = find_json_boundary(&self.buffer) {
                let bytes = self.buffer.split_to(end);
                return match serde_json::from_slice::<ListenResponse>(&bytes[start..]) {
                    Ok(msg) => Poll::Ready(Some(Ok(msg))),
                    Err(e) => Poll::Ready(Some(Err(FirestoreError::SerializationError(e)))),
                };
            }

            // 2. If no complete object, poll the underlying stream for more bytes.
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    self.buffer.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(FirestoreError::RequestError(e))));
                }
                Poll::Ready(None) => {
                    if self.buffer.iter().any(|b| !is_separator(*b)) {
                        self.buffer.clear();
                        return Poll::Ready(Some(Err(FirestoreError::ApiError(
                            "Stream ended with incomplete JSON".into(),
                        ))));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// Bytes allowed between messages: whitespace and the punctuation of an enclosing array.
fn is_separator(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'[' | b']' | b',')
}

/// Finds the first complete JSON object in the buffer.
///
/// Returns `(start, end)` where `start` skips leading separators and `end` is one past the
/// closing brace. A message that does not start with `{` is returned up to the end of the
/// buffer so the decoder reports it.
fn find_json_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let start = buf.iter().position(|b| !is_separator(*b))?;

    if buf[start] != b'{' {
        return Some((start, buf.len()));
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in buf.iter().enumerate().skip(start) {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, i + 1));
                }
            }
            _ => {}
        }
    }

    None
}

/// Opens a listen stream at `{documents_url}:listen`.
pub async fn listen_request(
    client: &ClientWithMiddleware,
    documents_url: &str,
    request: &ListenRequest,
) -> Result<ListenStream, FirestoreError> {
    let url = format!("{}:listen", documents_url);

    let response = client.post(&url).json(request).send().await?;

    if !response.status().is_success() {
        return Err(FirestoreError::ApiError(
            parse_error_response(response, "Listen failed").await,
        ));
    }

    let stream = stream::unfold(response, |mut resp| async move {
        match resp.chunk().await {
            Ok(Some(bytes)) => Some((Ok(bytes), resp)),
            Ok(None) => None,
            Err(e) => Some((Err(e), resp)),
        }
    });

    Ok(ListenStream::new(Box::pin(stream)))
}
