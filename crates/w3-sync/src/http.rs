//! Client for a document tree hosted by `w3-server`.
//!
//! Reads and writes map onto `/db/<path>`; subscriptions consume the
//! server-sent event stream at `/subscribe/<path>`.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::event::DocEvent;
use crate::path::DocPath;
use crate::store::{DocumentStore, Subscription};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct HttpDocumentStore {
    client: Client,
    base: Url,
    timeout: Duration,
}

#[derive(Deserialize)]
struct PushReply {
    key: String,
}

#[derive(Deserialize)]
struct DeleteReply {
    deleted: bool,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

impl HttpDocumentStore {
    /// `base` is the server root, e.g. `http://127.0.0.1:8626`.
    pub fn new(base: &str) -> Result<Self> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    /// `timeout` bounds every request except the subscription stream.
    pub fn with_timeout(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).map_err(|_| SyncError::InvalidPath(base.to_string()))?;
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            timeout,
        })
    }

    fn url(&self, route: &str, path: &DocPath) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidPath(self.base.to_string()))?
            .pop_if_empty()
            .push(route)
            .extend(path.segments());
        Ok(url)
    }
}

/// Turn a non-2xx response into [`SyncError::Status`].
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorReply>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    Err(SyncError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Value>> {
        let resp = self
            .client
            .get(self.url("db", path)?)
            .timeout(self.timeout)
            .send()
            .await?;
        let value: Value = check(resp).await?.json().await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn set(&self, path: &DocPath, value: Value) -> Result<()> {
        let resp = self
            .client
            .put(self.url("db", path)?)
            .timeout(self.timeout)
            .json(&value)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn push(&self, path: &DocPath, value: Value) -> Result<String> {
        let resp = self
            .client
            .post(self.url("db", path)?)
            .timeout(self.timeout)
            .json(&value)
            .send()
            .await?;
        let reply: PushReply = check(resp).await?.json().await?;
        Ok(reply.key)
    }

    async fn remove(&self, path: &DocPath) -> Result<bool> {
        let resp = self
            .client
            .delete(self.url("db", path)?)
            .timeout(self.timeout)
            .send()
            .await?;
        let reply: DeleteReply = check(resp).await?.json().await?;
        Ok(reply.deleted)
    }

    async fn subscribe(&self, path: &DocPath) -> Result<Subscription> {
        let resp = self
            .client
            .get(self.url("subscribe", path)?)
            .header("accept", "text/event-stream")
            .send()
            .await?;
        let resp = check(resp).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let watched = path.clone();
        let task = tokio::spawn(async move {
            let mut body = resp.bytes_stream();
            let mut parser = SseParser::default();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(path = %watched, error = %e, "event stream failed");
                        break;
                    }
                };
                for event in parser.feed(&chunk) {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
            }
            debug!(path = %watched, "event stream ended");
        });

        Ok(Subscription::new(path.clone(), rx, move || task.abort()))
    }
}

/// Frame terminators of `text/event-stream`, longest first.
const FRAME_SEPARATORS: [&[u8]; 3] = [b"\r\n\r\n", b"\n\n", b"\r\r"];

/// Incremental `text/event-stream` decoder that yields the `data:` payload
/// of each complete frame as a [`DocEvent`].
///
/// Bytes are buffered raw and only complete frames are decoded, so chunk
/// boundaries may fall inside a character or a line terminator.
#[derive(Default)]
struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    fn feed(&mut self, chunk: &[u8]) -> Vec<DocEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, separator)) = frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + separator).collect();
            let frame = match std::str::from_utf8(&frame[..end]) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "skipping event that is not UTF-8");
                    continue;
                }
            };
            let data: Vec<&str> = frame
                .split(['\r', '\n'])
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if data.is_empty() {
                continue;
            }
            match serde_json::from_str::<DocEvent>(&data.join("\n")) {
                Ok(event) => events.push(event),
                Err(e) => warn!(error = %e, "skipping malformed event"),
            }
        }
        events
    }
}

/// Offset and length of the first frame terminator in `buffer`.
fn frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    (0..buffer.len()).find_map(|i| {
        let rest = &buffer[i..];
        FRAME_SEPARATORS
            .iter()
            .find(|&&separator| rest.starts_with(separator))
            .map(|separator| (i, separator.len()))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn url_encodes_segments() {
        let store = HttpDocumentStore::new("http://localhost:8626/").unwrap();
        let url = store
            .url("db", &DocPath::parse("shared_diaries/diary 1").unwrap())
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8626/db/shared_diaries/diary%201");
    }

    #[test]
    fn sse_frames_split_across_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"data: {\"type\":\"childRemoved\",").is_empty());
        let events = parser.feed(b"\"key\":\"k\"}\n\n: keep-alive\n\ndata: {\"type\":\"snapshot\",\"value\":1}\r\n\r\n");
        assert_eq!(
            events,
            vec![
                DocEvent::ChildRemoved { key: "k".into() },
                DocEvent::Snapshot { value: Some(json!(1)) },
            ]
        );
    }

    #[test]
    fn sse_character_split_across_chunks() {
        let frame = "data: {\"type\":\"childRemoved\",\"key\":\"学习\"}\n\n".as_bytes();
        let cut = frame.iter().position(|&b| b >= 0x80).unwrap() + 1;

        let mut parser = SseParser::default();
        assert!(parser.feed(&frame[..cut]).is_empty());
        assert_eq!(
            parser.feed(&frame[cut..]),
            vec![DocEvent::ChildRemoved { key: "学习".into() }]
        );
    }

    #[test]
    fn sse_crlf_terminator_split_across_chunks() {
        let mut parser = SseParser::default();
        assert!(parser
            .feed(b"data: {\"type\":\"childRemoved\",\"key\":\"a\"}\r\n\r")
            .is_empty());
        assert_eq!(
            parser.feed(b"\ndata: {\"type\":\"childRemoved\",\"key\":\"b\"}\n\n"),
            vec![
                DocEvent::ChildRemoved { key: "a".into() },
                DocEvent::ChildRemoved { key: "b".into() },
            ]
        );
    }

    #[test]
    fn sse_bare_carriage_returns() {
        let mut parser = SseParser::default();
        assert_eq!(
            parser.feed(b": ping\r\rdata: {\"type\":\"snapshot\",\"value\":null}\r\r"),
            vec![DocEvent::Snapshot { value: None }]
        );
    }
}
