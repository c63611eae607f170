use crate::config::LedgerConfig;
use crate::domain::model::{Party, RecordKind, StateAndInstant, VaultUpdate};
use crate::domain::ports::{LedgerFeed, LedgerQuery, VaultTrack};
use crate::utils::error::{LedgerApiError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

/// Longest accepted feed line. Longer lines are dropped as malformed.
const MAX_FEED_LINE: usize = 8 * 1024 * 1024;

/// Client for the ledger node's HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    base_url: String,
    username: String,
    password: String,
    feed_capacity: usize,
    client: Client,
}

impl HttpLedger {
    pub fn new(config: &LedgerConfig) -> Result<Self> {
        // No overall timeout: the update feed is a single long-lived response.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            feed_capacity: config.feed_capacity,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| LedgerApiError::connection(format!("{} failed: {}", what, e)))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerApiError::connection(format!(
                "{} returned {}: {}",
                what, status, body
            )));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(request, what).await?;
        tracing::debug!(what, status = %response.status(), "Ledger query answered");
        response
            .json()
            .await
            .map_err(|e| LedgerApiError::connection(format!("{} unreadable: {}", what, e)))
    }
}

#[async_trait]
impl LedgerQuery for HttpLedger {
    async fn query(
        &self,
        kind: RecordKind,
        title_id: Option<&str>,
    ) -> Result<Vec<StateAndInstant<Value>>> {
        let mut request = self.get(&format!("/vault/{}", kind));
        if let Some(id) = title_id {
            request = request.query(&[("title_id", id)]);
        }
        self.get_json(request, "vault query").await
    }

    async fn node_identity(&self) -> Result<Party> {
        self.get_json(self.get("/node/identity"), "node identity")
            .await
    }

    async fn network_peers(&self) -> Result<Vec<Party>> {
        self.get_json(self.get("/network/peers"), "network map")
            .await
    }
}

#[async_trait]
impl LedgerFeed for HttpLedger {
    async fn track(&self, kind: RecordKind) -> Result<VaultTrack> {
        let snapshot = self.query(kind, None).await?;

        tracing::info!(
            url = %self.base_url,
            user = %self.username,
            kind = %kind,
            "Opening ledger update feed"
        );
        let response = self
            .send(self.get(&format!("/vault/{}/updates", kind)), "update feed")
            .await?;

        let (tx, rx) = mpsc::channel(self.feed_capacity);
        tokio::spawn(read_feed(response, tx));

        Ok(VaultTrack {
            snapshot,
            updates: rx,
        })
    }
}

/// Splits the NDJSON body into updates. Ends when the body ends, the body
/// errors, or the receiver goes away.
async fn read_feed(response: Response, tx: mpsc::Sender<Result<VaultUpdate>>) {
    let stream = response.bytes_stream();
    tokio::pin!(stream);
    let mut lines = LineBuffer::new(MAX_FEED_LINE);

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for line in lines.push(&bytes) {
                    if let Some(update) = parse_line(&line) {
                        if tx.send(Ok(update)).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                let _ = tx
                    .send(Err(LedgerApiError::connection(format!(
                        "update feed interrupted: {}",
                        e
                    ))))
                    .await;
                return;
            }
        }
    }

    if let Some(update) = lines.finish().and_then(|line| parse_line(&line)) {
        let _ = tx.send(Ok(update)).await;
    }
    tracing::warn!("Ledger update feed ended");
}

/// Reassembles newline-terminated lines from body chunks, holding at most
/// `limit` bytes of an unterminated line.
struct LineBuffer {
    buffer: Vec<u8>,
    limit: usize,
    overflowed: bool,
}

impl LineBuffer {
    fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
            overflowed: false,
        }
    }

    /// Complete lines found after appending `bytes`. An oversized line is
    /// skipped up to and including its terminating newline.
    fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut complete = Vec::new();
        for segment in bytes.split_inclusive(|b| *b == b'\n') {
            let terminated = segment.last() == Some(&b'\n');
            if !self.overflowed {
                self.buffer.extend_from_slice(segment);
                if self.buffer.len() > self.limit {
                    tracing::warn!(limit = self.limit, "Skipping oversized feed line");
                    self.buffer.clear();
                    self.overflowed = true;
                }
            }
            if terminated {
                if self.overflowed {
                    self.overflowed = false;
                } else {
                    complete.push(std::mem::take(&mut self.buffer));
                }
            }
        }
        complete
    }

    /// Trailing unterminated line, unless it overflowed.
    fn finish(self) -> Option<Vec<u8>> {
        (!self.overflowed && !self.buffer.is_empty()).then_some(self.buffer)
    }
}

fn parse_line(line: &[u8]) -> Option<VaultUpdate> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(update) => Some(update),
        Err(e) => {
            tracing::warn!(error = %e, line = %text, "Skipping malformed feed line");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_skips_blank_and_malformed() {
        assert!(parse_line(b"\n").is_none());
        assert!(parse_line(b"{not json}\n").is_none());

        let update = parse_line(
            br#"{"produced": [{"state": {"titleID": "TN1"}, "instant": "2019-06-10T12:00:00Z"}]}"#,
        )
        .unwrap();
        assert!(update.consumed.is_empty());
        assert_eq!(update.produced[0].state["titleID"], "TN1");
    }

    #[test]
    fn test_line_buffer_joins_chunks() {
        let mut lines = LineBuffer::new(64);
        assert!(lines.push(b"{\"consumed\"").is_empty());
        let complete = lines.push(b": []}\n{\"produced\"");
        assert_eq!(complete, vec![b"{\"consumed\": []}\n".to_vec()]);
        assert!(lines.push(b": []}").is_empty());
        assert_eq!(lines.finish(), Some(b"{\"produced\": []}".to_vec()));
    }

    #[test]
    fn test_line_buffer_drops_oversized_line_and_recovers() {
        let mut lines = LineBuffer::new(8);
        assert!(lines.push(b"0123456789").is_empty());
        assert!(lines.push(b"abcdef").is_empty());
        let complete = lines.push(b"xyz\nok\n");
        assert_eq!(complete, vec![b"ok\n".to_vec()]);

        assert!(lines.push(b"still too long").is_empty());
        assert_eq!(lines.finish(), None);
    }
}
