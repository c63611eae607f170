use crate::domain::model::{LedgerRecord, Party, RecordKind, StateAndInstant, VaultUpdate};
use crate::domain::ports::{LedgerFeed, LedgerQuery, VaultTrack};
use crate::utils::error::{LedgerApiError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::RwLock;
use tokio::sync::{broadcast, mpsc};

const FEED_CAPACITY: usize = 256;

/// In-process vault. Every recorded state stays queryable and is published
/// to live trackers of its kind as a produced state.
pub struct InMemoryLedger {
    identity: Party,
    peers: Vec<Party>,
    states: RwLock<Vec<(RecordKind, StateAndInstant<Value>)>>,
    feed: RwLock<Option<broadcast::Sender<(RecordKind, VaultUpdate)>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_identity(Party::new("O=Local Node,L=London,C=GB"), Vec::new())
    }

    /// `peers` is the whole network map and may include `identity`.
    pub fn with_identity(identity: Party, peers: Vec<Party>) -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            identity,
            peers,
            states: RwLock::new(Vec::new()),
            feed: RwLock::new(Some(sender)),
        }
    }

    /// Stores `record` as produced at `instant` and publishes it.
    pub fn record<T: LedgerRecord>(&self, record: &T, instant: DateTime<Utc>) -> Result<()> {
        let state = StateAndInstant::new(serde_json::to_value(record)?, instant);
        self.states
            .write()
            .map_err(|_| LedgerApiError::connection("in-memory vault lock poisoned"))?
            .push((T::KIND, state.clone()));

        self.publish(
            T::KIND,
            VaultUpdate {
                consumed: Vec::new(),
                produced: vec![state],
            },
        );
        Ok(())
    }

    /// Publishes an update without storing it, e.g. to replay a snapshot.
    pub fn publish(&self, kind: RecordKind, update: VaultUpdate) {
        if let Ok(feed) = self.feed.read() {
            if let Some(sender) = feed.as_ref() {
                // No trackers is fine.
                let _ = sender.send((kind, update));
            }
        }
    }

    /// Ends every live feed, as if the node connection dropped.
    pub fn close_feed(&self) {
        if let Ok(mut feed) = self.feed.write() {
            feed.take();
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerQuery for InMemoryLedger {
    async fn query(
        &self,
        kind: RecordKind,
        title_id: Option<&str>,
    ) -> Result<Vec<StateAndInstant<Value>>> {
        let states = self
            .states
            .read()
            .map_err(|_| LedgerApiError::connection("in-memory vault lock poisoned"))?;

        Ok(states
            .iter()
            .filter(|(k, _)| *k == kind)
            .filter(|(_, s)| {
                title_id.map_or(true, |id| {
                    s.state.get("titleID").and_then(Value::as_str) == Some(id)
                })
            })
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn node_identity(&self) -> Result<Party> {
        Ok(self.identity.clone())
    }

    async fn network_peers(&self) -> Result<Vec<Party>> {
        Ok(self.peers.clone())
    }
}

#[async_trait]
impl LedgerFeed for InMemoryLedger {
    async fn track(&self, kind: RecordKind) -> Result<VaultTrack> {
        let mut live = self
            .feed
            .read()
            .map_err(|_| LedgerApiError::connection("in-memory vault lock poisoned"))?
            .as_ref()
            .map(|sender| sender.subscribe())
            .ok_or_else(|| LedgerApiError::connection("ledger feed is closed"))?;
        let snapshot = self.query(kind, None).await?;

        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        tokio::spawn(async move {
            loop {
                match live.recv().await {
                    Ok((k, update)) if k == kind => {
                        if tx.send(Ok(update)).await.is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        let _ = tx
                            .send(Err(LedgerApiError::connection(format!(
                                "tracker fell behind by {} updates",
                                missed
                            ))))
                            .await;
                        return;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        Ok(VaultTrack {
            snapshot,
            updates: rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::PaymentRecord;

    fn payment(title_id: &str) -> PaymentRecord {
        PaymentRecord {
            title_id: title_id.to_string(),
            land_agreement_state_linear_id: "agreement-1".to_string(),
            settling_party: Party::new("O=Bank,L=London,C=GB"),
        }
    }

    #[tokio::test]
    async fn test_query_filters_by_kind_and_title() {
        let ledger = InMemoryLedger::new();
        let now = Utc::now();
        ledger.record(&payment("TN1"), now).unwrap();
        ledger.record(&payment("TN2"), now).unwrap();

        assert_eq!(ledger.query(RecordKind::Payment, None).await.unwrap().len(), 2);
        assert_eq!(
            ledger.query(RecordKind::Payment, Some("TN2")).await.unwrap().len(),
            1
        );
        assert!(ledger.query(RecordKind::Title, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_track_delivers_only_tracked_kind() {
        let ledger = InMemoryLedger::new();
        let now = Utc::now();
        ledger.record(&payment("TN0"), now).unwrap();

        let mut track = ledger.track(RecordKind::Payment).await.unwrap();
        assert_eq!(track.snapshot.len(), 1);

        ledger.publish(RecordKind::Title, VaultUpdate::default());
        ledger.record(&payment("TN1"), now).unwrap();

        let update = track.updates.recv().await.unwrap().unwrap();
        assert_eq!(update.produced.len(), 1);
        assert_eq!(update.produced[0].state["titleID"], "TN1");

        ledger.close_feed();
        assert!(track.updates.recv().await.is_none());
        assert!(ledger.track(RecordKind::Payment).await.is_err());
    }
}
