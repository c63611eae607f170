use crate::core::projection::project_transferred;
use crate::domain::model::{LedgerRecord, RecordKind, TitleRecord, VaultUpdate};
use crate::domain::ports::{DeliveryOutcome, LedgerFeed, TitleRegistry};
use crate::domain::views::RegistryTitle;
use crate::utils::error::{LedgerApiError, Result};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubscriberState {
    #[default]
    Idle,
    Subscribing,
    Streaming,
    Terminated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    pub updates: u64,
    pub produced: u64,
    pub ignored: u64,
    pub undecodable: u64,
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberStatus {
    pub state: SubscriberState,
    pub stats: SubscriberStats,
}

/// Forwards every newly transferred title to the registry.
///
/// Events are handled one at a time in feed order. A delivery blocks the
/// loop for at most the registry client's timeout, so a slow registry slows
/// consumption of the bounded feed channel rather than queueing without
/// limit. Failed deliveries are logged with their payload and not retried.
pub struct UpdateSubscriber {
    feed: Arc<dyn LedgerFeed>,
    registry: Arc<dyn TitleRegistry>,
    status: watch::Sender<SubscriberStatus>,
}

impl UpdateSubscriber {
    pub fn new(feed: Arc<dyn LedgerFeed>, registry: Arc<dyn TitleRegistry>) -> Self {
        let (status, _) = watch::channel(SubscriberStatus::default());
        Self {
            feed,
            registry,
            status,
        }
    }

    pub fn status(&self) -> SubscriberStatus {
        self.status.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SubscriberStatus> {
        self.status.subscribe()
    }

    fn set_state(&self, state: SubscriberState) {
        self.status.send_modify(|s| s.state = state);
        tracing::debug!(?state, "Subscriber state changed");
    }

    fn count(&self, f: impl FnOnce(&mut SubscriberStats)) {
        self.status.send_modify(|s| f(&mut s.stats));
    }

    /// Inspects the produced titles of one update; consumed ones are ignored.
    pub async fn handle_update(&self, update: VaultUpdate) {
        self.count(|s| s.updates += 1);

        for produced in update.produced {
            self.count(|s| s.produced += 1);
            match produced.decode::<TitleRecord>() {
                Ok(found) => self.process_title(&found.state).await,
                Err(e) => {
                    self.count(|s| s.undecodable += 1);
                    tracing::warn!(error = %e, "Skipping produced state that is not a title");
                }
            }
        }
    }

    async fn process_title(&self, title: &TitleRecord) {
        let Some(payload) = project_transferred(title) else {
            self.count(|s| s.ignored += 1);
            tracing::debug!(
                title_id = %title.title_id(),
                status = ?title.status,
                "Ignoring non-terminal title update"
            );
            return;
        };

        tracing::info!(title_id = %title.title_id, "Processing title");
        match self.registry.put_title(&title.title_id, &payload).await {
            Ok(DeliveryOutcome::Accepted { status }) => {
                self.count(|s| s.delivered += 1);
                tracing::info!(
                    title_id = %title.title_id,
                    owner = %title.owner.full_name(),
                    owner_id = title.owner.user_id,
                    status,
                    "Title transfer has been registered with the registry"
                );
            }
            Ok(DeliveryOutcome::Rejected { status, body }) => {
                self.count(|s| s.failed += 1);
                tracing::error!(
                    title_id = %title.title_id,
                    owner = %title.owner.full_name(),
                    owner_id = title.owner.user_id,
                    status,
                    response = %body,
                    request = %payload_text(&payload),
                    "Title transfer failed to be registered with the registry"
                );
            }
            Err(e) => {
                self.count(|s| s.failed += 1);
                tracing::error!(
                    title_id = %title.title_id,
                    owner = %title.owner.full_name(),
                    owner_id = title.owner.user_id,
                    error = %e,
                    request = %payload_text(&payload),
                    "Title transfer failed to be registered with the registry"
                );
            }
        }
    }

    /// Subscribes once and streams until the feed drops or `shutdown` fires.
    /// The feed ending is a connection failure; there is no reconnect.
    pub async fn run(self, shutdown: oneshot::Receiver<()>) -> Result<SubscriberStats> {
        let result = self.stream(shutdown).await;
        self.set_state(SubscriberState::Terminated);

        let stats = self.status().stats;
        match result {
            Ok(()) => {
                tracing::info!(?stats, "Subscriber stopped");
                Ok(stats)
            }
            Err(e) => {
                tracing::error!(error = %e, ?stats, "Subscriber lost the ledger update feed");
                Err(e)
            }
        }
    }

    async fn stream(&self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        self.set_state(SubscriberState::Subscribing);
        tracing::info!(kind = %RecordKind::Title, "Subscribing to ledger vault updates");

        let track = self.feed.track(RecordKind::Title).await?;
        tracing::debug!(
            snapshot = track.snapshot.len(),
            "Initial vault snapshot received, only live updates are forwarded"
        );
        let mut updates = track.updates;
        self.set_state(SubscriberState::Streaming);

        let mut shutdown_armed = true;
        loop {
            tokio::select! {
                biased;
                next = updates.recv() => match next {
                    Some(Ok(update)) => self.handle_update(update).await,
                    Some(Err(e)) => return Err(e),
                    None => return Err(LedgerApiError::connection("ledger update feed closed")),
                },
                requested = &mut shutdown, if shutdown_armed => match requested {
                    Ok(()) => {
                        updates.close();
                        return Ok(());
                    }
                    // Handle dropped without asking for shutdown.
                    Err(_) => shutdown_armed = false,
                },
            }
        }
    }

    pub fn spawn(self) -> SubscriberHandle {
        let status = self.watch();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        SubscriberHandle {
            status,
            shutdown: Some(shutdown),
            task,
        }
    }
}

fn payload_text(payload: &RegistryTitle) -> String {
    serde_json::to_string(payload).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}

/// Owner of the background subscriber task.
pub struct SubscriberHandle {
    status: watch::Receiver<SubscriberStatus>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<SubscriberStats>>,
}

impl SubscriberHandle {
    pub fn status(&self) -> SubscriberStatus {
        self.status.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SubscriberStatus> {
        self.status.clone()
    }

    /// Waits for the subscriber to end on its own.
    pub async fn join(self) -> Result<SubscriberStats> {
        self.task
            .await
            .map_err(|e| LedgerApiError::IoError(std::io::Error::other(e)))?
    }

    pub async fn shutdown(mut self) -> Result<SubscriberStats> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLedger;
    use crate::domain::model::{
        Address, Owner, Party, PlainRestriction, Restriction, StateAndInstant, TitleStatus,
        UserType,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingRegistry {
        calls: Mutex<Vec<(String, RegistryTitle)>>,
        reject: bool,
    }

    #[async_trait]
    impl TitleRegistry for RecordingRegistry {
        async fn put_title(&self, title_id: &str, title: &RegistryTitle) -> Result<DeliveryOutcome> {
            self.calls
                .lock()
                .await
                .push((title_id.to_string(), title.clone()));
            if self.reject {
                Ok(DeliveryOutcome::Rejected {
                    status: 400,
                    body: "{\"error\": \"bad owner\"}".to_string(),
                })
            } else {
                Ok(DeliveryOutcome::Accepted { status: 200 })
            }
        }
    }

    fn instant() -> DateTime<Utc> {
        "2019-06-10T12:00:00Z".parse().unwrap()
    }

    fn title(title_id: &str, status: TitleStatus) -> TitleRecord {
        TitleRecord {
            title_id: title_id.to_string(),
            owner: Owner {
                user_id: 7,
                forename: "Jane".to_string(),
                surname: "Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: "07700900001".to_string(),
                user_type: UserType::Individual,
                address: Address {
                    house_number: "22".to_string(),
                    street_name: "Mill Lane".to_string(),
                    city: "Exeter".to_string(),
                    county: "Devon".to_string(),
                    country: "England".to_string(),
                    postal_code: "EX1 2AB".to_string(),
                },
            },
            status,
            restrictions: vec![Restriction::Plain(PlainRestriction {
                restriction_id: "RES1".to_string(),
                restriction_text: "no subletting".to_string(),
                consenting_party: Party::new("O=Lender,L=London,C=GB"),
                date: instant(),
            })],
            charges: vec![],
            last_sold_value: None,
        }
    }

    fn produced(title: &TitleRecord) -> VaultUpdate {
        VaultUpdate {
            consumed: vec![],
            produced: vec![StateAndInstant::new(
                serde_json::to_value(title).unwrap(),
                instant(),
            )],
        }
    }

    fn subscriber(registry: Arc<RecordingRegistry>) -> UpdateSubscriber {
        UpdateSubscriber::new(Arc::new(InMemoryLedger::new()), registry)
    }

    #[tokio::test]
    async fn test_non_terminal_status_produces_no_delivery() {
        let registry = Arc::new(RecordingRegistry::default());
        let sub = subscriber(registry.clone());

        for status in [TitleStatus::Pending, TitleStatus::SaleInProgress, TitleStatus::Other] {
            sub.handle_update(produced(&title("TN100", status))).await;
        }

        assert!(registry.calls.lock().await.is_empty());
        assert_eq!(sub.status().stats.ignored, 3);
        assert_eq!(sub.status().stats.delivered, 0);
    }

    #[tokio::test]
    async fn test_consumed_states_are_not_inspected() {
        let registry = Arc::new(RecordingRegistry::default());
        let sub = subscriber(registry.clone());

        let transferred = title("TN100", TitleStatus::Transferred);
        let update = VaultUpdate {
            consumed: produced(&transferred).produced,
            produced: vec![],
        };
        sub.handle_update(update).await;

        assert!(registry.calls.lock().await.is_empty());
        assert_eq!(sub.status().stats.updates, 1);
        assert_eq!(sub.status().stats.produced, 0);
    }

    #[tokio::test]
    async fn test_replayed_snapshot_is_delivered_twice_with_same_payload() {
        let registry = Arc::new(RecordingRegistry::default());
        let sub = subscriber(registry.clone());
        let transferred = title("TN100", TitleStatus::Transferred);

        sub.handle_update(produced(&transferred)).await;
        sub.handle_update(produced(&transferred)).await;

        let calls = registry.calls.lock().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
        assert_eq!(calls[0].0, "TN100");
        assert_eq!(sub.status().stats.delivered, 2);
    }

    #[tokio::test]
    async fn test_rejected_delivery_is_counted_and_not_retried() {
        let registry = Arc::new(RecordingRegistry {
            reject: true,
            ..Default::default()
        });
        let sub = subscriber(registry.clone());

        sub.handle_update(produced(&title("TN100", TitleStatus::Transferred)))
            .await;

        assert_eq!(registry.calls.lock().await.len(), 1);
        assert_eq!(sub.status().stats.failed, 1);
    }

    #[tokio::test]
    async fn test_undecodable_produced_state_is_skipped() {
        let registry = Arc::new(RecordingRegistry::default());
        let sub = subscriber(registry.clone());

        let update = VaultUpdate {
            consumed: vec![],
            produced: vec![StateAndInstant::new(
                serde_json::json!({"unexpected": true}),
                instant(),
            )],
        };
        sub.handle_update(update).await;

        assert_eq!(sub.status().stats.undecodable, 1);
        assert!(registry.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_subscriber_streams_until_shutdown() {
        let ledger = Arc::new(InMemoryLedger::new());
        let registry = Arc::new(RecordingRegistry::default());
        let handle = UpdateSubscriber::new(ledger.clone(), registry.clone()).spawn();

        let mut status = handle.watch();
        tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.state == SubscriberState::Streaming),
        )
        .await
        .unwrap()
        .unwrap();

        ledger
            .record(&title("TN1", TitleStatus::Pending), instant())
            .unwrap();
        ledger
            .record(&title("TN1", TitleStatus::Transferred), instant())
            .unwrap();

        tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.stats.updates == 2),
        )
        .await
        .unwrap()
        .unwrap();

        let stats = handle.shutdown().await.unwrap();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.ignored, 1);
        assert_eq!(registry.calls.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_feed_drop_terminates_with_connection_failure() {
        let ledger = Arc::new(InMemoryLedger::new());
        let registry = Arc::new(RecordingRegistry::default());
        let handle = UpdateSubscriber::new(ledger.clone(), registry).spawn();

        let mut status = handle.watch();
        tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.state == SubscriberState::Streaming),
        )
        .await
        .unwrap()
        .unwrap();

        ledger.close_feed();

        let err = tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, LedgerApiError::ConnectionFailure { .. }));
        assert_eq!(status.borrow().state, SubscriberState::Terminated);
    }
}
