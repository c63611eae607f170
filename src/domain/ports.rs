use crate::domain::model::{Party, RecordKind, StateAndInstant, VaultUpdate};
use crate::domain::views::RegistryTitle;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

/// Read-only point-in-time access to the ledger vault.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// Unconsumed states of `kind`. `title_id` narrows the query on the
    /// ledger side; callers still check their own predicate.
    async fn query(
        &self,
        kind: RecordKind,
        title_id: Option<&str>,
    ) -> Result<Vec<StateAndInstant<Value>>>;

    async fn node_identity(&self) -> Result<Party>;

    async fn network_peers(&self) -> Result<Vec<Party>>;
}

/// Items are `Err` once the connection to the ledger is lost; the channel
/// closes after that.
pub type UpdateReceiver = mpsc::Receiver<Result<VaultUpdate>>;

pub struct VaultTrack {
    pub snapshot: Vec<StateAndInstant<Value>>,
    pub updates: UpdateReceiver,
}

/// Live vault updates for one record kind.
#[async_trait]
pub trait LedgerFeed: Send + Sync {
    async fn track(&self, kind: RecordKind) -> Result<VaultTrack>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted { status: u16 },
    Rejected { status: u16, body: String },
}

/// Sets the current state of a title in the downstream registry.
#[async_trait]
pub trait TitleRegistry: Send + Sync {
    /// Transport failures are `Err`; any response is an outcome.
    async fn put_title(&self, title_id: &str, title: &RegistryTitle) -> Result<DeliveryOutcome>;
}
