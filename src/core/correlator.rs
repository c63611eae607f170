use crate::domain::model::{
    AgreementRecord, ChargesAndRestrictionsRecord, LedgerRecord, Party, PaymentRecord,
    RestrictionCategory, StateAndInstant, TitleRecord,
};
use crate::domain::ports::LedgerQuery;
use crate::domain::views::{ChargeView, RestrictionView, SaleAgreementView, TitleSummaryView};
use crate::utils::error::{LedgerApiError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds point-in-time views of a title by joining independently versioned
/// vault records. Holds no state beyond the ledger handle.
#[derive(Clone)]
pub struct QueryCorrelator {
    ledger: Arc<dyn LedgerQuery>,
}

impl QueryCorrelator {
    pub fn new(ledger: Arc<dyn LedgerQuery>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerQuery> {
        &self.ledger
    }

    async fn fetch<T, P>(&self, title_id: Option<&str>, predicate: P) -> Result<Vec<StateAndInstant<T>>>
    where
        T: LedgerRecord,
        P: Fn(&StateAndInstant<T>) -> bool,
    {
        let raw = self.ledger.query(T::KIND, title_id).await?;
        let mut matching = Vec::with_capacity(raw.len());
        for entry in raw {
            let decoded = entry.decode::<T>()?;
            let in_scope = title_id.map_or(true, |id| decoded.state.title_id() == id);
            if in_scope && predicate(&decoded) {
                matching.push(decoded);
            }
        }
        Ok(matching)
    }

    /// Every record of type `T` matching `predicate`, in ledger order.
    pub async fn find_all_by<T, P>(&self, predicate: P) -> Result<Vec<StateAndInstant<T>>>
    where
        T: LedgerRecord,
        P: Fn(&StateAndInstant<T>) -> bool,
    {
        self.fetch(None, predicate).await
    }

    /// The most recent record of type `T` matching `predicate`.
    pub async fn find_latest_by<T, P>(&self, predicate: P) -> Result<Option<StateAndInstant<T>>>
    where
        T: LedgerRecord,
        P: Fn(&StateAndInstant<T>) -> bool,
    {
        Ok(latest(self.fetch(None, predicate).await?))
    }

    /// Like `find_latest_by`, with the title number pushed down to the ledger.
    pub async fn find_latest_for_title<T, P>(
        &self,
        title_id: &str,
        predicate: P,
    ) -> Result<Option<StateAndInstant<T>>>
    where
        T: LedgerRecord,
        P: Fn(&StateAndInstant<T>) -> bool,
    {
        Ok(latest(self.fetch(Some(title_id), predicate).await?))
    }

    pub async fn build_sale_agreement_view(&self, title_id: &str) -> Result<SaleAgreementView> {
        let agreement = self
            .find_latest_for_title::<AgreementRecord, _>(title_id, |_| true)
            .await?
            .ok_or_else(|| {
                LedgerApiError::not_found(format!("Sales agreement for title {}", title_id))
            })?;

        let settler = self.settling_party(&agreement.state).await?;

        Ok(SaleAgreementView::new(
            &agreement.state,
            &settler,
            agreement.instant,
        ))
    }

    /// Follows the payment's back-reference to the agreement's linear id.
    async fn settling_party(&self, agreement: &AgreementRecord) -> Result<Party> {
        let linear_id = agreement.linear_id.as_str();
        let payments = self
            .fetch::<PaymentRecord, _>(Some(&agreement.title_id), |p| {
                p.state.land_agreement_state_linear_id == linear_id
            })
            .await?;

        if payments.len() > 1 {
            tracing::warn!(
                title_id = %agreement.title_id,
                linear_id,
                count = payments.len(),
                "Multiple payment confirmations reference one agreement, using the latest"
            );
        }

        latest(payments)
            .map(|payment| payment.state.settling_party)
            .ok_or_else(|| {
                LedgerApiError::inconsistency(format!(
                    "no payment confirmation references agreement {} on title {}",
                    linear_id, agreement.title_id
                ))
            })
    }

    /// Latest charges record, or `None` for a known title without one.
    /// A title with neither record is `NotFound`.
    async fn charges_and_restrictions(
        &self,
        title_id: &str,
    ) -> Result<Option<ChargesAndRestrictionsRecord>> {
        let record = self
            .find_latest_for_title::<ChargesAndRestrictionsRecord, _>(title_id, |_| true)
            .await?
            .map(|found| found.state);
        if record.is_none() {
            self.require_title(title_id).await?;
        }
        Ok(record)
    }

    async fn require_title(&self, title_id: &str) -> Result<()> {
        self.find_latest_for_title::<TitleRecord, _>(title_id, |_| true)
            .await?
            .map(|_| ())
            .ok_or_else(|| LedgerApiError::not_found(format!("Title {}", title_id)))
    }

    /// Empty when the title exists but has no charges record.
    pub async fn build_charges_view(&self, title_id: &str) -> Result<Vec<ChargeView>> {
        Ok(self
            .charges_and_restrictions(title_id)
            .await?
            .map(|record| record.charges.iter().map(ChargeView::from).collect())
            .unwrap_or_default())
    }

    /// Empty when the title exists but has no restrictions record. A `filter`
    /// tag keeps only restrictions of that category; an unknown tag keeps none.
    pub async fn build_restrictions_view(
        &self,
        title_id: &str,
        filter: Option<&str>,
    ) -> Result<Vec<RestrictionView>> {
        let Some(record) = self.charges_and_restrictions(title_id).await? else {
            return Ok(Vec::new());
        };

        let wanted = filter.map(RestrictionCategory::from_tag);
        Ok(record
            .restrictions
            .iter()
            .filter(|restriction| match wanted {
                None => true,
                Some(category) => category == Some(restriction.category()),
            })
            .map(RestrictionView::from)
            .collect())
    }

    pub async fn build_title_summary(&self, title_id: &str) -> Result<TitleSummaryView> {
        self.find_latest_for_title::<TitleRecord, _>(title_id, |_| true)
            .await?
            .map(|found| TitleSummaryView::new(&found.state, found.instant))
            .ok_or_else(|| LedgerApiError::not_found(format!("Title {}", title_id)))
    }

    /// One summary per title number, from its latest record, ordered by title number.
    pub async fn build_all_title_summaries(&self) -> Result<Vec<TitleSummaryView>> {
        let mut by_title: BTreeMap<String, StateAndInstant<TitleRecord>> = BTreeMap::new();
        for found in self.find_all_by::<TitleRecord, _>(|_| true).await? {
            match by_title.get(&found.state.title_id) {
                Some(current) if current.instant > found.instant => {}
                _ => {
                    by_title.insert(found.state.title_id.clone(), found);
                }
            }
        }

        Ok(by_title
            .values()
            .map(|found| TitleSummaryView::new(&found.state, found.instant))
            .collect())
    }
}

/// Latest by instant; among equal instants the one later in ledger order wins.
fn latest<T>(states: Vec<StateAndInstant<T>>) -> Option<StateAndInstant<T>> {
    states.into_iter().max_by_key(|s| s.instant)
}
