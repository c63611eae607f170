use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Vault record types this service reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    Title,
    Agreement,
    Payment,
    ChargesAndRestrictions,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Agreement => "agreement",
            Self::Payment => "payment",
            Self::ChargesAndRestrictions => "charges-and-restrictions",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed ledger record keyed by title number.
pub trait LedgerRecord: serde::de::DeserializeOwned + Serialize + Send + Sync + 'static {
    const KIND: RecordKind;

    fn title_id(&self) -> &str;
}

/// A record snapshot paired with the instant the ledger produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAndInstant<T> {
    pub state: T,
    pub instant: DateTime<Utc>,
}

impl<T> StateAndInstant<T> {
    pub fn new(state: T, instant: DateTime<Utc>) -> Self {
        Self { state, instant }
    }
}

impl StateAndInstant<serde_json::Value> {
    pub fn decode<T: LedgerRecord>(self) -> serde_json::Result<StateAndInstant<T>> {
        Ok(StateAndInstant {
            state: serde_json::from_value(self.state)?,
            instant: self.instant,
        })
    }
}

/// One ledger transaction's effect on the tracked record kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultUpdate {
    #[serde(default)]
    pub consumed: Vec<StateAndInstant<serde_json::Value>>,
    #[serde(default)]
    pub produced: Vec<StateAndInstant<serde_json::Value>>,
}

/// A legal identity on the ledger network, named by its X.500 name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
}

impl Party {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Minor units (pence for GBP).
    pub quantity: i64,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub house_number: String,
    pub street_name: String,
    pub city: String,
    pub county: String,
    pub country: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Individual,
    Company,
    Overseas,
}

impl UserType {
    pub fn as_lowercase(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Company => "company",
            Self::Overseas => "overseas",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub user_id: i64,
    pub forename: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub user_type: UserType,
    pub address: Address,
}

impl Owner {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.forename, self.surname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub date: DateTime<Utc>,
    pub lender: Party,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainRestriction {
    pub restriction_id: String,
    pub restriction_text: String,
    pub consenting_party: Party,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRestriction {
    pub restriction_id: String,
    pub restriction_text: String,
    pub consenting_party: Party,
    pub date: DateTime<Utc>,
    pub charge: Charge,
}

/// Category tag used to filter restrictions by variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestrictionCategory {
    Charge,
    Restriction,
    /// Any variant this service does not model. Never selected by a filter.
    Other,
}

impl RestrictionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Restriction => "restriction",
            Self::Other => "other",
        }
    }

    /// Unknown tags yield `None`; a filter with an unknown tag matches nothing.
    /// `Other` is never returned, so filtering always drops unmodelled variants.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "charge" => Some(Self::Charge),
            "restriction" => Some(Self::Restriction),
            _ => None,
        }
    }
}

/// A restriction whose `type` tag is neither `charge` nor `restriction`.
/// Only the fields common to every variant are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherRestriction {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub restriction_id: String,
    #[serde(default)]
    pub restriction_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consenting_party: Option<Party>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Restriction variants, discriminated by the `type` field on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    Charge(ChargeRestriction),
    Plain(PlainRestriction),
    Other(OtherRestriction),
}

impl Restriction {
    pub fn category(&self) -> RestrictionCategory {
        match self {
            Self::Charge(_) => RestrictionCategory::Charge,
            Self::Plain(_) => RestrictionCategory::Restriction,
            Self::Other(_) => RestrictionCategory::Other,
        }
    }

    /// The wire tag, as recorded on the ledger.
    pub fn tag(&self) -> &str {
        match self {
            Self::Other(other) => other.tag.as_str(),
            known => known.category().as_str(),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum TaggedRestriction<'a> {
    #[serde(rename = "charge")]
    Charge(&'a ChargeRestriction),
    #[serde(rename = "restriction")]
    Plain(&'a PlainRestriction),
}

impl Serialize for Restriction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Charge(r) => TaggedRestriction::Charge(r).serialize(serializer),
            Self::Plain(r) => TaggedRestriction::Plain(r).serialize(serializer),
            Self::Other(r) => r.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Restriction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| de::Error::missing_field("type"))?;

        match tag.as_str() {
            "charge" => serde_json::from_value(value)
                .map(Self::Charge)
                .map_err(de::Error::custom),
            "restriction" => serde_json::from_value(value)
                .map(Self::Plain)
                .map_err(de::Error::custom),
            _ => serde_json::from_value(value)
                .map(Self::Other)
                .map_err(de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TitleStatus {
    Pending,
    AssignedConveyancer,
    SaleInProgress,
    Transferred,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRecord {
    #[serde(rename = "titleID")]
    pub title_id: String,
    pub owner: Owner,
    pub status: TitleStatus,
    #[serde(default)]
    pub restrictions: Vec<Restriction>,
    #[serde(default)]
    pub charges: Vec<Charge>,
    #[serde(default)]
    pub last_sold_value: Option<Amount>,
}

impl LedgerRecord for TitleRecord {
    const KIND: RecordKind = RecordKind::Title;

    fn title_id(&self) -> &str {
        &self.title_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementStatus {
    Created,
    Approved,
    Signed,
    Completed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementRecord {
    #[serde(rename = "titleID")]
    pub title_id: String,
    pub linear_id: String,
    pub buyer: Party,
    pub seller: Party,
    pub creation_date: NaiveDate,
    pub completion_date: NaiveDate,
    pub purchase_price: Amount,
    pub deposit: Amount,
    pub balance: Amount,
    pub status: AgreementStatus,
}

impl LedgerRecord for AgreementRecord {
    const KIND: RecordKind = RecordKind::Agreement;

    fn title_id(&self) -> &str {
        &self.title_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(rename = "titleID")]
    pub title_id: String,
    #[serde(rename = "landAgreementStateLinearId")]
    pub land_agreement_state_linear_id: String,
    pub settling_party: Party,
}

impl LedgerRecord for PaymentRecord {
    const KIND: RecordKind = RecordKind::Payment;

    fn title_id(&self) -> &str {
        &self.title_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargesAndRestrictionsRecord {
    #[serde(rename = "titleID")]
    pub title_id: String,
    #[serde(default)]
    pub charges: Vec<Charge>,
    #[serde(default)]
    pub restrictions: Vec<Restriction>,
}

impl LedgerRecord for ChargesAndRestrictionsRecord {
    const KIND: RecordKind = RecordKind::ChargesAndRestrictions;

    fn title_id(&self) -> &str {
        &self.title_id
    }
}
