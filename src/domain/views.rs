// External-facing shapes shared by the query endpoints and the registry projection.

use crate::domain::model::{
    AgreementRecord, AgreementStatus, Amount, Charge, Owner, Party, Restriction, TitleRecord,
    TitleStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl From<&Party> for PartyView {
    fn from(party: &Party) -> Self {
        let mut view = PartyView {
            name: party.name.clone(),
            organisation: None,
            locality: None,
            country: None,
        };
        for attribute in party.name.split(',') {
            let Some((key, value)) = attribute.split_once('=') else {
                continue;
            };
            let value = Some(value.trim().to_string());
            match key.trim() {
                "O" => view.organisation = value,
                "L" => view.locality = value,
                "C" => view.country = value,
                _ => {}
            }
        }
        view
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeView {
    pub date: DateTime<Utc>,
    pub lender: String,
    pub amount: i64,
    pub amount_currency_code: String,
}

impl From<&Charge> for ChargeView {
    fn from(charge: &Charge) -> Self {
        Self {
            date: charge.date,
            lender: charge.lender.name.clone(),
            amount: charge.amount.quantity,
            amount_currency_code: charge.amount.currency_code.clone(),
        }
    }
}

/// Per-item restriction shape. The variant is carried by `restriction_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionView {
    pub restriction_id: String,
    pub restriction_type: String,
    pub restriction_text: String,
    pub consenting_party: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge: Option<ChargeView>,
}

impl From<&Restriction> for RestrictionView {
    fn from(restriction: &Restriction) -> Self {
        let restriction_type = restriction.tag().to_string();
        match restriction {
            Restriction::Plain(r) => Self {
                restriction_id: r.restriction_id.clone(),
                restriction_type,
                restriction_text: r.restriction_text.clone(),
                consenting_party: r.consenting_party.name.clone(),
                date: Some(r.date),
                charge: None,
            },
            Restriction::Charge(r) => Self {
                restriction_id: r.restriction_id.clone(),
                restriction_type,
                restriction_text: r.restriction_text.clone(),
                consenting_party: r.consenting_party.name.clone(),
                date: Some(r.date),
                charge: Some(ChargeView::from(&r.charge)),
            },
            Restriction::Other(r) => Self {
                restriction_id: r.restriction_id.clone(),
                restriction_type,
                restriction_text: r.restriction_text.clone(),
                consenting_party: r
                    .consenting_party
                    .as_ref()
                    .map(|party| party.name.clone())
                    .unwrap_or_default(),
                date: r.date,
                charge: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerView {
    pub identity: i64,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub phone_number: String,
    #[serde(rename = "type")]
    pub owner_type: String,
    pub address: AddressView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressView {
    pub house_name_number: String,
    pub street: String,
    pub town_city: String,
    pub county: String,
    pub country: String,
    pub postcode: String,
}

impl From<&Owner> for OwnerView {
    fn from(owner: &Owner) -> Self {
        let address = &owner.address;
        Self {
            identity: owner.user_id,
            first_name: owner.forename.clone(),
            last_name: owner.surname.clone(),
            email_address: owner.email.clone(),
            phone_number: owner.phone.clone(),
            owner_type: owner.user_type.as_lowercase().to_string(),
            address: AddressView {
                house_name_number: address.house_number.clone(),
                street: address.street_name.clone(),
                town_city: address.city.clone(),
                county: address.county.clone(),
                country: address.country.clone(),
                postcode: address.postal_code.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceView {
    pub amount: i64,
    pub currency_code: String,
}

impl From<&Amount> for PriceView {
    fn from(amount: &Amount) -> Self {
        Self {
            amount: amount.quantity,
            currency_code: amount.currency_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleAgreementView {
    pub title_number: String,
    pub buyer: PartyView,
    pub seller: PartyView,
    pub creation_date: NaiveDate,
    pub completion_date: NaiveDate,
    pub purchase_price: PriceView,
    pub deposit: PriceView,
    pub balance: PriceView,
    pub status: AgreementStatus,
    pub payment_settler: PartyView,
    pub date_time: DateTime<Utc>,
}

impl SaleAgreementView {
    pub fn new(agreement: &AgreementRecord, settler: &Party, instant: DateTime<Utc>) -> Self {
        Self {
            title_number: agreement.title_id.clone(),
            buyer: PartyView::from(&agreement.buyer),
            seller: PartyView::from(&agreement.seller),
            creation_date: agreement.creation_date,
            completion_date: agreement.completion_date,
            purchase_price: PriceView::from(&agreement.purchase_price),
            deposit: PriceView::from(&agreement.deposit),
            balance: PriceView::from(&agreement.balance),
            status: agreement.status,
            payment_settler: PartyView::from(settler),
            date_time: instant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleSummaryView {
    pub title_number: String,
    pub status: TitleStatus,
    pub owner: OwnerView,
    pub restrictions: Vec<RestrictionView>,
    pub charges: Vec<ChargeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sold_value: Option<PriceView>,
    pub updated_at: DateTime<Utc>,
}

impl TitleSummaryView {
    pub fn new(title: &TitleRecord, instant: DateTime<Utc>) -> Self {
        Self {
            title_number: title.title_id.clone(),
            status: title.status,
            owner: OwnerView::from(&title.owner),
            restrictions: title.restrictions.iter().map(RestrictionView::from).collect(),
            charges: title.charges.iter().map(ChargeView::from).collect(),
            last_sold_value: title.last_sold_value.as_ref().map(PriceView::from),
            updated_at: instant,
        }
    }
}

/// Flat title representation accepted by the downstream registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryTitle {
    pub owner: OwnerView,
    pub restrictions: Vec<RestrictionView>,
    pub charges: Vec<ChargeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_history: Option<PriceView>,
}
