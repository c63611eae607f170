#![allow(dead_code)]

use chrono::{DateTime, Utc};
use title_ledger_api::domain::model::{
    Address, AgreementRecord, AgreementStatus, Amount, Charge, ChargeRestriction,
    ChargesAndRestrictionsRecord, OtherRestriction, Owner, Party, PaymentRecord, PlainRestriction, Restriction,
    TitleRecord, TitleStatus, UserType,
};

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    rfc3339.parse().unwrap()
}

pub fn gbp(quantity: i64) -> Amount {
    Amount {
        quantity,
        currency_code: "GBP".to_string(),
    }
}

pub fn owner(user_id: i64, forename: &str, surname: &str) -> Owner {
    Owner {
        user_id,
        forename: forename.to_string(),
        surname: surname.to_string(),
        email: format!("{}@example.com", forename.to_lowercase()),
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
    }
}

pub fn plain_restriction(id: &str, text: &str) -> Restriction {
    Restriction::Plain(PlainRestriction {
        restriction_id: id.to_string(),
        restriction_text: text.to_string(),
        consenting_party: Party::new("O=Lender,L=London,C=GB"),
        date: at("2019-03-01T09:00:00Z"),
    })
}

pub fn charge(quantity: i64) -> Charge {
    Charge {
        date: at("2019-03-01T09:00:00Z"),
        lender: Party::new("O=Lender,L=London,C=GB"),
        amount: gbp(quantity),
    }
}

pub fn charge_restriction(id: &str) -> Restriction {
    Restriction::Charge(ChargeRestriction {
        restriction_id: id.to_string(),
        restriction_text: "No disposition without the lender's consent".to_string(),
        consenting_party: Party::new("O=Lender,L=London,C=GB"),
        date: at("2019-03-01T09:00:00Z"),
        charge: charge(150_000_00),
    })
}

/// A restriction variant this service does not model.
pub fn notice_restriction(id: &str) -> Restriction {
    Restriction::Other(OtherRestriction {
        tag: "notice".to_string(),
        restriction_id: id.to_string(),
        restriction_text: "home rights notice".to_string(),
        consenting_party: Some(Party::new("O=Spouse,L=Exeter,C=GB")),
        date: Some(at("2019-04-01T09:00:00Z")),
    })
}

/// Title TN100 owned by Jane Doe with a single plain restriction.
pub fn jane_doe_title(status: TitleStatus) -> TitleRecord {
    TitleRecord {
        title_id: "TN100".to_string(),
        owner: owner(7, "Jane", "Doe"),
        status,
        restrictions: vec![plain_restriction("RES1", "no subletting")],
        charges: vec![],
        last_sold_value: None,
    }
}

pub fn agreement(title_id: &str, linear_id: &str) -> AgreementRecord {
    AgreementRecord {
        title_id: title_id.to_string(),
        linear_id: linear_id.to_string(),
        buyer: Party::new("O=Buyer Conveyancer,L=Leeds,C=GB"),
        seller: Party::new("O=Seller Conveyancer,L=York,C=GB"),
        creation_date: "2019-06-01".parse().unwrap(),
        completion_date: "2019-07-01".parse().unwrap(),
        purchase_price: gbp(250_000_00),
        deposit: gbp(25_000_00),
        balance: gbp(225_000_00),
        status: AgreementStatus::Signed,
    }
}

pub fn payment(title_id: &str, linear_id: &str, settler: &str) -> PaymentRecord {
    PaymentRecord {
        title_id: title_id.to_string(),
        land_agreement_state_linear_id: linear_id.to_string(),
        settling_party: Party::new(settler),
    }
}

pub fn charges_and_restrictions(
    title_id: &str,
    charges: Vec<Charge>,
    restrictions: Vec<Restriction>,
) -> ChargesAndRestrictionsRecord {
    ChargesAndRestrictionsRecord {
        title_id: title_id.to_string(),
        charges,
        restrictions,
    }
}
