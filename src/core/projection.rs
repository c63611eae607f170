use crate::domain::model::{TitleRecord, TitleStatus};
use crate::domain::views::{ChargeView, OwnerView, PriceView, RegistryTitle, RestrictionView};

/// Only a finalized transfer is forwarded to the registry.
pub fn is_terminal_transition(title: &TitleRecord) -> bool {
    title.status == TitleStatus::Transferred
}

/// Flattens a title into the registry payload. `None` unless transferred.
pub fn project_transferred(title: &TitleRecord) -> Option<RegistryTitle> {
    if !is_terminal_transition(title) {
        return None;
    }

    Some(RegistryTitle {
        owner: OwnerView::from(&title.owner),
        restrictions: title.restrictions.iter().map(RestrictionView::from).collect(),
        charges: title.charges.iter().map(ChargeView::from).collect(),
        price_history: title.last_sold_value.as_ref().map(PriceView::from),
    })
}

/// Path segments of a title's registry resource, below the registry base URL.
/// The title number is one segment and is percent-encoded when joined.
pub fn registry_segments(title_id: &str) -> [&str; 2] {
    ["titles", title_id]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Address, Amount, Owner, Party, PlainRestriction, Restriction, UserType,
    };
    use serde_json::json;

    fn jane_doe_title(status: TitleStatus) -> TitleRecord {
        TitleRecord {
            title_id: "TN100".to_string(),
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
                date: "2019-03-01T09:00:00Z".parse().unwrap(),
            })],
            charges: vec![],
            last_sold_value: None,
        }
    }

    #[test]
    fn test_non_transferred_titles_are_not_projected() {
        for status in [
            TitleStatus::Pending,
            TitleStatus::AssignedConveyancer,
            TitleStatus::SaleInProgress,
            TitleStatus::Other,
        ] {
            assert!(project_transferred(&jane_doe_title(status)).is_none());
        }
    }

    #[test]
    fn test_transferred_title_payload_shape() {
        let payload = project_transferred(&jane_doe_title(TitleStatus::Transferred)).unwrap();
        let body = serde_json::to_value(&payload).unwrap();

        assert_eq!(body["owner"]["identity"], json!(7));
        assert_eq!(body["owner"]["first_name"], "Jane");
        assert_eq!(body["owner"]["last_name"], "Doe");
        assert_eq!(body["owner"]["type"], "individual");
        assert_eq!(body["owner"]["address"]["house_name_number"], "22");
        assert_eq!(body["owner"]["address"]["postcode"], "EX1 2AB");

        let restrictions = body["restrictions"].as_array().unwrap();
        assert_eq!(restrictions.len(), 1);
        assert_eq!(restrictions[0]["restriction_text"], "no subletting");
        assert!(restrictions[0].get("type").is_none());
        assert_eq!(body["charges"], json!([]));
        assert!(body.get("price_history").is_none());

        assert_eq!(registry_segments("TN100"), ["titles", "TN100"]);
    }

    #[test]
    fn test_price_history_present_when_last_sold_value_known() {
        let mut title = jane_doe_title(TitleStatus::Transferred);
        title.last_sold_value = Some(Amount {
            quantity: 250_000_00,
            currency_code: "GBP".to_string(),
        });

        let body = serde_json::to_value(project_transferred(&title).unwrap()).unwrap();
        assert_eq!(
            body["price_history"],
            json!({"amount": 25000000, "currency_code": "GBP"})
        );
    }
}
