//! Outbound JSON projections of addresses.

use crate::model::address::{Address, AddressId, Metadata};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Public JSON shape of one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressResource {
    pub id: AddressId,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_primary: bool,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: String,
    pub full_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub metadata: Option<Metadata>,
    /// ISO-8601, e.g. `2025-01-01T12:00:00+00:00`.
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&Address> for AddressResource {
    fn from(address: &Address) -> Self {
        Self {
            id: address.id,
            kind: address.kind.clone(),
            is_primary: address.is_primary,
            address_line_1: address.address_line_1.clone(),
            address_line_2: address.address_line_2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country_code: address.country_code.clone(),
            full_address: address.full_address(),
            latitude: address.latitude,
            longitude: address.longitude,
            metadata: address.metadata.clone(),
            created_at: iso8601_from_millis(address.created_at),
            updated_at: iso8601_from_millis(address.updated_at),
        }
    }
}

impl From<Address> for AddressResource {
    fn from(address: Address) -> Self {
        Self::from(&address)
    }
}

/// List envelope: `{ "data": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressCollection {
    pub data: Vec<AddressResource>,
}

impl AddressCollection {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<'a> FromIterator<&'a Address> for AddressCollection {
    fn from_iter<I: IntoIterator<Item = &'a Address>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(AddressResource::from).collect(),
        }
    }
}

impl FromIterator<Address> for AddressCollection {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(AddressResource::from).collect(),
        }
    }
}

/// Address fields to merge into an owner's own JSON projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentAddresses {
    pub addresses: Vec<AddressResource>,
    pub primary_address: Option<AddressResource>,
}

impl ParentAddresses {
    /// Builds the projection from an owner's full address list.
    pub fn from_addresses(addresses: &[Address]) -> Self {
        Self {
            addresses: addresses.iter().map(AddressResource::from).collect(),
            primary_address: addresses
                .iter()
                .find(|address| address.is_primary)
                .map(AddressResource::from),
        }
    }
}

fn iso8601_from_millis(epoch_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|value| value.to_rfc3339_opts(SecondsFormat::Secs, false))
}

#[cfg(test)]
mod tests {
    use super::{iso8601_from_millis, AddressCollection, AddressResource, ParentAddresses};
    use crate::model::address::Address;
    use crate::model::parent::ParentRef;
    use serde_json::json;

    fn address(id: i64, kind: &str, is_primary: bool) -> Address {
        Address {
            id,
            parent: ParentRef::new("facility", 1),
            kind: kind.to_string(),
            is_primary,
            address_line_1: "123 Main St".to_string(),
            address_line_2: None,
            city: "Springfield".to_string(),
            state: Some("IL".to_string()),
            postal_code: None,
            country_code: "US".to_string(),
            latitude: Some(39.7817),
            longitude: None,
            metadata: None,
            created_at: 1_735_732_800_000,
            updated_at: 1_735_732_800_000,
        }
    }

    #[test]
    fn timestamps_render_as_iso8601_utc() {
        assert_eq!(
            iso8601_from_millis(1_735_732_800_000).as_deref(),
            Some("2025-01-01T12:00:00+00:00")
        );
    }

    #[test]
    fn resource_serializes_expected_wire_fields() {
        let value = serde_json::to_value(AddressResource::from(address(5, "work", true))).unwrap();
        assert_eq!(value["id"], 5);
        assert_eq!(value["type"], "work");
        assert_eq!(value["is_primary"], true);
        assert_eq!(value["full_address"], "123 Main St, Springfield, IL, US");
        assert_eq!(value["latitude"], json!(39.7817));
        assert_eq!(value["longitude"], json!(null));
        assert_eq!(value["created_at"], "2025-01-01T12:00:00+00:00");
        assert!(value.get("addressable_type").is_none());
    }

    #[test]
    fn collection_wraps_items_in_data() {
        let collection: AddressCollection = vec![address(1, "home", false)].into_iter().collect();
        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["data"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn parent_projection_picks_primary() {
        let list = vec![address(1, "home", false), address(2, "work", true)];
        let projection = ParentAddresses::from_addresses(&list);
        assert_eq!(projection.addresses.len(), 2);
        assert_eq!(projection.primary_address.map(|item| item.id), Some(2));

        let none = ParentAddresses::from_addresses(&list[..1]);
        assert!(none.primary_address.is_none());
    }
}
