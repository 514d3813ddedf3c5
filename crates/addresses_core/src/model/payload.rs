//! Inbound address payloads.
//!
//! `AddressInput` is the raw, loosely-typed shape a caller submits (one form
//! body, or one element of a bulk `addresses` list). `AddressPayload` is the
//! typed value the service consumes after validation.

use crate::config::AddressConfig;
use crate::model::address::{AddressId, Metadata};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw submitted address fields.
///
/// Every field is optional here; required-ness is checked by
/// [`crate::validate::validate_input`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressInput {
    /// Existing address id. Only meaningful for bulk sync.
    #[serde(default, deserialize_with = "deserialize_integer")]
    pub id: Option<AddressId>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_primary: Option<bool>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub longitude: Option<f64>,
    /// Kept untyped so validation can report non-object values.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Typed address fields written by store/update/sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub is_primary: bool,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub metadata: Option<Metadata>,
}

impl AddressPayload {
    /// Creates a non-primary payload with the required fields set.
    pub fn new(
        kind: impl Into<String>,
        address_line_1: impl Into<String>,
        city: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            is_primary: false,
            address_line_1: address_line_1.into(),
            address_line_2: None,
            city: city.into(),
            state: None,
            postal_code: None,
            country_code: country_code.into(),
            latitude: None,
            longitude: None,
            metadata: None,
        }
    }

    /// Converts a raw input using `config` for defaults.
    ///
    /// A missing `type` resolves to `config.default_type`. Missing required
    /// text fields become empty strings; callers are expected to validate
    /// first.
    pub fn from_input(input: &AddressInput, config: &AddressConfig) -> Self {
        Self {
            kind: input
                .kind
                .clone()
                .unwrap_or_else(|| config.default_type.clone()),
            is_primary: input.is_primary.unwrap_or(false),
            address_line_1: input.address_line_1.clone().unwrap_or_default(),
            address_line_2: input.address_line_2.clone(),
            city: input.city.clone().unwrap_or_default(),
            state: input.state.clone(),
            postal_code: input.postal_code.clone(),
            country_code: input.country_code.clone().unwrap_or_default(),
            latitude: input.latitude,
            longitude: input.longitude,
            metadata: match &input.metadata {
                Some(serde_json::Value::Object(map)) => Some(map.clone()),
                _ => None,
            },
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn with_line_2(mut self, value: impl Into<String>) -> Self {
        self.address_line_2 = Some(value.into());
        self
    }

    pub fn with_region(mut self, state: impl Into<String>, postal_code: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self.postal_code = Some(postal_code.into());
        self
    }

    pub fn with_coordinates(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One element of a sync request: optional existing id plus fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncItem {
    pub id: Option<AddressId>,
    pub payload: AddressPayload,
}

impl SyncItem {
    pub fn new(payload: AddressPayload) -> Self {
        Self { id: None, payload }
    }

    pub fn existing(id: AddressId, payload: AddressPayload) -> Self {
        Self {
            id: Some(id),
            payload,
        }
    }

    /// Converts a raw input, keeping its `id`.
    pub fn from_input(input: &AddressInput, config: &AddressConfig) -> Self {
        Self {
            id: input.id,
            payload: AddressPayload::from_input(input, config),
        }
    }
}

/// Accepts `true`/`false`, `0`/`1`, and `"0"`/`"1"`/`"true"`/`"false"`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    let value = Option::<Flag>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(Flag::Bool(value)) => Ok(Some(value)),
        Some(Flag::Int(0)) => Ok(Some(false)),
        Some(Flag::Int(1)) => Ok(Some(true)),
        Some(Flag::Text(text)) => match text.as_str() {
            "0" | "false" => Ok(Some(false)),
            "1" | "true" => Ok(Some(true)),
            other => Err(serde::de::Error::custom(format!(
                "is_primary must be a boolean, got `{other}`"
            ))),
        },
        Some(Flag::Int(other)) => Err(serde::de::Error::custom(format!(
            "is_primary must be a boolean, got `{other}`"
        ))),
    }
}

/// Accepts integers and integer strings such as `"12"`.
fn deserialize_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Integer {
        Int(i64),
        Text(String),
    }

    match Option::<Integer>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Integer::Int(value)) => Ok(Some(value)),
        Some(Integer::Text(text)) => text.trim().parse().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("expected an integer, got `{text}`"))
        }),
    }
}

/// Accepts numbers and numeric strings such as `"39.78"`.
fn deserialize_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    match Option::<Number>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Number::Float(value)) => Ok(Some(value)),
        Some(Number::Text(text)) => text.trim().parse().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("expected a number, got `{text}`"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressInput, AddressPayload, SyncItem};
    use crate::config::AddressConfig;
    use serde_json::json;

    #[test]
    fn missing_type_falls_back_to_configured_default() {
        let config = AddressConfig {
            default_type: "billing".to_string(),
            ..AddressConfig::default()
        };
        let input = AddressInput {
            address_line_1: Some("1 Loop".to_string()),
            city: Some("Cupertino".to_string()),
            country_code: Some("US".to_string()),
            ..AddressInput::default()
        };

        let payload = AddressPayload::from_input(&input, &config);
        assert_eq!(payload.kind, "billing");
        assert!(!payload.is_primary);
    }

    #[test]
    fn is_primary_accepts_integer_and_string_flags() {
        let input: AddressInput = serde_json::from_value(json!({ "is_primary": 1 })).unwrap();
        assert_eq!(input.is_primary, Some(true));

        let input: AddressInput = serde_json::from_value(json!({ "is_primary": "0" })).unwrap();
        assert_eq!(input.is_primary, Some(false));

        let input: AddressInput = serde_json::from_value(json!({ "is_primary": null })).unwrap();
        assert_eq!(input.is_primary, None);

        assert!(serde_json::from_value::<AddressInput>(json!({ "is_primary": 2 })).is_err());
    }

    #[test]
    fn numeric_fields_accept_numeric_strings() {
        let input: AddressInput = serde_json::from_value(json!({
            "id": "12",
            "latitude": "39.78",
            "longitude": -89.65
        }))
        .unwrap();
        assert_eq!(input.id, Some(12));
        assert_eq!(input.latitude, Some(39.78));
        assert_eq!(input.longitude, Some(-89.65));

        let input: AddressInput =
            serde_json::from_value(json!({ "latitude": 40, "longitude": null })).unwrap();
        assert_eq!(input.latitude, Some(40.0));
        assert_eq!(input.longitude, None);

        assert!(serde_json::from_value::<AddressInput>(json!({ "latitude": "north" })).is_err());
        assert!(serde_json::from_value::<AddressInput>(json!({ "id": "1.5" })).is_err());
    }

    #[test]
    fn non_object_metadata_is_dropped_on_conversion() {
        let input: AddressInput = serde_json::from_value(json!({
            "address_line_1": "a",
            "city": "b",
            "country_code": "US",
            "metadata": [1, 2]
        }))
        .unwrap();
        let payload = AddressPayload::from_input(&input, &AddressConfig::default());
        assert_eq!(payload.metadata, None);
    }

    #[test]
    fn sync_item_keeps_submitted_id() {
        let input: AddressInput = serde_json::from_value(json!({
            "id": 9,
            "address_line_1": "a",
            "city": "b",
            "country_code": "US"
        }))
        .unwrap();
        let item = SyncItem::from_input(&input, &AddressConfig::default());
        assert_eq!(item.id, Some(9));
        assert_eq!(item.payload.kind, "home");
    }
}
