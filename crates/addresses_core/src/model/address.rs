//! Stored address record.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - `address_line_1`, `city` and `country_code` are non-empty for rows
//!   written through validated entry points.
//! - `latitude` and `longitude` are independently nullable; no joint
//!   presence rule is enforced.

use crate::model::parent::ParentRef;
use serde::{Deserialize, Serialize};

/// Store-assigned address identifier.
pub type AddressId = i64;

/// Free-form key/value metadata attached to an address.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One persisted address row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    /// Owner reference, flattened to `addressable_type` / `addressable_id`.
    #[serde(flatten)]
    pub parent: ParentRef,
    /// Classification label (`home`, `work`, ...). Serialized as `type`.
    #[serde(rename = "type")]
    pub kind: String,
    pub is_primary: bool,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    /// ISO country code, 2 or 3 characters.
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub metadata: Option<Metadata>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Address {
    /// Comma-joined non-empty components: line 1, line 2, city, state,
    /// postal code, country code.
    pub fn full_address(&self) -> String {
        [
            Some(self.address_line_1.as_str()),
            self.address_line_2.as_deref(),
            Some(self.city.as_str()),
            self.state.as_deref(),
            self.postal_code.as_deref(),
            Some(self.country_code.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// True only when both latitude and longitude are set.
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Returns whether this address is owned by `parent`.
    pub fn belongs_to(&self, parent: &ParentRef) -> bool {
        &self.parent == parent
    }
}
