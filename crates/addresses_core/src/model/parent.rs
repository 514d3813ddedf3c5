//! Polymorphic owner reference.
//!
//! One `addresses` table serves many unrelated owner kinds. An owner is
//! identified by a type discriminator plus its key; neither half alone is
//! unique.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// `(type discriminator, key)` pair identifying the owner of an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    /// Owner type discriminator, e.g. `facility` or `App\Models\User`.
    #[serde(rename = "addressable_type")]
    pub kind: String,
    /// Owner key within its type.
    #[serde(rename = "addressable_id")]
    pub id: i64,
}

impl ParentRef {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl Display for ParentRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Any entity that can own addresses.
///
/// Implementors expose a stable type discriminator and key; the store never
/// needs anything else from the owner.
pub trait Addressable {
    /// Stable type discriminator persisted in `addresses.addressable_type`.
    fn morph_class(&self) -> String;

    /// Owner key persisted in `addresses.addressable_id`.
    fn addressable_key(&self) -> i64;

    fn parent_ref(&self) -> ParentRef {
        ParentRef::new(self.morph_class(), self.addressable_key())
    }
}

impl Addressable for ParentRef {
    fn morph_class(&self) -> String {
        self.kind.clone()
    }

    fn addressable_key(&self) -> i64 {
        self.id
    }

    fn parent_ref(&self) -> ParentRef {
        self.clone()
    }
}
