//! Address domain model.
//!
//! # Responsibility
//! - Define the stored `Address` record and its derived fields.
//! - Define the polymorphic owner reference (`ParentRef`, `Addressable`).
//! - Define inbound payloads and outbound projections.
//!
//! # Invariants
//! - Every address belongs to exactly one parent reference.
//! - At most one address per parent carries `is_primary = true`.

pub mod address;
pub mod parent;
pub mod payload;
pub mod resource;
