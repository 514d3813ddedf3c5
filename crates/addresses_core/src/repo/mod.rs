//! Repository layer for address persistence.
//!
//! # Responsibility
//! - Define the storage contract the service layer is written against.
//! - Keep SQL details behind that contract.
//!
//! # Invariants
//! - Every parent-scoped query filters on both `addressable_type` and
//!   `addressable_id`.
//! - Scoped lookups report absence as `None`, never as an error.

pub mod address_repo;
