//! Address use-case services.
//!
//! # Responsibility
//! - `address_service`: primary-flag invariant and bulk sync over a
//!   repository.
//! - `manager`: request-facing CRUD boundary (validation, not-found
//!   signalling, JSON projections).

pub mod address_service;
pub mod manager;
