//! Polymorphic address storage.
//!
//! Attaches address records to any owner identified by a
//! `(type, id)` parent reference, with a single-primary invariant per owner
//! and bulk sync of an owner's full address list.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validate;

pub use config::{AddressConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::address::{Address, AddressId, Metadata};
pub use model::parent::{Addressable, ParentRef};
pub use model::payload::{AddressInput, AddressPayload, SyncItem};
pub use model::resource::{AddressCollection, AddressResource, ParentAddresses};
pub use repo::address_repo::{AddressRepository, RepoError, RepoResult, SqliteAddressRepository};
pub use service::address_service::AddressService;
pub use service::manager::{AddressManager, ManagerError, ManagerResult};
pub use validate::{
    check_batch_ids, validate_batch, validate_input, FieldError, FieldRule, ValidationErrors,
    DEFAULT_LIST_KEY,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
