//! Request-facing address CRUD boundary.
//!
//! # Responsibility
//! - Validate raw inputs, convert them with the resolved config, and call
//!   `AddressService`.
//! - Turn scoped-lookup absence into `ManagerError::AddressNotFound`, the
//!   signal a transport maps to "404".
//! - Return JSON projections instead of stored rows.
//!
//! # Invariants
//! - `attach_addresses` with no list, or an empty list, changes nothing.
//! - Bulk item ids must name stored addresses; unknown ids are validation
//!   failures, not new rows.
//! - Inputs are validated before the scoped lookup, so an invalid body is
//!   always reported as a validation failure.
//! - Addresses are only ever reached through their parent; an id owned by
//!   another parent is reported as not found.

use crate::config::AddressConfig;
use crate::model::address::{Address, AddressId};
use crate::model::parent::ParentRef;
use crate::model::payload::{AddressInput, AddressPayload, SyncItem};
use crate::model::resource::{AddressCollection, AddressResource, ParentAddresses};
use crate::repo::address_repo::{AddressRepository, RepoError};
use crate::service::address_service::AddressService;
use crate::validate::{
    check_batch_ids, validate_batch, validate_input, ValidationErrors, DEFAULT_LIST_KEY,
};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors surfaced by the CRUD boundary.
#[derive(Debug)]
pub enum ManagerError {
    /// Input rejected before reaching the service.
    Validation(ValidationErrors),
    /// No address with this id belongs to this parent.
    AddressNotFound { parent: ParentRef, id: AddressId },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::AddressNotFound { parent, id } => {
                write!(f, "address {id} not found for {parent}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ManagerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::AddressNotFound { .. } => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ValidationErrors> for ManagerError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ManagerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// CRUD facade for one parent kind's address endpoints.
pub struct AddressManager<R: AddressRepository> {
    service: AddressService<R>,
    config: AddressConfig,
}

impl<R: AddressRepository> AddressManager<R> {
    pub fn new(service: AddressService<R>, config: AddressConfig) -> Self {
        Self { service, config }
    }

    pub fn service(&self) -> &AddressService<R> {
        &self.service
    }

    pub fn config(&self) -> &AddressConfig {
        &self.config
    }

    /// Bulk-syncs the parent's addresses from a submitted list.
    ///
    /// Returns `None` without touching storage when `inputs` is absent or
    /// empty, so omitting the list never deletes anything.
    pub fn attach_addresses(
        &self,
        parent: &ParentRef,
        inputs: Option<&[AddressInput]>,
    ) -> ManagerResult<Option<AddressCollection>> {
        self.attach_addresses_under(parent, DEFAULT_LIST_KEY, inputs)
    }

    /// Same as [`Self::attach_addresses`] for a list submitted under
    /// `list_key` (e.g. `billing_addresses`); error keys use that prefix.
    pub fn attach_addresses_under(
        &self,
        parent: &ParentRef,
        list_key: &str,
        inputs: Option<&[AddressInput]>,
    ) -> ManagerResult<Option<AddressCollection>> {
        let inputs = match inputs {
            Some(inputs) if !inputs.is_empty() => inputs,
            _ => return Ok(None),
        };

        let mut errors = validate_batch(inputs, &self.config, list_key)
            .err()
            .unwrap_or_default();
        errors.merge(check_batch_ids(inputs, list_key, |id| {
            Ok::<_, RepoError>(self.service.find(id)?.is_some())
        })?);
        if !errors.is_empty() {
            warn!(
                "event=address_attach module=manager status=rejected parent_type={} parent_id={} list_key={} errors={}",
                parent.kind,
                parent.id,
                list_key,
                errors.errors.len()
            );
            return Err(errors.into());
        }

        let items = inputs
            .iter()
            .map(|input| SyncItem::from_input(input, &self.config))
            .collect::<Vec<_>>();
        let addresses = self.service.sync(parent, &items)?;
        Ok(Some(addresses.into_iter().collect()))
    }

    /// Lists the parent's addresses.
    pub fn list_addresses(&self, parent: &ParentRef) -> ManagerResult<AddressCollection> {
        Ok(self.service.get_for_parent(parent)?.into_iter().collect())
    }

    /// Builds the `addresses` + `primary_address` block for a parent's own
    /// projection.
    pub fn parent_addresses(&self, parent: &ParentRef) -> ManagerResult<ParentAddresses> {
        let addresses = self.service.get_for_parent(parent)?;
        Ok(ParentAddresses::from_addresses(&addresses))
    }

    /// Validates and creates one address.
    pub fn store_address(
        &self,
        parent: &ParentRef,
        input: &AddressInput,
    ) -> ManagerResult<AddressResource> {
        let payload = self.checked_payload(input)?;
        let address = self.service.store(parent, &payload)?;
        Ok(AddressResource::from(address))
    }

    /// Validates and overwrites one address of the parent.
    pub fn update_address(
        &self,
        parent: &ParentRef,
        id: AddressId,
        input: &AddressInput,
    ) -> ManagerResult<AddressResource> {
        let payload = self.checked_payload(input)?;
        let address = self.require_address(parent, id)?;
        let address = self.service.update(&address, &payload)?;
        Ok(AddressResource::from(address))
    }

    /// Deletes one address of the parent.
    pub fn delete_address(&self, parent: &ParentRef, id: AddressId) -> ManagerResult<()> {
        let address = self.require_address(parent, id)?;
        self.service.delete(&address)?;
        Ok(())
    }

    fn checked_payload(&self, input: &AddressInput) -> ManagerResult<AddressPayload> {
        validate_input(input, &self.config)?;
        Ok(AddressPayload::from_input(input, &self.config))
    }

    fn require_address(
        &self,
        parent: &ParentRef,
        id: AddressId,
    ) -> ManagerResult<Address> {
        self.service
            .find_for_parent(id, parent)?
            .ok_or_else(|| ManagerError::AddressNotFound {
                parent: parent.clone(),
                id,
            })
    }
}
