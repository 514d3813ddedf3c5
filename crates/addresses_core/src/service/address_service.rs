//! Address use-case service.
//!
//! # Responsibility
//! - Provide store/update/delete/list/sync entry points over a repository.
//! - Maintain the single-primary invariant per parent.
//!
//! # Invariants
//! - Every multi-step write runs inside one `AddressRepository::atomically`
//!   section; clearing the old primary and writing the new one commit
//!   together.
//! - `sync` with an empty item list deletes every address of the parent.
//!   Callers that treat an empty list as "no change" must short-circuit
//!   before calling it (see `AddressManager::attach_addresses`).

use crate::model::address::{Address, AddressId};
use crate::model::parent::ParentRef;
use crate::model::payload::{AddressPayload, SyncItem};
use crate::repo::address_repo::{AddressRepository, RepoResult};
use log::{debug, info};

/// Use-case service over an address repository.
pub struct AddressService<R: AddressRepository> {
    repo: R,
}

impl<R: AddressRepository> AddressService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an address for `parent`.
    ///
    /// When the payload is primary, every existing primary of the parent is
    /// cleared first, in the same transaction.
    pub fn store(&self, parent: &ParentRef, payload: &AddressPayload) -> RepoResult<Address> {
        self.repo.atomically(|| self.store_locked(parent, payload))
    }

    /// Overwrites `address` with `payload`.
    ///
    /// Promoting a non-primary address clears the parent's current primary
    /// first. Updating an already-primary address, or sending
    /// `is_primary = false`, clears nothing else.
    pub fn update(&self, address: &Address, payload: &AddressPayload) -> RepoResult<Address> {
        self.repo.atomically(|| self.update_locked(address, payload))
    }

    /// Deletes `address`. Returns whether a row was removed.
    pub fn delete(&self, address: &Address) -> RepoResult<bool> {
        let removed = self.repo.delete(address)?;
        debug!(
            "event=address_delete module=service status=ok address_id={} removed={}",
            address.id, removed
        );
        Ok(removed)
    }

    /// Looks up an address by id without parent scoping.
    pub fn find(&self, id: AddressId) -> RepoResult<Option<Address>> {
        self.repo.find(id)
    }

    /// Lists addresses of `parent`, primary first, then by type.
    pub fn get_for_parent(&self, parent: &ParentRef) -> RepoResult<Vec<Address>> {
        self.repo.get_for_parent(parent)
    }

    /// Looks up `id` only if it belongs to `parent`.
    pub fn find_for_parent(
        &self,
        id: AddressId,
        parent: &ParentRef,
    ) -> RepoResult<Option<Address>> {
        self.repo.find_for_parent(id, parent)
    }

    pub fn primary_for_parent(&self, parent: &ParentRef) -> RepoResult<Option<Address>> {
        self.repo.primary_for_parent(parent)
    }

    pub fn get_of_type_for_parent(
        &self,
        parent: &ParentRef,
        kind: &str,
    ) -> RepoResult<Vec<Address>> {
        self.repo.get_of_type_for_parent(parent, kind)
    }

    /// Makes `address` the parent's only primary address.
    pub fn mark_as_primary(&self, address: &Address) -> RepoResult<Address> {
        self.repo.atomically(|| {
            let cleared = self.repo.unset_primary_except(&address.parent, address.id)?;
            let marked = self.repo.set_primary(address)?;
            debug!(
                "event=address_mark_primary module=service status=ok parent_type={} parent_id={} address_id={} cleared={}",
                address.parent.kind, address.parent.id, address.id, cleared
            );
            Ok(marked)
        })
    }

    /// Converges the parent's stored addresses to `items`.
    ///
    /// Items whose `id` names an address of this parent update it; all other
    /// items create a new address. Afterwards every address of the parent
    /// not touched by an item is deleted. Returns the parent's addresses in
    /// canonical order.
    pub fn sync(&self, parent: &ParentRef, items: &[SyncItem]) -> RepoResult<Vec<Address>> {
        self.repo.atomically(|| {
            let mut kept: Vec<AddressId> = Vec::with_capacity(items.len());
            let mut updated = 0usize;

            for item in items {
                let existing = match item.id {
                    Some(id) => self.repo.find_for_parent(id, parent)?,
                    None => None,
                };

                let address = match existing {
                    Some(existing) => {
                        updated += 1;
                        self.update_locked(&existing, &item.payload)?
                    }
                    None => self.store_locked(parent, &item.payload)?,
                };
                kept.push(address.id);
            }

            let deleted = self.repo.delete_where_not_in(parent, &kept)?;
            info!(
                "event=address_sync module=service status=ok parent_type={} parent_id={} items={} updated={} created={} deleted={}",
                parent.kind,
                parent.id,
                items.len(),
                updated,
                items.len() - updated,
                deleted
            );

            self.repo.get_for_parent(parent)
        })
    }

    fn store_locked(&self, parent: &ParentRef, payload: &AddressPayload) -> RepoResult<Address> {
        if payload.is_primary {
            let cleared = self.repo.unset_primary_for_parent(parent)?;
            debug!(
                "event=address_primary_clear module=service status=ok parent_type={} parent_id={} cleared={}",
                parent.kind, parent.id, cleared
            );
        }
        self.repo.create(parent, payload)
    }

    fn update_locked(&self, address: &Address, payload: &AddressPayload) -> RepoResult<Address> {
        // Decide from the row as it is now, not from the caller's snapshot.
        let currently_primary = match self.repo.find(address.id)? {
            Some(current) => current.is_primary,
            None => address.is_primary,
        };

        if payload.is_primary && !currently_primary {
            let cleared = self.repo.unset_primary_for_parent(&address.parent)?;
            debug!(
                "event=address_primary_clear module=service status=ok parent_type={} parent_id={} cleared={}",
                address.parent.kind, address.parent.id, cleared
            );
        }
        self.repo.update(address, payload)
    }
}
