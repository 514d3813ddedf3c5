//! Address repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide single-table reads/writes scoped by parent reference.
//! - Provide a serialized critical section (`atomically`) for multi-step
//!   writes such as primary re-assignment and sync.
//!
//! # Invariants
//! - `get_for_parent` order is `is_primary DESC, type ASC, id ASC`.
//! - `unset_primary_for_parent` only touches rows that are currently primary.
//! - Read paths reject malformed persisted rows instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::address::{Address, AddressId, Metadata};
use crate::model::parent::ParentRef;
use crate::model::payload::AddressPayload;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ADDRESS_SELECT_SQL: &str = "SELECT
    id,
    addressable_type,
    addressable_id,
    type,
    is_primary,
    address_line_1,
    address_line_2,
    city,
    state,
    postal_code,
    country_code,
    latitude,
    longitude,
    metadata,
    created_at,
    updated_at
FROM addresses";

const PARENT_ORDER_SQL: &str = "ORDER BY is_primary DESC, type ASC, id ASC";

const NOW_MS_SQL: &str = "(CAST(strftime('%s', 'now') AS INTEGER) * 1000)";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "addressable_type",
    "addressable_id",
    "type",
    "is_primary",
    "address_line_1",
    "address_line_2",
    "city",
    "state",
    "postal_code",
    "country_code",
    "latitude",
    "longitude",
    "metadata",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from address persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// A write targeted a row that no longer exists.
    NotFound(AddressId),
    /// Persisted data cannot be converted to an `Address`.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "address not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted address data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "address repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "address repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "address repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for addresses.
pub trait AddressRepository {
    /// Runs `work` inside one serialized write transaction.
    ///
    /// Commits when `work` returns `Ok`, rolls back otherwise. When a
    /// transaction is already open on the same connection, `work` joins it.
    fn atomically<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce() -> RepoResult<T>;

    /// Looks up an address by id alone, without parent scoping.
    fn find(&self, id: AddressId) -> RepoResult<Option<Address>>;
    /// Inserts a row owned by `parent`; the store assigns id and timestamps.
    fn create(&self, parent: &ParentRef, fields: &AddressPayload) -> RepoResult<Address>;
    /// Overwrites every payload field and returns the refreshed row.
    fn update(&self, address: &Address, fields: &AddressPayload) -> RepoResult<Address>;
    /// Removes the row. Returns whether a row was removed.
    fn delete(&self, address: &Address) -> RepoResult<bool>;
    /// Lists every address of `parent` in canonical order.
    fn get_for_parent(&self, parent: &ParentRef) -> RepoResult<Vec<Address>>;
    /// Looks up `id` only if it belongs to `parent`.
    fn find_for_parent(&self, id: AddressId, parent: &ParentRef) -> RepoResult<Option<Address>>;
    /// Returns the primary address of `parent`, if any.
    fn primary_for_parent(&self, parent: &ParentRef) -> RepoResult<Option<Address>>;
    /// Lists addresses of `parent` with classification `kind`.
    fn get_of_type_for_parent(&self, parent: &ParentRef, kind: &str)
        -> RepoResult<Vec<Address>>;
    /// Clears the primary flag on every row of `parent`. Returns rows changed.
    fn unset_primary_for_parent(&self, parent: &ParentRef) -> RepoResult<usize>;
    /// Clears the primary flag on every row of `parent` except `keep`.
    fn unset_primary_except(&self, parent: &ParentRef, keep: AddressId) -> RepoResult<usize>;
    /// Sets the primary flag on one row and returns it refreshed.
    fn set_primary(&self, address: &Address) -> RepoResult<Address>;
    /// Deletes rows of `parent` whose id is not in `ids`. Returns rows removed.
    ///
    /// An empty `ids` deletes every row of `parent`.
    fn delete_where_not_in(&self, parent: &ParentRef, ids: &[AddressId]) -> RepoResult<usize>;
}

/// SQLite-backed address repository.
pub struct SqliteAddressRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAddressRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_address_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: AddressId) -> RepoResult<Address> {
        self.find(id)?.ok_or(RepoError::NotFound(id))
    }

    fn query_addresses(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Address>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut addresses = Vec::new();
        while let Some(row) = rows.next()? {
            addresses.push(parse_address_row(row)?);
        }
        Ok(addresses)
    }
}

impl AddressRepository for SqliteAddressRepository<'_> {
    fn atomically<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce() -> RepoResult<T>,
    {
        if !self.conn.is_autocommit() {
            return work();
        }

        // IMMEDIATE takes the write lock up front, so two connections cannot
        // both read "no primary" and then both write one.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let value = work()?;
        tx.commit()?;
        Ok(value)
    }

    fn find(&self, id: AddressId) -> RepoResult<Option<Address>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ADDRESS_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_address_row(row)?));
        }
        Ok(None)
    }

    fn create(&self, parent: &ParentRef, fields: &AddressPayload) -> RepoResult<Address> {
        let metadata = encode_metadata(fields.metadata.as_ref())?;
        self.conn.execute(
            &format!(
                "INSERT INTO addresses (
                    addressable_type,
                    addressable_id,
                    type,
                    is_primary,
                    address_line_1,
                    address_line_2,
                    city,
                    state,
                    postal_code,
                    country_code,
                    latitude,
                    longitude,
                    metadata,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, {NOW_MS_SQL}, {NOW_MS_SQL});"
            ),
            params![
                parent.kind.as_str(),
                parent.id,
                fields.kind.as_str(),
                bool_to_int(fields.is_primary),
                fields.address_line_1.as_str(),
                fields.address_line_2.as_deref(),
                fields.city.as_str(),
                fields.state.as_deref(),
                fields.postal_code.as_deref(),
                fields.country_code.as_str(),
                fields.latitude,
                fields.longitude,
                metadata,
            ],
        )?;

        self.load_required(self.conn.last_insert_rowid())
    }

    fn update(&self, address: &Address, fields: &AddressPayload) -> RepoResult<Address> {
        let metadata = encode_metadata(fields.metadata.as_ref())?;
        let changed = self.conn.execute(
            &format!(
                "UPDATE addresses
                 SET
                    type = ?2,
                    is_primary = ?3,
                    address_line_1 = ?4,
                    address_line_2 = ?5,
                    city = ?6,
                    state = ?7,
                    postal_code = ?8,
                    country_code = ?9,
                    latitude = ?10,
                    longitude = ?11,
                    metadata = ?12,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![
                address.id,
                fields.kind.as_str(),
                bool_to_int(fields.is_primary),
                fields.address_line_1.as_str(),
                fields.address_line_2.as_deref(),
                fields.city.as_str(),
                fields.state.as_deref(),
                fields.postal_code.as_deref(),
                fields.country_code.as_str(),
                fields.latitude,
                fields.longitude,
                metadata,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(address.id));
        }

        self.load_required(address.id)
    }

    fn delete(&self, address: &Address) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM addresses WHERE id = ?1;", [address.id])?;
        Ok(changed > 0)
    }

    fn get_for_parent(&self, parent: &ParentRef) -> RepoResult<Vec<Address>> {
        self.query_addresses(
            &format!(
                "{ADDRESS_SELECT_SQL}
                 WHERE addressable_type = ?1
                   AND addressable_id = ?2
                 {PARENT_ORDER_SQL};"
            ),
            parent_bind_values(parent),
        )
    }

    fn find_for_parent(&self, id: AddressId, parent: &ParentRef) -> RepoResult<Option<Address>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ADDRESS_SELECT_SQL}
             WHERE id = ?1
               AND addressable_type = ?2
               AND addressable_id = ?3;"
        ))?;
        let mut rows = stmt.query(params![id, parent.kind.as_str(), parent.id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_address_row(row)?));
        }
        Ok(None)
    }

    fn primary_for_parent(&self, parent: &ParentRef) -> RepoResult<Option<Address>> {
        let mut found = self.query_addresses(
            &format!(
                "{ADDRESS_SELECT_SQL}
                 WHERE addressable_type = ?1
                   AND addressable_id = ?2
                   AND is_primary = 1
                 ORDER BY id ASC
                 LIMIT 1;"
            ),
            parent_bind_values(parent),
        )?;
        Ok(found.pop())
    }

    fn get_of_type_for_parent(
        &self,
        parent: &ParentRef,
        kind: &str,
    ) -> RepoResult<Vec<Address>> {
        let mut bind_values = parent_bind_values(parent);
        bind_values.push(Value::Text(kind.to_string()));
        self.query_addresses(
            &format!(
                "{ADDRESS_SELECT_SQL}
                 WHERE addressable_type = ?1
                   AND addressable_id = ?2
                   AND type = ?3
                 {PARENT_ORDER_SQL};"
            ),
            bind_values,
        )
    }

    fn unset_primary_for_parent(&self, parent: &ParentRef) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE addresses
                 SET is_primary = 0,
                     updated_at = {NOW_MS_SQL}
                 WHERE addressable_type = ?1
                   AND addressable_id = ?2
                   AND is_primary = 1;"
            ),
            params![parent.kind.as_str(), parent.id],
        )?;
        Ok(changed)
    }

    fn unset_primary_except(&self, parent: &ParentRef, keep: AddressId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE addresses
                 SET is_primary = 0,
                     updated_at = {NOW_MS_SQL}
                 WHERE addressable_type = ?1
                   AND addressable_id = ?2
                   AND id != ?3
                   AND is_primary = 1;"
            ),
            params![parent.kind.as_str(), parent.id, keep],
        )?;
        Ok(changed)
    }

    fn set_primary(&self, address: &Address) -> RepoResult<Address> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE addresses
                 SET is_primary = 1,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            [address.id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(address.id));
        }
        self.load_required(address.id)
    }

    fn delete_where_not_in(&self, parent: &ParentRef, ids: &[AddressId]) -> RepoResult<usize> {
        if ids.is_empty() {
            let changed = self.conn.execute(
                "DELETE FROM addresses
                 WHERE addressable_type = ?1
                   AND addressable_id = ?2;",
                params![parent.kind.as_str(), parent.id],
            )?;
            return Ok(changed);
        }

        // One JSON array parameter keeps the statement under SQLite's
        // bind-variable limit for any kept-set size.
        let kept = serde_json::to_string(ids)
            .map_err(|err| RepoError::InvalidData(format!("kept ids cannot be encoded: {err}")))?;
        let changed = self.conn.execute(
            "DELETE FROM addresses
             WHERE addressable_type = ?1
               AND addressable_id = ?2
               AND id NOT IN (SELECT value FROM json_each(?3));",
            params![parent.kind.as_str(), parent.id, kept],
        )?;
        Ok(changed)
    }
}

fn parent_bind_values(parent: &ParentRef) -> Vec<Value> {
    vec![Value::Text(parent.kind.clone()), Value::Integer(parent.id)]
}

fn parse_address_row(row: &Row<'_>) -> RepoResult<Address> {
    let id: AddressId = row.get("id")?;

    let is_primary = match row.get::<_, i64>("is_primary")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_primary value `{other}` in addresses.is_primary (id {id})"
            )));
        }
    };

    let metadata = match row.get::<_, Option<String>>("metadata")? {
        Some(raw) => Some(decode_metadata(&raw).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "addresses.metadata is not a JSON object (id {id})"
            ))
        })?),
        None => None,
    };

    Ok(Address {
        id,
        parent: ParentRef {
            kind: row.get("addressable_type")?,
            id: row.get("addressable_id")?,
        },
        kind: row.get("type")?,
        is_primary,
        address_line_1: row.get("address_line_1")?,
        address_line_2: row.get("address_line_2")?,
        city: row.get("city")?,
        state: row.get("state")?,
        postal_code: row.get("postal_code")?,
        country_code: row.get("country_code")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        metadata,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn encode_metadata(metadata: Option<&Metadata>) -> RepoResult<Option<String>> {
    metadata
        .map(|map| {
            serde_json::to_string(map).map_err(|err| {
                RepoError::InvalidData(format!("metadata cannot be encoded: {err}"))
            })
        })
        .transpose()
}

fn decode_metadata(raw: &str) -> Option<Metadata> {
    match serde_json::from_str::<serde_json::Value>(raw).ok()? {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_address_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "addresses")? {
        return Err(RepoError::MissingRequiredTable("addresses"));
    }

    let columns = table_columns(conn, "addresses")?;
    for &column in REQUIRED_COLUMNS {
        if !columns.iter().any(|current| current == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "addresses",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}
