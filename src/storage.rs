//! Indexed entity store over Sled.
//!
//! Every resource type implements [`Entity`] and owns a small family of trees:
//! - `<collection>`: id -> JSON record
//! - `<collection>/index`: big-endian sequence -> id (insertion order for `list`)
//! - `<collection>/position`: id -> sequence (reverse of the index)
//! - `<collection>/by_tenant`: tenant id + NUL + sequence -> id
//! - `<collection>/by_<key>`: lookup value -> id (tenant slug, user email)
//!
//! Seed markers live in the shared `_meta` tree so seeding survives restarts.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sled::{Db, IVec, Tree};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// A typed record bound to a named collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the collection (and of its Sled tree).
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// State returned by [`Storage::get`] for an id that was never written.
    fn initial_state(id: &str) -> Self;

    /// Owning tenant, for tenant-scoped collections.
    fn tenant_id(&self) -> Option<&str> {
        None
    }

    /// Secondary lookup keys as `(key name, value)` pairs.
    fn lookup_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Static rows written once by [`Storage::ensure_seed`].
    fn seed() -> Vec<Self> {
        Vec::new()
    }
}

/// Result of a list operation; serializes as `{"items": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResult<T> {
    pub items: Vec<T>,
}

impl<T> ListResult<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone)] // Sled handles are cheap to clone and thread-safe
pub struct Storage {
    db: Db,
    meta: Tree,
}

impl Storage {
    /// Open or create the Sled database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory database removed on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let meta = db.open_tree("_meta")?;
        Ok(Self { db, meta })
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn records<E: Entity>(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree(E::COLLECTION)?)
    }

    fn index<E: Entity>(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree(format!("{}/index", E::COLLECTION))?)
    }

    fn positions<E: Entity>(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree(format!("{}/position", E::COLLECTION))?)
    }

    fn by_tenant<E: Entity>(&self) -> StoreResult<Tree> {
        Ok(self.db.open_tree(format!("{}/by_tenant", E::COLLECTION))?)
    }

    fn lookup<E: Entity>(&self, key: &str) -> StoreResult<Tree> {
        Ok(self.db.open_tree(format!("{}/by_{}", E::COLLECTION, key))?)
    }

    /// Stored record, or the type's initial state when absent.
    pub fn get<E: Entity>(&self, id: &str) -> StoreResult<E> {
        Ok(self.find(id)?.unwrap_or_else(|| E::initial_state(id)))
    }

    pub fn find<E: Entity>(&self, id: &str) -> StoreResult<Option<E>> {
        self.records::<E>()?
            .get(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn exists<E: Entity>(&self, id: &str) -> StoreResult<bool> {
        Ok(self.records::<E>()?.contains_key(id.as_bytes())?)
    }

    /// Every indexed record in insertion order.
    pub fn list<E: Entity>(&self) -> StoreResult<ListResult<E>> {
        let records = self.records::<E>()?;
        let mut items = Vec::new();
        for entry in self.index::<E>()?.iter() {
            let (_, id) = entry?;
            if let Some(bytes) = records.get(&id)? {
                items.push(decode(&bytes)?);
            }
        }
        Ok(ListResult { items })
    }

    /// Records owned by one tenant, in insertion order, via the tenant prefix index.
    pub fn list_for_tenant<E: Entity>(&self, tenant_id: &str) -> StoreResult<ListResult<E>> {
        let records = self.records::<E>()?;
        let mut items = Vec::new();
        for entry in self.by_tenant::<E>()?.scan_prefix(tenant_prefix(tenant_id)) {
            let (_, id) = entry?;
            if let Some(bytes) = records.get(&id)? {
                items.push(decode(&bytes)?);
            }
        }
        Ok(ListResult { items })
    }

    /// Write the record under its id. An existing record is overwritten and
    /// keeps its original index position.
    ///
    /// Lookup keys are claimed before the write; a key owned by another record
    /// fails with [`StoreError::Conflict`] and nothing is written.
    pub fn create<E: Entity>(&self, record: &E) -> StoreResult<()> {
        let claimed = self.claim_lookup_keys(record)?;
        let previous = match self.write_record(record) {
            Ok(previous) => previous,
            Err(err) => {
                release_claims(claimed, record.id())?;
                return Err(err);
            }
        };

        let previous: Option<E> = previous.map(|bytes| decode(&bytes)).transpose()?;
        self.reindex(previous.as_ref(), record)?;
        debug!(
            collection = E::COLLECTION,
            id = record.id(),
            overwrite = previous.is_some(),
            "Record written"
        );
        Ok(())
    }

    fn write_record<E: Entity>(&self, record: &E) -> StoreResult<Option<IVec>> {
        let bytes = serde_json::to_vec(record)?;
        Ok(self.records::<E>()?.insert(record.id().as_bytes(), bytes)?)
    }

    /// Point every lookup key of `record` at its id with compare-and-swap.
    /// Returns only the keys this call claimed; keys the id already owns are skipped.
    fn claim_lookup_keys<E: Entity>(&self, record: &E) -> StoreResult<Vec<Claim>> {
        let id = record.id().as_bytes();
        let mut claimed = Vec::new();

        for (key, value) in record.lookup_keys() {
            let tree = self.lookup::<E>(key)?;
            match tree.compare_and_swap(value.as_bytes(), None as Option<&[u8]>, Some(id))? {
                Ok(()) => claimed.push(Claim { key, value, tree }),
                Err(cas) if cas.current.as_deref() == Some(id) => {}
                Err(_) => {
                    release_claims(claimed, record.id())?;
                    return Err(StoreError::Conflict {
                        collection: E::COLLECTION,
                        key,
                        value,
                    });
                }
            }
        }
        Ok(claimed)
    }

    /// Resolve a record through one of its lookup keys.
    pub fn find_by<E: Entity>(&self, key: &'static str, value: &str) -> StoreResult<Option<E>> {
        match self.lookup::<E>(key)?.get(value.as_bytes())? {
            Some(id) => self.find(&String::from_utf8_lossy(&id)),
            None => Ok(None),
        }
    }

    /// Apply `apply` to the current record with a compare-and-swap loop.
    ///
    /// Returns `Ok(None)` when the record does not exist. `apply` may run more
    /// than once if another writer races it, and may reject with its own error.
    pub fn update<E, F, Err>(&self, id: &str, mut apply: F) -> Result<Option<E>, Err>
    where
        E: Entity,
        F: FnMut(E) -> Result<E, Err>,
        Err: From<StoreError>,
    {
        let records = self.records::<E>()?;
        loop {
            let Some(current_bytes) = records.get(id.as_bytes()).map_err(StoreError::from)? else {
                return Ok(None);
            };
            let current: E = decode(&current_bytes)?;
            let next = apply(current.clone())?;
            if next.id() != id {
                return Err(StoreError::IdChanged {
                    collection: E::COLLECTION,
                    id: id.to_string(),
                }
                .into());
            }
            let claimed = self.claim_lookup_keys(&next)?;

            let swapped = serde_json::to_vec(&next)
                .map_err(StoreError::from)
                .and_then(|next_bytes| {
                    Ok(records.compare_and_swap(
                        id.as_bytes(),
                        Some(&current_bytes),
                        Some(next_bytes),
                    )?)
                });
            match swapped {
                Ok(Ok(())) => {
                    self.reindex(Some(&current), &next)?;
                    return Ok(Some(next));
                }
                Ok(Err(cas)) => {
                    // Keys the winning write also uses stay claimed
                    let kept = match cas.current {
                        Some(bytes) => decode::<E>(&bytes)?.lookup_keys(),
                        None => Vec::new(),
                    };
                    let stale = claimed
                        .into_iter()
                        .filter(|claim| {
                            !kept
                                .iter()
                                .any(|(k, v)| *k == claim.key && *v == claim.value)
                        })
                        .collect();
                    release_claims(stale, id)?;
                    debug!(collection = E::COLLECTION, id, "Concurrent write, retrying update");
                }
                Err(err) => {
                    release_claims(claimed, id)?;
                    return Err(err.into());
                }
            }
        }
    }

    /// Shallow-merge the top-level fields of `partial` into the stored record.
    /// `id` is never changed. An absent record is merged onto its initial state.
    pub fn patch<E: Entity>(&self, id: &str, partial: &Value) -> StoreResult<E> {
        let Some(fields) = partial.as_object() else {
            return Err(StoreError::InvalidPatch {
                collection: E::COLLECTION,
                id: id.to_string(),
            });
        };

        if !self.exists::<E>(id)? {
            self.insert_initial::<E>(id)?;
        }

        self.update::<E, _, StoreError>(id, |current| merge_patch(current, fields))?
            .ok_or_else(|| StoreError::Missing {
                collection: E::COLLECTION,
                id: id.to_string(),
            })
    }

    /// Remove a record and all of its index entries.
    pub fn delete<E: Entity>(&self, id: &str) -> StoreResult<bool> {
        let Some(bytes) = self.records::<E>()?.remove(id.as_bytes())? else {
            return Ok(false);
        };
        let removed: E = decode(&bytes)?;

        if let Some(seq_bytes) = self.positions::<E>()?.remove(id.as_bytes())? {
            self.index::<E>()?.remove(&seq_bytes)?;
            if let (Some(tenant_id), Some(seq)) = (removed.tenant_id(), decode_seq(&seq_bytes)) {
                self.by_tenant::<E>()?.remove(tenant_key(tenant_id, seq))?;
            }
        }
        for (key, value) in removed.lookup_keys() {
            self.release_lookup::<E>(key, &value, id)?;
        }

        debug!(collection = E::COLLECTION, id, "Record deleted");
        Ok(true)
    }

    /// Write the collection's seed rows once. The marker is persisted, so a
    /// reopened database is not re-seeded; existing rows are never overwritten.
    pub fn ensure_seed<E: Entity>(&self) -> StoreResult<bool> {
        if self.is_seeded::<E>()? {
            return Ok(false);
        }

        let mut written = 0usize;
        for row in E::seed() {
            if !self.exists::<E>(row.id())? {
                self.create(&row)?;
                written += 1;
            }
        }

        let stamp = chrono::Utc::now().to_rfc3339();
        self.meta.insert(seed_marker::<E>().as_bytes(), stamp.as_bytes())?;
        info!(collection = E::COLLECTION, written, "Seed data initialized");
        Ok(true)
    }

    pub fn is_seeded<E: Entity>(&self) -> StoreResult<bool> {
        Ok(self.meta.contains_key(seed_marker::<E>().as_bytes())?)
    }

    fn position_of<E: Entity>(&self, id: &str) -> StoreResult<Option<u64>> {
        Ok(self
            .positions::<E>()?
            .get(id.as_bytes())?
            .and_then(|bytes| decode_seq(&bytes)))
    }

    /// Bring the index, tenant index and lookup trees in line with `current`.
    fn reindex<E: Entity>(&self, previous: Option<&E>, current: &E) -> StoreResult<()> {
        let id = current.id();

        let seq = match self.position_of::<E>(id)? {
            Some(seq) => seq,
            None => self.claim_position::<E>(id)?,
        };

        let by_tenant = self.by_tenant::<E>()?;
        if let Some(old_tenant) = previous.and_then(|p| p.tenant_id()) {
            if current.tenant_id() != Some(old_tenant) {
                by_tenant.remove(tenant_key(old_tenant, seq))?;
            }
        }
        if let Some(tenant_id) = current.tenant_id() {
            by_tenant.insert(tenant_key(tenant_id, seq), id.as_bytes())?;
        }

        // Current keys were claimed before the write; only stale ones remain
        let current_keys = current.lookup_keys();
        if let Some(previous) = previous {
            for (key, value) in previous.lookup_keys() {
                if !current_keys.iter().any(|(k, v)| *k == key && *v == value) {
                    self.release_lookup::<E>(key, &value, id)?;
                }
            }
        }

        Ok(())
    }

    /// Give `id` an index position. Concurrent writers of the same id agree on
    /// the first position stored; a losing sequence number is discarded.
    fn claim_position<E: Entity>(&self, id: &str) -> StoreResult<u64> {
        let seq = self.db.generate_id()?;
        let claimed = self.positions::<E>()?.compare_and_swap(
            id.as_bytes(),
            None as Option<&[u8]>,
            Some(seq.to_be_bytes().to_vec()),
        )?;
        match claimed {
            Ok(()) => {
                self.index::<E>()?
                    .insert(seq.to_be_bytes().to_vec(), id.as_bytes())?;
                Ok(seq)
            }
            Err(cas) => cas
                .current
                .as_deref()
                .and_then(decode_seq)
                .ok_or_else(|| StoreError::Missing {
                    collection: E::COLLECTION,
                    id: id.to_string(),
                }),
        }
    }

    /// Write the initial state unless another writer got there first.
    fn insert_initial<E: Entity>(&self, id: &str) -> StoreResult<()> {
        let initial = E::initial_state(id);
        let bytes = serde_json::to_vec(&initial)?;
        let claimed = self.claim_lookup_keys(&initial)?;
        let inserted = self.records::<E>()?.compare_and_swap(
            id.as_bytes(),
            None as Option<&[u8]>,
            Some(bytes),
        )?;
        match inserted {
            Ok(()) => self.reindex(None, &initial),
            Err(_) => release_claims(claimed, id),
        }
    }

    /// Drop a lookup entry only if it still points at `id`.
    fn release_lookup<E: Entity>(&self, key: &str, value: &str, id: &str) -> StoreResult<()> {
        let _ = self.lookup::<E>(key)?.compare_and_swap(
            value.as_bytes(),
            Some(id.as_bytes()),
            None as Option<&[u8]>,
        )?;
        Ok(())
    }
}

/// A lookup entry claimed by the current write.
struct Claim {
    key: &'static str,
    value: String,
    tree: Tree,
}

/// Undo claims of a write that did not land. Entries already repointed elsewhere are left alone.
fn release_claims(claimed: Vec<Claim>, id: &str) -> StoreResult<()> {
    for claim in claimed {
        let _ = claim.tree.compare_and_swap(
            claim.value.as_bytes(),
            Some(id.as_bytes()),
            None as Option<&[u8]>,
        )?;
    }
    Ok(())
}

fn decode<E: DeserializeOwned>(bytes: &[u8]) -> StoreResult<E> {
    Ok(serde_json::from_slice(bytes)?)
}

fn decode_seq(bytes: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
}

fn seed_marker<E: Entity>() -> String {
    format!("seeded/{}", E::COLLECTION)
}

fn tenant_prefix(tenant_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(tenant_id.len() + 1);
    prefix.extend_from_slice(tenant_id.as_bytes());
    prefix.push(0);
    prefix
}

fn tenant_key(tenant_id: &str, seq: u64) -> Vec<u8> {
    let mut key = tenant_prefix(tenant_id);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// Shallow-merge `fields` onto `current`. The `id` field is never replaced.
pub fn merge_patch<E: Entity>(current: E, fields: &Map<String, Value>) -> StoreResult<E> {
    let mut value = serde_json::to_value(&current)?;
    if let Value::Object(map) = &mut value {
        for (field, new_value) in fields {
            if field != "id" {
                map.insert(field.clone(), new_value.clone());
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}
