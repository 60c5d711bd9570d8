//! Conversion mapping persistence.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stockflow_core::{Entity, MappingId, StoreId};
use stockflow_inventory::{ConversionMapping, MappingKey};

use super::StoreError;

pub trait MappingStore: Send + Sync {
    /// Active mappings for a canonical key. More than one means corrupt data.
    fn find_active(&self, store_id: StoreId, key: &MappingKey) -> Result<Vec<ConversionMapping>, StoreError>;

    fn get(&self, store_id: StoreId, id: MappingId) -> Result<Option<ConversionMapping>, StoreError>;

    /// Insert a mapping. Fails with `AlreadyExists` when an active mapping
    /// already owns the same key in the same store.
    fn insert(&self, mapping: ConversionMapping) -> Result<(), StoreError>;

    /// Replace an existing mapping. Reactivating one fails with `AlreadyExists`
    /// when another active mapping has taken its key.
    fn update(&self, mapping: ConversionMapping) -> Result<(), StoreError>;

    fn list(&self, store_id: StoreId) -> Result<Vec<ConversionMapping>, StoreError>;
}

impl<S> MappingStore for Arc<S>
where
    S: MappingStore + ?Sized,
{
    fn find_active(&self, store_id: StoreId, key: &MappingKey) -> Result<Vec<ConversionMapping>, StoreError> {
        (**self).find_active(store_id, key)
    }

    fn get(&self, store_id: StoreId, id: MappingId) -> Result<Option<ConversionMapping>, StoreError> {
        (**self).get(store_id, id)
    }

    fn insert(&self, mapping: ConversionMapping) -> Result<(), StoreError> {
        (**self).insert(mapping)
    }

    fn update(&self, mapping: ConversionMapping) -> Result<(), StoreError> {
        (**self).update(mapping)
    }

    fn list(&self, store_id: StoreId) -> Result<Vec<ConversionMapping>, StoreError> {
        (**self).list(store_id)
    }
}

/// In-memory mapping store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    inner: RwLock<HashMap<MappingId, ConversionMapping>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl MappingStore for InMemoryMappingStore {
    fn find_active(&self, store_id: StoreId, key: &MappingKey) -> Result<Vec<ConversionMapping>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned("mapping"))?;
        Ok(map
            .values()
            .filter(|m| m.store_id() == store_id && m.is_active() && m.key() == key)
            .cloned()
            .collect())
    }

    fn get(&self, store_id: StoreId, id: MappingId) -> Result<Option<ConversionMapping>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned("mapping"))?;
        match map.get(&id) {
            Some(m) if m.store_id() == store_id => Ok(Some(m.clone())),
            Some(_) => Err(StoreError::StoreIsolation(format!("mapping {id}"))),
            None => Ok(None),
        }
    }

    fn insert(&self, mapping: ConversionMapping) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned("mapping"))?;
        if map.contains_key(&mapping.id_typed()) {
            return Err(StoreError::AlreadyExists(format!("mapping {}", mapping.id_typed())));
        }
        ensure_key_free(&map, &mapping)?;
        map.insert(*mapping.id(), mapping);
        Ok(())
    }

    fn update(&self, mapping: ConversionMapping) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned("mapping"))?;
        let id = mapping.id_typed();
        match map.get(&id) {
            Some(existing) if existing.store_id() != mapping.store_id() => {
                Err(StoreError::StoreIsolation(format!("mapping {id}")))
            }
            Some(_) => {
                ensure_key_free(&map, &mapping)?;
                map.insert(id, mapping);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("mapping {id}"))),
        }
    }

    fn list(&self, store_id: StoreId) -> Result<Vec<ConversionMapping>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned("mapping"))?;
        Ok(map.values().filter(|m| m.store_id() == store_id).cloned().collect())
    }
}

/// An active mapping may only be stored if no other active mapping owns its key.
fn ensure_key_free(
    map: &HashMap<MappingId, ConversionMapping>,
    mapping: &ConversionMapping,
) -> Result<(), StoreError> {
    if !mapping.is_active() {
        return Ok(());
    }
    let taken = map.values().any(|m| {
        m.id_typed() != mapping.id_typed()
            && m.store_id() == mapping.store_id()
            && m.is_active()
            && m.key() == mapping.key()
    });
    if taken {
        return Err(StoreError::AlreadyExists(format!("active mapping for {}", mapping.key())));
    }
    Ok(())
}
