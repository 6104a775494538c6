use std::collections::HashMap;
use std::sync::RwLock;

use storefront_core::{DomainError, DomainResult, Entity};

/// In-memory table of entities keyed by their id.
///
/// Backing store for the catalog and basket services. Reads clone rows out so
/// no lock is held past the call.
#[derive(Debug)]
pub struct InMemoryTable<E: Entity> {
    inner: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity> InMemoryTable<E> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Entity> Default for InMemoryTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryTable<E>
where
    E: Entity + Clone,
{
    pub fn get(&self, id: E::Id) -> DomainResult<E> {
        let map = self.inner.read().map_err(|_| poisoned::<E>())?;
        map.get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(E::NAME, id))
    }

    pub fn contains(&self, id: E::Id) -> bool {
        self.inner
            .read()
            .map(|map| map.contains_key(&id))
            .unwrap_or(false)
    }

    /// Insert a new row; `Conflict` if the id is taken.
    pub fn insert(&self, entity: E) -> DomainResult<E> {
        let mut map = self.inner.write().map_err(|_| poisoned::<E>())?;
        let id = entity.id();
        if map.contains_key(&id) {
            return Err(DomainError::conflict(format!("{} {id} already exists", E::NAME)));
        }
        map.insert(id, entity.clone());
        Ok(entity)
    }

    pub fn upsert(&self, entity: E) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned::<E>())?;
        map.insert(entity.id(), entity);
        Ok(())
    }

    /// Mutate a row in place; `f` may reject the change.
    pub fn update<R>(
        &self,
        id: E::Id,
        f: impl FnOnce(&mut E) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let mut map = self.inner.write().map_err(|_| poisoned::<E>())?;
        let row = map
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(E::NAME, id))?;
        f(row)
    }

    /// Like [`Self::update`], starting from `default()` when the row is missing.
    /// A new row is only stored when `f` succeeds.
    pub fn update_or_insert<R>(
        &self,
        id: E::Id,
        default: impl FnOnce() -> E,
        f: impl FnOnce(&mut E) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let mut map = self.inner.write().map_err(|_| poisoned::<E>())?;
        if let Some(row) = map.get_mut(&id) {
            return f(row);
        }
        let mut row = default();
        let result = f(&mut row)?;
        map.insert(id, row);
        Ok(result)
    }

    /// Return the first row matching `existing`, or insert `make()` when none
    /// does. The flag is `true` when a row was inserted.
    pub fn find_or_insert(
        &self,
        existing: impl Fn(&E) -> bool,
        make: impl FnOnce() -> E,
    ) -> DomainResult<(E, bool)> {
        let mut map = self.inner.write().map_err(|_| poisoned::<E>())?;
        if let Some(row) = map.values().find(|e| existing(e)) {
            return Ok((row.clone(), false));
        }
        let row = make();
        map.insert(row.id(), row.clone());
        Ok((row, true))
    }

    /// Delete every row matching `predicate` and return them.
    pub fn remove_where(&self, predicate: impl Fn(&E) -> bool) -> DomainResult<Vec<E>> {
        let mut map = self.inner.write().map_err(|_| poisoned::<E>())?;
        let ids: Vec<E::Id> = map
            .iter()
            .filter(|(_, e)| predicate(e))
            .map(|(id, _)| *id)
            .collect();
        Ok(ids.into_iter().filter_map(|id| map.remove(&id)).collect())
    }

    pub fn list(&self) -> Vec<E> {
        self.filter(|_| true)
    }

    pub fn filter(&self, predicate: impl Fn(&E) -> bool) -> Vec<E> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        map.values().filter(|e| predicate(e)).cloned().collect()
    }
}

fn poisoned<E: Entity>() -> DomainError {
    DomainError::inconsistency(format!("{} table lock poisoned", E::NAME))
}
