use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::RotatorError;
use crate::facts::{ContentItem, ItemId};
use crate::used::UsedStore;

/// Hands out pool items without repeats until the pool is exhausted, then
/// starts a fresh cycle. Every selection is flushed to the store before it
/// is returned.
///
/// Not safe to share between processes. Within one process, concurrent
/// callers must wrap the rotator in a mutex.
pub struct ContentRotator {
    pool: Vec<ContentItem>,
    used: HashSet<ItemId>,
    store: Box<dyn UsedStore>,
    rng: StdRng,
}

impl ContentRotator {
    pub fn load(
        pool: Vec<ContentItem>,
        store: Box<dyn UsedStore>,
        rng: StdRng,
    ) -> Result<Self, RotatorError> {
        if pool.is_empty() {
            return Err(RotatorError::PoolEmpty);
        }
        let used = store.load();
        let stale = used
            .iter()
            .filter(|id| !pool.iter().any(|item| item.id == **id))
            .count();
        if stale > 0 {
            debug!("{} used ids are not in the current pool", stale);
        }
        info!(
            "Rotator ready: {} items, {} already used",
            pool.len(),
            used.len() - stale
        );
        Ok(Self {
            pool,
            used,
            store,
            rng,
        })
    }

    pub fn next(&mut self) -> Result<ContentItem, RotatorError> {
        if self.remaining() == 0 {
            warn!(
                "All {} facts have been used; resetting used set",
                self.pool.len()
            );
            self.used.clear();
        }

        let candidates: Vec<&ContentItem> = self
            .pool
            .iter()
            .filter(|item| !self.used.contains(&item.id))
            .collect();
        let picked = candidates
            .choose(&mut self.rng)
            .map(|item| (*item).clone())
            .ok_or(RotatorError::PoolEmpty)?;

        self.used.insert(picked.id);
        self.flush()?;
        debug!("Selected fact {} ({})", picked.id, picked.category);
        Ok(picked)
    }

    /// Writes the in-memory used set to the store. Callers retry this after a
    /// `Persistence` error from [`ContentRotator::next`].
    pub fn flush(&self) -> Result<(), RotatorError> {
        self.store.save(&self.used)
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn remaining(&self) -> usize {
        self.pool
            .iter()
            .filter(|item| !self.used.contains(&item.id))
            .count()
    }

    pub fn used_ids(&self) -> &HashSet<ItemId> {
        &self.used
    }
}
