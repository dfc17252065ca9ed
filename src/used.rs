use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::RotatorError;
use crate::facts::ItemId;

/// Where the used-id set lives between runs. Kept behind a trait so the
/// rotator can be exercised without touching disk.
pub trait UsedStore: Send {
    fn load(&self) -> HashSet<ItemId>;
    fn save(&self, ids: &HashSet<ItemId>) -> Result<(), RotatorError>;
}

/// Flat JSON list of ids in a single file.
#[derive(Debug, Clone)]
pub struct JsonUsedStore {
    path: PathBuf,
}

impl JsonUsedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UsedStore for JsonUsedStore {
    fn load(&self) -> HashSet<ItemId> {
        if !self.path.exists() {
            return HashSet::new();
        }
        let ids = fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|data| serde_json::from_str::<Vec<ItemId>>(&data).map_err(|e| e.to_string()));
        match ids {
            Ok(ids) => {
                debug!("Loaded {} used ids from {}", ids.len(), self.path.display());
                ids.into_iter().collect()
            }
            Err(e) => {
                warn!("Could not load used ids from {}: {}", self.path.display(), e);
                HashSet::new()
            }
        }
    }

    fn save(&self, ids: &HashSet<ItemId>) -> Result<(), RotatorError> {
        let mut sorted: Vec<ItemId> = ids.iter().copied().collect();
        sorted.sort_unstable();
        let data = serde_json::to_string(&sorted).map_err(|e| RotatorError::Persistence {
            path: self.path.clone(),
            source: e.into(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|source| RotatorError::Persistence {
                path: self.path.clone(),
                source,
            })?;
        debug!("Saved {} used ids to {}", sorted.len(), self.path.display());
        Ok(())
    }
}
