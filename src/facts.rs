use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::RotatorError;

pub type ItemId = i64;

/// One entry of the content pool. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    #[serde(rename = "fact")]
    pub text: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PoolFile {
    Wrapped { facts: Vec<ContentItem> },
    Bare(Vec<ContentItem>),
}

pub fn load_pool(path: impl AsRef<Path>) -> Result<Vec<ContentItem>, RotatorError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|source| RotatorError::PoolLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let pool = parse_pool(&data)?;
    info!("Loaded {} facts from {}", pool.len(), path.display());
    Ok(pool)
}

pub fn parse_pool(data: &str) -> Result<Vec<ContentItem>, RotatorError> {
    let parsed: PoolFile =
        serde_json::from_str(data).map_err(|e| RotatorError::PoolFormat(e.to_string()))?;
    let items = match parsed {
        PoolFile::Wrapped { facts } => facts,
        PoolFile::Bare(items) => items,
    };

    let mut seen = HashSet::new();
    for item in &items {
        if !seen.insert(item.id) {
            return Err(RotatorError::PoolFormat(format!("duplicate id {}", item.id)));
        }
    }
    debug!("Parsed {} pool entries", items.len());
    Ok(items)
}
