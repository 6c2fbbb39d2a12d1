use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Supplementary per-node payloads keyed by node id.
///
/// The payload shape is owned by the upstream analyzer (impact scores,
/// breaking-change flags, dependency chains, ...); the viewer forwards it
/// to the detail panel without interpreting it.
#[derive(Clone, Debug, Default)]
pub struct DetailStore {
    entries: HashMap<String, Value>,
}

impl DetailStore {
    pub fn get(&self, node_id: &str) -> Option<&Value> {
        self.entries.get(node_id)
    }
}

pub fn load_detail_store(path: &Path) -> Result<DetailStore> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read detail file {}", path.display()))?;
    let entries: HashMap<String, Value> =
        serde_json::from_str(&raw).context("invalid detail JSON, expected an object keyed by node id")?;
    Ok(DetailStore { entries })
}
