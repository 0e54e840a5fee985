// src/store/receipt.rs
use crate::fetch::Dataset;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Sidecar written next to the store after a successful ingest
/// (`<store>.receipt.json`). Records what went in so a later run can tell
/// whether the store still matches the remote payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Receipt {
    pub created_at: DateTime<Utc>,
    pub tables: BTreeMap<String, TableReceipt>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TableReceipt {
    pub source_url: String,
    pub sha256: String,
    pub rows: usize,
    pub columns: usize,
}

pub fn receipt_path(store: &Path) -> PathBuf {
    let mut name = store
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".receipt.json");
    store.with_file_name(name)
}

impl Receipt {
    pub fn for_tables(tables: &[(&str, &Dataset)]) -> Self {
        let tables = tables
            .iter()
            .map(|(name, ds)| {
                (
                    name.to_string(),
                    TableReceipt {
                        source_url: ds.source_url.clone(),
                        sha256: ds.sha256.clone(),
                        rows: ds.row_count(),
                        columns: ds.column_count(),
                    },
                )
            })
            .collect();
        Receipt {
            created_at: Utc::now(),
            tables,
        }
    }

    /// Load the sidecar for `store`. A missing file is `None`; one that no
    /// longer parses is also `None` (the store is then treated as stale
    /// rather than failing the run over a broken sidecar).
    pub fn load(store: &Path) -> Result<Option<Receipt>> {
        let path = receipt_path(store);
        if !path.exists() {
            return Ok(None);
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        match serde_json::from_str(&text) {
            Ok(receipt) => Ok(Some(receipt)),
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable receipt; treating store as stale");
                Ok(None)
            }
        }
    }

    pub fn write(&self, store: &Path) -> Result<()> {
        let path = receipt_path(store);
        let text = serde_json::to_string_pretty(self).context("serializing receipt")?;
        fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// True when every table's recorded fingerprint matches the freshly
    /// fetched payload and no table is missing from the receipt.
    pub fn matches(&self, tables: &[(&str, &Dataset)]) -> bool {
        tables.iter().all(|(name, ds)| {
            self.tables
                .get(*name)
                .map(|t| t.sha256 == ds.sha256)
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::parse_csv;

    #[test]
    fn receipt_path_appends_suffix() {
        let p = receipt_path(Path::new("data/chocolate.db"));
        assert_eq!(p, Path::new("data/chocolate.db.receipt.json"));
    }

    #[test]
    fn roundtrip_and_match() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = dir.path().join("t.db");
        let ds = parse_csv("mem://t.csv", b"a\n1\n")?;

        let receipt = Receipt::for_tables(&[("t", &ds)]);
        receipt.write(&store)?;

        let loaded = Receipt::load(&store)?.expect("receipt should exist");
        assert!(loaded.matches(&[("t", &ds)]));

        let changed = parse_csv("mem://t.csv", b"a\n2\n")?;
        assert!(!loaded.matches(&[("t", &changed)]));
        assert!(!loaded.matches(&[("other", &ds)]));
        Ok(())
    }

    #[test]
    fn corrupt_receipt_reads_as_stale() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = dir.path().join("t.db");
        fs::write(receipt_path(&store), b"not json")?;
        assert!(Receipt::load(&store)?.is_none());
        Ok(())
    }
}
