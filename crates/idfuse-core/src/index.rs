use crate::config::Registry;
use crate::dataset::Dataset;
use crate::error::Error;
use crate::fid::Fid;
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Name → ordered FIDs that used that name, in first-seen order.
///
/// Built once, before any merge call: the merge decision for a row depends
/// on which FID first used its name across *all* datasets.
#[derive(Debug, Default)]
pub struct NameIndex {
    names: IndexMap<String, Vec<Fid>>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `fid` used `name`. Duplicates are not re-appended.
    pub fn insert(&mut self, name: &str, fid: Fid) {
        let entry = self.names.entry(name.to_string()).or_default();
        if !entry.contains(&fid) {
            entry.push(fid);
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Fid]> {
        self.names.get(name).map(|v| v.as_slice())
    }

    /// The first FID recorded for a name — the only merge candidate.
    pub fn first(&self, name: &str) -> Option<&Fid> {
        self.names.get(name).and_then(|v| v.first())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Result of the scan pass: the name index plus the full ordered audit
/// listing of every `(FID, name)` pair observed.
#[derive(Debug, Default)]
pub struct ScanPass {
    pub index: NameIndex,
    pub listing: Vec<(Fid, String)>,
}

/// Scan every enabled dataset once, building the name index and the audit
/// listing. Rows with an empty name still appear in the listing but are
/// never indexed (they become unmatched singletons in the merge pass).
pub fn scan_datasets(
    registry: &Registry,
    datasets: &IndexMap<String, Dataset>,
) -> Result<ScanPass, Error> {
    let mut pass = ScanPass::default();

    for cfg in registry.enabled() {
        let ds = datasets
            .get(&cfg.ds_name)
            .ok_or_else(|| Error::Dataset(format!("dataset '{}' not loaded", cfg.ds_name)))?;
        let id_idx = ds
            .column_index(&cfg.col_id)
            .ok_or_else(|| Error::Dataset(format!("'{}': no id column '{}'", cfg.ds_name, cfg.col_id)))?;
        let name_idx = ds
            .column_index(&cfg.col_name)
            .ok_or_else(|| Error::Dataset(format!("'{}': no name column '{}'", cfg.ds_name, cfg.col_name)))?;

        for row in ds.rows() {
            let fid = Fid::new(&cfg.src_id, &row[id_idx]);
            let name = row[name_idx].as_str();
            if !name.is_empty() {
                pass.index.insert(name, fid.clone());
            }
            pass.listing.push((fid, name.to_string()));
        }
    }

    debug!(
        "Scan pass complete: {} names, {} (fid, name) pairs",
        pass.index.len(),
        pass.listing.len()
    );
    Ok(pass)
}

/// Write the audit listing as a `fid,name` file, one pair per line.
/// Values are written as-is; caller data is assumed delimiter-clean.
pub fn export_listing(path: &Path, listing: &[(Fid, String)]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "fid,name")?;
    for (fid, name) in listing {
        writeln!(out, "{},{}", fid, name)?;
    }
    out.flush()?;
    Ok(())
}

/// Find every occurrence of a name across enabled datasets.
pub fn find_name(
    registry: &Registry,
    datasets: &IndexMap<String, Dataset>,
    name: &str,
) -> Vec<(String, Fid)> {
    let mut matches = Vec::new();
    for cfg in registry.enabled() {
        let ds = match datasets.get(&cfg.ds_name) {
            Some(ds) => ds,
            None => continue,
        };
        let (id_idx, name_idx) =
            match (ds.column_index(&cfg.col_id), ds.column_index(&cfg.col_name)) {
                (Some(i), Some(n)) => (i, n),
                _ => continue,
            };
        for row in ds.rows() {
            if row[name_idx] == name {
                matches.push((cfg.ds_name.clone(), Fid::new(&cfg.src_id, &row[id_idx])));
            }
        }
    }
    matches
}
