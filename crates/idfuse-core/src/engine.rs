use crate::config::{AppConfig, IdType, Registry};
use crate::dataset::{self, Dataset};
use crate::error::Error;
use crate::fid::Fid;
use crate::index::{self, NameIndex};
use crate::persist;
use indexmap::IndexMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The canonical merged entry for one entity.
///
/// `fid_link` holds FIDs confirmed via reload; `guess_link` holds FIDs the
/// merge pass inferred through name equality across sources. Both are
/// ordered and duplicate-free; the `|`-joined string form exists only at
/// the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionRecord {
    pub fid_master: Fid,
    pub name: String,
    pub fid_link: Vec<Fid>,
    pub guess_link: Vec<Fid>,
    pub content: String,
}

impl FusionRecord {
    pub fn new(fid_master: Fid, name: &str) -> Self {
        FusionRecord {
            fid_master,
            name: name.to_string(),
            fid_link: Vec::new(),
            guess_link: Vec::new(),
            content: String::new(),
        }
    }
}

/// FID → fusion record, in insertion order.
///
/// Invariant: every key equals its record's `fid_master`, and a FID appears
/// in at most one record's link lists. The merge algorithm enforces both.
#[derive(Debug, Default)]
pub struct MasterTable {
    records: IndexMap<Fid, FusionRecord>,
}

impl MasterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, fid: &Fid) -> Option<&FusionRecord> {
        self.records.get(fid)
    }

    pub fn contains(&self, fid: &Fid) -> bool {
        self.records.contains_key(fid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FusionRecord> {
        self.records.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Fid> {
        self.records.keys()
    }

    /// Trusted ingestion: store the record under its own `fid_master`,
    /// unconditionally overwriting any existing entry. No linkage
    /// inference happens here — previously confirmed `fid_link` decisions
    /// survive across runs verbatim.
    pub fn reload_record(&mut self, record: FusionRecord) {
        self.records.insert(record.fid_master.clone(), record);
    }

    /// Incremental merge: called once per dataset row, in the same row
    /// order used to build the name index.
    ///
    /// Only the first FID recorded for the row's name is ever examined.
    /// A candidate from the same source as `fid` is never merged (same
    /// name within one dataset means distinct entities). On a match the
    /// new FID joins the matched master's `guess_link`; it never becomes
    /// a master key of its own.
    pub fn merge(&mut self, index: &NameIndex, fid: Fid, name: &str) {
        if fid.is_malformed() {
            warn!(
                "FID '{}' has no '@' separator; its empty source id matches any candidate",
                fid
            );
        }
        let source_id = fid.source_id().to_string();

        let matched: Option<Fid> = if name.is_empty() {
            None
        } else {
            match index.first(name) {
                Some(fid0) if self.records.contains_key(fid0) => {
                    if *fid0 != fid && fid0.contains_source(&source_id) {
                        // Same-source duplicate name: never merged.
                        None
                    } else {
                        Some(fid0.clone())
                    }
                }
                _ => None,
            }
        };

        match matched {
            None => {
                // Keep an existing record as-is (its guess_link included);
                // otherwise start a fresh singleton.
                if !self.records.contains_key(&fid) {
                    self.records
                        .insert(fid.clone(), FusionRecord::new(fid, name));
                }
            }
            Some(fid0) => {
                if let Some(record) = self.records.get_mut(&fid0) {
                    if !record.fid_master.as_str().contains(fid.as_str())
                        && !record.guess_link.contains(&fid)
                    {
                        record.guess_link.push(fid);
                    }
                }
            }
        }
    }

    /// Count of master records per source id, in first-encountered order.
    pub fn stats(&self) -> Vec<(String, usize)> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for fid in self.records.keys() {
            *counts.entry(fid.source_id().to_string()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }
}

/// Second pass over every enabled dataset, feeding each row into
/// `MasterTable::merge` in scan order. Returns the number of rows merged.
pub fn merge_pass(
    table: &mut MasterTable,
    index: &NameIndex,
    registry: &Registry,
    datasets: &IndexMap<String, Dataset>,
) -> Result<usize, Error> {
    let mut merged = 0usize;
    for cfg in registry.enabled() {
        let ds = datasets
            .get(&cfg.ds_name)
            .ok_or_else(|| Error::Dataset(format!("dataset '{}' not loaded", cfg.ds_name)))?;
        let id_idx = ds.column_index(&cfg.col_id).ok_or_else(|| {
            Error::Dataset(format!("'{}': no id column '{}'", cfg.ds_name, cfg.col_id))
        })?;
        let name_idx = ds.column_index(&cfg.col_name).ok_or_else(|| {
            Error::Dataset(format!("'{}': no name column '{}'", cfg.ds_name, cfg.col_name))
        })?;

        for row in ds.rows() {
            let fid = Fid::new(&cfg.src_id, &row[id_idx]);
            table.merge(index, fid, &row[name_idx]);
            merged += 1;
        }
    }
    Ok(merged)
}

/// Rebuild every record's `content` field: gather `column=value` pairs from
/// each dataset row reachable through the master FID and both link lists.
/// Lookup failures for one FID are reported and skipped; they never abort
/// the pass. Returns the number of records updated.
pub fn aggregate_content(
    table: &mut MasterTable,
    registry: &Registry,
    datasets: &IndexMap<String, Dataset>,
) -> usize {
    let masters: Vec<Fid> = table.records.keys().cloned().collect();
    let mut updated = 0usize;

    for master in masters {
        let closure: Vec<Fid> = match table.records.get(&master) {
            Some(record) => {
                let mut fids = vec![record.fid_master.clone()];
                fids.extend(record.fid_link.iter().cloned());
                fids.extend(record.guess_link.iter().cloned());
                fids
            }
            None => continue,
        };

        let mut pairs: Vec<String> = Vec::new();
        for fid in &closure {
            gather_row_content(fid, registry, datasets, &mut pairs);
        }

        if let Some(record) = table.records.get_mut(&master) {
            record.content = format!("\"{}\"", pairs.join("|"));
            updated += 1;
        }
    }
    updated
}

fn gather_row_content(
    fid: &Fid,
    registry: &Registry,
    datasets: &IndexMap<String, Dataset>,
    pairs: &mut Vec<String>,
) {
    let src_id = fid.source_id();
    let ds_name = match registry.ds_name_by_src(src_id) {
        Some(name) => name.to_string(),
        None => {
            warn!("content: no dataset for source id '{}' (fid {})", src_id, fid);
            return;
        }
    };
    let cfg = match registry.get(&ds_name) {
        Some(cfg) => cfg,
        None => return,
    };
    let ds = match datasets.get(&ds_name) {
        Some(ds) => ds,
        None => {
            warn!("content: dataset '{}' not loaded (fid {})", ds_name, fid);
            return;
        }
    };

    let int_typed = cfg.id_type() == IdType::Int;
    let row_idx = match ds.find_row_by_id(&cfg.col_id, fid.local_id(), int_typed) {
        Ok(Some(idx)) => idx,
        Ok(None) => {
            warn!("content: no row in '{}' with id '{}'", ds_name, fid.local_id());
            return;
        }
        Err(e) => {
            warn!("content: lookup failed for fid {}: {}", fid, e);
            return;
        }
    };

    let row = &ds.rows()[row_idx];
    for (header, value) in ds.headers().iter().zip(row.iter()) {
        // Skip the positional index column a tabular export may carry.
        if header.is_empty() {
            continue;
        }
        pairs.push(format!("{}={}", header, value));
    }
}

#[derive(Debug)]
pub struct FuseResult {
    pub reload_duration: Duration,
    pub scan_duration: Duration,
    pub merge_duration: Duration,
    pub reloaded_records: usize,
    pub datasets_loaded: usize,
    pub names_indexed: usize,
    pub rows_merged: usize,
    pub master_records: usize,
}

/// Orchestrates the fusion pipeline over the configured registry.
pub struct FusionEngine {
    config: AppConfig,
    registry: Registry,
}

impl FusionEngine {
    pub fn new(config: AppConfig, registry: Registry) -> Self {
        FusionEngine { config, registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn load_datasets(&self) -> Result<IndexMap<String, Dataset>, Error> {
        dataset::load_enabled(&self.registry)
    }

    /// Scan-only entry point: build the name index and export the audit
    /// listing without reloading or rewriting any persisted fusion state.
    pub fn scan(&self) -> Result<index::ScanPass, Error> {
        let datasets = self.load_datasets()?;
        let pass = index::scan_datasets(&self.registry, &datasets)?;
        index::export_listing(Path::new(&self.config.listing_path), &pass.listing)?;
        Ok(pass)
    }

    /// Run the full fusion pipeline:
    /// 1. Reload the persisted table (or the seed, or start empty)
    /// 2. Load datasets, build the name index, export the audit listing
    /// 3. Incremental merge pass over every row
    /// 4. Optional content aggregation
    /// 5. Save with backup rotation
    pub fn fuse(&self, with_content: bool) -> Result<FuseResult, Error> {
        // Phase 1: Reload
        info!("Reloading persisted fusion state...");
        let reload_start = Instant::now();
        let mut table = persist::load(
            Path::new(&self.config.fusion_path),
            Path::new(&self.config.seed_path),
        )?;
        let reload_duration = reload_start.elapsed();
        let reloaded_records = table.len();
        debug!(
            "Reload completed in {:.2}s — {} records",
            reload_duration.as_secs_f64(),
            reloaded_records,
        );

        // Phase 2: Scan — the index must be complete before any merge call.
        info!("Scanning datasets...");
        let scan_start = Instant::now();
        let datasets = self.load_datasets()?;
        let pass = index::scan_datasets(&self.registry, &datasets)?;
        index::export_listing(Path::new(&self.config.listing_path), &pass.listing)?;
        let scan_duration = scan_start.elapsed();
        debug!(
            "Scan completed in {:.2}s — {} datasets, {} names",
            scan_duration.as_secs_f64(),
            datasets.len(),
            pass.index.len(),
        );

        // Phase 3: Merge
        info!("Merging identifiers...");
        let merge_start = Instant::now();
        let rows_merged = merge_pass(&mut table, &pass.index, &self.registry, &datasets)?;
        let merge_duration = merge_start.elapsed();
        debug!(
            "Merge completed in {:.2}s — {} rows into {} master records",
            merge_duration.as_secs_f64(),
            rows_merged,
            table.len(),
        );

        // Phase 4: Content
        if with_content {
            info!("Aggregating content...");
            let updated = aggregate_content(&mut table, &self.registry, &datasets);
            debug!("Content aggregated for {} records", updated);
        }

        // Phase 5: Save
        persist::save(&table, Path::new(&self.config.fusion_path))?;

        Ok(FuseResult {
            reload_duration,
            scan_duration,
            merge_duration,
            reloaded_records,
            datasets_loaded: datasets.len(),
            names_indexed: pass.index.len(),
            rows_merged,
            master_records: table.len(),
        })
    }

    /// Regenerate the content field for the persisted table and save.
    pub fn refresh_content(&self) -> Result<usize, Error> {
        let mut table = persist::load(
            Path::new(&self.config.fusion_path),
            Path::new(&self.config.seed_path),
        )?;
        let datasets = self.load_datasets()?;
        let updated = aggregate_content(&mut table, &self.registry, &datasets);
        persist::save(&table, Path::new(&self.config.fusion_path))?;
        Ok(updated)
    }

    /// Per-source master record counts from the persisted table.
    pub fn info(&self) -> Result<Vec<(String, usize)>, Error> {
        let table = persist::load(
            Path::new(&self.config.fusion_path),
            Path::new(&self.config.seed_path),
        )?;
        Ok(table.stats())
    }
}
