use crate::config::{DatasetConfig, IdType, Registry};
use crate::error::Error;
use indexmap::IndexMap;
use std::path::Path;
use tracing::debug;

const WIKIDATA_ENTITY_PREFIX: &str = "http://www.wikidata.org/entity/";

/// A dataset loaded into memory: header row plus ordered data rows.
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Load a dataset per its registry entry. Wikidata-style id columns are
    /// normalized (entity URL prefix stripped) and, when sort key columns
    /// are configured, rows are stably sorted so that both scan and merge
    /// passes see the same reproducible order.
    pub fn load(cfg: &DatasetConfig) -> Result<Self, Error> {
        let mut ds = Self::from_file(Path::new(&cfg.filename))?;

        if cfg.id_type() == IdType::Wikidata {
            if let Some(idx) = ds.column_index(&cfg.col_id) {
                for row in &mut ds.rows {
                    if let Some(cell) = row.get_mut(idx) {
                        if let Some(stripped) = cell.strip_prefix(WIKIDATA_ENTITY_PREFIX) {
                            *cell = stripped.to_string();
                        }
                    }
                }
            }
        }

        let keys = cfg.key_columns();
        if !keys.is_empty() {
            ds.sort_by_keys(&keys);
        }

        debug!(
            "Dataset '{}' loaded: {} rows, {} columns",
            cfg.ds_name,
            ds.rows.len(),
            ds.headers.len()
        );
        Ok(ds)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                Error::Dataset(format!("cannot read dataset {}: {}", path.display(), e))
            })?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            // Short rows pad out so column access stays positional.
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Dataset { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn get(&self, row: usize, col: &str) -> Option<&str> {
        let idx = self.column_index(col)?;
        self.rows.get(row).and_then(|r| r.get(idx)).map(|s| s.as_str())
    }

    /// Stable sort by the given key columns, compared as strings in order.
    pub fn sort_by_keys(&mut self, keys: &[&str]) {
        let indices: Vec<usize> = keys.iter().filter_map(|k| self.column_index(k)).collect();
        if indices.is_empty() {
            return;
        }
        self.rows.sort_by(|a, b| {
            for &idx in &indices {
                let ord = a[idx].cmp(&b[idx]);
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    /// Locate the first row whose id column equals `local_id`. When the
    /// dataset declares integer ids, both sides are compared numerically so
    /// that `"7"` matches a `7` cell regardless of formatting. A probe value
    /// that cannot be coerced is an error the caller may treat as
    /// recoverable.
    pub fn find_row_by_id(
        &self,
        col_id: &str,
        local_id: &str,
        int_typed: bool,
    ) -> Result<Option<usize>, Error> {
        let idx = self
            .column_index(col_id)
            .ok_or_else(|| Error::Dataset(format!("no id column '{}'", col_id)))?;

        if int_typed {
            let probe: i64 = local_id.parse().map_err(|_| {
                Error::Dataset(format!("cannot coerce id '{}' to integer", local_id))
            })?;
            Ok(self
                .rows
                .iter()
                .position(|row| row[idx].parse::<i64>() == Ok(probe)))
        } else {
            Ok(self.rows.iter().position(|row| row[idx] == local_id))
        }
    }

    /// Emit `N|<seq>||<name>` candidate identifiers for every row, 1-based,
    /// in current row order.
    pub fn generate_new_ids(&self, col_name: &str) -> Vec<String> {
        let idx = match self.column_index(col_name) {
            Some(idx) => idx,
            None => return Vec::new(),
        };
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| format!("N|{}||{}", i + 1, row[idx]))
            .collect()
    }
}

/// Load every enabled dataset in registry order, keyed by dataset name.
pub fn load_enabled(registry: &Registry) -> Result<IndexMap<String, Dataset>, Error> {
    let mut datasets = IndexMap::new();
    for cfg in registry.enabled() {
        let ds = Dataset::load(cfg)?;
        datasets.insert(cfg.ds_name.clone(), ds);
    }
    Ok(datasets)
}
