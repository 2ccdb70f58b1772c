use crate::error::Error;
use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Application-level settings: where the registry, datasets and outputs live.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub registry_path: String,
    pub fusion_path: String,
    pub seed_path: String,
    pub listing_path: String,
    pub compare_dir: String,
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .set_default("registry_path", "include/registry.csv")?
        .set_default("fusion_path", "output/fusion.csv")?
        .set_default("seed_path", "dataset/fusion_seed.csv")?
        .set_default("listing_path", "output/fid_name.csv")?
        .set_default("compare_dir", "output")?
        .add_source(ConfigFile::with_name("Config").required(false))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Declared identifier style for a dataset's id column. `Wikidata` ids are
/// URL-prefixed and get normalized at load; `Int` ids are compared
/// numerically during row lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    Plain,
    Wikidata,
    Int,
}

/// One row of the dataset registry file.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub ds_name: String,
    pub enabled: u8,
    pub filename: String,
    pub id_type: String,
    pub col_id: String,
    pub col_name: String,
    #[serde(default)]
    pub col_key: Option<String>,
    pub src_id: String,
}

impl DatasetConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled == 1
    }

    pub fn id_type(&self) -> IdType {
        match self.id_type.as_str() {
            "wikidata" => IdType::Wikidata,
            "int" => IdType::Int,
            _ => IdType::Plain,
        }
    }

    /// Comma-separated sort key columns, empty when none configured.
    pub fn key_columns(&self) -> Vec<&str> {
        match self.col_key.as_deref() {
            Some(keys) if !keys.is_empty() => keys.split(',').collect(),
            _ => Vec::new(),
        }
    }
}

/// The dataset registry: one `DatasetConfig` per known dataset, in file
/// order. A missing or unreadable registry file is fatal.
#[derive(Debug, Clone)]
pub struct Registry {
    datasets: Vec<DatasetConfig>,
}

impl Registry {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            Error::Registry(format!("cannot read registry {}: {}", path.display(), e))
        })?;
        let mut datasets = Vec::new();
        for result in reader.deserialize() {
            let cfg: DatasetConfig = result?;
            datasets.push(cfg);
        }
        debug!("Registry loaded: {} datasets", datasets.len());
        Ok(Registry { datasets })
    }

    pub fn from_datasets(datasets: Vec<DatasetConfig>) -> Self {
        Registry { datasets }
    }

    pub fn get(&self, ds_name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|cfg| cfg.ds_name == ds_name)
    }

    /// Reverse lookup: the dataset owning a given source id.
    pub fn ds_name_by_src(&self, src_id: &str) -> Option<&str> {
        self.datasets
            .iter()
            .find(|cfg| cfg.src_id == src_id)
            .map(|cfg| cfg.ds_name.as_str())
    }

    pub fn enabled(&self) -> impl Iterator<Item = &DatasetConfig> {
        self.datasets.iter().filter(|cfg| cfg.is_enabled())
    }

    pub fn all(&self) -> &[DatasetConfig] {
        &self.datasets
    }
}
