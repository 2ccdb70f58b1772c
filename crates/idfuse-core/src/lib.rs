pub mod compare;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod fid;
pub mod index;
pub mod persist;

pub use config::{AppConfig, Registry};
pub use engine::{FuseResult, FusionEngine, FusionRecord, MasterTable};
pub use error::Error;
pub use fid::Fid;
pub use index::NameIndex;
