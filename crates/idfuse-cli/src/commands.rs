use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "idfuse")]
#[command(about = "Identity fusion across multi-source datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full fusion pipeline: reload, scan, merge, save
    Fuse {
        /// Also aggregate the content field before saving
        #[arg(long)]
        content: bool,
    },
    /// Regenerate the content field for the persisted fusion table
    Content,
    /// Scan datasets and export the fid,name audit listing only
    Scan,
    /// Per-source master record counts from the persisted table
    Info,
    /// Compare two dataset columns as sets
    Compare {
        ds_a: String,
        col_a: String,
        ds_b: String,
        col_b: String,
        /// Write the four result sets to the configured output directory
        #[arg(long)]
        export: bool,
    },
    /// Emit sequential candidate identifiers for a dataset
    GenIds { ds_name: String },
    /// List every dataset row using the given name
    FindName { name: String },
    /// Print configuration values
    PrintConfig,
}
