use crate::engine::{FusionRecord, MasterTable};
use crate::error::Error;
use crate::fid::Fid;
use chrono::Local;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const FUSION_HEADER: &str = "fid_master,name,fid_link,guess_link,content";

/// Serialize the table, rotating any previous file at `path` to a
/// timestamped backup first so no run silently destroys prior state.
/// Rows are written in table iteration order; link lists join with `|`.
pub fn save(table: &MasterTable, path: &Path) -> Result<(), Error> {
    if path.is_file() {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let backup = backup_path(path, &stamp);
        fs::rename(path, &backup)?;
        info!("Previous fusion file rotated to {}", backup.display());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", FUSION_HEADER)?;
    for record in table.iter() {
        writeln!(
            out,
            "{},{},{},{},{}",
            record.fid_master,
            record.name,
            join_links(&record.fid_link),
            join_links(&record.guess_link),
            record.content,
        )?;
    }
    out.flush()?;
    debug!("Fusion table saved: {} records to {}", table.len(), path.display());
    Ok(())
}

/// Load the master table: prefer the canonical output path (resuming a
/// prior session), fall back to the seed path (bootstrapping), else start
/// empty. Every row is trusted and inserted verbatim via `reload_record`.
pub fn load(canonical: &Path, seed: &Path) -> Result<MasterTable, Error> {
    let path = if canonical.is_file() {
        canonical
    } else if seed.is_file() {
        seed
    } else {
        debug!("No fusion file or seed found, starting from an empty table");
        return Ok(MasterTable::new());
    };
    load_file(path)
}

pub fn load_file(path: &Path) -> Result<MasterTable, Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let pos = |name: &str| headers.iter().position(|h| h == name);
    let fid_pos = pos("fid_master")
        .ok_or_else(|| Error::Other(format!("{}: missing fid_master column", path.display())))?;
    let name_pos = pos("name")
        .ok_or_else(|| Error::Other(format!("{}: missing name column", path.display())))?;
    let link_pos = pos("fid_link");
    let guess_pos = pos("guess_link");

    let mut table = MasterTable::new();
    for result in reader.records() {
        let row = result?;
        let field = |pos: Option<usize>| pos.and_then(|i| row.get(i)).unwrap_or("");

        let fid_master = Fid::from_raw(field(Some(fid_pos)));
        let record = FusionRecord {
            fid_master: fid_master.clone(),
            name: field(Some(name_pos)).to_string(),
            fid_link: split_links(field(link_pos)),
            guess_link: split_links(field(guess_pos)),
            // Content is regenerated by aggregation, never trusted on load.
            content: String::new(),
        };
        table.reload_record(record);
    }
    debug!("Fusion table loaded: {} records from {}", table.len(), path.display());
    Ok(table)
}

pub fn join_links(links: &[Fid]) -> String {
    links
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

pub fn split_links(joined: &str) -> Vec<Fid> {
    joined
        .split('|')
        .filter(|part| !part.is_empty())
        .map(Fid::from)
        .collect()
}

/// `output/fusion.csv` → `output/fusion_YYYYMMDD_HHMMSS.csv`
fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_links_skips_empty_parts() {
        assert!(split_links("").is_empty());
        let links = split_links("a@1|b@2");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].as_str(), "a@1");
        assert_eq!(join_links(&links), "a@1|b@2");
    }

    #[test]
    fn test_backup_path_keeps_extension() {
        let backup = backup_path(Path::new("output/fusion.csv"), "20260823_120000");
        assert_eq!(
            backup,
            PathBuf::from("output/fusion_20260823_120000.csv")
        );
        let bare = backup_path(Path::new("fusion"), "20260823_120000");
        assert_eq!(bare, PathBuf::from("fusion_20260823_120000"));
    }
}
