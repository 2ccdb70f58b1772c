use crate::dataset::Dataset;
use crate::error::Error;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Set comparison of two dataset columns. Vectors are sorted and
/// duplicate-free; empty cells are dropped before comparison.
#[derive(Debug)]
pub struct Comparison {
    pub a_count: usize,
    pub b_count: usize,
    pub union: Vec<String>,
    pub intersection: Vec<String>,
    pub a_minus_b: Vec<String>,
    pub b_minus_a: Vec<String>,
}

pub fn compare_columns(
    a: &Dataset,
    col_a: &str,
    b: &Dataset,
    col_b: &str,
) -> Result<Comparison, Error> {
    let set_a = column_values(a, col_a)?;
    let set_b = column_values(b, col_b)?;

    Ok(Comparison {
        a_count: set_a.len(),
        b_count: set_b.len(),
        union: set_a.union(&set_b).cloned().collect(),
        intersection: set_a.intersection(&set_b).cloned().collect(),
        a_minus_b: set_a.difference(&set_b).cloned().collect(),
        b_minus_a: set_b.difference(&set_a).cloned().collect(),
    })
}

fn column_values(ds: &Dataset, col: &str) -> Result<BTreeSet<String>, Error> {
    let idx = ds
        .column_index(col)
        .ok_or_else(|| Error::Dataset(format!("no column '{}'", col)))?;
    Ok(ds
        .rows()
        .iter()
        .map(|row| row[idx].clone())
        .filter(|v| !v.is_empty())
        .collect())
}

impl Comparison {
    /// Write the four result sets under `dir`, one value per line.
    pub fn export(&self, dir: &Path) -> Result<(), Error> {
        fs::create_dir_all(dir)?;
        write_set(&dir.join("compare_union.csv"), &self.union)?;
        write_set(&dir.join("compare_intersection.csv"), &self.intersection)?;
        write_set(&dir.join("compare_a_minus_b.csv"), &self.a_minus_b)?;
        write_set(&dir.join("compare_b_minus_a.csv"), &self.b_minus_a)?;
        Ok(())
    }
}

fn write_set(path: &Path, values: &[String]) -> Result<(), Error> {
    let mut out = BufWriter::new(File::create(path)?);
    for value in values {
        writeln!(out, "{}", value)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn make_dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        let mut csv = headers.join(",");
        for row in rows {
            csv.push('\n');
            csv.push_str(&row.join(","));
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ds.csv");
        std::fs::write(&path, csv).unwrap();
        Dataset::from_file(Path::new(&path)).unwrap()
    }

    #[test]
    fn test_compare_columns() {
        let a = make_dataset(&["name"], &[&["Oak"], &["Elm"], &["Oak"], &[""]]);
        let b = make_dataset(&["title"], &[&["Elm"], &["Pine"]]);

        let cmp = compare_columns(&a, "name", &b, "title").unwrap();
        assert_eq!(cmp.a_count, 2); // Oak, Elm — duplicates and empties dropped
        assert_eq!(cmp.b_count, 2);
        assert_eq!(cmp.union, vec!["Elm", "Oak", "Pine"]);
        assert_eq!(cmp.intersection, vec!["Elm"]);
        assert_eq!(cmp.a_minus_b, vec!["Oak"]);
        assert_eq!(cmp.b_minus_a, vec!["Pine"]);
    }

    #[test]
    fn test_compare_missing_column_is_error() {
        let a = make_dataset(&["name"], &[&["Oak"]]);
        let b = make_dataset(&["title"], &[&["Elm"]]);
        assert!(compare_columns(&a, "nope", &b, "title").is_err());
    }
}
