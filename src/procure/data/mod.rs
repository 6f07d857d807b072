// SPDX-License-Identifier: MIT

//! Tabular history inputs
//!
//! Both loaders are lenient: a missing file or column gives an empty result
//! and a warning, and a malformed row is skipped with a warning.

mod demand;
mod pricing;

pub use demand::{load_supply_demand, SupplyDemand, SupplyDemandHistory};
pub use pricing::{load_pricing_history, PricingHistory};

use csv::{Reader, ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Open a CSV file and resolve the positions of `required` columns.
///
/// Returns `None` after logging a warning when the file cannot be read or
/// a required column is absent.
fn open_table(path: &Path, required: &[&str]) -> Option<(Reader<File>, Vec<usize>)> {
    if !path.exists() {
        log::warn!("{} not found", path.display());
        return None;
    }

    let mut reader = match ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
    {
        Ok(reader) => reader,
        Err(e) => {
            log::warn!("Cannot open {}: {}", path.display(), e);
            return None;
        }
    };

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            log::warn!("Cannot read header row of {}: {}", path.display(), e);
            return None;
        }
    };

    let mut positions = Vec::with_capacity(required.len());
    let mut missing = Vec::new();
    for column in required {
        match headers.iter().position(|h| h == *column) {
            Some(i) => positions.push(i),
            None => missing.push(*column),
        }
    }

    if !missing.is_empty() {
        log::warn!("Missing columns in {}: {:?}", path.display(), missing);
        return None;
    }
    Some((reader, positions))
}

/// Parse a numeric cell, tolerating thousands separators
fn parse_number(cell: Option<&str>) -> Option<f64> {
    cell?.replace(',', "").trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(Some("1,250.50")), Some(1250.5));
        assert_eq!(parse_number(Some(" 42 ")), Some(42.0));
        assert_eq!(parse_number(Some("n/a")), None);
        assert_eq!(parse_number(None), None);
    }

    #[test]
    fn test_open_table_resolves_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"Service,Year\nCompute,2024\n").unwrap();

        let (_, positions) = open_table(file.path(), &["Year", "Service"]).unwrap();
        assert_eq!(positions, vec![1, 0]);
    }

    #[test]
    fn test_open_table_reader_errors_are_not_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"Year,\xff\xfe\n2024,1\n").unwrap();

        assert!(open_table(file.path(), &["Year"]).is_none());
        assert!(open_table(Path::new("/nonexistent/table.csv"), &["Year"]).is_none());
    }
}
