// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::path::Path;

use super::{open_table, parse_number};

/// `service -> year -> supplier -> price`
pub type PricingHistory = BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>;

const COLUMNS: [&str; 4] = ["Supplier", "Year", "Service", "Price ($)"];

/// Load historical supplier pricing from a CSV with the columns
/// `Supplier, Year, Service, Price ($)`.
pub fn load_pricing_history(path: impl AsRef<Path>) -> PricingHistory {
    let path = path.as_ref();
    let mut history = PricingHistory::new();
    let Some((mut reader, cols)) = open_table(path, &COLUMNS) else {
        return history;
    };

    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping unreadable row {} in {}: {}", line + 2, path.display(), e);
                continue;
            }
        };

        let Some(price) = parse_number(record.get(cols[3])) else {
            log::warn!("Non-numeric price in row {}: {:?}", line + 2, record);
            continue;
        };
        let supplier = record.get(cols[0]).unwrap_or_default();
        let year = record.get(cols[1]).unwrap_or_default();
        let service = record.get(cols[2]).unwrap_or_default();

        history
            .entry(service.to_string())
            .or_default()
            .entry(year.to_string())
            .or_default()
            .insert(supplier.to_string(), price);
    }

    log::info!(
        "Loaded pricing history for {} services from {}",
        history.len(),
        path.display()
    );
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_nested_by_service_year_supplier() {
        let file = csv_file(
            "Supplier,Year,Service,Price ($)\n\
             Acme,2023,Cloud Storage,\"1,200\"\n\
             Globex,2023,Cloud Storage,1100.5\n\
             Acme,2024,Compute,80\n",
        );

        let history = load_pricing_history(file.path());

        assert_eq!(history["Cloud Storage"]["2023"]["Acme"], 1200.0);
        assert_eq!(history["Cloud Storage"]["2023"]["Globex"], 1100.5);
        assert_eq!(history["Compute"]["2024"]["Acme"], 80.0);
    }

    #[test]
    fn test_missing_column_yields_empty() {
        let file = csv_file("Supplier,Year,Service\nAcme,2023,Cloud Storage\n");
        assert!(load_pricing_history(file.path()).is_empty());
    }

    #[test]
    fn test_missing_file_yields_empty() {
        assert!(load_pricing_history("/nonexistent/historical_pricing.csv").is_empty());
    }

    #[test]
    fn test_non_numeric_row_is_skipped() {
        let file = csv_file(
            "Supplier, Year ,Service,Price ($)\n\
             Acme,2023,Compute,TBD\n\
             Globex,2023,Compute,75\n",
        );

        let history = load_pricing_history(file.path());

        assert_eq!(history["Compute"]["2023"].len(), 1);
        assert_eq!(history["Compute"]["2023"]["Globex"], 75.0);
    }
}
