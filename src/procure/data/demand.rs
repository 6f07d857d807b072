// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::{open_table, parse_number};

/// Demand and supply observed for one service in one quarter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyDemand {
    #[serde(rename = "Demand")]
    pub demand: f64,
    #[serde(rename = "Supply")]
    pub supply: f64,
}

/// `service -> "Year-Quarter" -> SupplyDemand`
pub type SupplyDemandHistory = BTreeMap<String, BTreeMap<String, SupplyDemand>>;

const COLUMNS: [&str; 5] = ["Year", "Quarter", "Service", "Demand", "Supply"];

/// Load quarterly supply/demand figures from a CSV with the columns
/// `Year, Quarter, Service, Demand, Supply`.
pub fn load_supply_demand(path: impl AsRef<Path>) -> SupplyDemandHistory {
    let path = path.as_ref();
    let mut history = SupplyDemandHistory::new();
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

        let (Some(demand), Some(supply)) = (
            parse_number(record.get(cols[3])),
            parse_number(record.get(cols[4])),
        ) else {
            log::warn!("Non-numeric Demand/Supply in row {}: {:?}", line + 2, record);
            continue;
        };

        let year = record.get(cols[0]).unwrap_or_default();
        let quarter = record.get(cols[1]).unwrap_or_default();
        let service = record.get(cols[2]).unwrap_or_default();

        history
            .entry(service.to_string())
            .or_default()
            .insert(format!("{}-{}", year, quarter), SupplyDemand { demand, supply });
    }

    history
}
