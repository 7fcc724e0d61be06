//! CSV export of history items

use super::{HistoryError, HistoryItem};

/// Column order of the export
pub const CSV_HEADER: [&str; 9] = [
    "createdAt",
    "strategy/category",
    "simulations",
    "maxTradesPerRun",
    "initialCapital",
    "cagr",
    "maxDrawdown",
    "profitFactor",
    "sharpe",
];

/// Render items as CSV, one row per item in the given order
pub fn export_csv(items: &[HistoryItem]) -> Result<Vec<u8>, HistoryError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for item in items {
        writer.write_record([
            item.created_at.to_rfc3339(),
            item.config.label(),
            item.config.simulations.to_string(),
            item.config.max_trades_per_run.to_string(),
            format!("{:.2}", item.config.initial_capital),
            format!("{:.6}", item.summary.cagr),
            format!("{:.6}", item.summary.max_drawdown),
            format_ratio(item.summary.profit_factor),
            format!("{:.6}", item.summary.sharpe),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| HistoryError::Io(e.into_error()))
}

fn format_ratio(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        format!("{:.6}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::item_at;
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_header_only_for_no_items() {
        let bytes = export_csv(&[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "createdAt,strategy/category,simulations,maxTradesPerRun,initialCapital,cagr,maxDrawdown,profitFactor,sharpe\n"
        );
    }

    #[test]
    fn test_rows() {
        let mut item = item_at(Utc::now(), "ORB");
        item.config.category_filter = Some("futures".to_string());
        item.summary.max_drawdown = 0.125;
        item.summary.sharpe = 1.5;

        let mut second = item_at(Utc::now(), "Breakout");
        second.summary.profit_factor = 1.75;

        let bytes = export_csv(&[item.clone(), second]).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], item.created_at.to_rfc3339());
        assert_eq!(&rows[0][1], "ORB/futures");
        assert_eq!(&rows[0][2], "100");
        assert_eq!(&rows[0][3], "10");
        assert_eq!(&rows[0][4], "5000.00");
        assert_eq!(&rows[0][5], "0.120000");
        assert_eq!(&rows[0][6], "0.125000");
        assert_eq!(&rows[0][7], "Infinity");
        assert_eq!(&rows[0][8], "1.500000");
        assert_eq!(&rows[1][1], "Breakout");
        assert_eq!(&rows[1][7], "1.750000");
    }
}
