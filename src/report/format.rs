//! Plain-text rendering of dataset summaries.

use super::DatasetSummary;

/// Header block plus one table row per symbol.
pub fn format_summary(summary: &DatasetSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== refdesk - {} data ===\n", summary.kind.display_name()));
    let range = match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => format!("{first} .. {last}"),
        _ => "-".to_string(),
    };
    out.push_str(&format!("Dates: {range}\n"));
    out.push_str(&format!(
        "Points: n={} | anomaly={} | fixed={}\n\n",
        summary.points, summary.anomalies, summary.fixed
    ));

    out.push_str(&format!(
        "{:<12} {:<28} {:>10} {:>10} {:>10} {:>8}",
        "symbol", "name", "latest", "min", "max", "anomaly"
    ));
    out.push('\n');
    out.push_str(&format!(
        "{:-<12} {:-<28} {:-<10} {:-<10} {:-<10} {:-<8}",
        "", "", "", "", "", ""
    ));
    out.push('\n');

    for s in &summary.symbols {
        out.push_str(
            format!(
                "{:<12} {:<28} {:>10} {:>10} {:>10} {:>8}",
                truncate(&s.symbol, 12),
                truncate(&s.name, 28),
                fmt_value(s.latest),
                fmt_value(s.min),
                fmt_value(s.max),
                s.anomalies,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_value(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataType;
    use crate::report::SymbolSummary;
    use chrono::NaiveDate;

    #[test]
    fn renders_header_and_rows() {
        let summary = DatasetSummary {
            kind: DataType::Industry,
            first_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            last_date: NaiveDate::from_ymd_opt(2024, 1, 30),
            points: 2,
            anomalies: 1,
            fixed: 0,
            symbols: vec![SymbolSummary {
                symbol: "SPX.GI".to_string(),
                name: "S&P 500".to_string(),
                latest: Some(21.5),
                min: None,
                max: Some(30.0),
                anomalies: 1,
            }],
        };

        let text = format_summary(&summary);
        assert!(text.starts_with("=== refdesk - Industry Index data ===\n"));
        assert!(text.contains("Dates: 2024-01-01 .. 2024-01-30"));
        assert!(text.contains("Points: n=2 | anomaly=1 | fixed=0"));
        let row = text.lines().last().unwrap();
        assert!(row.starts_with("SPX.GI"));
        assert!(row.contains("21.50"));
        assert!(row.contains(" - "));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Consumer Discretionary", 10), "Consumer .");
    }
}
