//! Export a dataset to CSV.
//!
//! One row per data point. Columns depend on the record type; missing
//! (null) values are written as empty fields.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{DataPoint, DataType, Record};
use crate::error::AppError;

/// Write `points` (all of type `kind`) to a CSV file at `path`.
pub fn write_dataset_csv(path: &Path, kind: DataType, points: &[DataPoint]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_csv(&mut out, kind, points)?;
    out.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV '{}': {e}", path.display())))
}

/// CSV rendering of `points` into any writer.
pub fn write_csv<W: Write>(out: &mut W, kind: DataType, points: &[DataPoint]) -> Result<(), AppError> {
    writeln!(out, "id,date,status,{}", columns(kind))
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;

    for p in points {
        let fields = match &p.data {
            Record::Industry(r) => {
                let pct = r.percentiles.as_ref();
                [
                    r.symbol.clone(),
                    quote(&r.name),
                    opt(r.pe_ttm),
                    opt(r.pb_lyr),
                    opt(r.ps_ttm),
                    opt(r.dividend_yield),
                    opt(pct.map(|p| p.pe_ttm)),
                    opt(pct.map(|p| p.pb_lyr)),
                    opt(pct.map(|p| p.ps_ttm)),
                    opt(pct.map(|p| p.dividend_yield)),
                ]
                .join(",")
            }
            Record::Etf(r) => {
                let ret = r.returns.as_ref();
                [
                    r.symbol.clone(),
                    quote(&r.name),
                    r.setup_date.to_string(),
                    format!("{:.2}", r.open),
                    format!("{:.2}", r.high),
                    format!("{:.2}", r.low),
                    format!("{:.2}", r.close),
                    format!("{:.2}", r.pre_close),
                    r.volume.to_string(),
                    opt(ret.map(|x| x.m1)),
                    opt(ret.map(|x| x.m3)),
                    opt(ret.map(|x| x.m6)),
                    opt(ret.map(|x| x.y1)),
                ]
                .join(",")
            }
            Record::Stock(r) => [
                r.symbol.clone(),
                r.ipo_date.to_string(),
                format!("{:.2}", r.market_cap),
                format!("{:.2}", r.open),
                format!("{:.2}", r.high),
                format!("{:.2}", r.low),
                format!("{:.2}", r.close),
                format!("{:.2}", r.pre_close),
                r.volume.to_string(),
                opt(r.pe_ttm),
                opt(r.dividend_yield),
                opt(r.yoy_revenue_growth),
            ]
            .join(","),
        };
        writeln!(out, "{},{},{},{fields}", p.id, p.timestamp, p.status.as_str())
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }
    Ok(())
}

fn columns(kind: DataType) -> &'static str {
    match kind {
        DataType::Industry => {
            "symbol,name,pe_ttm,pb_lyr,ps_ttm,dividend_yield,pe_pct,pb_pct,ps_pct,dividend_yield_pct"
        }
        DataType::Etf => "symbol,name,setup_date,open,high,low,close,pre_close,volume,ret_1m,ret_3m,ret_6m,ret_1y",
        DataType::Stock => {
            "symbol,ipo_date,market_cap,open,high,low,close,pre_close,volume,pe_ttm,dividend_yield,yoy_revenue_growth"
        }
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn quote(s: &str) -> String {
    if s.contains([',', '"']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
