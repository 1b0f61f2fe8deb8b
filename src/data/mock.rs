//! Randomized mock datasets.
//!
//! Every generator takes the RNG and the as-of date from the caller, so a
//! seeded `StdRng` reproduces the exact same dataset (ids included).

use chrono::{Days, NaiveDate};
use rand::Rng;

use crate::data::universe::{
    ETF_SYMBOLS, INDUSTRY_INDICES, REVIEW_ETFS, REVIEW_INDUSTRIES, STOCK_SYMBOLS, stock_name,
};
use crate::domain::{
    DataPoint, DataStatus, DataType, EtfQuote, EtfReturns, IndustryIndex, Percentiles, Record,
    ReviewItem, StockQuote, Valuation,
};

/// Probability that a nullable field is left empty.
const NULL_PROBABILITY: f64 = 0.05;

/// Probability that a generated data point is flagged as an anomaly.
const ANOMALY_PROBABILITY: f64 = 0.1;

/// Probability that a review row is flagged as abnormal.
const ABNORMAL_PROBABILITY: f64 = 0.2;

const ETF_SETUP_DATE: (i32, u32, u32) = (2010, 1, 1);
const STOCK_IPO_DATE: (i32, u32, u32) = (2000, 1, 1);

/// Uniform draw in `[min, max)` rounded to two decimals.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    let raw: f64 = rng.r#gen();
    round2(raw * (max - min) + min)
}

/// Like [`uniform`], but nullable fields are `None` 5% of the time.
pub fn random_number<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64, nullable: bool) -> Option<f64> {
    if nullable && rng.gen_bool(NULL_PROBABILITY) {
        return None;
    }
    Some(uniform(rng, min, max))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `days` calendar dates ending at `asof`, newest first.
pub fn date_range(asof: NaiveDate, days: usize) -> Vec<NaiveDate> {
    (0..days as u64)
        .filter_map(|i| asof.checked_sub_days(Days::new(i)))
        .collect()
}

fn new_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bytes: [u8; 16] = rng.r#gen();
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

fn initial_status<R: Rng + ?Sized>(rng: &mut R) -> DataStatus {
    if rng.gen_bool(ANOMALY_PROBABILITY) {
        DataStatus::Anomaly
    } else {
        DataStatus::Normal
    }
}

fn fixed_date((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Generate `days` of data for `kind`.
pub fn generate<R: Rng + ?Sized>(kind: DataType, rng: &mut R, asof: NaiveDate, days: usize) -> Vec<DataPoint> {
    match kind {
        DataType::Industry => generate_industry_data(rng, asof, days),
        DataType::Etf => generate_etf_data(rng, asof, days),
        DataType::Stock => generate_stock_data(rng, asof, days),
    }
}

pub fn generate_industry_data<R: Rng + ?Sized>(rng: &mut R, asof: NaiveDate, days: usize) -> Vec<DataPoint> {
    let dates = date_range(asof, days);
    let mut data = Vec::with_capacity(INDUSTRY_INDICES.len() * dates.len());

    for index in INDUSTRY_INDICES {
        for &date in &dates {
            let record = IndustryIndex {
                date,
                symbol: index.symbol.to_string(),
                name: index.name.to_string(),
                pe_ttm: random_number(rng, 10.0, 30.0, true),
                pb_lyr: random_number(rng, 1.0, 5.0, true),
                ps_ttm: random_number(rng, 1.0, 10.0, true),
                dividend_yield: random_number(rng, 1.0, 5.0, true),
                percentiles: Some(Percentiles {
                    pe_ttm: uniform(rng, 0.0, 100.0),
                    pb_lyr: uniform(rng, 0.0, 100.0),
                    ps_ttm: uniform(rng, 0.0, 100.0),
                    dividend_yield: uniform(rng, 0.0, 100.0),
                }),
            };

            data.push(DataPoint {
                id: new_id(rng),
                timestamp: date,
                status: initial_status(rng),
                kind: DataType::Industry,
                data: Record::Industry(record),
            });
        }
    }

    data
}

/// OHLC around a base price: open at base, close/pre-close within ±2%,
/// high 1-3% above, low 1-3% below.
struct Bar {
    open: f64,
    close: f64,
    high: f64,
    low: f64,
    pre_close: f64,
}

fn bar_around<R: Rng + ?Sized>(rng: &mut R, base: f64) -> Bar {
    Bar {
        open: base,
        close: base * (1.0 + uniform(rng, -0.02, 0.02)),
        high: base * (1.0 + uniform(rng, 0.01, 0.03)),
        low: base * (1.0 - uniform(rng, 0.01, 0.03)),
        pre_close: base * (1.0 + uniform(rng, -0.02, 0.02)),
    }
}

pub fn generate_etf_data<R: Rng + ?Sized>(rng: &mut R, asof: NaiveDate, days: usize) -> Vec<DataPoint> {
    let dates = date_range(asof, days);
    let mut data = Vec::with_capacity(ETF_SYMBOLS.len() * dates.len());

    for etf in ETF_SYMBOLS {
        for &date in &dates {
            let base = uniform(rng, 100.0, 400.0);
            let bar = bar_around(rng, base);
            let record = EtfQuote {
                date,
                symbol: etf.symbol.to_string(),
                name: etf.name.to_string(),
                setup_date: fixed_date(ETF_SETUP_DATE),
                open: bar.open,
                close: bar.close,
                high: bar.high,
                low: bar.low,
                pre_close: bar.pre_close,
                volume: uniform(rng, 100_000.0, 1_000_000.0).floor() as u64,
                returns: Some(EtfReturns {
                    m1: uniform(rng, -10.0, 10.0),
                    m3: uniform(rng, -15.0, 15.0),
                    m6: uniform(rng, -20.0, 20.0),
                    y1: uniform(rng, -30.0, 30.0),
                    y1_excess: uniform(rng, -10.0, 10.0),
                    y2_excess: uniform(rng, -15.0, 15.0),
                    y3_excess: uniform(rng, -20.0, 20.0),
                }),
            };

            data.push(DataPoint {
                id: new_id(rng),
                timestamp: date,
                status: initial_status(rng),
                kind: DataType::Etf,
                data: Record::Etf(record),
            });
        }
    }

    data
}

pub fn generate_stock_data<R: Rng + ?Sized>(rng: &mut R, asof: NaiveDate, days: usize) -> Vec<DataPoint> {
    let dates = date_range(asof, days);
    let mut data = Vec::with_capacity(STOCK_SYMBOLS.len() * dates.len());

    for symbol in STOCK_SYMBOLS {
        for &date in &dates {
            let base = uniform(rng, 100.0, 1000.0);
            let bar = bar_around(rng, base);
            let record = StockQuote {
                date,
                symbol: symbol.to_string(),
                ipo_date: fixed_date(STOCK_IPO_DATE),
                market_cap: uniform(rng, 100_000_000_000.0, 3_000_000_000_000.0),
                open: bar.open,
                close: bar.close,
                high: bar.high,
                low: bar.low,
                pre_close: bar.pre_close,
                volume: uniform(rng, 1_000_000.0, 10_000_000.0).floor() as u64,
                pe_ttm: random_number(rng, 15.0, 50.0, true),
                dividend_yield: random_number(rng, 0.0, 3.0, true),
                yoy_revenue_growth: random_number(rng, -10.0, 30.0, true),
            };

            data.push(DataPoint {
                id: new_id(rng),
                timestamp: date,
                status: initial_status(rng),
                kind: DataType::Stock,
                data: Record::Stock(record),
            });
        }
    }

    data
}

/// Ranges for the valuation ratios of a review row.
struct RatioRanges {
    pe: (f64, f64),
    pb: (f64, f64),
    ps: (f64, f64),
    dividend_yield: (f64, f64),
    market_cap: (f64, f64),
    volume: (f64, f64),
    revenue_yoy: (f64, f64),
}

fn ratio_ranges(kind: DataType) -> RatioRanges {
    match kind {
        DataType::Industry => RatioRanges {
            pe: (10.0, 40.0),
            pb: (1.0, 6.0),
            ps: (2.0, 10.0),
            dividend_yield: (0.0, 5.0),
            market_cap: (0.0, 1_000_000_000_000.0),
            volume: (0.0, 10_000_000.0),
            revenue_yoy: (-20.0, 20.0),
        },
        DataType::Etf => RatioRanges {
            pe: (12.0, 37.0),
            pb: (1.2, 5.2),
            ps: (1.5, 7.5),
            dividend_yield: (0.0, 4.0),
            market_cap: (0.0, 500_000_000_000.0),
            volume: (0.0, 5_000_000.0),
            revenue_yoy: (-15.0, 15.0),
        },
        DataType::Stock => RatioRanges {
            pe: (15.0, 65.0),
            pb: (2.0, 12.0),
            ps: (3.0, 18.0),
            dividend_yield: (0.0, 5.0),
            market_cap: (0.0, 1_000_000_000_000.0),
            volume: (0.0, 10_000_000.0),
            revenue_yoy: (-20.0, 20.0),
        },
    }
}

/// One review row for a pull task step.
///
/// Index and ETF pulls sample a benchmark at random; stock pulls use `symbol`
/// (falling back to a synthetic `STOCK-NN` ticker when none is given).
pub fn generate_review_item<R: Rng + ?Sized>(rng: &mut R, kind: DataType, symbol: Option<&str>) -> ReviewItem {
    let (symbol, name, value) = match kind {
        DataType::Industry => {
            let b = REVIEW_INDUSTRIES[rng.gen_range(0..REVIEW_INDUSTRIES.len())];
            (b.symbol.to_string(), b.name.to_string(), b.value)
        }
        DataType::Etf => {
            let b = REVIEW_ETFS[rng.gen_range(0..REVIEW_ETFS.len())];
            (b.symbol.to_string(), b.name.to_string(), b.value)
        }
        DataType::Stock => {
            let symbol = match symbol {
                Some(s) => s.to_string(),
                None => format!("STOCK-{}", rng.gen_range(0..100)),
            };
            let name = stock_name(&symbol).map(str::to_string).unwrap_or_else(|| symbol.clone());
            (symbol, name, uniform(rng, 3000.0, 8000.0))
        }
    };

    let r = ratio_ranges(kind);
    let pe_percentile = uniform(rng, 0.0, 100.0);
    let pb_percentile = uniform(rng, 0.0, 100.0);

    ReviewItem {
        symbol,
        name,
        value,
        change: uniform(rng, -3.0, 3.0),
        is_abnormal: rng.gen_bool(ABNORMAL_PROBABILITY),
        corrected_value: None,
        pe: Some(uniform(rng, r.pe.0, r.pe.1)),
        pe_percentile: Some(pe_percentile),
        pb: Some(uniform(rng, r.pb.0, r.pb.1)),
        pb_percentile: Some(pb_percentile),
        ps: Some(uniform(rng, r.ps.0, r.ps.1)),
        ps_percentile: Some(uniform(rng, 0.0, 100.0)),
        dividend_yield: Some(uniform(rng, r.dividend_yield.0, r.dividend_yield.1)),
        dividend_yield_percentile: Some(uniform(rng, 0.0, 100.0)),
        market_cap: Some(uniform(rng, r.market_cap.0, r.market_cap.1)),
        volume: Some(uniform(rng, r.volume.0, r.volume.1).floor() as u64),
        revenue_yoy: Some(uniform(rng, r.revenue_yoy.0, r.revenue_yoy.1)),
        smart_valuation: Some(Valuation::from_percentiles(pe_percentile, pb_percentile)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn asof() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn date_range_walks_backwards_from_asof() {
        let dates = date_range(asof(), 3);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            ]
        );
        assert!(date_range(asof(), 0).is_empty());
    }

    #[test]
    fn industry_dataset_covers_every_index_and_day() {
        let mut rng = StdRng::seed_from_u64(7);
        let data = generate_industry_data(&mut rng, asof(), 30);
        assert_eq!(data.len(), INDUSTRY_INDICES.len() * 30);

        let ids: HashSet<_> = data.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), data.len(), "ids must be unique");

        for p in &data {
            assert_eq!(p.kind, DataType::Industry);
            assert_ne!(p.status, DataStatus::Fixed);
            let Record::Industry(r) = &p.data else {
                panic!("expected industry record");
            };
            assert_eq!(r.date, p.timestamp);
            if let Some(pe) = r.pe_ttm {
                assert!((10.0..=30.0).contains(&pe), "pe out of range: {pe}");
            }
            let pct = r.percentiles.as_ref().unwrap();
            assert!((0.0..=100.0).contains(&pct.pe_ttm));
        }
    }

    #[test]
    fn etf_bars_bracket_the_open() {
        let mut rng = StdRng::seed_from_u64(11);
        let data = generate_etf_data(&mut rng, asof(), 5);
        assert_eq!(data.len(), ETF_SYMBOLS.len() * 5);
        for p in &data {
            let Record::Etf(r) = &p.data else {
                panic!("expected etf record");
            };
            assert!(r.high >= r.open && r.low <= r.open);
            assert!((100_000..=1_000_000).contains(&r.volume));
            assert_eq!(r.setup_date, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        }
    }

    #[test]
    fn stock_dataset_uses_fixed_tickers() {
        let mut rng = StdRng::seed_from_u64(3);
        let data = generate_stock_data(&mut rng, asof(), 2);
        let symbols: HashSet<_> = data.iter().map(|p| p.data.symbol().to_string()).collect();
        assert_eq!(symbols.len(), STOCK_SYMBOLS.len());
        assert!(symbols.contains("TSLA"));
    }

    #[test]
    fn same_seed_reproduces_dataset() {
        let a = generate(DataType::Stock, &mut StdRng::seed_from_u64(42), asof(), 4);
        let b = generate(DataType::Stock, &mut StdRng::seed_from_u64(42), asof(), 4);
        assert_eq!(a, b);
    }

    #[test]
    fn nullable_numbers_are_sometimes_missing() {
        let mut rng = StdRng::seed_from_u64(99);
        let draws: Vec<_> = (0..2_000).map(|_| random_number(&mut rng, 1.0, 2.0, true)).collect();
        let missing = draws.iter().filter(|v| v.is_none()).count();
        assert!(missing > 0 && missing < 300, "missing={missing}");
        assert!((0..100).all(|_| random_number(&mut rng, 1.0, 2.0, false).is_some()));
    }

    #[test]
    fn review_item_for_stock_resolves_catalog_name() {
        let mut rng = StdRng::seed_from_u64(5);
        let item = generate_review_item(&mut rng, DataType::Stock, Some("NVDA"));
        assert_eq!(item.symbol, "NVDA");
        assert_eq!(item.name, "NVIDIA Corporation");
        assert!(item.corrected_value.is_none());
        let expected = Valuation::from_percentiles(item.pe_percentile.unwrap(), item.pb_percentile.unwrap());
        assert_eq!(item.smart_valuation, Some(expected));
    }

    #[test]
    fn review_item_for_etf_samples_benchmarks() {
        let mut rng = StdRng::seed_from_u64(6);
        let item = generate_review_item(&mut rng, DataType::Etf, None);
        assert!(REVIEW_ETFS.iter().any(|b| b.symbol == item.symbol && b.value == item.value));
        assert!((-3.0..=3.0).contains(&item.change));
    }
}
