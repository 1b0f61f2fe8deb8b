//! Static instrument universe used by the generators.

/// A tradable or benchmark instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    pub symbol: &'static str,
    pub name: &'static str,
}

/// Reference level used to seed review rows for index/ETF pulls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Benchmark {
    pub symbol: &'static str,
    pub name: &'static str,
    pub value: f64,
    pub change: f64,
}

const fn listing(symbol: &'static str, name: &'static str) -> Listing {
    Listing { symbol, name }
}

const fn benchmark(symbol: &'static str, name: &'static str, value: f64, change: f64) -> Benchmark {
    Benchmark {
        symbol,
        name,
        value,
        change,
    }
}

pub const INDUSTRY_INDICES: [Listing; 8] = [
    listing("S5COND.SPI", "Consumer Discretionary"),
    listing("S5MATR.SPI", "Materials"),
    listing("SPF.SPI", "Financials"),
    listing("SPN.SPI", "Energy"),
    listing("S5INDU.SPI", "Industrials"),
    listing("NDX.GI", "NASDAQ 100"),
    listing("DJI.GI", "Dow Jones Industrial"),
    listing("SPX.GI", "S&P 500"),
];

pub const ETF_SYMBOLS: [Listing; 7] = [
    listing("XLE.P", "Energy Select Sector SPDR"),
    listing("VDE.P", "Vanguard Energy ETF"),
    listing("XLB.P", "Materials Select Sector SPDR"),
    listing("XLI.P", "Industrial Select Sector SPDR"),
    listing("XLY.P", "Consumer Discretionary Select SPDR"),
    listing("XLF.P", "Financial Select Sector SPDR"),
    listing("SPY.P", "SPDR S&P 500 ETF"),
];

/// Tickers covered by the scheduled stock dataset.
pub const STOCK_SYMBOLS: [&str; 6] = ["AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA"];

/// Stocks selectable for pull tasks.
pub const STOCK_CATALOG: [Listing; 20] = [
    listing("AAPL", "Apple Inc."),
    listing("MSFT", "Microsoft Corporation"),
    listing("GOOGL", "Alphabet Inc."),
    listing("AMZN", "Amazon.com, Inc."),
    listing("META", "Meta Platforms, Inc."),
    listing("TSLA", "Tesla, Inc."),
    listing("NVDA", "NVIDIA Corporation"),
    listing("JPM", "JPMorgan Chase & Co."),
    listing("BAC", "Bank of America Corp."),
    listing("WMT", "Walmart Inc."),
    listing("PG", "Procter & Gamble Co."),
    listing("JNJ", "Johnson & Johnson"),
    listing("UNH", "UnitedHealth Group Inc."),
    listing("HD", "The Home Depot, Inc."),
    listing("MA", "Mastercard Inc."),
    listing("INTC", "Intel Corporation"),
    listing("VZ", "Verizon Communications Inc."),
    listing("DIS", "The Walt Disney Company"),
    listing("ADBE", "Adobe Inc."),
    listing("NFLX", "Netflix, Inc."),
];

pub const REVIEW_INDUSTRIES: [Benchmark; 10] = [
    benchmark("TECH", "Technology", 2345.67, 2.3),
    benchmark("FIN", "Financials", 1876.54, -1.2),
    benchmark("HEALTH", "Health Care", 3456.78, 1.5),
    benchmark("CONS", "Consumer Goods", 1234.56, 0.8),
    benchmark("ENERGY", "Energy", 2789.12, -0.7),
    benchmark("MATER", "Materials", 1567.89, 1.1),
    benchmark("INDUS", "Industrials", 2123.45, -0.5),
    benchmark("REAL", "Real Estate", 1890.23, -1.8),
    benchmark("TELE", "Telecom Services", 1678.90, 0.6),
    benchmark("UTIL", "Utilities", 1456.78, 0.3),
];

pub const REVIEW_ETFS: [Benchmark; 10] = [
    benchmark("SPY", "S&P 500 ETF", 456.78, 1.2),
    benchmark("QQQ", "Nasdaq 100", 378.90, 2.1),
    benchmark("IWM", "Russell 2000", 189.45, -0.8),
    benchmark("EEM", "Emerging Markets", 42.31, -1.5),
    benchmark("VGK", "European Equities", 58.67, 0.7),
    benchmark("FXI", "China Large-Cap", 28.45, 1.6),
    benchmark("GLD", "Gold ETF", 178.90, -0.4),
    benchmark("TLT", "Long-Term Treasuries", 98.76, -0.9),
    benchmark("VNQ", "Real Estate ETF", 84.52, -1.1),
    benchmark("XLE", "Energy Sector ETF", 76.89, 0.5),
];

/// Company name for a ticker, if it is in the catalog.
pub fn stock_name(symbol: &str) -> Option<&'static str> {
    STOCK_CATALOG
        .iter()
        .find(|l| l.symbol == symbol)
        .map(|l| l.name)
}
