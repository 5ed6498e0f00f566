//! Point-in-time market snapshot loaded from a directory of CSV files.
//!
//! Layout:
//! - `prices/<TICKER>.csv` with columns `date,close,volume[,open]`
//! - `fundamentals.csv`, one `UniverseCandidate` per row
//! - `volatility.csv` with columns `ticker,implied_vol,iv_rank,expiries`,
//!   where `iv_rank` may be blank and `expiries` is a `;`-separated list of
//!   ISO dates (blank means the standard monthly calendar)
//!
//! A ticker whose file is unreadable or malformed is skipped with a warning
//! and recorded in `MarketSnapshot::issues`; it never aborts the load. The
//! same holds for a single bad row in `fundamentals.csv` or
//! `volatility.csv`: only that ticker is dropped.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use momentumlab_core::domain::{PriceBar, PriceSeries, UniverseCandidate};
use momentumlab_core::error::EngineError;

pub const PRICES_DIR: &str = "prices";
pub const FUNDAMENTALS_FILE: &str = "fundamentals.csv";
pub const VOLATILITY_FILE: &str = "volatility.csv";

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data directory '{0}' does not exist")]
    MissingDirectory(String),

    #[error("no price files found under '{0}'")]
    NoPriceData(String),

    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("bad field in '{path}': {detail}")]
    Field { path: String, detail: String },

    #[error(transparent)]
    Series(#[from] EngineError),
}

impl LoadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Implied-volatility facts for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityQuote {
    pub implied_vol: f64,
    pub iv_rank: Option<f64>,
    #[serde(default)]
    pub expiries: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize, Serialize)]
struct VolatilityRow {
    ticker: String,
    implied_vol: f64,
    iv_rank: Option<f64>,
    #[serde(default)]
    expiries: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Truncate every series to bars on or before this date.
    pub as_of: Option<NaiveDate>,
    pub risk_free_rate: f64,
}

/// Immutable input to one engine cycle.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub as_of: NaiveDate,
    pub risk_free_rate: f64,
    pub series: BTreeMap<String, PriceSeries>,
    pub fundamentals: BTreeMap<String, UniverseCandidate>,
    pub volatility: BTreeMap<String, VolatilityQuote>,
    /// False when no fundamentals file was supplied; the universe filter is
    /// then bypassed. A supplied file whose rows all failed still counts.
    pub has_fundamentals: bool,
    /// BLAKE3 over every bar and fundamental, in ticker order.
    pub dataset_hash: String,
    /// `(ticker or file, reason)` for everything skipped while loading.
    pub issues: Vec<(String, String)>,
}

impl MarketSnapshot {
    /// Assembles a snapshot from in-memory parts, dating it at the latest bar.
    pub fn from_parts(
        series: BTreeMap<String, PriceSeries>,
        fundamentals: BTreeMap<String, UniverseCandidate>,
        volatility: BTreeMap<String, VolatilityQuote>,
        risk_free_rate: f64,
    ) -> Option<Self> {
        let as_of = series.values().filter_map(PriceSeries::as_of).max()?;
        let dataset_hash = compute_dataset_hash(&series, &fundamentals);
        Some(Self {
            as_of,
            risk_free_rate,
            series,
            has_fundamentals: !fundamentals.is_empty(),
            fundamentals,
            volatility,
            dataset_hash,
            issues: Vec::new(),
        })
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.series.keys().map(String::as_str).collect()
    }

    /// Candidates with fundamentals, in ticker order.
    pub fn candidates(&self) -> Vec<UniverseCandidate> {
        self.fundamentals.values().cloned().collect()
    }
}

pub fn load_snapshot(dir: &Path, opts: &LoadOptions) -> Result<MarketSnapshot, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::MissingDirectory(dir.display().to_string()));
    }
    let mut issues = Vec::new();

    let prices_dir = dir.join(PRICES_DIR);
    let mut series = BTreeMap::new();
    for path in price_files(&prices_dir)? {
        let Some(ticker) = path.file_stem().and_then(|s| s.to_str()).map(str::to_uppercase) else {
            continue;
        };
        match load_series(&path, &ticker) {
            Ok(s) => {
                let s = match opts.as_of {
                    Some(date) => s.as_of_date(date),
                    None => s,
                };
                if s.is_empty() {
                    warn!(ticker = %ticker, "no bars on or before the as-of date, skipped");
                    issues.push((ticker, "no bars on or before the as-of date".into()));
                } else {
                    series.insert(ticker, s);
                }
            }
            Err(e) => {
                warn!(ticker = %ticker, reason = %e, "price file skipped");
                issues.push((ticker, e.to_string()));
            }
        }
    }
    if series.is_empty() {
        return Err(LoadError::NoPriceData(prices_dir.display().to_string()));
    }

    let fundamentals = optional_rows(&dir.join(FUNDAMENTALS_FILE), fundamentals_row, &mut issues);
    let has_fundamentals = fundamentals.is_some();
    let fundamentals = fundamentals.unwrap_or_default();
    let volatility = optional_rows(&dir.join(VOLATILITY_FILE), volatility_row, &mut issues).unwrap_or_default();

    let as_of = match opts.as_of {
        Some(date) => date,
        None => series
            .values()
            .filter_map(PriceSeries::as_of)
            .max()
            .ok_or_else(|| LoadError::NoPriceData(prices_dir.display().to_string()))?,
    };
    let dataset_hash = compute_dataset_hash(&series, &fundamentals);
    info!(
        tickers = series.len(),
        fundamentals = fundamentals.len(),
        volatility = volatility.len(),
        issues = issues.len(),
        %as_of,
        "snapshot loaded"
    );

    Ok(MarketSnapshot {
        as_of,
        risk_free_rate: opts.risk_free_rate,
        series,
        fundamentals,
        volatility,
        has_fundamentals,
        dataset_hash,
        issues,
    })
}

fn price_files(prices_dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !prices_dir.is_dir() {
        return Err(LoadError::NoPriceData(prices_dir.display().to_string()));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(prices_dir).map_err(|e| LoadError::io(prices_dir, e))? {
        let path = entry.map_err(|e| LoadError::io(prices_dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads a per-ticker CSV row by row.
///
/// `None` when the file is absent. A row that fails to parse or convert is
/// reported under its ticker and skipped; the rest of the file still loads.
fn optional_rows<R, T>(
    path: &Path,
    convert: fn(R) -> Result<(String, T), String>,
    issues: &mut Vec<(String, String)>,
) -> Option<BTreeMap<String, T>>
where
    R: DeserializeOwned,
{
    if !path.exists() {
        debug!(path = %path.display(), "optional file absent");
        return None;
    }
    let file = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |f| f.to_string_lossy().into_owned());
    let mut out = BTreeMap::new();

    let opened = csv::Reader::from_path(path).and_then(|mut r| {
        let headers = r.headers()?.clone();
        Ok((r, headers))
    });
    let (mut reader, headers) = match opened {
        Ok(pair) => pair,
        Err(e) => {
            let e = LoadError::csv(path, e);
            warn!(path = %path.display(), reason = %e, "file skipped");
            issues.push((file, e.to_string()));
            return Some(out);
        }
    };
    let ticker_col = headers.iter().position(|h| h.trim().eq_ignore_ascii_case("ticker"));

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                let recoverable = matches!(e.kind(), csv::ErrorKind::UnequalLengths { .. });
                warn!(path = %path.display(), reason = %e, "row skipped");
                issues.push((file.clone(), e.to_string()));
                if recoverable {
                    continue;
                }
                break;
            }
        };
        let line = record.position().map_or(0, csv::Position::line);
        let parsed = record
            .deserialize::<R>(Some(&headers))
            .map_err(|e| e.to_string())
            .and_then(convert);
        match parsed {
            Ok((ticker, value)) => {
                out.insert(ticker, value);
            }
            Err(detail) => {
                let ticker = ticker_col
                    .and_then(|i| record.get(i))
                    .map(|t| t.trim().to_uppercase())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| file.clone());
                warn!(%ticker, file = %file, line, reason = %detail, "row skipped");
                issues.push((ticker, format!("{file} line {line}: {detail}")));
            }
        }
    }
    Some(out)
}

pub fn load_series(path: &Path, ticker: &str) -> Result<PriceSeries, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| LoadError::csv(path, e))?;
    let mut bars: Vec<PriceBar> = Vec::new();
    for row in reader.deserialize() {
        bars.push(row.map_err(|e| LoadError::csv(path, e))?);
    }
    Ok(PriceSeries::new(ticker, bars)?)
}

fn fundamentals_row(mut c: UniverseCandidate) -> Result<(String, UniverseCandidate), String> {
    c.ticker = c.ticker.trim().to_uppercase();
    if c.ticker.is_empty() {
        return Err("blank ticker".into());
    }
    for (name, value) in [
        ("market_cap", c.market_cap),
        ("avg_dollar_volume", c.avg_dollar_volume),
        ("price", c.price),
        ("avg_share_volume", c.avg_share_volume),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(format!("{name} must be a non-negative number, got {value}"));
        }
    }
    if c.avg_share_volume == 0.0 && c.price > 0.0 {
        c.avg_share_volume = c.avg_dollar_volume / c.price;
    }
    Ok((c.ticker.clone(), c))
}

fn volatility_row(row: VolatilityRow) -> Result<(String, VolatilityQuote), String> {
    let ticker = row.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err("blank ticker".into());
    }
    if !(row.implied_vol.is_finite() && row.implied_vol > 0.0) {
        return Err(format!("implied_vol must be positive, got {}", row.implied_vol));
    }
    if let Some(rank) = row.iv_rank.filter(|r| !(0.0..=100.0).contains(r)) {
        return Err(format!("iv_rank must be within 0..=100, got {rank}"));
    }
    let expiries = parse_expiries(row.expiries.as_deref().unwrap_or(""))?;
    Ok((
        ticker,
        VolatilityQuote {
            implied_vol: row.implied_vol,
            iv_rank: row.iv_rank,
            expiries,
        },
    ))
}

fn parse_expiries(field: &str) -> Result<Vec<NaiveDate>, String> {
    let mut dates: Vec<NaiveDate> = field
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expiry '{s}': {e}")))
        .collect::<Result<_, _>>()?;
    dates.sort();
    dates.dedup();
    Ok(dates)
}

/// Writes `snapshot` in the layout [`load_snapshot`] reads.
pub fn save_snapshot(dir: &Path, snapshot: &MarketSnapshot) -> Result<(), LoadError> {
    let prices_dir = dir.join(PRICES_DIR);
    fs::create_dir_all(&prices_dir).map_err(|e| LoadError::io(&prices_dir, e))?;

    for (ticker, series) in &snapshot.series {
        let path = prices_dir.join(format!("{ticker}.csv"));
        let mut w = csv::Writer::from_path(&path).map_err(|e| LoadError::csv(&path, e))?;
        for bar in series.bars() {
            w.serialize(bar).map_err(|e| LoadError::csv(&path, e))?;
        }
        w.flush().map_err(|e| LoadError::io(&path, e))?;
    }

    let path = dir.join(FUNDAMENTALS_FILE);
    let mut w = csv::Writer::from_path(&path).map_err(|e| LoadError::csv(&path, e))?;
    for c in snapshot.fundamentals.values() {
        w.serialize(c).map_err(|e| LoadError::csv(&path, e))?;
    }
    w.flush().map_err(|e| LoadError::io(&path, e))?;

    let path = dir.join(VOLATILITY_FILE);
    let mut w = csv::Writer::from_path(&path).map_err(|e| LoadError::csv(&path, e))?;
    for (ticker, v) in &snapshot.volatility {
        let expiries: Vec<String> = v.expiries.iter().map(ToString::to_string).collect();
        w.serialize(VolatilityRow {
            ticker: ticker.clone(),
            implied_vol: v.implied_vol,
            iv_rank: v.iv_rank,
            expiries: Some(expiries.join(";")),
        })
        .map_err(|e| LoadError::csv(&path, e))?;
    }
    w.flush().map_err(|e| LoadError::io(&path, e))?;
    Ok(())
}

/// Deterministic BLAKE3 hash over all bars and fundamentals.
///
/// Iterates in ticker order, so the hash does not depend on load order.
fn compute_dataset_hash(
    series: &BTreeMap<String, PriceSeries>,
    fundamentals: &BTreeMap<String, UniverseCandidate>,
) -> String {
    let mut hasher = blake3::Hasher::new();
    for (ticker, s) in series {
        hasher.update(ticker.as_bytes());
        for bar in s.bars() {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
            hasher.update(&bar.open.unwrap_or(f64::NAN).to_le_bytes());
        }
    }
    for (ticker, c) in fundamentals {
        hasher.update(ticker.as_bytes());
        hasher.update(&c.market_cap.to_le_bytes());
        hasher.update(&c.avg_dollar_volume.to_le_bytes());
        hasher.update(&c.price.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
