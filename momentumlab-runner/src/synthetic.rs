//! Seeded synthetic market snapshots for demos and tests.
//!
//! Each ticker gets its own `StdRng` seeded from BLAKE3 over the run seed
//! and the ticker, so a ticker's path does not depend on which other
//! tickers are generated alongside it.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use momentumlab_core::domain::{PriceBar, PriceSeries, UniverseCandidate};
use momentumlab_core::indicators::RealizedVol;

use crate::data_loader::{LoadError, MarketSnapshot, VolatilityQuote};

#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub tickers: Vec<String>,
    /// Last bar date; earlier bars step back over weekdays.
    pub end: NaiveDate,
    pub trading_days: usize,
    pub seed: u64,
    pub risk_free_rate: f64,
}

fn ticker_rng(seed: u64, ticker: &str) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(ticker.as_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}

/// `n` weekdays ending on or before `end`, oldest first.
fn weekdays_ending(end: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut current = end;
    while dates.len() < n {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
        current -= Duration::days(1);
    }
    dates.reverse();
    dates
}

/// Random walk with a per-ticker drift and volatility.
pub fn generate_series(ticker: &str, dates: &[NaiveDate], rng: &mut StdRng) -> Result<PriceSeries, LoadError> {
    let annual_drift: f64 = rng.gen_range(-0.60..0.60);
    let annual_vol: f64 = rng.gen_range(0.15..0.60);
    let daily_drift = annual_drift / 252.0;
    let daily_vol = annual_vol / 252.0_f64.sqrt();

    let mut price: f64 = rng.gen_range(20.0..300.0);
    let mut bars = Vec::with_capacity(dates.len());
    for &date in dates {
        let shock: f64 = rng.gen_range(-1.0..1.0) * daily_vol * 3.0_f64.sqrt();
        let open = price * (1.0 + rng.gen_range(-0.005..0.005));
        price = (price * (1.0 + daily_drift + shock)).max(0.5);
        let volume = rng.gen_range(500_000..20_000_000u64);
        bars.push(PriceBar::new(date, price, volume).with_open(open));
    }
    Ok(PriceSeries::new(ticker, bars)?)
}

pub fn generate_snapshot(spec: &SyntheticSpec) -> Result<MarketSnapshot, LoadError> {
    let dates = weekdays_ending(spec.end, spec.trading_days);
    let rv = RealizedVol::new(30);

    let mut series = BTreeMap::new();
    let mut fundamentals = BTreeMap::new();
    let mut volatility = BTreeMap::new();

    for ticker in &spec.tickers {
        let ticker = ticker.to_uppercase();
        let mut rng = ticker_rng(spec.seed, &ticker);
        let s = generate_series(&ticker, &dates, &mut rng)?;

        let last = s.last_close().unwrap_or(1.0);
        let avg_volume = s.bars().iter().rev().take(20).map(|b| b.volume as f64).sum::<f64>() / 20.0;
        let mut candidate = UniverseCandidate::new(
            ticker.clone(),
            rng.gen_range(1e9..500e9),
            avg_volume * last,
            last,
        );
        candidate.shortable = rng.gen_bool(0.9);
        candidate.days_to_earnings = Some(rng.gen_range(1..90));
        candidate.one_year_return = s.close_back(252.min(s.len().saturating_sub(1))).map(|p| last / p - 1.0);

        let realized = rv.latest_or(s.bars(), 0.30);
        volatility.insert(
            ticker.clone(),
            VolatilityQuote {
                implied_vol: realized * rng.gen_range(0.85..1.30),
                iv_rank: Some(rng.gen_range(5.0..80.0)),
                expiries: Vec::new(),
            },
        );
        fundamentals.insert(ticker.clone(), candidate);
        series.insert(ticker, s);
    }

    MarketSnapshot::from_parts(series, fundamentals, volatility, spec.risk_free_rate)
        .ok_or_else(|| LoadError::NoPriceData("synthetic".into()))
}
