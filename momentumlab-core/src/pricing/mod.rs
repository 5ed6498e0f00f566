//! European option pricing (Black-Scholes) and Greeks.
//!
//! Quotes are pure value objects: identical inputs always produce identical
//! outputs. Conventions: theta per calendar day, vega and rho per one point
//! (1%) of volatility and rate.

pub mod black_scholes;
pub mod implied_vol;

pub use black_scholes::price;
pub use implied_vol::implied_vol;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar days per year used to turn DTE into `T`.
pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKind {
    Put,
    Call,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => write!(f, "PUT"),
            Self::Call => write!(f, "CALL"),
        }
    }
}

pub fn time_to_expiry_years(days_to_expiry: i64) -> f64 {
    days_to_expiry as f64 / DAYS_PER_YEAR
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub spot: f64,
    pub strike: f64,
    /// Years.
    pub time_to_expiry: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    pub kind: OptionKind,
}

impl PricingInput {
    pub fn new(
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        kind: OptionKind,
    ) -> Self {
        Self {
            spot,
            strike,
            time_to_expiry,
            risk_free_rate,
            volatility,
            kind,
        }
    }

    pub fn from_dte(
        spot: f64,
        strike: f64,
        days_to_expiry: i64,
        risk_free_rate: f64,
        volatility: f64,
        kind: OptionKind,
    ) -> Self {
        Self::new(
            spot,
            strike,
            time_to_expiry_years(days_to_expiry),
            risk_free_rate,
            volatility,
            kind,
        )
    }

    pub fn with_strike(self, strike: f64) -> Self {
        Self { strike, ..self }
    }

    pub fn with_volatility(self, volatility: f64) -> Self {
        Self { volatility, ..self }
    }

    pub fn with_kind(self, kind: OptionKind) -> Self {
        Self { kind, ..self }
    }

    /// Intrinsic value at expiry.
    pub fn intrinsic(&self) -> f64 {
        match self.kind {
            OptionKind::Put => (self.strike - self.spot).max(0.0),
            OptionKind::Call => (self.spot - self.strike).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    /// Per calendar day.
    pub theta: f64,
    /// Per 1% change in volatility.
    pub vega: f64,
    /// Per 1% change in the risk-free rate.
    pub rho: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub input: PricingInput,
    pub price: f64,
    pub greeks: Greeks,
}

impl OptionQuote {
    pub fn strike(&self) -> f64 {
        self.input.strike
    }

    pub fn delta(&self) -> f64 {
        self.greeks.delta
    }
}
